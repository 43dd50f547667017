// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded waiting for queue entries shared by both store implementations.

use std::future::Future;
use std::time::Duration;

use chatrelay_core::RelayError;
use tokio::sync::Notify;
use tokio::time::Instant;

/// How often a waiting consumer re-checks the store when no wakeup arrives.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Repeatedly run `claim` until it yields an item or `wait` elapses.
///
/// An in-process enqueue signals `notify`, ending the current nap early;
/// entries written by other processes are picked up on the next poll.
pub(crate) async fn claim_within<T, F, Fut>(
    notify: &Notify,
    wait: Duration,
    poll_interval: Duration,
    mut claim: F,
) -> Result<Option<T>, RelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, RelayError>>,
{
    let deadline = Instant::now() + wait;
    loop {
        let notified = notify.notified();
        if let Some(item) = claim().await? {
            return Ok(Some(item));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        let nap = (deadline - now).min(poll_interval);
        tokio::select! {
            _ = notified => {}
            _ = tokio::time::sleep(nap) => {}
        }
    }
}
