// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reply transport for deterministic testing.
//!
//! `MockTransport` captures successful sends for assertion and can be told to
//! reject the next N deliveries.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatrelay_core::{AdapterType, HealthStatus, PluginAdapter, RelayError, ReplyTransport};
use tokio::sync::{Mutex, Notify};

/// Which transport path a message went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    Push,
    Reply,
}

/// A captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub kind: SendKind,
    /// User id for pushes, reply token for replies.
    pub target: String,
    pub text: String,
}

pub struct MockTransport {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail_remaining: AtomicUsize,
    attempts: AtomicUsize,
    notify: Notify,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_remaining: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Reject the next `n` sends with a delivery error.
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Successfully delivered messages, in send order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Number of send calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` messages were delivered or `timeout` elapses.
    pub async fn wait_for_sends(&self, n: usize, timeout: Duration) -> Vec<SentMessage> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.sent.lock().await.len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.sent().await
    }

    async fn record(&self, kind: SendKind, target: &str, text: &str) -> Result<(), RelayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RelayError::Delivery {
                message: "mock delivery failure".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(SentMessage {
            kind,
            target: target.to_string(),
            text: text.to_string(),
        });
        self.notify.notify_waiters();
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl ReplyTransport for MockTransport {
    async fn push(&self, user_id: &str, text: &str) -> Result<(), RelayError> {
        self.record(SendKind::Push, user_id, text).await
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), RelayError> {
        self.record(SendKind::Reply, reply_token, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_sends_and_fails_on_demand() {
        let transport = MockTransport::new();
        transport.fail_next(1);
        assert!(transport.push("U1", "first").await.is_err());
        transport.reply("rt", "second").await.unwrap();

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, SendKind::Reply);
        assert_eq!(sent[0].target, "rt");
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn wait_for_sends_sees_concurrent_delivery() {
        let transport = Arc::new(MockTransport::new());
        let sender = Arc::clone(&transport);
        tokio::spawn(async move {
            sender.push("U1", "hello").await.unwrap();
        });
        let sent = transport.wait_for_sends(1, Duration::from_secs(5)).await;
        assert_eq!(sent.len(), 1);
    }
}
