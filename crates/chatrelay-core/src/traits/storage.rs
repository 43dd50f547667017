// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store traits for the work queue, conversation history, and user settings.
//!
//! Components hold these as `Arc<dyn Trait>` handles so the SQLite store and
//! the in-memory store are interchangeable.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{ConversationEntry, QueuedTask, Task, UserSettings};

/// Durable FIFO handoff between webhook producers and the worker.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Appends a task to the tail of the queue and returns its entry id.
    async fn enqueue(&self, task: &Task) -> Result<i64, RelayError>;

    /// Takes the oldest available task, waiting up to `wait` for one to arrive.
    async fn dequeue(&self, wait: Duration) -> Result<Option<QueuedTask>, RelayError>;

    /// Removes a dequeued entry once it has been handled.
    async fn ack(&self, id: i64) -> Result<(), RelayError>;

    /// Number of entries waiting to be dequeued.
    async fn len(&self) -> Result<usize, RelayError>;
}

/// Bounded per-user conversation log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Inserts the newest entry, evicting the oldest ones beyond capacity.
    async fn append(&self, user_id: &str, entry: &ConversationEntry) -> Result<(), RelayError>;

    /// Returns at most `n` of the most recent entries, oldest first.
    async fn recent(&self, user_id: &str, n: usize) -> Result<Vec<ConversationEntry>, RelayError>;

    /// Returns entries whose user or assistant text contains `keyword`, oldest first.
    async fn search(
        &self,
        user_id: &str,
        keyword: &str,
    ) -> Result<Vec<ConversationEntry>, RelayError>;
}

/// Per-user preference storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>, RelayError>;

    /// Creates or overwrites the settings for `settings.user_id`.
    async fn put_settings(&self, settings: &UserSettings) -> Result<(), RelayError>;
}
