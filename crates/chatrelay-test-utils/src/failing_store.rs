// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A store whose every operation fails, for degrade-path tests.

use std::time::Duration;

use async_trait::async_trait;
use chatrelay_core::{
    ConversationEntry, HistoryStore, QueuedTask, RelayError, SettingsStore, Task, TaskQueue,
    UserSettings,
};

/// Implements every store trait and returns a storage error from each call.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

fn unavailable() -> RelayError {
    RelayError::Storage {
        source: Box::new(std::io::Error::other("store unavailable")),
    }
}

#[async_trait]
impl TaskQueue for FailingStore {
    async fn enqueue(&self, _task: &Task) -> Result<i64, RelayError> {
        Err(unavailable())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<QueuedTask>, RelayError> {
        tokio::time::sleep(wait).await;
        Err(unavailable())
    }

    async fn ack(&self, _id: i64) -> Result<(), RelayError> {
        Err(unavailable())
    }

    async fn len(&self) -> Result<usize, RelayError> {
        Err(unavailable())
    }
}

#[async_trait]
impl HistoryStore for FailingStore {
    async fn append(&self, _user_id: &str, _entry: &ConversationEntry) -> Result<(), RelayError> {
        Err(unavailable())
    }

    async fn recent(
        &self,
        _user_id: &str,
        _n: usize,
    ) -> Result<Vec<ConversationEntry>, RelayError> {
        Err(unavailable())
    }

    async fn search(
        &self,
        _user_id: &str,
        _keyword: &str,
    ) -> Result<Vec<ConversationEntry>, RelayError> {
        Err(unavailable())
    }
}

#[async_trait]
impl SettingsStore for FailingStore {
    async fn get_settings(&self, _user_id: &str) -> Result<Option<UserSettings>, RelayError> {
        Err(unavailable())
    }

    async fn put_settings(&self, _settings: &UserSettings) -> Result<(), RelayError> {
        Err(unavailable())
    }
}
