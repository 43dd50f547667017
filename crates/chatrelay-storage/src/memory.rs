// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process store implementing the same traits as [`SqliteStorage`](crate::SqliteStorage).
//!
//! Nothing survives a restart. Used by tests and by `serve --memory`.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chatrelay_core::types::{DEFAULT_QUEUE_NAME, MAX_HISTORY, history_key};
use chatrelay_core::{
    AdapterType, ConversationEntry, HealthStatus, HistoryStore, PluginAdapter, QueuedTask,
    RelayError, SettingsStore, Task, TaskQueue, UserSettings,
};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::wait::{DEFAULT_POLL_INTERVAL, claim_within};

struct QueueSlot {
    task: Task,
    locked_until: Option<Instant>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    queue: BTreeMap<i64, QueueSlot>,
    history: HashMap<String, VecDeque<ConversationEntry>>,
    settings: HashMap<String, UserSettings>,
}

/// Volatile store backed by in-process collections.
pub struct InMemoryStore {
    state: Mutex<State>,
    notify: Notify,
    max_history: usize,
    lock_timeout: Duration,
    queue_name: String,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl InMemoryStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            max_history,
            lock_timeout: Duration::from_secs(300),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
        }
    }

    /// Set how long a dequeued entry stays invisible before redelivery.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    async fn try_dequeue(&self) -> Result<Option<QueuedTask>, RelayError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let lock_until = now + self.lock_timeout;
        let claimed = state
            .queue
            .iter_mut()
            .find(|(_, slot)| slot.locked_until.is_none_or(|until| until <= now))
            .map(|(id, slot)| {
                slot.locked_until = Some(lock_until);
                QueuedTask {
                    id: *id,
                    task: slot.task.clone(),
                }
            });
        Ok(claimed)
    }
}

#[async_trait]
impl PluginAdapter for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for InMemoryStore {
    async fn enqueue(&self, task: &Task) -> Result<i64, RelayError> {
        let id = {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            let id = state.next_id;
            state.queue.insert(
                id,
                QueueSlot {
                    task: task.clone(),
                    locked_until: None,
                },
            );
            id
        };
        self.notify.notify_one();
        tracing::debug!(queue = %self.queue_name, queue_entry = id, "task enqueued");
        Ok(id)
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<QueuedTask>, RelayError> {
        claim_within(&self.notify, wait, DEFAULT_POLL_INTERVAL, || self.try_dequeue()).await
    }

    async fn ack(&self, id: i64) -> Result<(), RelayError> {
        self.state.lock().await.queue.remove(&id);
        Ok(())
    }

    async fn len(&self) -> Result<usize, RelayError> {
        let state = self.state.lock().await;
        Ok(state
            .queue
            .values()
            .filter(|slot| slot.locked_until.is_none())
            .count())
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn append(&self, user_id: &str, entry: &ConversationEntry) -> Result<(), RelayError> {
        let mut state = self.state.lock().await;
        let log = state.history.entry(history_key(user_id)).or_default();
        log.push_back(entry.clone());
        while log.len() > self.max_history {
            log.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, user_id: &str, n: usize) -> Result<Vec<ConversationEntry>, RelayError> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .get(&history_key(user_id))
            .map(|log| {
                let skip = log.len().saturating_sub(n);
                log.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn search(
        &self,
        user_id: &str,
        keyword: &str,
    ) -> Result<Vec<ConversationEntry>, RelayError> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .get(&history_key(user_id))
            .map(|log| log.iter().filter(|e| e.matches(keyword)).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>, RelayError> {
        Ok(self.state.lock().await.settings.get(user_id).cloned())
    }

    async fn put_settings(&self, settings: &UserSettings) -> Result<(), RelayError> {
        self.state
            .lock()
            .await
            .settings
            .insert(settings.user_id.clone(), settings.clone());
        Ok(())
    }
}
