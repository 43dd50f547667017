// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the queue, history, and settings stores.

use std::time::Duration;

use async_trait::async_trait;
use chatrelay_config::model::StorageConfig;
use chatrelay_core::types::history_key;
use chatrelay_core::{
    AdapterType, ConversationEntry, HealthStatus, HistoryStore, PluginAdapter, QueuedTask,
    RelayError, SettingsStore, Task, TaskQueue, UserSettings,
};
use tokio::sync::{Notify, OnceCell};
use tracing::{debug, warn};

use crate::database::Database;
use crate::queries;
use crate::wait::{DEFAULT_POLL_INTERVAL, claim_within};

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
    notify: Notify,
    poll_interval: Duration,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            notify: Notify::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Wrap an already-open database.
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        let storage = Self::new(config);
        // A fresh cell cannot already be set.
        let _ = storage.db.set(db);
        storage
    }

    /// Override how often a waiting dequeue re-checks the table.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), RelayError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, RelayError> {
        self.db.get().ok_or_else(|| RelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Claim one entry, discarding payloads that no longer decode.
    async fn try_dequeue(&self) -> Result<Option<QueuedTask>, RelayError> {
        let db = self.db()?;
        loop {
            let Some(row) =
                queries::queue::dequeue(db, &self.config.queue_name, self.config.lock_timeout_secs)
                    .await?
            else {
                return Ok(None);
            };

            match serde_json::from_str::<Task>(&row.payload) {
                Ok(task) => {
                    if row.attempts > 1 {
                        debug!(queue_entry = row.id, attempts = row.attempts, "redelivering task");
                    }
                    return Ok(Some(QueuedTask { id: row.id, task }));
                }
                Err(e) => {
                    warn!(queue_entry = row.id, error = %e, "dropping undecodable queue payload");
                    queries::queue::ack(db, row.id).await?;
                }
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for SqliteStorage {
    async fn enqueue(&self, task: &Task) -> Result<i64, RelayError> {
        let payload = serde_json::to_string(task)?;
        let id = queries::queue::enqueue(self.db()?, &self.config.queue_name, &payload).await?;
        self.notify.notify_one();
        debug!(queue_entry = id, user_id = %task.user_id, "task enqueued");
        Ok(id)
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<QueuedTask>, RelayError> {
        claim_within(&self.notify, wait, self.poll_interval, || self.try_dequeue()).await
    }

    async fn ack(&self, id: i64) -> Result<(), RelayError> {
        queries::queue::ack(self.db()?, id).await
    }

    async fn len(&self) -> Result<usize, RelayError> {
        queries::queue::pending_count(self.db()?, &self.config.queue_name).await
    }
}

#[async_trait]
impl HistoryStore for SqliteStorage {
    async fn append(&self, user_id: &str, entry: &ConversationEntry) -> Result<(), RelayError> {
        queries::history::append(
            self.db()?,
            &history_key(user_id),
            entry,
            self.config.max_history,
        )
        .await
    }

    async fn recent(&self, user_id: &str, n: usize) -> Result<Vec<ConversationEntry>, RelayError> {
        queries::history::recent(self.db()?, &history_key(user_id), n).await
    }

    async fn search(
        &self,
        user_id: &str,
        keyword: &str,
    ) -> Result<Vec<ConversationEntry>, RelayError> {
        queries::history::search(self.db()?, &history_key(user_id), keyword).await
    }
}

#[async_trait]
impl SettingsStore for SqliteStorage {
    async fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>, RelayError> {
        queries::settings::get(self.db()?, user_id).await
    }

    async fn put_settings(&self, settings: &UserSettings) -> Result<(), RelayError> {
        queries::settings::upsert(self.db()?, settings).await
    }
}
