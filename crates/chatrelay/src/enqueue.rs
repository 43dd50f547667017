// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatrelay enqueue` command implementation.
//!
//! Writes one task to the SQLite queue so a running `serve` picks it up.

use chatrelay_config::RelayConfig;
use chatrelay_config::model::StorageConfig;
use chatrelay_core::{PluginAdapter, RelayError, Task, TaskQueue};
use chatrelay_storage::SqliteStorage;

/// Runs the `chatrelay enqueue` command.
pub async fn run_enqueue(
    config: &RelayConfig,
    user_id: &str,
    message: &str,
    reply_token: &str,
) -> Result<(), RelayError> {
    let task = Task::new(user_id, message, reply_token);
    let id = enqueue_task(&config.storage, &task).await?;
    println!("queued entry {id} for {user_id} on '{}'", config.storage.queue_name);
    Ok(())
}

async fn enqueue_task(config: &StorageConfig, task: &Task) -> Result<i64, RelayError> {
    if task.user_id.trim().is_empty() || task.message.trim().is_empty() {
        return Err(RelayError::Queue {
            message: "user id and message must not be empty".into(),
        });
    }
    let storage = SqliteStorage::new(config.clone());
    storage.initialize().await?;
    let id = storage.enqueue(task).await?;
    storage.shutdown().await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn enqueued_task_is_visible_to_a_new_connection() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("relay.db").display().to_string(),
            ..StorageConfig::default()
        };

        let id = enqueue_task(&config, &Task::new("U1", "ping", "manual"))
            .await
            .unwrap();

        let storage = SqliteStorage::new(config);
        storage.initialize().await.unwrap();
        let queued = storage.dequeue(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(queued.id, id);
        assert_eq!(queued.task.user_id, "U1");
        assert_eq!(queued.task.message, "ping");
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("relay.db").display().to_string(),
            ..StorageConfig::default()
        };
        let err = enqueue_task(&config, &Task::new("U1", "   ", "manual"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Queue { .. }));
        assert!(!dir.path().join("relay.db").exists());
    }
}
