// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history facade that never fails its caller.
//!
//! Reads degrade to empty results and writes are logged and dropped, so a
//! store outage costs context rather than a reply.

use std::sync::Arc;

use chatrelay_core::{ConversationEntry, HistoryStore};
use tracing::warn;

#[derive(Clone)]
pub struct ConversationHistory {
    store: Arc<dyn HistoryStore>,
}

impl ConversationHistory {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Up to `n` most recent entries, oldest first.
    pub async fn recent(&self, user_id: &str, n: usize) -> Vec<ConversationEntry> {
        match self.store.recent(user_id, n).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(user_id, error = %e, "history read failed, continuing without context");
                Vec::new()
            }
        }
    }

    pub async fn search(&self, user_id: &str, keyword: &str) -> Vec<ConversationEntry> {
        match self.store.search(user_id, keyword).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(user_id, error = %e, "history search failed");
                Vec::new()
            }
        }
    }

    pub async fn append(&self, user_id: &str, entry: &ConversationEntry) {
        if let Err(e) = self.store.append(user_id, entry).await {
            warn!(user_id, error = %e, "failed to record conversation entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_storage::InMemoryStore;
    use chatrelay_test_utils::FailingStore;

    #[tokio::test]
    async fn passes_through_healthy_store() {
        let history = ConversationHistory::new(Arc::new(InMemoryStore::default()));
        history.append("U1", &ConversationEntry::new("hi", "hello")).await;
        let recent = history.recent("U1", 5).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(history.search("U1", "hel").await.len(), 1);
    }

    #[tokio::test]
    async fn failing_store_degrades_to_empty() {
        let history = ConversationHistory::new(Arc::new(FailingStore));
        history.append("U1", &ConversationEntry::new("hi", "hello")).await;
        assert!(history.recent("U1", 5).await.is_empty());
        assert!(history.search("U1", "hi").await.is_empty());
    }
}
