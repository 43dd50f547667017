// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the queue, stores, provider, and worker.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Maximum number of exchanges retained per user.
pub const MAX_HISTORY: usize = 10;

/// Key prefix for per-user history in the backing store.
pub const HISTORY_KEY_PREFIX: &str = "chat_history:";

/// Name of the default work queue.
pub const DEFAULT_QUEUE_NAME: &str = "message_queue";

/// Builds the backing-store key holding a user's history.
pub fn history_key(user_id: &str) -> String {
    format!("{HISTORY_KEY_PREFIX}{user_id}")
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Provider,
    Transport,
    Lookup,
}

// --- Queue types ---

/// One unit of queued inbound-message work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque user identity from the chat platform.
    pub user_id: String,
    /// Raw message text.
    pub message: String,
    /// Platform-issued, time-limited reply token.
    pub reply_token: String,
    /// Time the task was handed to the queue, serialized as float epoch seconds.
    #[serde(with = "epoch_seconds")]
    pub enqueued_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task stamped with the current time.
    ///
    /// The stamp is truncated to whole microseconds, the precision the queue
    /// payload keeps, so a dequeued task compares equal to the one enqueued.
    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        reply_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            reply_token: reply_token.into(),
            enqueued_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Age of the task relative to `now`. Clock skew into the future yields zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.enqueued_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// A task taken off the queue together with the entry id used to acknowledge it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTask {
    pub id: i64,
    pub task: Task,
}

// --- History and settings ---

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    #[serde(rename = "user")]
    pub user_text: String,
    #[serde(rename = "assistant")]
    pub assistant_text: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn new(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            created_at: Utc::now(),
        }
    }

    /// Case-sensitive substring match against either side of the exchange.
    pub fn matches(&self, keyword: &str) -> bool {
        self.user_text.contains(keyword) || self.assistant_text.contains(keyword)
    }
}

/// Per-user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    /// Preferred reply language code, e.g. `en` or `zh-TW`.
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// --- Provider types ---

/// Role tag on a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request to the language-model backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    /// Deadline for the whole request, honored by the backend client.
    pub timeout: Duration,
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A generated reply from the language-model backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
}

/// Serde adapter storing a UTC timestamp as float epoch seconds.
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let secs = value.timestamp_micros() as f64 / 1_000_000.0;
        serializer.serialize_f64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(de::Error::custom("enqueued_at must be a finite number"));
        }
        let micros = (secs * 1_000_000.0).round() as i64;
        DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| de::Error::custom(format!("timestamp {secs} out of range")))
    }
}
