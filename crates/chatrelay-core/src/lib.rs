// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for chatrelay.
//!
//! Holds the error enum, the domain types that cross crate boundaries
//! (tasks, conversation entries, completion requests), and the traits every
//! store, backend, and transport implements.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use types::{
    AdapterType, ChatMessage, CompletionRequest, CompletionResponse, ConversationEntry,
    HealthStatus, QueuedTask, Role, Task, TokenUsage, UserSettings, MAX_HISTORY,
};

pub use traits::{
    HistoryStore, PluginAdapter, ProviderAdapter, ReplyTransport, SettingsStore, TaskQueue,
    Translator, WeatherService,
};
