// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seams of the processing pipeline.
//!
//! Async traits use `#[async_trait]` so they stay object safe behind `Arc<dyn _>`.

pub mod adapter;
pub mod lookup;
pub mod provider;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use lookup::{Translator, WeatherService};
pub use provider::ProviderAdapter;
pub use storage::{HistoryStore, SettingsStore, TaskQueue};
pub use transport::ReplyTransport;
