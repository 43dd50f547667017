// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for chatrelay.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and a crash-safe task queue with
//! lock-timeout redelivery. [`InMemoryStore`] implements the same traits for
//! tests and throwaway runs.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;
mod wait;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use memory::InMemoryStore;
pub use wait::DEFAULT_POLL_INTERVAL;
