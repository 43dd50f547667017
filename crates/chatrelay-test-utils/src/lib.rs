// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatrelay.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests without
//! external services.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted language-model backend with request capture
//! - [`MockTransport`] - reply transport that records sends and can fail on demand
//! - [`MockWeather`] / [`MockTranslator`] - lookup collaborators
//! - [`FailingStore`] - store whose every operation errors

pub mod failing_store;
pub mod mock_lookup;
pub mod mock_provider;
pub mod mock_transport;

pub use failing_store::FailingStore;
pub use mock_lookup::{MockTranslator, MockWeather};
pub use mock_provider::{MockOutcome, MockProvider};
pub use mock_transport::{MockTransport, SendKind, SentMessage};
