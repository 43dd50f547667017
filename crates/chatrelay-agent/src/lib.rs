// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message processing for chatrelay.
//!
//! The [`WorkerLoop`] is the central coordinator that:
//! - Takes tasks off the durable queue
//! - Drops tasks whose reply window has passed
//! - Answers commands locally through the [`CommandDispatcher`]
//! - Generates everything else with the [`ResponseGenerator`]
//! - Delivers replies through the reply transport

pub mod dispatcher;
pub mod generator;
pub mod history;
pub mod language;
pub mod prompt;
pub mod shutdown;
pub mod worker;

pub use dispatcher::CommandDispatcher;
pub use generator::{GeneratorConfig, ResponseGenerator};
pub use history::ConversationHistory;
pub use shutdown::install_signal_handler;
pub use worker::{TaskOutcome, WorkerLoop, WorkerState, WorkerStats};
