// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LINE Messaging API boundary for chatrelay.
//!
//! Holds the webhook router that feeds the task queue and the HTTP client that
//! delivers replies back to users.

pub mod client;
pub mod events;
pub mod signature;
pub mod webhook;

pub use client::{BotInfo, LineClient};
pub use webhook::{WebhookState, router, serve};
