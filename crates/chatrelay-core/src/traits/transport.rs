// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound reply transport trait.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;

/// Sends text back to a chat-platform user.
#[async_trait]
pub trait ReplyTransport: PluginAdapter {
    /// Asynchronous delivery addressed by user identity.
    async fn push(&self, user_id: &str, text: &str) -> Result<(), RelayError>;

    /// Synchronous delivery using a short-lived reply token. Fails once the token expired.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), RelayError>;
}
