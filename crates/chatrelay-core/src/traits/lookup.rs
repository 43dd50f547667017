// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weather and translation collaborators used by commands and prompt building.

use async_trait::async_trait;

use crate::error::RelayError;

/// Current-conditions lookup for a free-text location.
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Returns a formatted, user-facing weather summary.
    async fn current(&self, location: &str) -> Result<String, RelayError>;
}

/// Text translation into a target language code.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, RelayError>;
}
