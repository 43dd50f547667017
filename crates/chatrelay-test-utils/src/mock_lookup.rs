// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock weather and translation collaborators.

use async_trait::async_trait;
use chatrelay_core::{RelayError, Translator, WeatherService};
use tokio::sync::Mutex;

/// Weather lookup that answers with a canned summary, or always fails.
pub struct MockWeather {
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl MockWeather {
    pub fn new() -> Self {
        Self {
            failing: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Locations looked up so far.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

impl Default for MockWeather {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherService for MockWeather {
    async fn current(&self, location: &str) -> Result<String, RelayError> {
        self.queries.lock().await.push(location.to_string());
        if self.failing {
            return Err(RelayError::Lookup {
                message: format!("no data for {location}"),
            });
        }
        Ok(format!("{location}: clear sky, 21°C"))
    }
}

/// Translator that tags text with the target language, or always fails.
pub struct MockTranslator {
    failing: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            failing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(text, target_language)` pairs received so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, RelayError> {
        self.calls
            .lock()
            .await
            .push((text.to_string(), target_language.to_string()));
        if self.failing {
            return Err(RelayError::Lookup {
                message: "translation unavailable".into(),
            });
        }
        Ok(format!("[{target_language}] {text}"))
    }
}
