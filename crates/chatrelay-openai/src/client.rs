// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible Chat Completions APIs.
//!
//! [`OpenAiClient`] handles authentication, per-request deadlines, and error
//! decoding. It does not retry; the caller owns the retry policy.

use std::time::Duration;

use chatrelay_core::RelayError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ModelList};

/// Connect timeout applied to every request; the overall deadline is per request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a client for the API rooted at `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| RelayError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a completion request that must finish within `timeout`.
    ///
    /// A missed deadline maps to [`RelayError::Timeout`]; any other failure to
    /// [`RelayError::Provider`].
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, RelayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| request_error(e, timeout))?;

        let status = response.status();
        debug!(status = %status, model = %request.model, "completion response received");

        let body = response.text().await.map_err(|e| request_error(e, timeout))?;
        if !status.is_success() {
            return Err(RelayError::Provider {
                message: describe_error(status, &body),
                source: None,
            });
        }

        serde_json::from_str(&body).map_err(|e| RelayError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Lists model ids visible to the key. Used as a cheap credential check.
    pub async fn list_models(&self, timeout: Duration) -> Result<Vec<String>, RelayError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(e, timeout))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| request_error(e, timeout))?;
        if !status.is_success() {
            return Err(RelayError::Provider {
                message: describe_error(status, &body),
                source: None,
            });
        }

        let list: ModelList = serde_json::from_str(&body).map_err(|e| RelayError::Provider {
            message: format!("failed to parse model list: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

fn request_error(e: reqwest::Error, timeout: Duration) -> RelayError {
    if e.is_timeout() {
        RelayError::Timeout { duration: timeout }
    } else {
        RelayError::Provider {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => match api_err.error.type_ {
            Some(kind) => format!("OpenAI API error ({kind}): {}", api_err.error.message),
            None => format!("OpenAI API error: {}", api_err.error.message),
        },
        Err(_) => format!("API returned {status}: {body}"),
    }
}
