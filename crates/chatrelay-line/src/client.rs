// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LINE Messaging API client implementing [`ReplyTransport`].

use std::time::Duration;

use async_trait::async_trait;
use chatrelay_config::model::LineConfig;
use chatrelay_core::{AdapterType, HealthStatus, PluginAdapter, RelayError, ReplyTransport};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// LINE rejects text messages longer than this many characters.
pub const MAX_TEXT_CHARS: usize = 5000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

/// Response of `GET /v2/bot/info`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotInfo {
    pub user_id: String,
    #[serde(default)]
    pub basic_id: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// HTTP client for the LINE Messaging API.
#[derive(Debug, Clone)]
pub struct LineClient {
    client: reqwest::Client,
    base_url: String,
}

impl LineClient {
    /// Creates a client authenticated with a channel access token.
    pub fn new(channel_access_token: &str, base_url: &str) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {channel_access_token}"))
            .map_err(|e| RelayError::Config(format!("invalid channel access token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from the `[line]` config section.
    pub fn from_config(config: &LineConfig) -> Result<Self, RelayError> {
        let token = config
            .channel_access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                RelayError::Config(
                    "LINE channel access token not found. Set line.channel_access_token or LINE_CHANNEL_ACCESS_TOKEN.".into(),
                )
            })?;
        Self::new(token, &config.api_base_url)
    }

    /// Fetches the bot profile. Doubles as a credential check.
    pub async fn bot_info(&self) -> Result<BotInfo, RelayError> {
        let url = format!("{}/v2/bot/info", self.base_url);
        let response = self.client.get(&url).send().await.map_err(send_error)?;
        let status = response.status();
        let body = response.text().await.map_err(send_error)?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| RelayError::Delivery {
            message: format!("failed to parse bot info: {e}"),
            source: Some(Box::new(e)),
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), RelayError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(send_error)?;
        let status = response.status();
        debug!(status = %status, path, "LINE API response received");
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }
}

/// Cut `text` to the platform's length limit on a character boundary.
pub fn truncate_for_line(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn send_error(e: reqwest::Error) -> RelayError {
    RelayError::Delivery {
        message: format!("LINE request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> RelayError {
    let detail = serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());
    RelayError::Delivery {
        message: format!("LINE API returned {status}: {detail}"),
        source: None,
    }
}

#[async_trait]
impl PluginAdapter for LineClient {
    fn name(&self) -> &str {
        "line"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        match self.bot_info().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl ReplyTransport for LineClient {
    async fn push(&self, user_id: &str, text: &str) -> Result<(), RelayError> {
        let body = PushRequest {
            to: user_id,
            messages: [TextMessage {
                kind: "text",
                text: truncate_for_line(text),
            }],
        };
        self.post_json("/v2/bot/message/push", &body).await
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), RelayError> {
        let body = ReplyRequest {
            reply_token,
            messages: [TextMessage {
                kind: "text",
                text: truncate_for_line(text),
            }],
        };
        self.post_json("/v2/bot/message/reply", &body).await
    }
}
