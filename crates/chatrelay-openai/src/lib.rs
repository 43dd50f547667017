// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapter for chatrelay.
//!
//! Implements [`ProviderAdapter`] over `POST /chat/completions`. Works with any
//! server exposing the same API shape via `openai.base_url`.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use chatrelay_config::model::OpenAiConfig;
use chatrelay_core::{
    AdapterType, ChatMessage, CompletionRequest, CompletionResponse, HealthStatus,
    PluginAdapter, ProviderAdapter, RelayError, TokenUsage,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ApiMessage, ChatCompletionRequest, ChatCompletionResponse};

/// Deadline for the credential probe made by [`PluginAdapter::health_check`].
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAI provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Creates a provider from the `[openai]` config section.
    pub fn new(config: &OpenAiConfig) -> Result<Self, RelayError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = OpenAiClient::new(&api_key, &config.base_url)?;
        info!(model = %config.model, base_url = %config.base_url, "OpenAI provider initialized");
        Ok(Self { client })
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    /// Lists models, which validates the key without spending tokens.
    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        match self.client.list_models(HEALTH_CHECK_TIMEOUT).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, RelayError> {
        let api_request = to_api_request(&request);
        let response = self
            .client
            .chat_completion(&api_request, request.timeout)
            .await?;
        from_api_response(response)
    }
}

fn to_api_request(request: &CompletionRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(to_api_message).collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        presence_penalty: request.presence_penalty,
        frequency_penalty: request.frequency_penalty,
    }
}

fn to_api_message(message: &ChatMessage) -> ApiMessage {
    ApiMessage {
        role: message.role.to_string(),
        content: Some(message.content.clone()),
    }
}

/// Takes the first choice; a response without text content is an error.
fn from_api_response(response: ChatCompletionResponse) -> Result<CompletionResponse, RelayError> {
    let usage = response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RelayError::Provider {
            message: "response contained no choices".into(),
            source: None,
        })?;

    let content = choice.message.content.ok_or_else(|| RelayError::Provider {
        message: "first choice has no text content".into(),
        source: None,
    })?;

    Ok(CompletionResponse {
        id: response.id,
        content,
        model: response.model,
        finish_reason: choice.finish_reason,
        usage,
    })
}

/// Resolves the API key from config, falling back to the environment.
fn resolve_api_key(config_key: Option<&str>) -> Result<String, RelayError> {
    if let Some(key) = config_key.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            RelayError::Config(
                "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
            )
        })
}
