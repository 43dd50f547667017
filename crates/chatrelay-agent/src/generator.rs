// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response generation with bounded retries.
//!
//! Each attempt rebuilds the prompt from current history and settings, then
//! calls the backend under a deadline. Exhausted attempts yield the configured
//! apology text instead of an error.

use std::sync::Arc;
use std::time::Duration;

use chatrelay_config::model::RelayConfig;
use chatrelay_core::{
    CompletionRequest, ConversationEntry, ProviderAdapter, RelayError,
    SettingsStore, Translator,
};
use tracing::{debug, info, warn};

use crate::dispatcher::CommandDispatcher;
use crate::history::ConversationHistory;
use crate::language::{detect_language, same_language};
use crate::prompt;

/// Generation parameters, resolved once from [`RelayConfig`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub request_timeout: Duration,
    /// Total attempts, the first call included.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub context_turns: usize,
    pub persona: String,
    pub default_language: String,
    pub apology_message: String,
}

impl GeneratorConfig {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            model: config.openai.model.clone(),
            max_tokens: config.openai.max_tokens,
            temperature: config.openai.temperature,
            presence_penalty: config.openai.presence_penalty,
            frequency_penalty: config.openai.frequency_penalty,
            request_timeout: config.openai.request_timeout(),
            max_retries: config.worker.max_retries,
            retry_delay: config.worker.retry_delay(),
            context_turns: config.agent.context_turns,
            persona: config.agent.persona.clone(),
            default_language: config.agent.default_language.clone(),
            apology_message: config.agent.apology_message.clone(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Produces the reply text for one inbound message.
pub struct ResponseGenerator {
    dispatcher: CommandDispatcher,
    provider: Arc<dyn ProviderAdapter>,
    history: ConversationHistory,
    settings: Arc<dyn SettingsStore>,
    translator: Option<Arc<dyn Translator>>,
    config: GeneratorConfig,
}

impl ResponseGenerator {
    pub fn new(
        dispatcher: CommandDispatcher,
        provider: Arc<dyn ProviderAdapter>,
        history: ConversationHistory,
        settings: Arc<dyn SettingsStore>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            dispatcher,
            provider,
            history,
            settings,
            translator: None,
            config,
        }
    }

    /// Enables translating non-default-language input into the default language.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Command reply if `user_text` is a command, otherwise a generated reply.
    ///
    /// Never fails. Each attempt repeats the whole computation, command check
    /// included; exhausting all attempts returns the apology text.
    pub async fn respond(&self, user_id: &str, user_text: &str) -> String {
        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            if let Some(reply) = self.dispatcher.dispatch(user_text, user_id).await {
                return reply;
            }
            debug!(user_id, attempt, "no command matched, calling backend");

            match self.attempt(user_id, user_text).await {
                Ok(reply) => {
                    info!(user_id, attempt, "reply generated");
                    let entry = ConversationEntry::new(user_text, reply.as_str());
                    self.history.append(user_id, &entry).await;
                    return reply;
                }
                Err(e) => {
                    warn!(
                        user_id,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "generation attempt failed"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
        warn!(user_id, "all generation attempts failed, sending apology");
        self.config.apology_message.clone()
    }

    async fn attempt(&self, user_id: &str, user_text: &str) -> Result<String, RelayError> {
        let request = self.build_request(user_id, user_text).await;
        let timeout = request.timeout;
        let response = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| RelayError::Timeout { duration: timeout })??;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(RelayError::Provider {
                message: "backend returned an empty reply".into(),
                source: None,
            });
        }
        debug!(
            user_id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );
        Ok(text.to_string())
    }

    async fn build_request(&self, user_id: &str, user_text: &str) -> CompletionRequest {
        let user_turn = self.user_turn(user_id, user_text).await;
        let recent = self.history.recent(user_id, self.config.context_turns).await;
        let topics = prompt::recent_topics(&recent);
        let preferred = self.preferred_language(user_id).await;
        let system = prompt::system_prompt(&self.config.persona, &topics, preferred.as_deref());

        CompletionRequest {
            model: self.config.model.clone(),
            messages: prompt::build_messages(system, &recent, user_turn),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            presence_penalty: self.config.presence_penalty,
            frequency_penalty: self.config.frequency_penalty,
            timeout: self.config.request_timeout,
        }
    }

    async fn user_turn(&self, user_id: &str, user_text: &str) -> String {
        let detected = detect_language(user_text);
        let Some(translator) = &self.translator else {
            return user_text.to_string();
        };
        if same_language(detected, &self.config.default_language) {
            return user_text.to_string();
        }
        match translator
            .translate(user_text, &self.config.default_language)
            .await
        {
            Ok(translated) => prompt::with_translation(user_text, &translated),
            Err(e) => {
                debug!(
                    user_id,
                    detected,
                    error = %e,
                    "translation failed, using original text"
                );
                user_text.to_string()
            }
        }
    }

    async fn preferred_language(&self, user_id: &str) -> Option<String> {
        match self.settings.get_settings(user_id).await {
            Ok(settings) => settings.and_then(|s| s.language),
            Err(e) => {
                warn!(user_id, error = %e, "failed to read user settings");
                None
            }
        }
    }
}
