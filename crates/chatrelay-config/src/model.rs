// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for chatrelay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level chatrelay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Bot identity, persona, and command settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// LINE Messaging API credentials.
    #[serde(default)]
    pub line: LineConfig,

    /// Language-model backend settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Queue and history store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker loop timing and retry settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Webhook HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenWeather lookup settings.
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Bot identity and conversational behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bot.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Persona line placed at the top of every system prompt.
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Language the model is prompted in. Other input languages get a translation appended.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// First-word triggers for the weather command.
    #[serde(default = "default_weather_keywords")]
    pub weather_keywords: Vec<String>,

    /// Number of past exchanges fed back into the prompt.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Reply sent when generation fails after all retries.
    #[serde(default = "default_apology")]
    pub apology_message: String,

    /// Reply sent when delivering a generated answer fails.
    #[serde(default = "default_delivery_fallback")]
    pub delivery_fallback_message: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            persona: default_persona(),
            default_language: default_language(),
            weather_keywords: default_weather_keywords(),
            context_turns: default_context_turns(),
            apology_message: default_apology(),
            delivery_fallback_message: default_delivery_fallback(),
        }
    }
}

fn default_agent_name() -> String {
    "chatrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_persona() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_weather_keywords() -> Vec<String> {
    vec!["weather".to_string(), "天氣".to_string()]
}

fn default_context_turns() -> usize {
    5
}

fn default_apology() -> String {
    "Sorry, I can't respond right now. Please try again later.".to_string()
}

fn default_delivery_fallback() -> String {
    "Sorry, something went wrong while sending my reply.".to_string()
}

/// LINE Messaging API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LineConfig {
    /// Channel secret used to verify webhook signatures.
    #[serde(default)]
    pub channel_secret: Option<String>,

    /// Long-lived channel access token for the Messaging API.
    #[serde(default)]
    pub channel_access_token: Option<String>,

    /// Messaging API base URL.
    #[serde(default = "default_line_api_base_url")]
    pub api_base_url: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: None,
            channel_access_token: None,
            api_base_url: default_line_api_base_url(),
        }
    }
}

fn default_line_api_base_url() -> String {
    "https://api.line.me".to_string()
}

/// Chat-completion backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` requires the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f32,

    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,

    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            presence_penalty: default_presence_penalty(),
            frequency_penalty: default_frequency_penalty(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_presence_penalty() -> f32 {
    0.6
}

fn default_frequency_penalty() -> f32 {
    0.3
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Exchanges kept per user before the oldest is evicted.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Name of the work queue shared by the webhook and the worker.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    /// Seconds a dequeued entry stays locked before it is redelivered.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            max_history: default_max_history(),
            queue_name: default_queue_name(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatrelay").join("chatrelay.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatrelay.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_max_history() -> usize {
    10
}

fn default_queue_name() -> String {
    "message_queue".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    300
}

/// How the worker addresses replies for queued tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Push by user identity; independent of the reply token lifetime.
    #[default]
    Push,
    /// Reply with the task's reply token.
    Reply,
}

/// Worker loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Longest a single dequeue call blocks before the loop re-checks shutdown.
    #[serde(default = "default_dequeue_wait_ms")]
    pub dequeue_wait_ms: u64,

    /// Tasks older than this are dropped without a reply.
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,

    /// Validity window of a platform reply token. `expiry_secs` must stay below it.
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,

    /// Total generation attempts per message.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between generation attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause after a failed dequeue before trying again.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    #[serde(default)]
    pub delivery: DeliveryMode,
}

impl WorkerConfig {
    pub fn dequeue_wait(&self) -> Duration {
        Duration::from_millis(self.dequeue_wait_ms)
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dequeue_wait_ms: default_dequeue_wait_ms(),
            expiry_secs: default_expiry_secs(),
            token_lifetime_secs: default_token_lifetime_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            delivery: DeliveryMode::default(),
        }
    }
}

fn default_dequeue_wait_ms() -> u64 {
    1000
}

fn default_expiry_secs() -> u64 {
    1700
}

fn default_token_lifetime_secs() -> u64 {
    1800
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_error_backoff_ms() -> u64 {
    1000
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the webhook server to.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// OpenWeather lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherConfig {
    /// API key. `None` disables the weather command's backend.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Unit system passed to the API (`metric`, `imperial`, `standard`).
    #[serde(default = "default_units")]
    pub units: String,

    /// Language for weather descriptions.
    #[serde(default = "default_weather_lang")]
    pub lang: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            units: default_units(),
            lang: default_weather_lang(),
        }
    }
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_weather_lang() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_durations_follow_fields() {
        let worker = WorkerConfig::default();
        assert_eq!(worker.dequeue_wait(), Duration::from_secs(1));
        assert_eq!(worker.expiry(), Duration::from_secs(1700));
        assert_eq!(worker.retry_delay(), Duration::from_secs(1));
        assert_eq!(worker.error_backoff(), Duration::from_secs(1));
    }

    #[test]
    fn delivery_mode_parses_lowercase() {
        let worker: WorkerConfig = toml::from_str("delivery = \"reply\"").unwrap();
        assert_eq!(worker.delivery, DeliveryMode::Reply);
        assert_eq!(WorkerConfig::default().delivery, DeliveryMode::Push);
    }

    #[test]
    fn default_database_path_ends_with_file_name() {
        assert!(StorageConfig::default().database_path.ends_with("chatrelay.db"));
    }
}
