// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as the expiry window fitting inside the reply token lifetime.

use crate::diagnostic::ConfigError;
use crate::model::RelayConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        invalid("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            invalid(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.storage.queue_name.trim().is_empty() {
        invalid("storage.queue_name must not be empty".to_string());
    }

    if config.storage.max_history == 0 {
        invalid("storage.max_history must be at least 1".to_string());
    }

    if config.storage.lock_timeout_secs == 0 {
        invalid("storage.lock_timeout_secs must be at least 1".to_string());
    }

    // Tasks must expire while their reply token is still valid.
    if config.worker.expiry_secs >= config.worker.token_lifetime_secs {
        invalid(format!(
            "worker.expiry_secs ({}) must be less than worker.token_lifetime_secs ({})",
            config.worker.expiry_secs, config.worker.token_lifetime_secs
        ));
    }

    if config.worker.max_retries == 0 {
        invalid("worker.max_retries must be at least 1".to_string());
    }

    if config.worker.dequeue_wait_ms == 0 {
        invalid("worker.dequeue_wait_ms must be greater than 0".to_string());
    }

    if config.openai.model.trim().is_empty() {
        invalid("openai.model must not be empty".to_string());
    }

    if config.openai.max_tokens == 0 {
        invalid("openai.max_tokens must be greater than 0".to_string());
    }

    if !(0.0..=2.0).contains(&config.openai.temperature) {
        invalid(format!(
            "openai.temperature must be between 0.0 and 2.0, got {}",
            config.openai.temperature
        ));
    }

    for (name, value) in [
        ("presence_penalty", config.openai.presence_penalty),
        ("frequency_penalty", config.openai.frequency_penalty),
    ] {
        if !(-2.0..=2.0).contains(&value) {
            invalid(format!(
                "openai.{name} must be between -2.0 and 2.0, got {value}"
            ));
        }
    }

    if config.openai.request_timeout_secs == 0 {
        invalid("openai.request_timeout_secs must be greater than 0".to_string());
    }

    if config.agent.context_turns > config.storage.max_history {
        invalid(format!(
            "agent.context_turns ({}) must not exceed storage.max_history ({})",
            config.agent.context_turns, config.storage.max_history
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that the secrets needed to serve traffic are present.
///
/// Kept separate from [`validate_config`] so offline subcommands can run without credentials.
pub fn validate_secrets(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let missing: Vec<ConfigError> = [
        ("line.channel_secret", config.line.channel_secret.as_deref()),
        (
            "line.channel_access_token",
            config.line.channel_access_token.as_deref(),
        ),
        ("openai.api_key", config.openai.api_key.as_deref()),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
    .map(|(key, _)| ConfigError::missing_key(key))
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
