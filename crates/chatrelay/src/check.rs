// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatrelay check` command implementation.
//!
//! Verifies that each external dependency the relay needs is reachable with
//! the configured credentials, without sending any user-visible message.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use chatrelay_config::RelayConfig;
use chatrelay_core::{HealthStatus, PluginAdapter, RelayError, TaskQueue};
use chatrelay_line::LineClient;
use chatrelay_openai::OpenAiProvider;
use chatrelay_storage::SqliteStorage;

/// Status of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single connectivity check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs the `chatrelay check` command. Fails when any check fails.
pub async fn run_check(config: &RelayConfig, plain: bool) -> Result<(), RelayError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_secrets(config),
        check_database(config).await,
        check_line(config).await,
        check_openai(config).await,
        check_weather(config),
    ];

    println!();
    println!("  chatrelay check");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", format_line(result, use_color));
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warned = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();

    if failed == 0 && warned == 0 {
        println!("  All checks passed.");
    } else {
        let issues = failed + warned;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    }
    println!();

    if failed > 0 {
        return Err(RelayError::Config(format!("{failed} check(s) failed")));
    }
    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

fn check_secrets(config: &RelayConfig) -> CheckResult {
    let start = Instant::now();
    match chatrelay_config::validate_secrets(config) {
        Ok(()) => CheckResult::new("Secrets", CheckStatus::Pass, "present", start),
        Err(errors) => {
            let keys: Vec<String> = errors
                .iter()
                .filter_map(|e| match e {
                    chatrelay_config::ConfigError::MissingKey { key, .. } => Some(key.clone()),
                    _ => None,
                })
                .collect();
            CheckResult::new(
                "Secrets",
                CheckStatus::Fail,
                format!("missing: {}", keys.join(", ")),
                start,
            )
        }
    }
}

async fn check_database(config: &RelayConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;

    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let result = match storage.len().await {
        Ok(pending) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("connected, {pending} task(s) pending"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    };
    let _ = storage.shutdown().await;
    result
}

async fn check_line(config: &RelayConfig) -> CheckResult {
    let start = Instant::now();
    let client = match LineClient::from_config(&config.line) {
        Ok(client) => client,
        Err(e) => return CheckResult::new("LINE", CheckStatus::Fail, e.to_string(), start),
    };
    match client.bot_info().await {
        Ok(info) => CheckResult::new(
            "LINE",
            CheckStatus::Pass,
            format!("bot '{}' ({})", info.display_name, info.user_id),
            start,
        ),
        Err(e) => CheckResult::new("LINE", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_openai(config: &RelayConfig) -> CheckResult {
    let start = Instant::now();
    let provider = match OpenAiProvider::new(&config.openai) {
        Ok(provider) => provider,
        Err(e) => return CheckResult::new("OpenAI", CheckStatus::Fail, e.to_string(), start),
    };
    match provider.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "OpenAI",
            CheckStatus::Pass,
            format!("reachable, model {}", config.openai.model),
            start,
        ),
        Ok(HealthStatus::Degraded(msg)) => {
            CheckResult::new("OpenAI", CheckStatus::Warn, msg, start)
        }
        Ok(HealthStatus::Unhealthy(msg)) => {
            CheckResult::new("OpenAI", CheckStatus::Fail, msg, start)
        }
        Err(e) => CheckResult::new("OpenAI", CheckStatus::Fail, e.to_string(), start),
    }
}

fn check_weather(config: &RelayConfig) -> CheckResult {
    let start = Instant::now();
    let configured = config
        .weather
        .api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());
    if configured {
        CheckResult::new("Weather", CheckStatus::Pass, "API key set", start)
    } else {
        CheckResult::new(
            "Weather",
            CheckStatus::Warn,
            "no API key, weather command disabled",
            start,
        )
    }
}
