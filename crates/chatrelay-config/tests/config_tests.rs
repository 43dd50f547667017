// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the chatrelay configuration system.

use chatrelay_config::diagnostic::{ConfigError, suggest_key};
use chatrelay_config::model::{DeliveryMode, RelayConfig};
use chatrelay_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use figment::Jail;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_relay_config() {
    let toml = r#"
[agent]
name = "relay-test"
log_level = "debug"
persona = "You are terse."
default_language = "zh"
weather_keywords = ["weather"]
context_turns = 3

[line]
channel_secret = "secret"
channel_access_token = "token"

[openai]
api_key = "sk-123"
model = "gpt-4o-mini"
max_tokens = 500
temperature = 0.2

[storage]
database_path = "/tmp/relay.db"
wal_mode = false
max_history = 8
queue_name = "q"

[worker]
expiry_secs = 600
delivery = "reply"

[server]
host = "127.0.0.1"
port = 9000

[weather]
api_key = "ow-1"
units = "imperial"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "relay-test");
    assert_eq!(config.agent.default_language, "zh");
    assert_eq!(config.agent.weather_keywords, vec!["weather"]);
    assert_eq!(config.agent.context_turns, 3);
    assert_eq!(config.line.channel_secret.as_deref(), Some("secret"));
    assert_eq!(config.line.channel_access_token.as_deref(), Some("token"));
    assert_eq!(config.openai.model, "gpt-4o-mini");
    assert_eq!(config.openai.max_tokens, 500);
    assert_eq!(config.storage.database_path, "/tmp/relay.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.max_history, 8);
    assert_eq!(config.storage.queue_name, "q");
    assert_eq!(config.worker.expiry_secs, 600);
    assert_eq!(config.worker.delivery, DeliveryMode::Reply);
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.weather.api_key.as_deref(), Some("ow-1"));
    assert_eq!(config.weather.units, "imperial");
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "chatrelay");
    assert_eq!(config.agent.log_level, "info");
    assert_eq!(config.agent.context_turns, 5);
    assert!(config.line.channel_secret.is_none());
    assert_eq!(config.line.api_base_url, "https://api.line.me");
    assert_eq!(config.openai.model, "gpt-3.5-turbo");
    assert_eq!(config.openai.max_tokens, 1000);
    assert_eq!(config.openai.temperature, 0.7);
    assert_eq!(config.openai.presence_penalty, 0.6);
    assert_eq!(config.openai.frequency_penalty, 0.3);
    assert_eq!(config.openai.request_timeout_secs, 30);
    assert_eq!(config.storage.max_history, 10);
    assert_eq!(config.storage.queue_name, "message_queue");
    assert_eq!(config.worker.dequeue_wait_ms, 1000);
    assert_eq!(config.worker.expiry_secs, 1700);
    assert_eq!(config.worker.token_lifetime_secs, 1800);
    assert_eq!(config.worker.max_retries, 3);
    assert_eq!(config.worker.retry_delay_ms, 1000);
    assert_eq!(config.worker.delivery, DeliveryMode::Push);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn unknown_field_in_worker_produces_error() {
    let toml = r#"
[worker]
expiry = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("expiry"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[redis]
host = "localhost"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("redis"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn invalid_delivery_mode_rejected() {
    let toml = r#"
[worker]
delivery = "carrier-pigeon"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// CHATRELAY_ variables override file values, mapping only the leading section.
#[test]
fn prefixed_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "relay.toml",
            r#"
[storage]
queue_name = "from-file"
"#,
        )?;
        jail.set_env("CHATRELAY_STORAGE_QUEUE_NAME", "from-env");
        jail.set_env("CHATRELAY_WORKER_DEQUEUE_WAIT_MS", "250");

        let config = load_and_validate_path(std::path::Path::new("relay.toml"))
            .map_err(|e| format!("{e:?}"))?;
        assert_eq!(config.storage.queue_name, "from-env");
        assert_eq!(config.worker.dequeue_wait_ms, 250);
        Ok(())
    });
}

/// Conventional platform variables fill secrets and the port.
#[test]
fn platform_env_fills_secrets() {
    Jail::expect_with(|jail| {
        jail.create_file("relay.toml", "")?;
        jail.set_env("LINE_CHANNEL_SECRET", "line-secret");
        jail.set_env("LINE_CHANNEL_ACCESS_TOKEN", "line-token");
        jail.set_env("OPENAI_API_KEY", "sk-env");
        jail.set_env("OPENWEATHER_API_KEY", "ow-env");
        jail.set_env("PORT", "5000");

        let config = load_and_validate_path(std::path::Path::new("relay.toml"))
            .map_err(|e| format!("{e:?}"))?;
        assert_eq!(config.line.channel_secret.as_deref(), Some("line-secret"));
        assert_eq!(config.line.channel_access_token.as_deref(), Some("line-token"));
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.weather.api_key.as_deref(), Some("ow-env"));
        assert_eq!(config.server.port, 5000);
        assert!(chatrelay_config::validate_secrets(&config).is_ok());
        Ok(())
    });
}

/// The prefixed form wins over the conventional variable.
#[test]
fn prefixed_env_beats_platform_env() {
    Jail::expect_with(|jail| {
        jail.create_file("relay.toml", "")?;
        jail.set_env("OPENAI_API_KEY", "sk-platform");
        jail.set_env("CHATRELAY_OPENAI_API_KEY", "sk-prefixed");

        let config = load_and_validate_path(std::path::Path::new("relay.toml"))
            .map_err(|e| format!("{e:?}"))?;
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-prefixed"));
        Ok(())
    });
}

#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: RelayConfig = Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file("/nonexistent/path/chatrelay.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.agent.name, "chatrelay");
}

#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[line]
chanel_secret = "s"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "chanel_secret"
                && suggestion.as_deref() == Some("channel_secret")
                && valid_keys.contains("channel_access_token")
        })
    });
    assert!(has_unknown_key, "got: {errors:?}");
}

#[test]
fn diagnostic_distant_typo_has_no_suggestion() {
    let valid_keys = &["host", "port"];
    assert!(suggest_key("zzzzzz", valid_keys).is_none());
}

#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[server]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "got: {errors:?}"
    );
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "naem".to_string(),
        suggestion: Some("name".to_string()),
        valid_keys: "name, persona, log_level".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `name`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("naem"));
}

#[test]
fn validation_rejects_expiry_beyond_token_lifetime() {
    let toml = r#"
[worker]
expiry_secs = 1900
"#;

    let errors = load_and_validate_str(toml).expect_err("expiry past token lifetime should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("token_lifetime_secs"))
    }));
}

#[test]
fn missing_secret_diagnostic_points_at_env_fallback() {
    use miette::Diagnostic;

    let config = load_and_validate_str("").expect("defaults should validate");
    let errors = chatrelay_config::validate_secrets(&config).expect_err("no secrets configured");
    let openai = errors
        .iter()
        .find(|e| matches!(e, ConfigError::MissingKey { key, .. } if key == "openai.api_key"))
        .expect("openai.api_key should be reported");
    assert!(matches!(
        openai,
        ConfigError::MissingKey { env_var: Some("OPENAI_API_KEY"), .. }
    ));
    let help = openai.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("export OPENAI_API_KEY"), "got: {help}");
}

#[test]
fn unknown_key_is_labeled_in_inline_source() {
    let toml = "[server]\nport = 8080\nhots = \"0.0.0.0\"\n";

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let span = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { key, span, .. } if key == "hots" => *span,
        _ => None,
    });
    let span = span.expect("unknown key should carry a span");
    assert_eq!(&toml[span.offset()..span.offset() + span.len()], "hots");
}

#[test]
fn example_config_is_valid() {
    let example = include_str!("../../../chatrelay.example.toml");
    let config = load_and_validate_str(example).expect("example config should validate");
    assert_eq!(config.storage.database_path, "./chatrelay.db");
    assert_eq!(config.worker.delivery, DeliveryMode::Push);
}
