// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatrelay.toml` > `~/.config/chatrelay/chatrelay.toml` >
//! `/etc/chatrelay/chatrelay.toml`, with environment variable overrides via the
//! `CHATRELAY_` prefix. The conventional unprefixed platform variables
//! (`LINE_CHANNEL_SECRET`, `OPENAI_API_KEY`, `PORT`, ...) are honored as well.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RelayConfig;

/// Config sections reachable through `CHATRELAY_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &[
    "agent", "line", "openai", "storage", "worker", "server", "weather",
];

/// Unprefixed variables conventionally used by LINE bot deployments, with the keys they set.
const PLATFORM_VARS: &[(&str, &str)] = &[
    ("LINE_CHANNEL_SECRET", "line.channel_secret"),
    ("LINE_CHANNEL_ACCESS_TOKEN", "line.channel_access_token"),
    ("OPENAI_API_KEY", "openai.api_key"),
    ("OPENWEATHER_API_KEY", "weather.api_key"),
    ("PORT", "server.port"),
];

const SYSTEM_CONFIG_PATH: &str = "/etc/chatrelay/chatrelay.toml";
const LOCAL_CONFIG_PATH: &str = "chatrelay.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatrelay/chatrelay.toml` (system-wide)
/// 3. `~/.config/chatrelay/chatrelay.toml` (user XDG config)
/// 4. `./chatrelay.toml` (local directory)
/// 5. Unprefixed platform variables (`LINE_CHANNEL_SECRET`, `OPENAI_API_KEY`, ...)
/// 6. `CHATRELAY_*` environment variables
pub fn load_config() -> Result<RelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(path))
        .merge(platform_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(platform_env_provider())
        .merge(env_provider())
}

/// Path of the per-user config file, if the platform has a config directory.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("chatrelay").join("chatrelay.toml"))
}

/// Paths probed for config files, lowest precedence first.
pub fn config_file_paths() -> Vec<std::path::PathBuf> {
    let mut paths = vec![std::path::PathBuf::from(SYSTEM_CONFIG_PATH)];
    paths.extend(user_config_path());
    paths.push(std::path::PathBuf::from(LOCAL_CONFIG_PATH));
    paths
}

/// Map a lowercased, prefix-stripped `CHATRELAY_` variable name to a dotted key.
///
/// Only the leading section name is split off, so `line_channel_access_token`
/// maps to `line.channel_access_token`. Names without a known section pass through.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        match key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            Some(rest) if !rest.is_empty() => return format!("{section}.{rest}"),
            _ => {}
        }
    }
    key.to_string()
}

/// Map an unprefixed platform variable to its config key.
pub fn map_platform_env_key(key: &str) -> Option<&'static str> {
    PLATFORM_VARS
        .iter()
        .find(|(var, _)| var.eq_ignore_ascii_case(key))
        .map(|(_, config_key)| *config_key)
}

/// The unprefixed platform variable that sets a dotted config key, if any.
pub fn platform_var_for(config_key: &str) -> Option<&'static str> {
    PLATFORM_VARS
        .iter()
        .find(|(_, key)| *key == config_key)
        .map(|(var, _)| *var)
}

/// Environment provider for `CHATRELAY_*` overrides.
///
/// Uses an explicit section map rather than `Env::split("_")`, since key names
/// themselves contain underscores.
fn env_provider() -> Env {
    Env::prefixed("CHATRELAY_").map(|key| map_env_key(key.as_str()).into())
}

fn platform_env_provider() -> Env {
    let vars: Vec<&str> = PLATFORM_VARS.iter().map(|(var, _)| *var).collect();
    Env::raw().only(&vars).map(|key| {
        map_platform_env_key(key.as_str())
            .unwrap_or(key.as_str())
            .to_string()
            .into()
    })
}
