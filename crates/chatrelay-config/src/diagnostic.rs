// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config diagnostics rendered through miette.
//!
//! Figment reports one error per bad key. Each becomes a [`ConfigError`] that
//! points at the offending line of `chatrelay.toml` when the key came from a file,
//! and names the environment variable that can supply a missing secret.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::platform_var_for;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem found while loading or validating `chatrelay.toml`.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no config section declares.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(chatrelay::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted by the enclosing section.
        valid_keys: String,
        #[label("not a chatrelay setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that does not deserialize into the declared type.
    #[error("invalid value for `{key}`: found {found}")]
    #[diagnostic(code(chatrelay::config::invalid_type), help("`{key}` expects {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `server.port`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required setting (usually a secret) with no value from any source.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(chatrelay::config::missing_key),
        help("{}", missing_key_help(key, *env_var))
    )]
    MissingKey {
        /// Dotted path, e.g. `line.channel_secret`.
        key: String,
        /// Unprefixed variable the loader also reads for this key.
        env_var: Option<&'static str>,
    },

    /// A value that parsed but is out of range or inconsistent.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(chatrelay::config::validation))]
    Validation { message: String },

    /// Unreadable TOML or any figment failure without a more specific shape.
    #[error("could not load configuration: {0}")]
    #[diagnostic(
        code(chatrelay::config::malformed),
        help("check the TOML syntax of chatrelay.toml")
    )]
    Malformed(String),
}

impl ConfigError {
    /// Missing-key error that also names the key's environment fallback.
    pub fn missing_key(key: impl Into<String>) -> Self {
        let key = key.into();
        let env_var = platform_var_for(&key);
        ConfigError::MissingKey { key, env_var }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

fn missing_key_help(key: &str, env_var: Option<&str>) -> String {
    let (section, field) = key.split_once('.').unwrap_or(("", key));
    let in_file = if section.is_empty() {
        format!("set `{field} = ...` in chatrelay.toml")
    } else {
        format!("set `{field} = ...` under [{section}] in chatrelay.toml")
    };
    let prefixed = format!("CHATRELAY_{}", key.replace('.', "_").to_ascii_uppercase());
    match env_var {
        Some(var) => format!("{in_file}, or export {var} (or {prefixed})"),
        None => format!("{in_file}, or export {prefixed}"),
    }
}

/// Convert every error carried by a figment failure into a diagnostic.
///
/// `toml_sources` pairs each loaded file's display path with its content, so
/// file-borne errors can be labeled in place.
pub fn figment_to_config_errors(
    err: FigmentError,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &FigmentError, toml_sources: &[(String, String)]) -> ConfigError {
    let section = error.path.first().map(String::as_str);
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, toml_sources, section, field);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => {
            let key = match section {
                Some(section) => format!("{section}.{field}"),
                None => field.to_string(),
            };
            ConfigError::missing_key(key)
        }
        Kind::InvalidType(found, expected) => {
            let (span, src) = match error.path.last() {
                Some(field) if error.path.len() > 1 => {
                    locate(error, toml_sources, section, field)
                }
                _ => (None, None),
            };
            ConfigError::InvalidType {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Malformed(error.to_string()),
    }
}

/// Label `field` inside `section` when the error originated in a known file.
fn locate(
    error: &FigmentError,
    toml_sources: &[(String, String)],
    section: Option<&str>,
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => path.display().to_string(),
        // Inline strings carry no file metadata; fall back to a lone source.
        _ if toml_sources.len() == 1 => toml_sources[0].0.clone(),
        _ => return (None, None),
    };

    toml_sources
        .iter()
        .find(|(path, _)| *path == origin)
        .and_then(|(path, content)| {
            let offset = key_offset(content, section, field)?;
            Some((
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field = ...` inside the `[section]` table.
///
/// Tracks table headers line by line, so a same-named key in another section
/// is never matched. `section = None` searches the root table.
pub fn key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header.split(']').next().map(str::trim);
        } else if current == section {
            let key = trimmed.split('=').next().map(str::trim);
            if key == Some(field) && trimmed.contains('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }

    None
}

/// Closest valid key to `unknown` by Jaro-Winkler similarity, if close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    eprintln!(
        "chatrelay: {} configuration problem(s) found\n",
        errors.len()
    );
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
