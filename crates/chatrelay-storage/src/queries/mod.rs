// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed SQL operations over the queue, history, and settings tables.

pub mod history;
pub mod queue;
pub mod settings;

/// Render a timestamp the way rows store it (RFC 3339, millisecond precision, `Z`).
pub(crate) fn to_sql_time(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back, surfacing corrupt values as a conversion error.
pub(crate) fn from_sql_time(
    idx: usize,
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>, rusqlite::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&chrono::Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Clamp a row count into SQLite's LIMIT domain.
pub(crate) fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
