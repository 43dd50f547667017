// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-user conversation history.

use chatrelay_core::{ConversationEntry, RelayError};
use rusqlite::params;

use super::{from_sql_time, sql_limit, to_sql_time};
use crate::database::Database;

fn entry_from_row(row: &rusqlite::Row<'_>) -> Result<ConversationEntry, rusqlite::Error> {
    let created_at: String = row.get(2)?;
    Ok(ConversationEntry {
        user_text: row.get(0)?,
        assistant_text: row.get(1)?,
        created_at: from_sql_time(2, &created_at)?,
    })
}

/// Append an entry and trim the key's history to its newest `capacity` rows.
///
/// Insert and trim commit together, so readers never observe more than
/// `capacity` entries.
pub async fn append(
    db: &Database,
    key: &str,
    entry: &ConversationEntry,
    capacity: usize,
) -> Result<(), RelayError> {
    let key = key.to_string();
    let user_text = entry.user_text.clone();
    let assistant_text = entry.assistant_text.clone();
    let created_at = to_sql_time(&entry.created_at);
    let capacity = sql_limit(capacity);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO history (history_key, user_text, assistant_text, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, user_text, assistant_text, created_at],
            )?;
            tx.execute(
                "DELETE FROM history
                 WHERE history_key = ?1
                   AND id NOT IN (
                       SELECT id FROM history WHERE history_key = ?1
                       ORDER BY id DESC LIMIT ?2
                   )",
                params![key, capacity],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The newest `n` entries for a key, oldest first.
pub async fn recent(
    db: &Database,
    key: &str,
    n: usize,
) -> Result<Vec<ConversationEntry>, RelayError> {
    let key = key.to_string();
    let limit = sql_limit(n);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_text, assistant_text, created_at FROM (
                     SELECT id, user_text, assistant_text, created_at FROM history
                     WHERE history_key = ?1
                     ORDER BY id DESC LIMIT ?2
                 ) ORDER BY id ASC",
            )?;
            let entries = stmt
                .query_map(params![key, limit], entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Entries whose user or assistant text contains `keyword`, oldest first.
///
/// `instr` keeps the match case-sensitive, unlike `LIKE`.
pub async fn search(
    db: &Database,
    key: &str,
    keyword: &str,
) -> Result<Vec<ConversationEntry>, RelayError> {
    let key = key.to_string();
    let keyword = keyword.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_text, assistant_text, created_at FROM history
                 WHERE history_key = ?1
                   AND (instr(user_text, ?2) > 0 OR instr(assistant_text, ?2) > 0)
                 ORDER BY id ASC",
            )?;
            let entries = stmt
                .query_map(params![key, keyword], entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
