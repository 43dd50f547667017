// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user settings rows.

use chatrelay_core::{RelayError, UserSettings};
use rusqlite::{OptionalExtension, params};

use super::{from_sql_time, to_sql_time};
use crate::database::Database;

pub async fn get(db: &Database, user_id: &str) -> Result<Option<UserSettings>, RelayError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id, language, updated_at FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let updated_at: String = row.get(2)?;
                    Ok(UserSettings {
                        user_id: row.get(0)?,
                        language: row.get(1)?,
                        updated_at: from_sql_time(2, &updated_at)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or overwrite the settings row for `settings.user_id`.
pub async fn upsert(db: &Database, settings: &UserSettings) -> Result<(), RelayError> {
    let user_id = settings.user_id.clone();
    let language = settings.language.clone();
    let updated_at = to_sql_time(&settings.updated_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_settings (user_id, language, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                     language = excluded.language,
                     updated_at = excluded.updated_at",
                params![user_id, language, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
