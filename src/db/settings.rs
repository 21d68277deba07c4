use rusqlite::{params, OptionalExtension};

use super::{current_timestamp_millis, Database, StorageResult};

pub(crate) const SETTINGS_TABLE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at_millis INTEGER NOT NULL
);";

pub fn get_setting(db: &Database, key: &str) -> StorageResult<Option<String>> {
    db.with_connection(|conn| {
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| format!("failed to query setting {key}: {e}"))
    })
}

pub fn set_setting(db: &Database, key: &str, value: &str) -> StorageResult<()> {
    let updated_at = current_timestamp_millis();
    db.with_connection(|conn| {
        conn.execute(
            "INSERT INTO settings (key, value, updated_at_millis) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at_millis = excluded.updated_at_millis",
            params![key, value, updated_at],
        )
        .map_err(|e| format!("failed to upsert setting {key}: {e}"))?;
        Ok(())
    })
}
