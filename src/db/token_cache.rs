use rusqlite::{params, OptionalExtension};

use super::{Database, StorageResult};

/// 每个用户一行的 token cache 表：cache_bits 存放序列化后的整份缓存。
/// 写入是无条件 upsert（后写者覆盖），同一用户的并发刷新可能覆盖彼此的结果；
/// 被覆盖的一方下次请求时会重新静默获取，因此不加分布式锁。
pub(crate) const TOKEN_CACHE_TABLE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user_token_cache (
    user_key TEXT PRIMARY KEY,
    cache_bits BLOB NOT NULL,
    last_write_millis INTEGER NOT NULL
);";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCacheRecord {
    pub user_key: String,
    pub cache_bits: Vec<u8>,
    pub last_write_millis: i64,
}

pub fn upsert_token_cache(db: &Database, record: &TokenCacheRecord) -> StorageResult<()> {
    db.with_connection(|conn| {
        conn.execute(
            "INSERT INTO user_token_cache (user_key, cache_bits, last_write_millis)
            VALUES (?, ?, ?)
            ON CONFLICT(user_key) DO UPDATE SET
                cache_bits = excluded.cache_bits,
                last_write_millis = excluded.last_write_millis",
            params![
                record.user_key,
                record.cache_bits,
                record.last_write_millis
            ],
        )
        .map_err(|e| format!("failed to upsert token cache: {e}"))?;
        Ok(())
    })
}

pub fn load_token_cache(db: &Database, user_key: &str) -> StorageResult<Option<TokenCacheRecord>> {
    db.with_connection(|conn| {
        conn.query_row(
            "SELECT user_key, cache_bits, last_write_millis
            FROM user_token_cache
            WHERE user_key = ?",
            params![user_key],
            |row| {
                Ok(TokenCacheRecord {
                    user_key: row.get(0)?,
                    cache_bits: row.get(1)?,
                    last_write_millis: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| format!("failed to read token cache: {e}"))
    })
}
