use crate::db::{self, Database, StorageResult, TokenCacheRecord};
use std::collections::HashMap;
use std::sync::Mutex;

/// 按用户持久化的一行 token cache。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCacheEntry {
    pub user_key: String,
    pub serialized_cache: Vec<u8>,
    pub last_write_millis: i64,
}

/// 定义 token cache 的持久化接口，方便替换存储实现或编写单测。
///
/// 不同用户之间互不干扰；同一用户的 `save` 是后写者覆盖。
/// token cache 天然是读-改-写，并发刷新时旧值覆盖新值是已知的一致性取舍：
/// 被覆盖的令牌会在下一次静默获取时重新换取，不视为错误。
pub trait TokenCacheStore: Send + Sync {
    fn load(&self, user_key: &str) -> StorageResult<Option<TokenCacheEntry>>;
    fn save(&self, user_key: &str, serialized_cache: &[u8], last_write_millis: i64)
        -> StorageResult<()>;
}

/// 默认的 SQLite 实现：每次调用独立打开连接。
pub struct SqliteTokenCacheStore {
    db: Database,
}

impl SqliteTokenCacheStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl TokenCacheStore for SqliteTokenCacheStore {
    fn load(&self, user_key: &str) -> StorageResult<Option<TokenCacheEntry>> {
        Ok(db::load_token_cache(&self.db, user_key)?.map(|record| TokenCacheEntry {
            user_key: record.user_key,
            serialized_cache: record.cache_bits,
            last_write_millis: record.last_write_millis,
        }))
    }

    fn save(
        &self,
        user_key: &str,
        serialized_cache: &[u8],
        last_write_millis: i64,
    ) -> StorageResult<()> {
        db::upsert_token_cache(
            &self.db,
            &TokenCacheRecord {
                user_key: user_key.to_string(),
                cache_bits: serialized_cache.to_vec(),
                last_write_millis,
            },
        )
    }
}

/// 进程内实现，数据随实例释放；用于嵌入式场景与测试。
#[derive(Default)]
pub struct MemoryTokenCacheStore {
    rows: Mutex<HashMap<String, TokenCacheEntry>>,
}

impl MemoryTokenCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCacheStore for MemoryTokenCacheStore {
    fn load(&self, user_key: &str) -> StorageResult<Option<TokenCacheEntry>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| "token cache store poisoned".to_string())?;
        Ok(rows.get(user_key).cloned())
    }

    fn save(
        &self,
        user_key: &str,
        serialized_cache: &[u8],
        last_write_millis: i64,
    ) -> StorageResult<()> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| "token cache store poisoned".to_string())?;
        rows.insert(
            user_key.to_string(),
            TokenCacheEntry {
                user_key: user_key.to_string(),
                serialized_cache: serialized_cache.to_vec(),
                last_write_millis,
            },
        );
        Ok(())
    }
}
