mod settings;
mod token_cache;

use directories::ProjectDirs;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use settings::{get_setting, set_setting};
pub use token_cache::{load_token_cache, upsert_token_cache, TokenCacheRecord};

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "Skydrivex";
const APPLICATION: &str = "SkydrivexExplorer";
const DB_FILE_NAME: &str = "explorer.db";

/// 并发请求可能同时写同一个库文件，给 SQLite 一个等待锁的窗口，而不是立刻报 SQLITE_BUSY。
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type StorageResult<T> = Result<T, String>;

/// 数据库位置句柄。每次操作都单独打开连接，不在请求之间共享连接或锁。
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// 使用平台默认的应用数据目录。
    pub fn open_default() -> StorageResult<Self> {
        Ok(Self {
            path: default_database_path()?,
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 建库并执行迁移；首次启动时调用一次即可，后续操作也会自动迁移。
    pub fn init(&self) -> StorageResult<()> {
        self.with_connection(|_| Ok(()))
    }

    pub(crate) fn with_connection<T, F>(&self, operation: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let conn = self.open_connection()?;
        operation(&conn)
    }

    fn open_connection(&self) -> StorageResult<Connection> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .map_err(|e| format!("failed to create database directory {dir:?}: {e}"))?;
            }
        }

        let conn = Connection::open(&self.path)
            .map_err(|e| format!("failed to open SQLite database: {e}"))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| format!("failed to configure busy timeout: {e}"))?;
        apply_migrations(&conn)?;
        Ok(conn)
    }
}

fn apply_migrations(conn: &Connection) -> StorageResult<()> {
    for schema in [
        token_cache::TOKEN_CACHE_TABLE_SCHEMA,
        settings::SETTINGS_TABLE_SCHEMA,
    ] {
        conn.execute_batch(schema)
            .map_err(|e| format!("failed to initialize database schema: {e}"))?;
    }
    Ok(())
}

fn default_database_path() -> StorageResult<PathBuf> {
    let dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .ok_or_else(|| "failed to resolve application data directory".to_string())?;
    Ok(dirs.data_dir().join(DB_FILE_NAME))
}

pub(crate) fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
