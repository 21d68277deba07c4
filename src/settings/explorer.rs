use crate::db::Database;
use crate::settings::listing_page_limit::{
    default_listing_page_limit, stored_listing_page_limit, MAX_LISTING_PAGE_LIMIT,
    MIN_LISTING_PAGE_LIMIT,
};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_AUTHORIZATION_URI: &str = "https://login.windows.net";
const DEFAULT_DISCOVERY_RESOURCE_ID: &str = "https://api.office.com/discovery/";
const DEFAULT_DISCOVERY_ENDPOINT_URI: &str = "https://api.office.com/discovery/v1.0/me/";
const DEFAULT_CAPABILITY: &str = "MyFiles";

const ENV_PREFIX: &str = "SKYDRIVEX_";

/// 应用级配置：客户端凭据、授权/发现端点以及分页上限。
/// 加载顺序：内置默认值 → JSON 文件 → `SKYDRIVEX_*` 环境变量。
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_uri: String,
    pub discovery_resource_id: String,
    pub discovery_endpoint_uri: String,
    pub capability: String,
    pub max_listing_pages: usize,
    pub database_path: Option<PathBuf>,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorization_uri: DEFAULT_AUTHORIZATION_URI.to_string(),
            discovery_resource_id: DEFAULT_DISCOVERY_RESOURCE_ID.to_string(),
            discovery_endpoint_uri: DEFAULT_DISCOVERY_ENDPOINT_URI.to_string(),
            capability: DEFAULT_CAPABILITY.to_string(),
            max_listing_pages: default_listing_page_limit(),
            database_path: None,
        }
    }
}

// client_secret 不能出现在日志里。
impl fmt::Debug for ExplorerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplorerSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorization_uri", &self.authorization_uri)
            .field("discovery_resource_id", &self.discovery_resource_id)
            .field("discovery_endpoint_uri", &self.discovery_endpoint_uri)
            .field("capability", &self.capability)
            .field("max_listing_pages", &self.max_listing_pages)
            .field("database_path", &self.database_path)
            .finish()
    }
}

impl ExplorerSettings {
    /// 默认值 + 环境变量覆盖。
    pub fn from_env() -> Result<Self, String> {
        let mut settings = Self::default();
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// 读取 JSON 配置文件（缺省字段取默认值），随后再叠加环境变量。
    pub fn from_json_file(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("failed to read settings file {path:?}: {e}"))?;
        let mut settings: ExplorerSettings = serde_json::from_str(&raw)
            .map_err(|e| format!("failed to parse settings file {path:?}: {e}"))?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// 按 `SKYDRIVEX_<FIELD>` 覆盖字段；`lookup` 便于测试时替换环境变量来源。
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(value) = get("CLIENT_ID") {
            self.client_id = value;
        }
        if let Some(value) = get("CLIENT_SECRET") {
            self.client_secret = value;
        }
        if let Some(value) = get("AUTHORIZATION_URI") {
            self.authorization_uri = value;
        }
        if let Some(value) = get("DISCOVERY_RESOURCE_ID") {
            self.discovery_resource_id = value;
        }
        if let Some(value) = get("DISCOVERY_ENDPOINT_URI") {
            self.discovery_endpoint_uri = value;
        }
        if let Some(value) = get("CAPABILITY") {
            self.capability = value;
        }
        if let Some(value) = get("MAX_LISTING_PAGES") {
            self.max_listing_pages = value
                .parse()
                .map_err(|e| format!("invalid {ENV_PREFIX}MAX_LISTING_PAGES: {e}"))?;
        }
        if let Some(value) = get("DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// 设置表里存在分页上限时覆盖当前值；未设置或读取失败时保持原值。
    pub fn with_persisted_overrides(mut self, db: &Database) -> Self {
        match stored_listing_page_limit(db) {
            Ok(Some(limit)) => self.max_listing_pages = limit,
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to read persisted listing page limit"),
        }
        self
    }

    pub fn database(&self) -> Result<Database, String> {
        match &self.database_path {
            Some(path) => Ok(Database::at(path)),
            None => Database::open_default(),
        }
    }

    /// 租户级 token 端点：`{authorization_uri}/{tenant}/oauth2/token`。
    pub fn token_endpoint(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/token",
            self.authorization_uri.trim_end_matches('/'),
            tenant_id.trim_matches('/')
        )
    }

    pub(crate) fn page_limit(&self) -> usize {
        self.max_listing_pages
            .clamp(MIN_LISTING_PAGE_LIMIT, MAX_LISTING_PAGE_LIMIT)
    }
}
