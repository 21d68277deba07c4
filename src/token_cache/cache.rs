use serde::{Deserialize, Serialize};
use std::fmt;

/// 距离过期不足 5 分钟的 access token 视为已过期，避免请求途中失效。
pub(crate) const EXPIRY_SKEW_MILLIS: i64 = 5 * 60 * 1000;

const CACHE_FORMAT_VERSION: u32 = 1;

/// 单条缓存的令牌，按 (user_object_id, resource) 唯一。
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedToken {
    pub user_object_id: String,
    pub resource: String,
    pub tenant_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// refresh token 能否兑换其他 resource 的 access token。
    #[serde(default)]
    pub is_multi_resource: bool,
    pub expires_at_millis: i64,
}

impl CachedToken {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at_millis <= now_millis.saturating_add(EXPIRY_SKEW_MILLIS)
    }

    fn matches(&self, user_object_id: &str, resource: &str) -> bool {
        self.user_object_id == user_object_id && self.resource == resource
    }
}

// 令牌本身不能出现在日志里。
impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("user_object_id", &self.user_object_id)
            .field("resource", &self.resource)
            .field("tenant_id", &self.tenant_id)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("is_multi_resource", &self.is_multi_resource)
            .field("expires_at_millis", &self.expires_at_millis)
            .finish()
    }
}

/// 从一行 `user_token_cache` 反序列化出来的内存缓存。
/// 同一用户的多个 resource（discovery、文件服务）共用这一份缓存。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default = "current_format_version")]
    version: u32,
    #[serde(default)]
    entries: Vec<CachedToken>,
    #[serde(skip)]
    has_state_changed: bool,
}

fn current_format_version() -> u32 {
    CACHE_FORMAT_VERSION
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            entries: Vec::new(),
            has_state_changed: false,
        }
    }

    pub fn deserialize(bits: &[u8]) -> Result<Self, String> {
        if bits.is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_slice(bits).map_err(|e| format!("failed to decode token cache: {e}"))
    }

    pub fn serialize(&self) -> Result<Vec<u8>, String> {
        serde_json::to_vec(self).map_err(|e| format!("failed to encode token cache: {e}"))
    }

    pub fn find(&self, user_object_id: &str, resource: &str) -> Option<&CachedToken> {
        self.entries
            .iter()
            .find(|entry| entry.matches(user_object_id, resource))
    }

    /// 找一个可以跨 resource 兑换的 refresh token（来自该用户的任意一条缓存）。
    pub fn find_multi_resource_refresh_token(&self, user_object_id: &str) -> Option<&CachedToken> {
        self.entries.iter().find(|entry| {
            entry.user_object_id == user_object_id
                && entry.is_multi_resource
                && entry.refresh_token.is_some()
        })
    }

    /// 插入或替换 (user, resource) 对应的条目。
    pub fn upsert(&mut self, token: CachedToken) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.matches(&token.user_object_id, &token.resource))
        {
            Some(existing) => *existing = token,
            None => self.entries.push(token),
        }
        self.has_state_changed = true;
    }

    pub fn evict(&mut self, user_object_id: &str, resource: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !entry.matches(user_object_id, resource));
        let removed = self.entries.len() != before;
        if removed {
            self.has_state_changed = true;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_state_changed(&self) -> bool {
        self.has_state_changed
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.has_state_changed = false;
    }
}
