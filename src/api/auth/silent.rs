use super::identity::SessionIdentity;
use super::refresh::{IssuedTokens, TokenEndpoint};
use crate::db::current_timestamp_millis;
use crate::error::{ExplorerError, ExplorerResult};
use crate::token_cache::{CachedToken, TokenCache, TokenCacheStore};
use std::sync::Arc;

/// 为指定 resource 提供 access token 的统一接口。
/// discovery 客户端与文件服务客户端都只依赖这一接口。
pub trait AccessTokenSource: Send + Sync {
    fn acquire_token(&self, identity: &SessionIdentity, resource: &str) -> ExplorerResult<String>;
}

/// 基于持久化 token cache 的静默令牌提供者，从不触发交互式登录。
///
/// 查找顺序：
/// 1. 缓存中该 resource 的 access token 未过期 → 直接返回；
/// 2. 已过期但有 refresh token → 兑换、持久化后返回；
/// 3. 该 resource 无可用条目，但用户有 multi-resource refresh token → 兑换新 resource；
/// 4. 否则返回 `AuthorizationRequired`。
pub struct SilentTokenProvider {
    store: Arc<dyn TokenCacheStore>,
    endpoint: Arc<dyn TokenEndpoint>,
}

impl SilentTokenProvider {
    pub fn new(store: Arc<dyn TokenCacheStore>, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self { store, endpoint }
    }

    /// 保存交互式登录流程拿到的令牌，作为后续静默获取的起点。
    pub fn record_sign_in(
        &self,
        identity: &SessionIdentity,
        resource: &str,
        tokens: IssuedTokens,
    ) -> ExplorerResult<()> {
        let mut cache = self.load_cache(&identity.user_key);
        cache.upsert(cached_token(identity, resource, tokens, current_timestamp_millis()));
        self.store
            .save(
                &identity.user_key,
                &cache.serialize().map_err(ExplorerError::Storage)?,
                current_timestamp_millis(),
            )
            .map_err(ExplorerError::Storage)?;
        tracing::debug!(user_key = %identity.user_key, resource, "recorded sign-in tokens");
        Ok(())
    }

    /// 读失败或内容损坏时降级为空缓存，而不是让请求失败。
    fn load_cache(&self, user_key: &str) -> TokenCache {
        let entry = match self.store.load(user_key) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(user_key, error = %err, "token cache read failed; starting empty");
                return TokenCache::new();
            }
        };
        match entry {
            Some(entry) => TokenCache::deserialize(&entry.serialized_cache).unwrap_or_else(|err| {
                tracing::warn!(user_key, error = %err, "token cache unreadable; starting empty");
                TokenCache::new()
            }),
            None => TokenCache::new(),
        }
    }

    /// 缓存有变化时写回存储。写失败直接上抛，调用方不会拿到未落盘的令牌。
    fn persist(&self, user_key: &str, cache: &mut TokenCache) -> ExplorerResult<()> {
        if !cache.has_state_changed() {
            return Ok(());
        }
        cache
            .serialize()
            .and_then(|bits| self.store.save(user_key, &bits, current_timestamp_millis()))
            .map_err(|err| {
                tracing::warn!(user_key, error = %err, "failed to persist token cache");
                ExplorerError::Storage(err)
            })?;
        cache.mark_persisted();
        Ok(())
    }

    /// 兑换 refresh token。`source_resource` 是 refresh token 所在的缓存条目，
    /// 被拒绝时删除该条目，避免后续请求反复使用失效凭据。
    fn redeem(
        &self,
        identity: &SessionIdentity,
        cache: &mut TokenCache,
        resource: &str,
        source_resource: &str,
        refresh_token: &str,
    ) -> ExplorerResult<String> {
        tracing::debug!(
            user_key = %identity.user_key,
            resource,
            source_resource,
            "refreshing access token"
        );
        match self
            .endpoint
            .redeem_refresh_token(&identity.tenant_id, resource, refresh_token)
        {
            Ok(tokens) => {
                let token = cached_token(identity, resource, tokens, current_timestamp_millis());
                let access_token = token.access_token.clone();
                cache.upsert(token);
                self.persist(&identity.user_key, cache)?;
                Ok(access_token)
            }
            Err(err @ ExplorerError::AuthorizationRequired(_)) => {
                tracing::warn!(
                    user_key = %identity.user_key,
                    source_resource,
                    "refresh token rejected; evicting cache entry"
                );
                cache.evict(&identity.user_object_id, source_resource);
                self.persist(&identity.user_key, cache)?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

impl AccessTokenSource for SilentTokenProvider {
    fn acquire_token(&self, identity: &SessionIdentity, resource: &str) -> ExplorerResult<String> {
        let mut cache = self.load_cache(&identity.user_key);
        let now = current_timestamp_millis();

        if let Some(entry) = cache.find(&identity.user_object_id, resource) {
            if !entry.is_expired(now) {
                return Ok(entry.access_token.clone());
            }
            if let Some(refresh_token) = entry.refresh_token.clone() {
                return self.redeem(identity, &mut cache, resource, resource, &refresh_token);
            }
        }

        let fallback = cache
            .find_multi_resource_refresh_token(&identity.user_object_id)
            .and_then(|entry| {
                entry
                    .refresh_token
                    .clone()
                    .map(|token| (entry.resource.clone(), token))
            });
        if let Some((source_resource, refresh_token)) = fallback {
            return self.redeem(identity, &mut cache, resource, &source_resource, &refresh_token);
        }

        Err(ExplorerError::AuthorizationRequired(format!(
            "no cached credentials for resource {resource}"
        )))
    }
}

fn cached_token(
    identity: &SessionIdentity,
    resource: &str,
    tokens: IssuedTokens,
    now_millis: i64,
) -> CachedToken {
    let lifetime_millis = i64::try_from(tokens.expires_in_seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    CachedToken {
        user_object_id: identity.user_object_id.clone(),
        resource: resource.to_string(),
        tenant_id: identity.tenant_id.clone(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        is_multi_resource: tokens.is_multi_resource,
        expires_at_millis: now_millis.saturating_add(lifetime_millis),
    }
}
