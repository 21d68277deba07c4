use crate::error::{ExplorerError, ExplorerResult};

/// 已认证会话的身份信息，由上层（Web 框架/身份提供方）解析后显式传入。
///
/// - `user_key`：稳定的登录用户标识，作为 token cache 行的主键；
/// - `user_object_id`：目录中的用户对象 ID，用于在缓存中匹配令牌；
/// - `tenant_id`：决定 token 端点的租户；
/// - `discovery_resource`：可选的 discovery resource 覆盖值，缺省取配置。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_key: String,
    pub user_object_id: String,
    pub tenant_id: String,
    pub discovery_resource: Option<String>,
}

impl SessionIdentity {
    pub fn new(
        user_key: impl Into<String>,
        user_object_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> ExplorerResult<Self> {
        let identity = Self {
            user_key: user_key.into().trim().to_string(),
            user_object_id: user_object_id.into().trim().to_string(),
            tenant_id: tenant_id.into().trim().to_string(),
            discovery_resource: None,
        };
        if identity.user_key.is_empty() {
            return Err(ExplorerError::AuthorizationRequired(
                "session carries no user identity".to_string(),
            ));
        }
        if identity.user_object_id.is_empty() || identity.tenant_id.is_empty() {
            return Err(ExplorerError::InvalidInput(
                "user object id and tenant id are required".to_string(),
            ));
        }
        Ok(identity)
    }

    pub fn with_discovery_resource(mut self, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        self.discovery_resource = Some(resource).filter(|r| !r.trim().is_empty());
        self
    }
}
