use crate::api::auth::{AccessTokenSource, SessionIdentity};
use crate::api::discovery::ResolvedCapability;
use crate::error::{ExplorerError, ExplorerResult};
use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::Duration;

/// 构建一个带有统一超时与重定向策略的阻塞式 HTTP 客户端。
/// 所有远端调用应尽量复用该函数，避免重复配置。
pub(crate) fn build_blocking_client(timeout: Duration) -> ExplorerResult<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(10))
        .build()
        .map_err(|e| ExplorerError::TransientFailure(format!("failed to build HTTP client: {e}")))
}

/// 非 2xx 响应统一按错误分类映射。
pub(crate) fn ensure_success(response: Response, context: &str) -> ExplorerResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ExplorerError::from_status(status, context))
    }
}

/// 绑定到某个已解析 capability 的文件服务客户端。
/// 每次调用都会重新向 token 提供者要一次令牌，不在客户端内缓存。
pub struct HttpFileClient {
    tokens: Arc<dyn AccessTokenSource>,
    identity: SessionIdentity,
    capability: ResolvedCapability,
}

impl HttpFileClient {
    pub fn new(
        tokens: Arc<dyn AccessTokenSource>,
        identity: SessionIdentity,
        capability: ResolvedCapability,
    ) -> Self {
        Self {
            tokens,
            identity,
            capability,
        }
    }

    pub fn capability(&self) -> &ResolvedCapability {
        &self.capability
    }

    /// 以 capability 的 resource id 为 audience 获取令牌。
    pub(crate) fn access_token(&self) -> ExplorerResult<String> {
        self.tokens
            .acquire_token(&self.identity, &self.capability.service_resource_id)
    }

    /// 在服务根地址后拼接相对路径。
    pub(crate) fn endpoint_url(&self, relative: &str) -> String {
        format!(
            "{}/{}",
            self.capability.service_endpoint_uri.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}
