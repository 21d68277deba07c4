use crate::api::auth::{AccessTokenSource, SessionIdentity};
use crate::api::drive::client::{build_blocking_client, ensure_success};
use crate::error::{ExplorerError, ExplorerResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// 解析得到的服务地址与 audience。只在一次会话/请求内使用，不落盘。
/// 后续对该端点的调用必须使用以 `service_resource_id` 为 audience 的令牌。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCapability {
    pub service_endpoint_uri: String,
    pub service_resource_id: String,
}

/// discovery 服务返回的一条 capability 映射。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredService {
    pub capability: String,
    pub service_endpoint_uri: String,
    pub service_resource_id: String,
}

/// 以 discovery 令牌查询当前用户可用服务的接口。
pub trait DiscoveryApi: Send + Sync {
    fn fetch_services(&self, access_token: &str) -> ExplorerResult<Vec<DiscoveredService>>;
}

/// `GET {discovery_endpoint_uri}services` 的 HTTP 实现。
pub struct HttpDiscoveryClient {
    endpoint_uri: String,
}

impl HttpDiscoveryClient {
    pub fn new(endpoint_uri: impl Into<String>) -> Self {
        Self {
            endpoint_uri: endpoint_uri.into(),
        }
    }

    fn services_url(&self) -> String {
        format!("{}/services", self.endpoint_uri.trim_end_matches('/'))
    }
}

impl DiscoveryApi for HttpDiscoveryClient {
    fn fetch_services(&self, access_token: &str) -> ExplorerResult<Vec<DiscoveredService>> {
        let client = build_blocking_client(Duration::from_secs(30))?;
        let response = client
            .get(self.services_url())
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| ExplorerError::from_transport(e, "capability discovery"))?;

        let payload: DiscoveryResponse = ensure_success(response, "capability discovery")?
            .json()
            .map_err(|e| ExplorerError::Protocol(format!("failed to parse discovery response: {e}")))?;
        Ok(payload.value)
    }
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(default)]
    value: Vec<DiscoveredService>,
}

/// 通过 discovery 服务把 capability 名称解析成具体端点。
/// 不做重试；令牌刷新由 [`AccessTokenSource`] 负责，远端错误原样上抛。
pub struct CapabilityResolver {
    tokens: Arc<dyn AccessTokenSource>,
    discovery: Arc<dyn DiscoveryApi>,
    discovery_resource: String,
}

impl CapabilityResolver {
    pub fn new(
        tokens: Arc<dyn AccessTokenSource>,
        discovery: Arc<dyn DiscoveryApi>,
        discovery_resource: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            discovery,
            discovery_resource: discovery_resource.into(),
        }
    }

    pub fn resolve(
        &self,
        identity: &SessionIdentity,
        capability_name: &str,
    ) -> ExplorerResult<ResolvedCapability> {
        let resource = identity
            .discovery_resource
            .as_deref()
            .unwrap_or(&self.discovery_resource);
        let access_token = self.tokens.acquire_token(identity, resource)?;
        let services = self.discovery.fetch_services(&access_token)?;

        let service = services
            .into_iter()
            .find(|service| service.capability.eq_ignore_ascii_case(capability_name))
            .ok_or_else(|| {
                ExplorerError::CapabilityUnavailable(format!(
                    "capability {capability_name} is not provisioned for this tenant"
                ))
            })?;

        let endpoint = Url::parse(&service.service_endpoint_uri).map_err(|e| {
            ExplorerError::Protocol(format!(
                "discovery returned an invalid endpoint for {capability_name}: {e}"
            ))
        })?;
        if !matches!(endpoint.scheme(), "https" | "http") {
            return Err(ExplorerError::Protocol(format!(
                "discovery returned a non-HTTP endpoint for {capability_name}"
            )));
        }
        if service.service_resource_id.trim().is_empty() {
            return Err(ExplorerError::Protocol(format!(
                "discovery returned no resource id for {capability_name}"
            )));
        }

        tracing::debug!(
            user_key = %identity.user_key,
            capability = capability_name,
            endpoint = %endpoint,
            "resolved capability"
        );
        Ok(ResolvedCapability {
            service_endpoint_uri: service.service_endpoint_uri,
            service_resource_id: service.service_resource_id,
        })
    }
}
