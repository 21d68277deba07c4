use crate::api::drive::client::build_blocking_client;
use crate::error::{ExplorerError, ExplorerResult};
use crate::settings::ExplorerSettings;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// 未返回 expires_in 时按一小时计算。
const DEFAULT_EXPIRES_IN_SECONDS: u64 = 3600;

/// token 端点签发的一组令牌。
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in_seconds: u64,
    pub is_multi_resource: bool,
}

impl fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in_seconds", &self.expires_in_seconds)
            .field("is_multi_resource", &self.is_multi_resource)
            .finish()
    }
}

/// 用 refresh token 换取指定 resource 的 access token。
/// 被拒绝的 refresh token（`invalid_grant` 等）必须返回 `AuthorizationRequired`。
pub trait TokenEndpoint: Send + Sync {
    fn redeem_refresh_token(
        &self,
        tenant_id: &str,
        resource: &str,
        refresh_token: &str,
    ) -> ExplorerResult<IssuedTokens>;
}

/// 走 v1 token 端点（`{authority}/{tenant}/oauth2/token`）的实现，使用机密客户端凭据。
pub struct HttpTokenEndpoint {
    settings: ExplorerSettings,
}

impl HttpTokenEndpoint {
    pub fn new(settings: ExplorerSettings) -> Self {
        Self { settings }
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    fn redeem_refresh_token(
        &self,
        tenant_id: &str,
        resource: &str,
        refresh_token: &str,
    ) -> ExplorerResult<IssuedTokens> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("resource", resource),
        ];

        let client = build_blocking_client(Duration::from_secs(30))?;
        let token_url = self.settings.token_endpoint(tenant_id);
        let response = client
            .post(token_url)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .map_err(|e| ExplorerError::from_transport(e, "token refresh failed"))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ExplorerError::from_transport(e, "failed to read token response"))?;

        // 错误响应同样是 JSON；先尝试解析出 error 字段再决定分类。
        let payload = serde_json::from_str::<TokenResponse>(&body).ok();
        interpret_token_response(status, payload, refresh_token)
    }
}

fn interpret_token_response(
    status: reqwest::StatusCode,
    payload: Option<TokenResponse>,
    previous_refresh_token: &str,
) -> ExplorerResult<IssuedTokens> {
    if let Some(error) = payload.as_ref().and_then(|p| p.error.as_deref()) {
        let description = payload
            .as_ref()
            .and_then(|p| p.error_description.clone())
            .unwrap_or_default();
        return Err(classify_token_error(status, error, &description));
    }

    if !status.is_success() {
        return Err(ExplorerError::from_status(status, "token endpoint"));
    }

    let payload = payload
        .ok_or_else(|| ExplorerError::Protocol("failed to parse token response".to_string()))?;
    let access_token = payload
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExplorerError::Protocol("missing access_token in response".to_string()))?;

    Ok(IssuedTokens {
        access_token,
        is_multi_resource: payload.resource.is_some(),
        refresh_token: payload
            .refresh_token
            .or_else(|| Some(previous_refresh_token.to_string())),
        expires_in_seconds: payload
            .expires_in
            .and_then(FlexibleSeconds::into_seconds)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECONDS),
    })
}

fn classify_token_error(
    status: reqwest::StatusCode,
    error: &str,
    description: &str,
) -> ExplorerError {
    match error {
        "invalid_grant" | "interaction_required" | "login_required" | "consent_required" => {
            ExplorerError::AuthorizationRequired(format!("{error}: {description}"))
        }
        "temporarily_unavailable" => {
            ExplorerError::TransientFailure(format!("{error}: {description}"))
        }
        _ if status.is_server_error() => {
            ExplorerError::TransientFailure(format!("{error}: {description}"))
        }
        _ => ExplorerError::Remote {
            status: status.as_u16(),
            message: format!("{error}: {description}"),
        },
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<FlexibleSeconds>,
    resource: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// v1 端点的 expires_in 有时是字符串，有时是数字。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlexibleSeconds {
    Number(u64),
    Text(String),
}

impl FlexibleSeconds {
    fn into_seconds(self) -> Option<u64> {
        match self {
            FlexibleSeconds::Number(value) => Some(value),
            FlexibleSeconds::Text(raw) => raw.trim().parse().ok(),
        }
    }
}
