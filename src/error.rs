use crate::api::drive::models::ListingItem;
use thiserror::Error;

/// 浏览器核心对外暴露的统一错误类型。
/// 前五个变体与调用方约定的错误语义一一对应，其余用于存储/协议层面的异常。
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// 缓存中没有可用的 access token / refresh token，需要重新走交互式登录。
    #[error("authorization required: {0}")]
    AuthorizationRequired(String),

    /// 网络或远端 5xx 错误，调用方可自行决定是否重试。
    #[error("transient failure: {0}")]
    TransientFailure(String),

    /// discovery 成功返回，但租户下没有请求的 capability。
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// 分页次数超过上限或 cursor 不再前进；`partial` 保留已经拉取到的条目。
    #[error("listing incomplete after {pages_fetched} pages")]
    ListingIncomplete {
        pages_fetched: usize,
        partial: Vec<ListingItem>,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// 远端返回了非重试型的 4xx（401/403/404 之外）。
    #[error("remote service returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Protocol(String),
}

pub type ExplorerResult<T> = Result<T, ExplorerError>;

impl ExplorerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExplorerError::NotFound(_))
    }

    /// 将 HTTP 状态码映射到错误分类；所有远端调用共用这一套规则。
    pub(crate) fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        let code = status.as_u16();
        match code {
            401 | 403 => ExplorerError::AuthorizationRequired(format!(
                "{context}: access token rejected (HTTP {code})"
            )),
            404 => ExplorerError::NotFound(context.to_string()),
            408 | 429 => ExplorerError::TransientFailure(format!("{context}: HTTP {code}")),
            _ if status.is_server_error() => {
                ExplorerError::TransientFailure(format!("{context}: HTTP {code}"))
            }
            _ => ExplorerError::Remote {
                status: code,
                message: context.to_string(),
            },
        }
    }

    /// 发送阶段的 reqwest 错误（连接失败、超时、读取 body 失败）都视为可重试。
    pub(crate) fn from_transport(err: reqwest::Error, context: &str) -> Self {
        if err.is_decode() {
            return ExplorerError::Protocol(format!("{context}: {err}"));
        }
        ExplorerError::TransientFailure(format!("{context}: {err}"))
    }
}
