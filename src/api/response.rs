use crate::api::drive::ListingItem;
use crate::error::{ExplorerError, ExplorerResult};
use serde::Serialize;

/// 列表操作返回给调用方的结构化结果。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub items: Vec<ListingItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 上传、删除等不返回条目的操作结果。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ExplorerResult<Vec<ListingItem>>> for ListResponse {
    fn from(result: ExplorerResult<Vec<ListingItem>>) -> Self {
        match result {
            Ok(items) => Self {
                success: true,
                items,
                message: None,
            },
            // 截断的列表仍然把已拿到的条目交给调用方展示
            Err(ExplorerError::ListingIncomplete {
                pages_fetched,
                partial,
            }) => Self {
                success: false,
                items: partial,
                message: Some(format!(
                    "Listing incomplete: showing items from the first {pages_fetched} pages"
                )),
            },
            Err(err) => Self {
                success: false,
                items: Vec::new(),
                message: Some(user_message(&err)),
            },
        }
    }
}

impl<T> From<ExplorerResult<T>> for OperationResponse {
    fn from(result: ExplorerResult<T>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                message: None,
            },
            Err(err) => Self {
                success: false,
                message: Some(user_message(&err)),
            },
        }
    }
}

/// 面向用户的错误提示。细节只进日志，不回传给调用方。
pub fn user_message(err: &ExplorerError) -> String {
    let message = match err {
        ExplorerError::AuthorizationRequired(_) => "Authorization Required",
        ExplorerError::TransientFailure(_) => "Service temporarily unavailable, please retry",
        ExplorerError::CapabilityUnavailable(_) => "File storage is not available for this account",
        ExplorerError::NotFound(_) => "Item not found",
        ExplorerError::ListingIncomplete { .. } => "Listing incomplete",
        ExplorerError::InvalidInput(detail) => return format!("Invalid request: {detail}"),
        ExplorerError::Storage(_) | ExplorerError::Remote { .. } | ExplorerError::Protocol(_) => {
            tracing::error!(error = %err, "unexpected failure");
            "Unexpected exception"
        }
    };
    message.to_string()
}
