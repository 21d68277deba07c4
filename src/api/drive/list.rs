use super::{
    client::{build_blocking_client, ensure_success, HttpFileClient},
    models::{ItemKind, ListingItem, ListingPage, PageCursor},
};
use crate::error::{ExplorerError, ExplorerResult};
use serde::Deserialize;
use std::time::Duration;

impl HttpFileClient {
    /// 根目录第一页：`GET {endpoint}/files`。
    pub(crate) fn fetch_root_page(&self) -> ExplorerResult<ListingPage> {
        let url = self.endpoint_url("files");
        self.fetch_page(&url, "list root")
    }

    /// 指定文件夹第一页：`GET {endpoint}/files/{id}/children`。
    pub(crate) fn fetch_folder_page(&self, folder_id: &str) -> ExplorerResult<ListingPage> {
        let folder_id = folder_id.trim();
        if folder_id.is_empty() {
            return Err(ExplorerError::InvalidInput("folder id is required".to_string()));
        }
        let url = self.endpoint_url(&format!("files/{}/children", encode_segment(folder_id)));
        self.fetch_page(&url, "list folder")
    }

    /// 续页：cursor 原样作为请求地址。
    pub(crate) fn fetch_next_page(&self, cursor: &PageCursor) -> ExplorerResult<ListingPage> {
        self.fetch_page(cursor.as_str(), "list next page")
    }

    fn fetch_page(&self, url: &str, context: &str) -> ExplorerResult<ListingPage> {
        let access_token = self.access_token()?;
        // 设置较短超时；下载等长耗时场景另行处理。
        let client = build_blocking_client(Duration::from_secs(30))?;

        let response = client
            .get(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| ExplorerError::from_transport(e, context))?;
        let payload: FileCollectionResponse = ensure_success(response, context)?
            .json()
            .map_err(|e| ExplorerError::Protocol(format!("failed to parse {context} response: {e}")))?;

        Ok(payload.into())
    }
}

pub(crate) fn encode_segment(raw: &str) -> String {
    percent_encoding::utf8_percent_encode(raw, percent_encoding::NON_ALPHANUMERIC).to_string()
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileCollectionResponse {
    #[serde(default)]
    value: Vec<FileItemDto>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl From<FileCollectionResponse> for ListingPage {
    fn from(payload: FileCollectionResponse) -> Self {
        ListingPage {
            items: payload.value.into_iter().map(ListingItem::from).collect(),
            next: payload
                .next_link
                .filter(|link| !link.trim().is_empty())
                .map(PageCursor::new),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileItemDto {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    #[serde(rename = "type")]
    pub(crate) item_type: Option<String>,
    pub(crate) size: Option<i64>,
    pub(crate) created_by: Option<IdentitySetDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentitySetDto {
    user: Option<IdentityDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDto {
    display_name: Option<String>,
}

impl From<FileItemDto> for ListingItem {
    fn from(value: FileItemDto) -> Self {
        ListingItem::new(
            value.id,
            value.name.unwrap_or_default(),
            value.size.and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
            ItemKind::from_remote(value.item_type.as_deref()),
            value
                .created_by
                .and_then(|set| set.user)
                .and_then(|user| user.display_name)
                .unwrap_or_default(),
        )
    }
}
