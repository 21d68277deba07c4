use super::{
    client::{build_blocking_client, ensure_success, HttpFileClient},
    list::{encode_segment, FileItemDto},
    models::{ItemRef, ListingItem},
};
use crate::error::{ExplorerError, ExplorerResult};
use std::time::Duration;

impl HttpFileClient {
    /// 按 ID 获取条目元数据：`GET {endpoint}/files/{id}`。
    pub(crate) fn fetch_item(&self, item_id: &str) -> ExplorerResult<ListingItem> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(ExplorerError::InvalidInput("item id is required".to_string()));
        }
        let url = self.endpoint_url(&format!("files/{}", encode_segment(item_id)));
        Ok(self.fetch_item_dto(&url, "get item")?.into())
    }

    /// 按路径查找条目：`GET {endpoint}/files/getByPath('{path}')`，不存在时返回 `NotFound`。
    pub(crate) fn fetch_item_by_path(&self, path: &str) -> ExplorerResult<ItemRef> {
        let relative = build_get_by_path(path)
            .ok_or_else(|| ExplorerError::InvalidInput("item path is required".to_string()))?;
        let url = self.endpoint_url(&relative);
        let dto = self.fetch_item_dto(&url, "get item by path")?;
        Ok(ItemRef {
            name: dto.name.unwrap_or_default(),
            id: dto.id,
        })
    }

    fn fetch_item_dto(&self, url: &str, context: &str) -> ExplorerResult<FileItemDto> {
        let access_token = self.access_token()?;
        let client = build_blocking_client(Duration::from_secs(30))?;

        let response = client
            .get(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| ExplorerError::from_transport(e, context))?;

        ensure_success(response, context)?
            .json::<FileItemDto>()
            .map_err(|e| ExplorerError::Protocol(format!("failed to parse {context} response: {e}")))
    }
}

/// 构造 `files/getByPath('a/b.txt')`：去掉首尾 `/`，单引号按 OData 规则双写，逐段编码。
fn build_get_by_path(path: &str) -> Option<String> {
    let normalized = path.trim().trim_matches('/');
    if normalized.is_empty() {
        return None;
    }
    let encoded = normalized
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| encode_segment(&segment.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join("/");
    Some(format!("files/getByPath('{encoded}')"))
}
