use super::{
    client::{build_blocking_client, ensure_success, HttpFileClient},
    list::{encode_segment, FileItemDto},
    models::{ItemRef, UploadBody},
};
use crate::error::{ExplorerError, ExplorerResult};
use reqwest::blocking::Body;
use std::time::Duration;

/// 上传可能是大文件，给足超时。
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

impl HttpFileClient {
    /// 在根目录创建一个空文件条目：`POST {endpoint}/files`。
    pub(crate) fn create_file_item(&self, name: &str) -> ExplorerResult<ItemRef> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExplorerError::InvalidInput("file name cannot be empty".to_string()));
        }

        let access_token = self.access_token()?;
        let client = build_blocking_client(Duration::from_secs(30))?;
        let metadata = serde_json::json!({
            "name": name,
            "type": "File",
        });

        let response = client
            .post(self.endpoint_url("files"))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .json(&metadata)
            .send()
            .map_err(|e| ExplorerError::from_transport(e, "create file"))?;

        let dto: FileItemDto = ensure_success(response, "create file")?
            .json()
            .map_err(|e| ExplorerError::Protocol(format!("failed to parse create response: {e}")))?;

        Ok(ItemRef {
            name: dto.name.unwrap_or_else(|| name.to_string()),
            id: dto.id,
        })
    }

    /// 把内容流式写入已创建的文件：`POST {endpoint}/files/{id}/uploadContent`。
    /// 请求体直接包装调用方的 Reader，不在内存里缓冲整个文件。
    pub(crate) fn upload_item_content(&self, item: &ItemRef, body: UploadBody) -> ExplorerResult<()> {
        let access_token = self.access_token()?;
        let client = build_blocking_client(UPLOAD_TIMEOUT)?;
        let url = self.endpoint_url(&format!("files/{}/uploadContent", encode_segment(&item.id)));

        let (reader, length) = body.into_parts();
        let request_body = match length {
            Some(len) => Body::sized(reader, len),
            None => Body::new(reader),
        };

        let response = client
            .post(url)
            .bearer_auth(access_token)
            .header("Content-Type", "application/octet-stream")
            .body(request_body)
            .send()
            .map_err(|e| ExplorerError::from_transport(e, "upload content"))?;

        ensure_success(response, "upload content")?;
        tracing::debug!(item_id = %item.id, bytes = ?length, "uploaded file content");
        Ok(())
    }
}
