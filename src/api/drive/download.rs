use super::{
    client::{build_blocking_client, ensure_success, HttpFileClient},
    list::encode_segment,
    models::{DownloadStream, ItemKind, ItemRef},
};
use crate::error::{ExplorerError, ExplorerResult};
use std::time::Duration;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

impl HttpFileClient {
    /// 先取元数据（文件名/大小），再打开 `GET {endpoint}/files/{id}/content` 内容流。
    /// 返回的流直接读取响应体；调用方 drop 它即释放连接。
    pub(crate) fn open_download(&self, item: &ItemRef) -> ExplorerResult<DownloadStream> {
        let metadata = self.fetch_item(&item.id)?;
        if metadata.kind == ItemKind::Folder {
            return Err(ExplorerError::InvalidInput(format!(
                "{} is a folder and cannot be downloaded",
                metadata.name
            )));
        }

        let access_token = self.access_token()?;
        let client = build_blocking_client(DOWNLOAD_TIMEOUT)?;
        let url = self.endpoint_url(&format!("files/{}/content", encode_segment(&item.id)));

        let response = client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .map_err(|e| ExplorerError::from_transport(e, "download content"))?;
        let response = ensure_success(response, "download content")?;

        let size_bytes = response.content_length().or(Some(metadata.size_bytes));
        let name = if metadata.name.is_empty() {
            item.name.clone()
        } else {
            metadata.name
        };
        tracing::debug!(item_id = %item.id, size = ?size_bytes, "opened download stream");

        Ok(DownloadStream::new(name, size_bytes, response))
    }
}
