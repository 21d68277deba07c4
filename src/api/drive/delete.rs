use super::{
    client::{build_blocking_client, ensure_success, HttpFileClient},
    list::encode_segment,
    models::ItemRef,
};
use crate::error::{ExplorerError, ExplorerResult};
use std::time::Duration;

impl HttpFileClient {
    /// 删除指定条目：`DELETE {endpoint}/files/{id}`；条目不存在时返回 `NotFound`。
    pub(crate) fn delete_file_item(&self, item: &ItemRef) -> ExplorerResult<()> {
        if item.id.trim().is_empty() {
            return Err(ExplorerError::InvalidInput("item id is required".to_string()));
        }

        let access_token = self.access_token()?;
        let client = build_blocking_client(Duration::from_secs(30))?;
        let url = self.endpoint_url(&format!("files/{}", encode_segment(&item.id)));

        let response = client
            .delete(url)
            .bearer_auth(&access_token)
            .header("Accept", "application/json")
            .header("If-Match", "*")
            .send()
            .map_err(|e| ExplorerError::from_transport(e, "delete item"))?;

        ensure_success(response, "delete item")?;
        Ok(())
    }
}
