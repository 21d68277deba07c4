use super::client::HttpFileClient;
use super::models::{DownloadStream, ItemRef, ListingPage, PageCursor, UploadBody};
use crate::api::auth::{AccessTokenSource, SessionIdentity};
use crate::api::discovery::ResolvedCapability;
use crate::error::ExplorerResult;
use std::sync::Arc;

/// 文件服务的操作集合；HTTP 实现之外也便于在单测里替换。
pub trait FileService: Send + Sync {
    fn list_root(&self) -> ExplorerResult<ListingPage>;
    fn list_folder(&self, folder_id: &str) -> ExplorerResult<ListingPage>;
    fn next_page(&self, cursor: &PageCursor) -> ExplorerResult<ListingPage>;
    /// 路径不存在时返回 `NotFound`。
    fn get_by_path(&self, path: &str) -> ExplorerResult<ItemRef>;
    fn delete_item(&self, item: &ItemRef) -> ExplorerResult<()>;
    fn create_file(&self, name: &str) -> ExplorerResult<ItemRef>;
    fn upload_content(&self, item: &ItemRef, body: UploadBody) -> ExplorerResult<()>;
    fn download_content(&self, item: &ItemRef) -> ExplorerResult<DownloadStream>;
}

impl<T: FileService + ?Sized> FileService for Arc<T> {
    fn list_root(&self) -> ExplorerResult<ListingPage> {
        (**self).list_root()
    }

    fn list_folder(&self, folder_id: &str) -> ExplorerResult<ListingPage> {
        (**self).list_folder(folder_id)
    }

    fn next_page(&self, cursor: &PageCursor) -> ExplorerResult<ListingPage> {
        (**self).next_page(cursor)
    }

    fn get_by_path(&self, path: &str) -> ExplorerResult<ItemRef> {
        (**self).get_by_path(path)
    }

    fn delete_item(&self, item: &ItemRef) -> ExplorerResult<()> {
        (**self).delete_item(item)
    }

    fn create_file(&self, name: &str) -> ExplorerResult<ItemRef> {
        (**self).create_file(name)
    }

    fn upload_content(&self, item: &ItemRef, body: UploadBody) -> ExplorerResult<()> {
        (**self).upload_content(item, body)
    }

    fn download_content(&self, item: &ItemRef) -> ExplorerResult<DownloadStream> {
        (**self).download_content(item)
    }
}

impl FileService for HttpFileClient {
    fn list_root(&self) -> ExplorerResult<ListingPage> {
        self.fetch_root_page()
    }

    fn list_folder(&self, folder_id: &str) -> ExplorerResult<ListingPage> {
        self.fetch_folder_page(folder_id)
    }

    fn next_page(&self, cursor: &PageCursor) -> ExplorerResult<ListingPage> {
        self.fetch_next_page(cursor)
    }

    fn get_by_path(&self, path: &str) -> ExplorerResult<ItemRef> {
        self.fetch_item_by_path(path)
    }

    fn delete_item(&self, item: &ItemRef) -> ExplorerResult<()> {
        self.delete_file_item(item)
    }

    fn create_file(&self, name: &str) -> ExplorerResult<ItemRef> {
        self.create_file_item(name)
    }

    fn upload_content(&self, item: &ItemRef, body: UploadBody) -> ExplorerResult<()> {
        self.upload_item_content(item, body)
    }

    fn download_content(&self, item: &ItemRef) -> ExplorerResult<DownloadStream> {
        self.open_download(item)
    }
}

/// 根据解析出的 capability 构造文件服务客户端。
pub trait FileServiceConnector: Send + Sync {
    fn connect(
        &self,
        identity: &SessionIdentity,
        capability: ResolvedCapability,
    ) -> Box<dyn FileService>;
}

/// 默认连接器：生成 [`HttpFileClient`]，令牌来自共享的 [`AccessTokenSource`]。
pub struct HttpFileConnector {
    tokens: Arc<dyn AccessTokenSource>,
}

impl HttpFileConnector {
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self { tokens }
    }
}

impl FileServiceConnector for HttpFileConnector {
    fn connect(
        &self,
        identity: &SessionIdentity,
        capability: ResolvedCapability,
    ) -> Box<dyn FileService> {
        Box::new(HttpFileClient::new(
            self.tokens.clone(),
            identity.clone(),
            capability,
        ))
    }
}
