//! 单测用的内存文件服务：按 cursor 预置分页结果，并记录每一次调用。

use super::models::{
    DownloadStream, ItemKind, ItemRef, ListingItem, ListingPage, PageCursor, UploadBody,
};
use super::service::FileService;
use crate::error::{ExplorerError, ExplorerResult};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Mutex;

pub(crate) fn file(id: &str, name: &str) -> ListingItem {
    ListingItem::new(id, name, 1, ItemKind::File, "Tester")
}

pub(crate) fn folder(id: &str, name: &str) -> ListingItem {
    ListingItem::new(id, name, 0, ItemKind::Folder, "Tester")
}

pub(crate) fn page(items: Vec<ListingItem>, next: Option<&str>) -> ListingPage {
    ListingPage {
        items,
        next: next.map(PageCursor::new),
    }
}

#[derive(Default)]
pub(crate) struct FakeFileService {
    pub root: Option<ListingPage>,
    pub folders: HashMap<String, ListingPage>,
    pub pages: HashMap<String, ListingPage>,
    pub paths: HashMap<String, ItemRef>,
    pub delete_error: Option<fn() -> ExplorerError>,
    pub lookup_error: Option<fn() -> ExplorerError>,
    pub contents: HashMap<String, Vec<u8>>,
    pub calls: Mutex<Vec<String>>,
    pub uploaded: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeFileService {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

impl FileService for FakeFileService {
    fn list_root(&self) -> ExplorerResult<ListingPage> {
        self.record("list_root".to_string());
        self.root
            .clone()
            .ok_or_else(|| ExplorerError::NotFound("root".to_string()))
    }

    fn list_folder(&self, folder_id: &str) -> ExplorerResult<ListingPage> {
        self.record(format!("list_folder:{folder_id}"));
        self.folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| ExplorerError::NotFound(folder_id.to_string()))
    }

    fn next_page(&self, cursor: &PageCursor) -> ExplorerResult<ListingPage> {
        self.record(format!("next_page:{}", cursor.as_str()));
        self.pages
            .get(cursor.as_str())
            .cloned()
            .ok_or_else(|| ExplorerError::TransientFailure("unknown cursor".to_string()))
    }

    fn get_by_path(&self, path: &str) -> ExplorerResult<ItemRef> {
        self.record(format!("get_by_path:{path}"));
        if let Some(make_error) = self.lookup_error {
            return Err(make_error());
        }
        self.paths
            .get(path)
            .cloned()
            .ok_or_else(|| ExplorerError::NotFound(path.to_string()))
    }

    fn delete_item(&self, item: &ItemRef) -> ExplorerResult<()> {
        self.record(format!("delete:{}", item.id));
        match self.delete_error {
            Some(make_error) => Err(make_error()),
            None => Ok(()),
        }
    }

    fn create_file(&self, name: &str) -> ExplorerResult<ItemRef> {
        self.record(format!("create:{name}"));
        Ok(ItemRef {
            id: format!("new-{name}"),
            name: name.to_string(),
        })
    }

    fn upload_content(&self, item: &ItemRef, body: UploadBody) -> ExplorerResult<()> {
        self.record(format!("upload:{}", item.id));
        let (mut reader, _) = body.into_parts();
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ExplorerError::TransientFailure(e.to_string()))?;
        self.uploaded.lock().unwrap().insert(item.id.clone(), bytes);
        Ok(())
    }

    fn download_content(&self, item: &ItemRef) -> ExplorerResult<DownloadStream> {
        self.record(format!("download:{}", item.id));
        let bytes = self
            .contents
            .get(&item.id)
            .cloned()
            .ok_or_else(|| ExplorerError::NotFound(item.id.clone()))?;
        let name = self
            .paths
            .values()
            .find(|candidate| candidate.id == item.id)
            .map(|candidate| candidate.name.clone())
            .unwrap_or_else(|| item.name.clone());
        Ok(DownloadStream::new(
            name,
            Some(bytes.len() as u64),
            std::io::Cursor::new(bytes),
        ))
    }
}
