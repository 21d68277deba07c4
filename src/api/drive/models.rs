use serde::Serialize;
use std::fmt;
use std::io::{self, Read};

/// 条目类型。排序时文件夹排在文件前面，因此声明顺序即排序顺序。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ItemKind {
    Folder,
    File,
}

impl ItemKind {
    /// 远端的 `type` 字段只区分 "Folder" / "File"，未知值按文件处理。
    pub fn from_remote(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.eq_ignore_ascii_case("folder") => ItemKind::Folder,
            _ => ItemKind::File,
        }
    }
}

/// 归一化后的列表条目，与前端共享的字段保持精简。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub kind: ItemKind,
    /// 仅文件有扩展名；文件夹恒为空串。
    pub extension: String,
    pub creator_display_name: String,
}

impl ListingItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        size_bytes: u64,
        kind: ItemKind,
        creator_display_name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let extension = match kind {
            ItemKind::File => derive_extension(&name),
            ItemKind::Folder => String::new(),
        };
        Self {
            id: id.into(),
            name,
            size_bytes,
            kind,
            extension,
            creator_display_name: creator_display_name.into(),
        }
    }
}

/// 取最后一个 '.' 之后的部分作为扩展名；没有 '.' 时返回空串。
/// `report.v2.pdf` → `pdf`，`archive` → ``，`.bashrc` → `bashrc`。
pub fn derive_extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}

/// 远端条目的引用，后续的删除/上传/下载都以它为参数。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
    pub name: String,
}

/// 不透明的续页标记，只能原样回传给远端，不解析也不拼接。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

// 续页链接里可能带有 skiptoken 等敏感参数，日志里只显示长度。
impl fmt::Debug for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageCursor(<{} bytes>)", self.0.len())
    }
}

/// 一页列表结果；`next` 为空表示最后一页。
#[derive(Clone, Debug, Default)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    pub next: Option<PageCursor>,
}

/// 上传内容：以流的形式转发，已知长度时带上 Content-Length。
pub struct UploadBody {
    reader: Box<dyn Read + Send>,
    length: Option<u64>,
}

impl UploadBody {
    pub fn new(reader: impl Read + Send + 'static, length: Option<u64>) -> Self {
        Self {
            reader: Box::new(reader),
            length,
        }
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub(crate) fn into_parts(self) -> (Box<dyn Read + Send>, Option<u64>) {
        (self.reader, self.length)
    }
}

/// 下载结果：文件名 + 远端报告的大小 + 尚未读取的内容流。
/// 流被 drop 时底层连接随之释放。
pub struct DownloadStream {
    pub name: String,
    pub size_bytes: Option<u64>,
    reader: Box<dyn Read + Send>,
}

impl DownloadStream {
    pub fn new(
        name: impl Into<String>,
        size_bytes: Option<u64>,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            reader: Box::new(reader),
        }
    }
}

impl Read for DownloadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for DownloadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadStream")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_uses_last_dot() {
        assert_eq!(derive_extension("report.v2.pdf"), "pdf");
        assert_eq!(derive_extension("notes.txt"), "txt");
        assert_eq!(derive_extension(".bashrc"), "bashrc");
        assert_eq!(derive_extension("trailing."), "");
    }

    #[test]
    fn name_without_dot_has_empty_extension() {
        let item = ListingItem::new("1", "archive", 10, ItemKind::File, "Alice");
        assert_eq!(item.extension, "");
    }

    #[test]
    fn folders_never_get_an_extension() {
        let item = ListingItem::new("1", "photos.2024", 0, ItemKind::Folder, "Alice");
        assert_eq!(item.extension, "");
    }

    #[test]
    fn remote_kind_parsing() {
        assert_eq!(ItemKind::from_remote(Some("Folder")), ItemKind::Folder);
        assert_eq!(ItemKind::from_remote(Some("folder")), ItemKind::Folder);
        assert_eq!(ItemKind::from_remote(Some("File")), ItemKind::File);
        assert_eq!(ItemKind::from_remote(None), ItemKind::File);
    }

    #[test]
    fn folder_orders_before_file() {
        assert!(ItemKind::Folder < ItemKind::File);
    }

    #[test]
    fn listing_item_serializes_for_frontend() {
        let item = ListingItem::new("id-1", "a.txt", 5, ItemKind::File, "Alice");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "File");
        assert_eq!(json["sizeBytes"], 5);
        assert_eq!(json["creatorDisplayName"], "Alice");
    }

    #[test]
    fn cursor_debug_hides_contents() {
        let cursor = PageCursor::new("https://x/files?$skiptoken=secret");
        assert!(!format!("{cursor:?}").contains("secret"));
    }

    #[test]
    fn download_stream_reads_through() {
        let mut stream = DownloadStream::new("a.txt", Some(3), &b"abc"[..]);
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }
}
