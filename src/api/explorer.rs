use crate::api::auth::{AccessTokenSource, HttpTokenEndpoint, SessionIdentity, SilentTokenProvider};
use crate::api::discovery::{CapabilityResolver, DiscoveryApi, HttpDiscoveryClient};
use crate::api::drive::{
    walk_listing, DownloadStream, FileService, FileServiceConnector, HttpFileConnector, ItemRef,
    ListingItem, UploadBody,
};
use crate::db::Database;
use crate::error::{ExplorerError, ExplorerResult};
use crate::settings::ExplorerSettings;
use crate::token_cache::SqliteTokenCacheStore;
use std::sync::Arc;
use uuid::Uuid;

/// 基于配置构建默认的静默令牌提供者（SQLite token cache + v1 token 端点）。
/// 登录回调需要用它的 `record_sign_in` 写入初始令牌。
pub fn build_token_provider(settings: &ExplorerSettings) -> ExplorerResult<Arc<SilentTokenProvider>> {
    let db = open_database(settings)?;
    Ok(token_provider_for(settings, db))
}

fn open_database(settings: &ExplorerSettings) -> ExplorerResult<Database> {
    let db = settings.database().map_err(ExplorerError::Storage)?;
    db.init().map_err(ExplorerError::Storage)?;
    Ok(db)
}

fn token_provider_for(settings: &ExplorerSettings, db: Database) -> Arc<SilentTokenProvider> {
    Arc::new(SilentTokenProvider::new(
        Arc::new(SqliteTokenCacheStore::new(db)),
        Arc::new(HttpTokenEndpoint::new(settings.clone())),
    ))
}

/// 浏览器核心入口：列表、上传、下载三个对外操作。
/// 自身不持有请求间共享的可变状态，可被多个请求线程并发使用。
pub struct DriveExplorer {
    settings: ExplorerSettings,
    resolver: CapabilityResolver,
    connector: Arc<dyn FileServiceConnector>,
}

impl DriveExplorer {
    /// 打开配置指向的数据库；设置表里保存过的分页上限优先于配置值。
    pub fn new(settings: ExplorerSettings) -> ExplorerResult<Self> {
        let db = open_database(&settings)?;
        let settings = settings.with_persisted_overrides(&db);
        let tokens = token_provider_for(&settings, db);
        Ok(Self::with_token_source(settings, tokens))
    }

    /// 使用调用方提供的令牌来源，discovery 与文件服务走 HTTP 默认实现。
    pub fn with_token_source(settings: ExplorerSettings, tokens: Arc<dyn AccessTokenSource>) -> Self {
        let discovery = Arc::new(HttpDiscoveryClient::new(
            settings.discovery_endpoint_uri.clone(),
        ));
        let connector = Arc::new(HttpFileConnector::new(tokens.clone()));
        Self::from_parts(settings, tokens, discovery, connector)
    }

    pub fn from_parts(
        settings: ExplorerSettings,
        tokens: Arc<dyn AccessTokenSource>,
        discovery: Arc<dyn DiscoveryApi>,
        connector: Arc<dyn FileServiceConnector>,
    ) -> Self {
        let resolver =
            CapabilityResolver::new(tokens, discovery, settings.discovery_resource_id.clone());
        Self {
            settings,
            resolver,
            connector,
        }
    }

    pub fn settings(&self) -> &ExplorerSettings {
        &self.settings
    }

    /// 解析一次 capability 并绑定文件服务；同一请求内的多次操作复用这个会话。
    pub fn open_session(&self, identity: &SessionIdentity) -> ExplorerResult<ExplorerSession> {
        let capability = self.resolver.resolve(identity, &self.settings.capability)?;
        Ok(ExplorerSession {
            service: self.connector.connect(identity, capability),
            max_pages: self.settings.page_limit(),
        })
    }

    /// `folder_id` 为空时列出根目录。
    pub fn list_items(
        &self,
        identity: &SessionIdentity,
        folder_id: Option<&str>,
    ) -> ExplorerResult<Vec<ListingItem>> {
        let span = tracing::info_span!(
            "list_items",
            request_id = %Uuid::new_v4(),
            user_key = %identity.user_key
        );
        let _guard = span.enter();
        self.open_session(identity)?.list_items(folder_id)
    }

    pub fn upload_file(
        &self,
        identity: &SessionIdentity,
        name: &str,
        body: UploadBody,
    ) -> ExplorerResult<ItemRef> {
        let span = tracing::info_span!(
            "upload_file",
            request_id = %Uuid::new_v4(),
            user_key = %identity.user_key
        );
        let _guard = span.enter();
        validate_upload(name, &body)?;
        self.open_session(identity)?.upload_file(name, body)
    }

    pub fn download_file(
        &self,
        identity: &SessionIdentity,
        item_id: &str,
    ) -> ExplorerResult<DownloadStream> {
        let span = tracing::info_span!(
            "download_file",
            request_id = %Uuid::new_v4(),
            user_key = %identity.user_key
        );
        let _guard = span.enter();
        if item_id.trim().is_empty() {
            return Err(ExplorerError::InvalidInput("item id is required".to_string()));
        }
        self.open_session(identity)?.download_file(item_id)
    }
}

/// 绑定到已解析端点的一次浏览会话，只在请求作用域内存活。
pub struct ExplorerSession {
    service: Box<dyn FileService>,
    max_pages: usize,
}

impl ExplorerSession {
    pub fn service(&self) -> &dyn FileService {
        self.service.as_ref()
    }

    /// 拉取全部分页并排序。
    pub fn list_items(&self, folder_id: Option<&str>) -> ExplorerResult<Vec<ListingItem>> {
        let first = match folder_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.service.list_folder(id)?,
            None => self.service.list_root()?,
        };
        walk_listing(self.service.as_ref(), first, self.max_pages)
    }

    /// 同名文件先删除再创建，随后流式上传内容。
    pub fn upload_file(&self, name: &str, body: UploadBody) -> ExplorerResult<ItemRef> {
        validate_upload(name, &body)?;
        let name = name.trim();

        remove_existing(self.service.as_ref(), name)?;
        let item = self.service.create_file(name)?;
        self.service.upload_content(&item, body)?;
        tracing::info!(item_id = %item.id, "uploaded file");
        Ok(item)
    }

    pub fn download_file(&self, item_id: &str) -> ExplorerResult<DownloadStream> {
        let item = ItemRef {
            id: item_id.trim().to_string(),
            name: String::new(),
        };
        self.service.download_content(&item)
    }
}

fn validate_upload(name: &str, body: &UploadBody) -> ExplorerResult<()> {
    if name.trim().is_empty() {
        return Err(ExplorerError::InvalidInput("file name cannot be empty".to_string()));
    }
    if body.length() == Some(0) {
        return Err(ExplorerError::InvalidInput("upload body is empty".to_string()));
    }
    Ok(())
}

/// 上传前删除同名文件。这里是唯一吞掉错误的地方，且只吞 `NotFound`：
/// 查找不到或删除时已不存在都继续上传；其他错误（含瞬时故障）照常上抛。
fn remove_existing(service: &dyn FileService, name: &str) -> ExplorerResult<()> {
    let existing = match service.get_by_path(name) {
        Ok(item) => item,
        Err(ExplorerError::NotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };

    match service.delete_item(&existing) {
        Ok(()) => {
            tracing::debug!(item_id = %existing.id, "deleted existing file before upload");
            Ok(())
        }
        Err(ExplorerError::NotFound(_)) => {
            tracing::debug!(item_id = %existing.id, "existing file already gone before upload");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::discovery::fakes::{my_files, RecordingTokens, StaticDiscovery};
    use crate::api::discovery::ResolvedCapability;
    use crate::api::drive::testing::{file, folder, page, FakeFileService};
    use crate::api::drive::ItemKind;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeConnector {
        service: Arc<FakeFileService>,
        connects: AtomicUsize,
        capabilities: Mutex<Vec<ResolvedCapability>>,
    }

    impl FakeConnector {
        fn new(service: FakeFileService) -> Arc<Self> {
            Arc::new(Self {
                service: Arc::new(service),
                connects: AtomicUsize::new(0),
                capabilities: Mutex::new(Vec::new()),
            })
        }
    }

    impl FileServiceConnector for FakeConnector {
        fn connect(
            &self,
            _identity: &SessionIdentity,
            capability: ResolvedCapability,
        ) -> Box<dyn FileService> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.capabilities.lock().unwrap().push(capability);
            Box::new(self.service.clone())
        }
    }

    fn identity() -> SessionIdentity {
        SessionIdentity::new("alice@contoso.com", "oid-alice", "tenant-1").unwrap()
    }

    fn explorer_with(
        service: FakeFileService,
        services: Vec<crate::api::discovery::DiscoveredService>,
    ) -> (DriveExplorer, Arc<FakeConnector>) {
        let connector = FakeConnector::new(service);
        let explorer = DriveExplorer::from_parts(
            ExplorerSettings::default(),
            RecordingTokens::new(),
            StaticDiscovery::with(services),
            connector.clone(),
        );
        (explorer, connector)
    }

    fn body(bytes: &'static [u8]) -> UploadBody {
        UploadBody::new(bytes, Some(bytes.len() as u64))
    }

    #[test]
    fn lists_root_across_pages_sorted() {
        let mut service = FakeFileService::default();
        service.root = Some(page(vec![file("1", "b.txt"), folder("2", "A")], Some("c1")));
        service
            .pages
            .insert("c1".to_string(), page(vec![file("3", "a.txt")], None));
        let (explorer, connector) = explorer_with(service, vec![my_files()]);

        let items = explorer.list_items(&identity(), None).unwrap();
        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["A", "a.txt", "b.txt"]);
        assert_eq!(items[0].kind, ItemKind::Folder);
        assert_eq!(
            connector.capabilities.lock().unwrap()[0].service_resource_id,
            "https://contoso-my.sharepoint.com/"
        );
    }

    #[test]
    fn empty_folder_id_lists_root_and_folder_id_lists_children() {
        let mut service = FakeFileService::default();
        service.root = Some(page(vec![], None));
        service
            .folders
            .insert("folderA".to_string(), page(vec![file("9", "x.doc")], None));
        let (explorer, connector) = explorer_with(service, vec![my_files()]);

        assert!(explorer.list_items(&identity(), Some("  ")).unwrap().is_empty());
        assert_eq!(explorer.list_items(&identity(), Some("folderA")).unwrap().len(), 1);
        assert_eq!(
            connector.service.calls(),
            vec!["list_root".to_string(), "list_folder:folderA".to_string()]
        );
    }

    #[test]
    fn unavailable_capability_never_touches_file_service() {
        let mut mail = my_files();
        mail.capability = "Mail".to_string();
        let (explorer, connector) = explorer_with(FakeFileService::default(), vec![mail]);

        let err = explorer.list_items(&identity(), None).unwrap_err();
        assert!(matches!(err, ExplorerError::CapabilityUnavailable(_)));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert!(connector.service.calls().is_empty());
    }

    #[test]
    fn upload_over_existing_file_deletes_exactly_once_before_create() {
        let mut service = FakeFileService::default();
        service.paths.insert(
            "notes.txt".to_string(),
            ItemRef {
                id: "old-1".to_string(),
                name: "notes.txt".to_string(),
            },
        );
        let (explorer, connector) = explorer_with(service, vec![my_files()]);

        let item = explorer
            .upload_file(&identity(), "notes.txt", body(b"hello"))
            .unwrap();
        assert_eq!(item.id, "new-notes.txt");
        assert_eq!(
            connector.service.calls(),
            vec![
                "get_by_path:notes.txt".to_string(),
                "delete:old-1".to_string(),
                "create:notes.txt".to_string(),
                "upload:new-notes.txt".to_string(),
            ]
        );
        assert_eq!(
            connector.service.uploaded.lock().unwrap()["new-notes.txt"],
            b"hello".to_vec()
        );
    }

    #[test]
    fn delete_not_found_does_not_block_upload() {
        let mut service = FakeFileService::default();
        service.paths.insert(
            "notes.txt".to_string(),
            ItemRef {
                id: "old-1".to_string(),
                name: "notes.txt".to_string(),
            },
        );
        service.delete_error = Some(|| ExplorerError::NotFound("old-1".to_string()));
        let (explorer, connector) = explorer_with(service, vec![my_files()]);

        explorer
            .upload_file(&identity(), "notes.txt", body(b"hello"))
            .unwrap();
        assert_eq!(connector.service.count("delete"), 1);
        assert_eq!(connector.service.count("create"), 1);
        assert_eq!(connector.service.count("upload"), 1);
    }

    #[test]
    fn new_file_skips_delete() {
        let (explorer, connector) = explorer_with(FakeFileService::default(), vec![my_files()]);

        explorer
            .upload_file(&identity(), "fresh.txt", body(b"data"))
            .unwrap();
        assert_eq!(connector.service.count("delete"), 0);
        assert_eq!(connector.service.count("create"), 1);
    }

    #[test]
    fn transient_failure_during_pre_delete_is_surfaced() {
        let mut service = FakeFileService::default();
        service.paths.insert(
            "notes.txt".to_string(),
            ItemRef {
                id: "old-1".to_string(),
                name: "notes.txt".to_string(),
            },
        );
        service.delete_error = Some(|| ExplorerError::TransientFailure("HTTP 503".to_string()));
        let (explorer, connector) = explorer_with(service, vec![my_files()]);

        let err = explorer
            .upload_file(&identity(), "notes.txt", body(b"hello"))
            .unwrap_err();
        assert!(matches!(err, ExplorerError::TransientFailure(_)));
        assert_eq!(connector.service.count("create"), 0);
    }

    #[test]
    fn authorization_failure_during_lookup_is_surfaced() {
        let mut service = FakeFileService::default();
        service.lookup_error = Some(|| ExplorerError::AuthorizationRequired("expired".to_string()));
        let (explorer, connector) = explorer_with(service, vec![my_files()]);

        let err = explorer
            .upload_file(&identity(), "notes.txt", body(b"hello"))
            .unwrap_err();
        assert!(matches!(err, ExplorerError::AuthorizationRequired(_)));
        assert_eq!(connector.service.count("create"), 0);
    }

    #[test]
    fn empty_uploads_are_rejected_before_discovery() {
        let (explorer, connector) = explorer_with(FakeFileService::default(), vec![my_files()]);

        let err = explorer
            .upload_file(&identity(), "empty.txt", body(b""))
            .unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidInput(_)));
        let err = explorer
            .upload_file(&identity(), "  ", body(b"x"))
            .unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidInput(_)));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn download_returns_name_and_stream() {
        let mut service = FakeFileService::default();
        service.paths.insert(
            "report.pdf".to_string(),
            ItemRef {
                id: "f-1".to_string(),
                name: "report.pdf".to_string(),
            },
        );
        service
            .contents
            .insert("f-1".to_string(), b"%PDF-1.7".to_vec());
        let (explorer, _connector) = explorer_with(service, vec![my_files()]);

        let mut stream = explorer.download_file(&identity(), "f-1").unwrap();
        assert_eq!(stream.name, "report.pdf");
        assert_eq!(stream.size_bytes, Some(8));
        let mut content = Vec::new();
        stream.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"%PDF-1.7".to_vec());
    }

    #[test]
    fn download_of_unknown_item_is_not_found() {
        let (explorer, _connector) = explorer_with(FakeFileService::default(), vec![my_files()]);
        let err = explorer.download_file(&identity(), "missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn session_resolves_capability_once_for_several_calls() {
        let mut service = FakeFileService::default();
        service.root = Some(page(vec![file("1", "a.txt")], None));
        let tokens = RecordingTokens::new();
        let connector = FakeConnector::new(service);
        let explorer = DriveExplorer::from_parts(
            ExplorerSettings::default(),
            tokens.clone(),
            StaticDiscovery::with(vec![my_files()]),
            connector.clone(),
        );

        let session = explorer.open_session(&identity()).unwrap();
        session.list_items(None).unwrap();
        session.upload_file("b.txt", body(b"b")).unwrap();

        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.resources.lock().unwrap().len(), 1);
    }

    #[test]
    fn default_construction_applies_persisted_page_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explorer.db");
        crate::settings::set_listing_page_limit(&Database::at(&path), 7).unwrap();

        let explorer = DriveExplorer::new(ExplorerSettings {
            database_path: Some(path),
            max_listing_pages: 500,
            ..ExplorerSettings::default()
        })
        .unwrap();
        assert_eq!(explorer.settings().max_listing_pages, 7);
    }

    #[test]
    fn default_construction_keeps_configured_limit_without_stored_value() {
        let dir = tempfile::tempdir().unwrap();
        let explorer = DriveExplorer::new(ExplorerSettings {
            database_path: Some(dir.path().join("explorer.db")),
            max_listing_pages: 500,
            ..ExplorerSettings::default()
        })
        .unwrap();
        assert_eq!(explorer.settings().max_listing_pages, 500);
    }
}
