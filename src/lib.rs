//! Office 365 文件浏览核心：静默令牌获取、capability 发现、文件列表/上传/下载。

pub mod api;
pub mod db;
pub mod error;
pub mod settings;
pub mod token_cache;

pub use api::auth::{SessionIdentity, SilentTokenProvider};
pub use api::drive::{DownloadStream, ItemKind, ListingItem, UploadBody};
pub use api::explorer::{build_token_provider, DriveExplorer, ExplorerSession};
pub use api::response::{ListResponse, OperationResponse};
pub use error::{ExplorerError, ExplorerResult};
pub use settings::ExplorerSettings;
