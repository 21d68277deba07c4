pub(crate) mod client;
mod delete;
mod download;
mod info;
mod list;
pub mod models;
mod service;
#[cfg(test)]
pub(crate) mod testing;
mod upload;
mod walker;

pub use client::HttpFileClient;
pub use models::{
    derive_extension, DownloadStream, ItemKind, ItemRef, ListingItem, ListingPage, PageCursor,
    UploadBody,
};
pub use service::{FileService, FileServiceConnector, HttpFileConnector};
pub use walker::{sort_listing, walk_listing, ListingPages};
