pub mod auth;
pub mod discovery;
pub mod drive;
pub mod explorer;
pub mod response;
