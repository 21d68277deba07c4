mod cache;
mod store;

pub use cache::{CachedToken, TokenCache};
pub use store::{MemoryTokenCacheStore, SqliteTokenCacheStore, TokenCacheEntry, TokenCacheStore};
