pub mod explorer;
pub mod listing_page_limit;

pub use explorer::ExplorerSettings;
pub use listing_page_limit::{
    default_listing_page_limit, get_listing_page_limit, set_listing_page_limit,
    stored_listing_page_limit, MAX_LISTING_PAGE_LIMIT, MIN_LISTING_PAGE_LIMIT,
};
