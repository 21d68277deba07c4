use crate::db::{self, Database};

const PAGE_LIMIT_KEY: &str = "listing_max_pages";
pub const MIN_LISTING_PAGE_LIMIT: usize = 1;
pub const MAX_LISTING_PAGE_LIMIT: usize = 10_000;
const DEFAULT_LISTING_PAGE_LIMIT: usize = 1_000;

/// 从设置表读取分页上限；缺失时返回默认值，错误时透传。
pub fn get_listing_page_limit(db: &Database) -> Result<usize, String> {
    Ok(stored_listing_page_limit(db)?.unwrap_or(DEFAULT_LISTING_PAGE_LIMIT))
}

/// 仅返回显式保存过的值。
pub fn stored_listing_page_limit(db: &Database) -> Result<Option<usize>, String> {
    db::get_setting(db, PAGE_LIMIT_KEY)?
        .map(|value| parse_and_clamp(&value))
        .transpose()
}

/// 写入并校验分页上限，限定在 [MIN, MAX] 区间。
pub fn set_listing_page_limit(db: &Database, value: usize) -> Result<usize, String> {
    if !(MIN_LISTING_PAGE_LIMIT..=MAX_LISTING_PAGE_LIMIT).contains(&value) {
        return Err(format!(
            "listing page limit must be between {} and {}",
            MIN_LISTING_PAGE_LIMIT, MAX_LISTING_PAGE_LIMIT
        ));
    }
    db::set_setting(db, PAGE_LIMIT_KEY, &value.to_string())?;
    Ok(value)
}

pub fn default_listing_page_limit() -> usize {
    DEFAULT_LISTING_PAGE_LIMIT
}

fn parse_and_clamp(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid listing page limit value: {e}"))?;
    Ok(parsed.clamp(MIN_LISTING_PAGE_LIMIT, MAX_LISTING_PAGE_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::at(dir.path().join("explorer.db"));
        (dir, db)
    }

    #[test]
    fn missing_value_falls_back_to_default() {
        let (_dir, db) = temp_db();
        assert_eq!(get_listing_page_limit(&db).unwrap(), default_listing_page_limit());
    }

    #[test]
    fn stored_value_round_trips() {
        let (_dir, db) = temp_db();
        set_listing_page_limit(&db, 25).unwrap();
        assert_eq!(get_listing_page_limit(&db).unwrap(), 25);
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let (_dir, db) = temp_db();
        assert!(set_listing_page_limit(&db, 0).is_err());
        assert!(set_listing_page_limit(&db, MAX_LISTING_PAGE_LIMIT + 1).is_err());
    }

    #[test]
    fn hand_edited_value_is_clamped_on_read() {
        let (_dir, db) = temp_db();
        db::set_setting(&db, PAGE_LIMIT_KEY, "999999").unwrap();
        assert_eq!(get_listing_page_limit(&db).unwrap(), MAX_LISTING_PAGE_LIMIT);
    }
}
