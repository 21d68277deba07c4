use super::models::{ListingItem, ListingPage, PageCursor};
use super::service::FileService;
use crate::error::{ExplorerError, ExplorerResult};
use std::collections::HashSet;

/// 从第一页开始，沿 cursor 逐页拉取的惰性序列；只能消费一次。
///
/// 每次迭代产出一页条目。遇到以下情况时产出 `ListingIncomplete` 并终止：
/// - 已拉取的页数达到 `max_pages` 而远端仍返回 cursor；
/// - 远端返回了此前已经请求过的 cursor（不前进）。
pub struct ListingPages<'a> {
    service: &'a dyn FileService,
    first: Option<ListingPage>,
    next: Option<PageCursor>,
    seen: HashSet<PageCursor>,
    pages_fetched: usize,
    max_pages: usize,
    done: bool,
}

impl<'a> ListingPages<'a> {
    pub fn new(service: &'a dyn FileService, first: ListingPage, max_pages: usize) -> Self {
        Self {
            service,
            first: Some(first),
            next: None,
            seen: HashSet::new(),
            pages_fetched: 0,
            max_pages: max_pages.max(1),
            done: false,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// 终止迭代；`partial` 是本次已拉到但还没产出的条目。
    fn incomplete(&mut self, partial: Vec<ListingItem>) -> ExplorerError {
        self.done = true;
        ExplorerError::ListingIncomplete {
            pages_fetched: self.pages_fetched,
            partial,
        }
    }

    /// 记录本页并决定是否还有下一页。
    fn accept(&mut self, page: ListingPage) -> ExplorerResult<Vec<ListingItem>> {
        self.pages_fetched += 1;
        if let Some(cursor) = page.next.as_ref() {
            if self.seen.contains(cursor) {
                tracing::warn!(
                    pages_fetched = self.pages_fetched,
                    "remote listing returned a cursor that does not advance"
                );
                return Err(self.incomplete(page.items));
            }
        }
        self.next = page.next;
        Ok(page.items)
    }
}

impl Iterator for ListingPages<'_> {
    type Item = ExplorerResult<Vec<ListingItem>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(first) = self.first.take() {
            return Some(self.accept(first));
        }

        let cursor = match self.next.take() {
            Some(cursor) => cursor,
            None => {
                self.done = true;
                return None;
            }
        };

        if self.pages_fetched >= self.max_pages {
            tracing::warn!(
                max_pages = self.max_pages,
                "listing page ceiling reached with more pages pending"
            );
            return Some(Err(self.incomplete(Vec::new())));
        }

        match self.service.next_page(&cursor) {
            Ok(page) => {
                self.seen.insert(cursor);
                Some(self.accept(page))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// 拉完所有分页并按「文件夹在前、名称字典序」排序。
/// 触发分页上限时返回 `ListingIncomplete`，其中携带已经拿到的条目（同样已排序）。
pub fn walk_listing(
    service: &dyn FileService,
    first: ListingPage,
    max_pages: usize,
) -> ExplorerResult<Vec<ListingItem>> {
    let mut items = Vec::new();
    let mut pages = ListingPages::new(service, first, max_pages);

    for page in pages.by_ref() {
        match page {
            Ok(batch) => items.extend(batch),
            Err(ExplorerError::ListingIncomplete {
                pages_fetched,
                partial,
            }) => {
                items.extend(partial);
                sort_listing(&mut items);
                return Err(ExplorerError::ListingIncomplete {
                    pages_fetched,
                    partial: items,
                });
            }
            Err(err) => return Err(err),
        }
    }

    tracing::debug!(
        pages = pages.pages_fetched(),
        items = items.len(),
        "listing walk finished"
    );
    sort_listing(&mut items);
    Ok(items)
}

/// 先按类型（文件夹在前），再按名称区分大小写的字典序；稳定排序。
pub fn sort_listing(items: &mut [ListingItem]) {
    items.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
}
