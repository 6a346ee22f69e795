use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const DEFAULT_VISIBLE_PAGES: u64 = 5;

/// One page of a larger result together with the counters a pager needs.
///
/// Page numbers are 1-based. `current_page` and `page_size` are clamped to
/// at least 1; a page past the end simply has no items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedList<T> {
    items: Vec<T>,
    current_page: u64,
    page_size: u64,
    row_count: u64,
}

impl<T> PaginatedList<T> {
    /// Wraps an already sliced page of a result with `row_count` rows.
    #[must_use]
    pub fn new(items: Vec<T>, row_count: u64, current_page: u64, page_size: u64) -> Self {
        Self {
            items,
            current_page: current_page.max(1),
            page_size: page_size.max(1),
            row_count,
        }
    }

    /// Slices page `current_page` out of the full in-memory sequence.
    #[must_use]
    pub fn from_items(all: Vec<T>, current_page: u64, page_size: u64) -> Self {
        let current_page = current_page.max(1);
        let page_size = page_size.max(1);
        let row_count = all.len() as u64;
        let skip = usize::try_from(Self::offset_of(current_page, page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        let items = all.into_iter().skip(skip).take(take).collect();
        Self::new(items, row_count, current_page, page_size)
    }

    #[must_use]
    pub fn empty(current_page: u64, page_size: u64) -> Self {
        Self::new(Vec::new(), 0, current_page, page_size)
    }

    /// Rows to skip before page `current_page`.
    #[must_use]
    pub fn offset_of(current_page: u64, page_size: u64) -> u64 {
        current_page.max(1).saturating_sub(1).saturating_mul(page_size.max(1))
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.row_count.div_ceil(self.page_size)
    }

    #[must_use]
    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.current_page < self.page_count()
    }

    /// 1-based number of the last row shown on this page.
    #[must_use]
    pub fn last_row(&self) -> u64 {
        self.current_page
            .saturating_mul(self.page_size)
            .min(self.row_count)
    }

    /// 1-based number of the first row shown on this page.
    #[must_use]
    pub fn first_row(&self) -> u64 {
        Self::offset_of(self.current_page, self.page_size)
            .saturating_add(1)
            .min(self.last_row())
    }

    #[must_use]
    pub fn window(&self, visible_pages: u64) -> PageWindow {
        PageWindow::new(self.current_page, self.page_count(), visible_pages)
    }

    /// Maps the items, keeping the counters.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedList<U> {
        PaginatedList {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            row_count: self.row_count,
        }
    }

    /// View model for a pager control bound to `view_name`.
    #[must_use]
    pub fn view(&self, view_name: impl Into<String>, visible_pages: u64) -> PaginationView {
        let window = self.window(visible_pages);
        PaginationView {
            current_page: self.current_page,
            page_size: self.page_size,
            row_count: self.row_count,
            page_count: self.page_count(),
            first_row: self.first_row(),
            last_row: self.last_row(),
            has_previous_page: self.has_previous_page(),
            has_next_page: self.has_next_page(),
            visible_pages: window.visible_pages(),
            first_visible_page: window.first(),
            last_visible_page: window.last(),
            view_name: view_name.into(),
            ajax_target: None,
            url_vars: BTreeMap::new(),
        }
    }
}

/// Range of page links to show around the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    first: u64,
    last: u64,
    visible_pages: u64,
}

impl PageWindow {
    #[must_use]
    pub fn new(current_page: u64, page_count: u64, visible_pages: u64) -> Self {
        let visible_pages = visible_pages.max(1);
        // Saturating to 0 is harmless: the result is clamped to 1 anyway.
        let tail_start = page_count.saturating_add(1).saturating_sub(visible_pages);
        let centered = current_page.saturating_sub(visible_pages.div_euclid(2));
        let first = tail_start.min(centered).max(1);
        let last = first.saturating_add(visible_pages - 1).min(page_count);
        Self {
            first,
            last,
            visible_pages,
        }
    }

    #[must_use]
    pub fn first(&self) -> u64 {
        self.first
    }

    /// Less than [`first`](Self::first) when there are no pages.
    #[must_use]
    pub fn last(&self) -> u64 {
        self.last
    }

    #[must_use]
    pub fn visible_pages(&self) -> u64 {
        self.visible_pages
    }

    #[must_use]
    pub fn pages(&self) -> RangeInclusive<u64> {
        self.first..=self.last
    }
}

/// Serializable pager state for templates and client-side scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PaginationView {
    pub current_page: u64,
    pub page_size: u64,
    pub row_count: u64,
    pub page_count: u64,
    pub first_row: u64,
    pub last_row: u64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub visible_pages: u64,
    pub first_visible_page: u64,
    pub last_visible_page: u64,
    pub view_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ajax_target: Option<String>,
    pub url_vars: BTreeMap<String, String>,
}

impl PaginationView {
    #[must_use]
    pub fn with_ajax_target(mut self, target: impl Into<String>) -> Self {
        self.ajax_target = Some(target.into());
        self
    }

    /// Extra query-string values carried by every page link.
    #[must_use]
    pub fn with_url_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_vars.insert(key.into(), value.into());
        self
    }
}
