//! Page bounds derived from the total hit count and the page size.

use crate::query::PageSize;
use serde::Serialize;

/// What the pagination bar shows for the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: u32,
    pub total_pages: u64,
    /// Row range as displayed, `size * (page - 1)` to `size * page`
    pub first_row: u64,
    pub last_row: u64,
    pub total: u64,
}

impl PageWindow {
    pub fn new(total: u64, page: u32, page_size: PageSize) -> Self {
        let size = u64::from(page_size.get());
        let page_u64 = u64::from(page.max(1));
        Self {
            page,
            total_pages: total.div_ceil(size),
            first_row: size * (page_u64 - 1),
            last_row: size * page_u64,
            total,
        }
    }

    /// Whether the page lies past the last page of a known, non-empty result set
    pub fn is_past_end(&self) -> bool {
        self.total > 0 && self.first_row >= self.total
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Range text as rendered, e.g. `20–40`
    pub fn range_label(&self) -> String {
        format!("{}–{}", self.first_row, self.last_row)
    }
}
