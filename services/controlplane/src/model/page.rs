//! Paging helpers for list and search queries.
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

/// One-based page selector.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page_number: usize,
    pub page_size: usize,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Clamp out-of-range values instead of rejecting them.
    pub fn normalized(self) -> Self {
        Self {
            page_number: self.page_number.max(1),
            page_size: match self.page_size {
                0 => DEFAULT_PAGE_SIZE,
                size => size.min(MAX_PAGE_SIZE),
            },
        }
    }

    pub fn paginate<T>(self, items: Vec<T>) -> PageResult<T> {
        let query = self.normalized();
        let total = items.len();
        let offset = (query.page_number - 1).saturating_mul(query.page_size);
        let items = items
            .into_iter()
            .skip(offset)
            .take(query.page_size)
            .collect();
        PageResult { total, items }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    pub total: usize,
    pub items: Vec<T>,
}
