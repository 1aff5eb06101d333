//! Paginated list responses

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Upper bound for `per_page`
pub const MAX_PER_PAGE: u32 = 100;

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, per_page: u32) -> Self {
        let total_pages = if per_page > 0 {
            total.div_ceil(per_page as u64) as u32
        } else {
            1
        };

        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Query-string pagination parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    /// Normalized `(page, per_page)`: page ≥ 1, per_page in 1..=MAX_PER_PAGE
    pub fn resolve(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }

    /// SQL `(LIMIT, OFFSET)` for the resolved page
    pub fn limit_offset(&self) -> (i64, i64) {
        let (page, per_page) = self.resolve();
        (per_page as i64, ((page - 1) * per_page) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        let resp = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(resp.total_pages, 3);

        let empty: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_page_params_resolve() {
        let params = PageParams {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(params.resolve(), (1, MAX_PER_PAGE));
        assert_eq!(PageParams::default().resolve(), (1, DEFAULT_PER_PAGE));

        let params = PageParams {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(params.limit_offset(), (10, 20));
    }
}
