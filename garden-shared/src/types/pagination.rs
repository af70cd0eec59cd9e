use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u64 = 100;

/// `?page=&per_page=` query parameters, translated to limit/offset for the store.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 10 }

impl PaginationParams {
    /// Saturates at `i64::MAX` so the value always fits a SQL OFFSET.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1)
            .saturating_mul(self.limit())
            .min(i64::MAX as u64)
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: default_page(), per_page: default_per_page() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        Self {
            items,
            total,
            page: params.page.max(1),
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page() {
        let params = PaginationParams { page: 3, per_page: 10 };
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn page_zero_and_oversized_pages_are_clamped() {
        let params = PaginationParams { page: 0, per_page: 500 };
        assert_eq!(params.limit(), MAX_PER_PAGE);
        assert_eq!(params.offset(), 0);

        let params = PaginationParams { page: 2, per_page: 0 };
        assert_eq!(params.limit(), 1);
        assert_eq!(params.offset(), 1);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let params = PaginationParams { page: u64::MAX, per_page: 10 };
        assert_eq!(params.offset(), i64::MAX as u64);
        assert!(i64::try_from(params.offset()).is_ok());
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams { page: 1, per_page: 10 };
        let page: Paginated<u8> = Paginated::new(vec![], 21, &params);
        assert_eq!(page.total_pages, 3);
        let empty: Paginated<u8> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
    }
}
