// src/common/pagination.rs

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

// ---
// Query string da listagem: ?page=&limit=&lowStock=
// ---
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub low_stock: bool,
}

/// Página já normalizada (1-indexada).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        // page=0 é tratado como a primeira página
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    /// skip = (page - 1) * limit
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl From<&PageParams> for PageRequest {
    fn from(params: &PageParams) -> Self {
        Self::new(params.page, params.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_ten() {
        let req = PageRequest::new(None, None);
        assert_eq!(req, PageRequest { page: 1, limit: DEFAULT_PAGE_SIZE });
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(PageRequest::new(Some(2), Some(5)).offset(), 5);
        assert_eq!(PageRequest::new(Some(4), Some(25)).offset(), 75);
    }

    #[test]
    fn zero_values_fall_back_and_limit_is_capped() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(1), Some(5000)).limit, MAX_PAGE_SIZE);
    }
}
