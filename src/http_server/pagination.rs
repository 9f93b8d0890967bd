//! Page/per-page query handling for list endpoints.

use serde::{Deserialize, Serialize};

use crate::rest_api::Params;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 50;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PageQuery {
    /// Page starts at 1; per_page is clamped to 1..=50
    pub fn resolve(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }

    /// Add `limit`/`offset` for the resolved page
    pub fn apply(&self, params: &mut Params) {
        let (page, per_page) = self.resolve();
        params.insert("limit".to_string(), per_page.to_string());
        params.insert("offset".to_string(), ((page - 1) * per_page).to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

impl PageMeta {
    pub fn new(query: &PageQuery, total: u64) -> Self {
        let (page, per_page) = query.resolve();
        Self {
            page,
            per_page,
            total,
            pages: total.div_ceil(per_page),
        }
    }
}
