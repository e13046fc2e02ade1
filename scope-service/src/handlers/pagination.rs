use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::config::ListConfig;
use crate::services::{Page, ScopeFilter};

/// `?limit=&offset=` on collection routes.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn page(&self, lists: &ListConfig) -> Result<Page, AppError> {
        let limit = self.limit.unwrap_or(lists.default_limit);
        if !(1..=lists.max_limit).contains(&limit) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "limit must be between 1 and {}",
                lists.max_limit
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "offset must not be negative"
            )));
        }
        Ok(Page::new(limit, offset))
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
    /// Scope constraint the collection was read under.
    pub filter: ScopeFilter,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, page: Page, filter: ScopeFilter) -> Self {
        Self {
            items,
            limit: page.limit,
            offset: page.offset,
            filter,
        }
    }
}
