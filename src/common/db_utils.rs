// src/common/db_utils.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::error::AppError;

// ---
// Helper: violação de unicidade -> 409
// ---
/// Converte um erro do sqlx em `UniqueConstraintViolation` quando for violação de
/// chave única. A mensagem é montada a partir do nome da constraint violada.
pub fn map_unique_violation<F>(e: sqlx::Error, message: F) -> AppError
where
    F: FnOnce(&str) -> String,
{
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            return AppError::UniqueConstraintViolation(message(constraint));
        }
    }
    e.into()
}

// ---
// Paginação
// ---
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l > 0)
            .map(|l| l.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl Pagination {
    pub fn new(params: &PageParams, total_items: i64) -> Self {
        let limit = params.limit();
        Self {
            current_page: params.page(),
            total_pages: (total_items + limit - 1) / limit,
            total_items,
            items_per_page: limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults_and_clamp() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);

        let params = PageParams { page: Some(3), limit: Some(500) };
        assert_eq!(params.limit(), MAX_PAGE_SIZE);
        assert_eq!(params.offset(), 200);

        let params = PageParams { page: Some(0), limit: Some(-5) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_rounds_pages_up() {
        let params = PageParams { page: Some(2), limit: Some(20) };
        let p = Pagination::new(&params, 41);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.current_page, 2);

        let p = Pagination::new(&params, 0);
        assert_eq!(p.total_pages, 0);
    }
}
