use crate::model::Product;
use crate::storage::ProductStorage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{error::Error, sync::Arc};
use tracing::debug;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 12;
const MAX_LIMIT: i64 = 100;
const DEFAULT_SORT_COLUMN: &str = "created_at";

/// Columns callers may sort by; anything else falls back to the default.
const SORT_COLUMNS: &[&str] = &["created_at", "price", "title", "brand", "condition"];

/// Filter, sort and pagination parameters of the catalog endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogParams {
    pub page: i64,
    pub limit: i64,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: String,
    pub sort_order: String,
}

impl Default for CatalogParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            category: None,
            condition: None,
            min_price: None,
            max_price: None,
            search: None,
            sort_by: DEFAULT_SORT_COLUMN.to_string(),
            sort_order: "desc".to_string(),
        }
    }
}

impl CatalogParams {
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// The validated sort column. Unknown names fall back to `created_at`
    /// instead of erroring, matching the endpoint's permissive contract.
    pub fn sort_column(&self) -> &str {
        if SORT_COLUMNS.contains(&self.sort_by.as_str()) {
            &self.sort_by
        } else {
            DEFAULT_SORT_COLUMN
        }
    }

    pub fn sort_ascending(&self) -> bool {
        self.sort_order.eq_ignore_ascii_case("asc")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub pagination: PaginationMeta,
}

/// Translates catalog parameters into a single store query and wraps the
/// result page with pagination metadata.
pub struct CatalogService {
    products: Arc<dyn ProductStorage>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductStorage>) -> Self {
        Self { products }
    }

    pub async fn query(
        &self,
        params: &CatalogParams,
    ) -> Result<CatalogPage, Box<dyn Error + Send + Sync>> {
        let (products, total) = self.products.fetch_page(params).await?;
        debug!(
            total,
            page = params.page(),
            returned = products.len(),
            "catalog page fetched"
        );

        let limit = params.limit();
        Ok(CatalogPage {
            products,
            pagination: PaginationMeta {
                page: params.page(),
                limit,
                total,
                total_pages: (total + limit - 1) / limit,
            },
        })
    }
}
