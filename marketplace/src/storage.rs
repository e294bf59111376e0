use crate::catalog::CatalogParams;
use crate::model::{EvaluationRequest, EvaluationResult, NewOrder, OrderRecord, OrderStatus, Product};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::error::Error;
use std::str::FromStr;
use uuid::Uuid;

/// Read access to the product catalog.
#[async_trait]
pub trait ProductStorage: Send + Sync {
    /// Fetch one page of available products matching the query, plus the
    /// total number of matching rows for pagination metadata.
    async fn fetch_page(
        &self,
        query: &CatalogParams,
    ) -> Result<(Vec<Product>, i64), Box<dyn Error + Send + Sync>>;
}

/// Order records written at session creation and advanced by the
/// confirmation webhook.
#[async_trait]
pub trait OrderStorage: Send + Sync {
    async fn insert_pending(&self, order: &NewOrder) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: i64,
    ) -> Result<Option<OrderRecord>, Box<dyn Error + Send + Sync>>;

    async fn set_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Evaluation records: inserted as `processing`, completed with the parsed
/// inference response.
#[async_trait]
pub trait EvaluationStorage: Send + Sync {
    async fn insert_processing(
        &self,
        user_id: Uuid,
        request: &EvaluationRequest,
    ) -> Result<Uuid, Box<dyn Error + Send + Sync>>;

    async fn mark_completed(
        &self,
        evaluation_id: Uuid,
        result: &EvaluationResult,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Postgres-backed implementation of all three storage traits.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn connect(database_url: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "id, seller_id, title, description, brand, model, category, \
     condition, price, image_urls, is_available, created_at";

fn push_product_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a CatalogParams) {
    if let Some(category) = &query.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(condition) = &query.condition {
        builder.push(" AND condition = ").push_bind(condition);
    }
    if let Some(min_price) = &query.min_price {
        builder.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = &query.max_price {
        builder.push(" AND price <= ").push_bind(max_price);
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        builder.push(" AND (title ILIKE ").push_bind(pattern.clone());
        builder.push(" OR description ILIKE ").push_bind(pattern.clone());
        builder.push(" OR brand ILIKE ").push_bind(pattern.clone());
        builder.push(" OR model ILIKE ").push_bind(pattern);
        builder.push(")");
    }
}

#[async_trait]
impl ProductStorage for PgStorage {
    async fn fetch_page(
        &self,
        query: &CatalogParams,
    ) -> Result<(Vec<Product>, i64), Box<dyn Error + Send + Sync>> {
        let mut count_builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM products WHERE is_available = TRUE",
        );
        push_product_filters(&mut count_builder, query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_available = TRUE"
        ));
        push_product_filters(&mut builder, query);

        // The sort column comes from an allow-list, never raw caller input.
        builder.push(" ORDER BY ");
        builder.push(query.sort_column());
        builder.push(if query.sort_ascending() { " ASC" } else { " DESC" });
        builder.push(" LIMIT ").push_bind(query.limit());
        builder.push(" OFFSET ").push_bind(query.offset());

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok((products, total))
    }
}

fn row_to_order(row: &PgRow) -> Result<OrderRecord, Box<dyn Error + Send + Sync>> {
    let status_text: String = row.try_get("status")?;
    let status = OrderStatus::from_str(&status_text)
        .map_err(|_| format!("unknown order status in store: {status_text}"))?;

    Ok(OrderRecord {
        order_id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        total_amount: row.try_get("total_amount")?,
        currency: row.try_get("currency")?,
        status,
        payment_method: row.try_get("payment_method")?,
        gateway_order_id: row.try_get("gateway_order_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl OrderStorage for PgStorage {
    async fn insert_pending(&self, order: &NewOrder) -> Result<(), Box<dyn Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO orders \
                 (id, user_id, total_amount, currency, status, payment_method, \
                  gateway_order_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())",
        )
        .bind(order.order_id)
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(&order.currency)
        .bind(OrderStatus::Pending.to_string())
        .bind(&order.payment_method)
        .bind(order.gateway_order_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: i64,
    ) -> Result<Option<OrderRecord>, Box<dyn Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT id, user_id, total_amount, currency, status, payment_method, \
                    gateway_order_id, created_at, updated_at \
             FROM orders WHERE gateway_order_id = $1",
        )
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn set_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(order_id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl EvaluationStorage for PgStorage {
    async fn insert_processing(
        &self,
        user_id: Uuid,
        request: &EvaluationRequest,
    ) -> Result<Uuid, Box<dyn Error + Send + Sync>> {
        let evaluation_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO ai_evaluations \
                 (id, user_id, product_info, images, questions_answers, status, \
                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 'processing', now(), now())",
        )
        .bind(evaluation_id)
        .bind(user_id)
        .bind(serde_json::to_value(&request.product_info)?)
        .bind(&request.images)
        .bind(serde_json::to_value(&request.questions_answers)?)
        .execute(&self.pool)
        .await?;

        Ok(evaluation_id)
    }

    async fn mark_completed(
        &self,
        evaluation_id: Uuid,
        result: &EvaluationResult,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        sqlx::query(
            "UPDATE ai_evaluations \
             SET ai_response = $2, estimated_price = $3, confidence_score = $4, \
                 status = 'completed', updated_at = now() \
             WHERE id = $1",
        )
        .bind(evaluation_id)
        .bind(serde_json::to_value(result)?)
        .bind(result.estimated_price.recommended)
        .bind(result.confidence_score)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
