use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// A marketplace listing for a used PC component.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub model: String,
    pub category: String,
    pub condition: String,
    pub price: Decimal,
    pub image_urls: Vec<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "phone_number")]
    pub phone: String,
}

/// One itemized line submitted to the gateway at order registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLineItem {
    pub name: String,
    pub amount_cents: i64,
    pub quantity: i64,
}

/// Immutable description of one checkout attempt. `order_id` is generated by
/// the caller and is globally unique across attempts.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSessionRequest {
    pub amount: Decimal,
    pub currency: String,
    pub order_id: Uuid,
    #[serde(rename = "billing_data")]
    pub billing: BillingContact,
    pub items: Vec<SessionLineItem>,
}

/// What the caller gets back: an opaque token plus the redirect target. The
/// wire names mirror the storefront's existing contract.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSessionResult {
    pub payment_token: String,
    #[serde(rename = "paymob_order_id")]
    pub gateway_order_id: i64,
    pub iframe_url: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

/// Insert payload for the local order record written after the gateway steps.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub currency: String,
    pub gateway_order_id: i64,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_method: String,
    pub gateway_order_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structured description of the component being evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub category: String,
    pub brand: String,
    pub model: String,
    pub condition: String,
    pub specifications: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub product_info: ProductInfo,
    #[serde(default)]
    pub images: Vec<String>,
    // BTreeMap keeps the Q&A block stable in the rendered prompt.
    #[serde(default)]
    pub questions_answers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedPrice {
    pub min: Decimal,
    pub max: Decimal,
    pub recommended: Decimal,
}

/// The JSON shape the inference API is instructed to respond with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub estimated_price: EstimatedPrice,
    pub confidence_score: f64,
    pub condition_assessment: String,
    pub key_factors: Vec<String>,
    pub market_demand: String,
    pub recommendations: Vec<String>,
    pub summary: String,
}
