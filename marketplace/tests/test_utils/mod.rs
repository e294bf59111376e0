#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use marketplace::auth::{AuthVerifier, AuthenticatedUser};
use marketplace::catalog::CatalogParams;
use marketplace::inference::InferenceClient;
use marketplace::model::{
    BillingContact, EvaluationRequest, EvaluationResult, NewOrder, OrderRecord, OrderStatus,
    PaymentSessionRequest, Product, SessionLineItem,
};
use marketplace::payment::{GatewayOrderId, PaymentGateway};
use marketplace::storage::{EvaluationStorage, OrderStorage, ProductStorage};
use rust_decimal::Decimal;
use std::error::Error;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub const TEST_IFRAME_BASE: &str = "https://gateway.test/acceptance/iframes/851598";

/// Gateway double that counts every protocol step and records the amounts
/// submitted at order registration.
pub struct RecordingGateway {
    pub auth_calls: AtomicUsize,
    pub order_calls: AtomicUsize,
    pub key_calls: AtomicUsize,
    pub fail_auth: bool,
    pub fail_order: bool,
    pub fail_key: bool,
    pub registered_amounts: Mutex<Vec<i64>>,
    pub next_gateway_order_id: AtomicI64,
    pub payment_token: String,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            auth_calls: AtomicUsize::new(0),
            order_calls: AtomicUsize::new(0),
            key_calls: AtomicUsize::new(0),
            fail_auth: false,
            fail_order: false,
            fail_key: false,
            registered_amounts: Mutex::new(Vec::new()),
            next_gateway_order_id: AtomicI64::new(9000),
            payment_token: "tok-test".to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn authenticate(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth {
            return Err("gateway auth unavailable".into());
        }
        Ok("gw-auth-token".to_string())
    }

    async fn register_order(
        &self,
        _auth_token: &str,
        amount_cents: i64,
        _currency: &str,
        _items: &[SessionLineItem],
    ) -> Result<GatewayOrderId, Box<dyn Error + Send + Sync>> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_order {
            return Err("gateway order registration refused".into());
        }
        self.registered_amounts.lock().unwrap().push(amount_cents);
        Ok(self.next_gateway_order_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request_payment_key(
        &self,
        _auth_token: &str,
        _amount_cents: i64,
        _currency: &str,
        _gateway_order_id: GatewayOrderId,
        _billing: &BillingContact,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_key {
            return Err("gateway payment key refused".into());
        }
        Ok(self.payment_token.clone())
    }

    fn iframe_url(&self, payment_token: &str) -> String {
        format!("{TEST_IFRAME_BASE}?payment_token={payment_token}")
    }
}

/// Order store double. Enforces `order_id` uniqueness like the real store's
/// constraint, and can be told to fail every insert.
#[derive(Default)]
pub struct MockOrderStorage {
    pub fail_insert: bool,
    pub inserted: Mutex<Vec<NewOrder>>,
    pub records: Mutex<Vec<OrderRecord>>,
    pub status_updates: Mutex<Vec<(Uuid, OrderStatus)>>,
}

#[async_trait]
impl OrderStorage for MockOrderStorage {
    async fn insert_pending(&self, order: &NewOrder) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.fail_insert {
            return Err("store unavailable".into());
        }
        let mut inserted = self.inserted.lock().unwrap();
        if inserted.iter().any(|o| o.order_id == order.order_id) {
            return Err("duplicate key value violates unique constraint \"orders_pkey\"".into());
        }
        inserted.push(order.clone());
        Ok(())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: i64,
    ) -> Result<Option<OrderRecord>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn set_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.status_updates.lock().unwrap().push((order_id, status));
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.order_id == order_id) {
            record.status = status;
        }
        Ok(())
    }
}

/// Product store double returning a canned page and remembering the params
/// it was queried with.
#[derive(Default)]
pub struct MockProductStorage {
    pub products: Vec<Product>,
    pub total: i64,
    pub fail: bool,
    pub seen_params: Mutex<Vec<CatalogParams>>,
}

#[async_trait]
impl ProductStorage for MockProductStorage {
    async fn fetch_page(
        &self,
        query: &CatalogParams,
    ) -> Result<(Vec<Product>, i64), Box<dyn Error + Send + Sync>> {
        if self.fail {
            return Err("product store unavailable".into());
        }
        self.seen_params.lock().unwrap().push(query.clone());
        Ok((self.products.clone(), self.total))
    }
}

#[derive(Default)]
pub struct MockEvaluationStorage {
    pub fail_insert: bool,
    pub fail_complete: bool,
    pub inserted_for: Mutex<Vec<Uuid>>,
    pub completed: Mutex<Vec<(Uuid, EvaluationResult)>>,
}

#[async_trait]
impl EvaluationStorage for MockEvaluationStorage {
    async fn insert_processing(
        &self,
        user_id: Uuid,
        _request: &EvaluationRequest,
    ) -> Result<Uuid, Box<dyn Error + Send + Sync>> {
        if self.fail_insert {
            return Err("evaluation store unavailable".into());
        }
        self.inserted_for.lock().unwrap().push(user_id);
        Ok(Uuid::new_v4())
    }

    async fn mark_completed(
        &self,
        evaluation_id: Uuid,
        result: &EvaluationResult,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.fail_complete {
            return Err("evaluation store unavailable".into());
        }
        self.completed
            .lock()
            .unwrap()
            .push((evaluation_id, result.clone()));
        Ok(())
    }
}

/// Inference double returning a fixed content string.
pub struct MockInferenceClient {
    pub content: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockInferenceClient {
    pub fn returning(content: &str) -> Self {
        Self {
            content: content.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err("inference API unavailable".into());
        }
        Ok(self.content.clone())
    }
}

/// Verifier double: any bearer token resolves to the configured identity.
pub struct StaticAuthVerifier {
    pub identity: Option<AuthenticatedUser>,
}

#[async_trait]
impl AuthVerifier for StaticAuthVerifier {
    async fn verify(
        &self,
        _bearer_token: &str,
    ) -> Result<Option<AuthenticatedUser>, Box<dyn Error + Send + Sync>> {
        Ok(self.identity.clone())
    }
}

pub fn test_user() -> AuthenticatedUser {
    AuthenticatedUser {
        id: Uuid::new_v4(),
        email: Some("buyer@example.com".to_string()),
    }
}

pub fn session_request(amount: Decimal) -> PaymentSessionRequest {
    PaymentSessionRequest {
        amount,
        currency: "EGP".to_string(),
        order_id: Uuid::new_v4(),
        billing: BillingContact {
            first_name: "Dina".to_string(),
            last_name: "Hassan".to_string(),
            email: "dina@example.com".to_string(),
            phone: "+201000000000".to_string(),
        },
        items: vec![SessionLineItem {
            name: "RTX 3070".to_string(),
            amount_cents: 1250,
            quantity: 1,
        }],
    }
}

pub fn sample_product(title: &str, price: Decimal) -> Product {
    Product {
        id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        title: title.to_string(),
        description: "lightly used".to_string(),
        brand: "NVIDIA".to_string(),
        model: "RTX 3070".to_string(),
        category: "gpu".to_string(),
        condition: "used".to_string(),
        price,
        image_urls: vec![],
        is_available: true,
        created_at: Utc::now(),
    }
}

pub fn pending_order(gateway_order_id: i64) -> OrderRecord {
    OrderRecord {
        order_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        total_amount: Decimal::new(12_50, 2),
        currency: "EGP".to_string(),
        status: OrderStatus::Pending,
        payment_method: "paymob".to_string(),
        gateway_order_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
