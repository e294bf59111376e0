use crate::auth::AuthenticatedUser;
use crate::error::ServiceError;
use crate::model::{
    BillingContact, NewOrder, PaymentSessionRequest, PaymentSessionResult, SessionLineItem,
};
use crate::storage::OrderStorage;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::{error::Error, sync::Arc};
use tracing::{error, info};

/// Identifier the gateway assigns at order registration.
pub type GatewayOrderId = i64;

/// The external payment gateway, one method per protocol step.
///
/// Each step consumes the previous step's output, so the whole flow is a
/// linear pipeline; implementations perform exactly one HTTP call per method
/// with no retries.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Step 1: exchange the server-held API key for a short-lived bearer token.
    async fn authenticate(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Step 2: register the order and receive the gateway's order identifier.
    async fn register_order(
        &self,
        auth_token: &str,
        amount_cents: i64,
        currency: &str,
        items: &[SessionLineItem],
    ) -> Result<GatewayOrderId, Box<dyn Error + Send + Sync>>;

    /// Step 3: request an opaque payment token for the registered order.
    async fn request_payment_key(
        &self,
        auth_token: &str,
        amount_cents: i64,
        currency: &str,
        gateway_order_id: GatewayOrderId,
        billing: &BillingContact,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Deterministic redirect URL for an issued payment token.
    fn iframe_url(&self, payment_token: &str) -> String;
}

/// Convert a major-unit amount to integer minor units (e.g. 12.50 -> 1250).
///
/// Rejects non-positive amounts and amounts with sub-minor-unit precision
/// before any gateway call is made.
pub fn to_minor_units(amount: &Decimal) -> Result<i64, ServiceError> {
    if amount <= &Decimal::ZERO {
        return Err(ServiceError::InvalidRequest(
            "amount must be positive".to_string(),
        ));
    }
    let Some(cents) = amount.checked_mul(Decimal::from(100)) else {
        return Err(ServiceError::InvalidRequest(
            "amount out of range for minor units".to_string(),
        ));
    };
    if !cents.fract().is_zero() {
        return Err(ServiceError::InvalidRequest(
            "amount has sub-minor-unit precision".to_string(),
        ));
    }
    cents.to_i64().ok_or_else(|| {
        ServiceError::InvalidRequest("amount out of range for minor units".to_string())
    })
}

/// Creates redirectable payment sessions with the external gateway and
/// records the attempt locally before the user is sent to pay.
pub struct PaymentSessionService {
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStorage>,
}

impl PaymentSessionService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, orders: Arc<dyn OrderStorage>) -> Self {
        Self { gateway, orders }
    }

    /// Run the checkout-attempt pipeline:
    /// authenticate -> register order -> request payment key -> persist.
    ///
    /// Any failure in the three gateway steps aborts immediately with no
    /// partial local state. A failure of the final local insert is logged and
    /// swallowed: the token is already issued and still usable, so the caller
    /// gets a success response (see DESIGN.md for the open question around
    /// this policy). The amount-vs-line-sum consistency is caller-trusted.
    pub async fn create_session(
        &self,
        identity: Option<&AuthenticatedUser>,
        request: PaymentSessionRequest,
    ) -> Result<PaymentSessionResult, ServiceError> {
        let Some(user) = identity else {
            return Err(ServiceError::Unauthenticated);
        };
        if request.items.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "payment session requires at least one line item".to_string(),
            ));
        }
        let amount_cents = to_minor_units(&request.amount)?;

        let auth_token = self
            .gateway
            .authenticate()
            .await
            .map_err(|e| ServiceError::GatewayAuth(e.to_string()))?;

        let gateway_order_id = self
            .gateway
            .register_order(&auth_token, amount_cents, &request.currency, &request.items)
            .await
            .map_err(|e| ServiceError::GatewayOrder(e.to_string()))?;

        let payment_token = self
            .gateway
            .request_payment_key(
                &auth_token,
                amount_cents,
                &request.currency,
                gateway_order_id,
                &request.billing,
            )
            .await
            .map_err(|e| ServiceError::GatewayPaymentKey(e.to_string()))?;

        info!(
            order_id = %request.order_id,
            gateway_order_id,
            "payment key issued, recording pending order"
        );

        let new_order = NewOrder {
            order_id: request.order_id,
            user_id: user.id,
            total_amount: request.amount,
            currency: request.currency.clone(),
            gateway_order_id,
            payment_method: "paymob".to_string(),
        };
        // The token is already valid at the gateway; a failed insert leaves
        // an order with no local record rather than a dead checkout.
        if let Err(e) = self.orders.insert_pending(&new_order).await {
            error!(
                error = %e,
                order_id = %request.order_id,
                gateway_order_id,
                "failed to persist pending order; payment token remains valid"
            );
            metrics::counter!("payment_order_persist_failures_total").increment(1);
        }

        metrics::counter!("payment_sessions_created_total").increment(1);

        Ok(PaymentSessionResult {
            iframe_url: self.gateway.iframe_url(&payment_token),
            payment_token,
            gateway_order_id,
        })
    }
}
