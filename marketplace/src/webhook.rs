use crate::error::ServiceError;
use crate::model::OrderStatus;
use crate::storage::OrderStorage;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, warn};

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackOrder {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackSourceData {
    pub pan: String,
    pub sub_type: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Transaction notification delivered by the gateway after the user pays.
/// Field names (including `error_occured`) follow the gateway's wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionCallback {
    pub amount_cents: i64,
    pub created_at: String,
    pub currency: String,
    pub error_occured: bool,
    pub has_parent_transaction: bool,
    pub id: i64,
    pub integration_id: i64,
    pub is_3d_secure: bool,
    pub is_auth: bool,
    pub is_capture: bool,
    pub is_refunded: bool,
    pub is_standalone_payment: bool,
    pub is_voided: bool,
    pub order: CallbackOrder,
    pub owner: i64,
    pub pending: bool,
    pub source_data: CallbackSourceData,
    pub success: bool,
}

impl TransactionCallback {
    /// The gateway signs the concatenation of these fields, in this exact
    /// (lexicographic) order, with HMAC-SHA512 over the shared secret.
    fn signature_payload(&self) -> String {
        let mut payload = String::new();
        let _ = write!(
            payload,
            "{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}",
            self.amount_cents,
            self.created_at,
            self.currency,
            self.error_occured,
            self.has_parent_transaction,
            self.id,
            self.integration_id,
            self.is_3d_secure,
            self.is_auth,
            self.is_capture,
            self.is_refunded,
            self.is_standalone_payment,
            self.is_voided,
            self.order.id,
            self.owner,
            self.pending,
            self.source_data.pan,
            self.source_data.sub_type,
            self.source_data.kind,
            self.success,
        );
        payload
    }

    /// Verify the hex HMAC the gateway appends as a query parameter.
    pub fn verify_signature(&self, secret: &str, provided_hex: &str) -> bool {
        let Ok(provided) = hex::decode(provided_hex) else {
            return false;
        };
        let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(self.signature_payload().as_bytes());
        mac.verify_slice(&provided).is_ok()
    }
}

/// Advances local order records when the gateway confirms or rejects a
/// payment. This is the only path that moves an order out of `pending`.
pub struct ConfirmationService {
    orders: Arc<dyn OrderStorage>,
    hmac_secret: String,
}

impl ConfirmationService {
    pub fn new(orders: Arc<dyn OrderStorage>, hmac_secret: String) -> Self {
        Self {
            orders,
            hmac_secret,
        }
    }

    /// Validate the notification signature and advance the order's status.
    ///
    /// Idempotent: re-delivery for an order already out of `pending` is a
    /// no-op returning the current status.
    pub async fn process(
        &self,
        callback: &TransactionCallback,
        provided_hmac: &str,
    ) -> Result<OrderStatus, ServiceError> {
        if !callback.verify_signature(&self.hmac_secret, provided_hmac) {
            warn!(
                gateway_order_id = callback.order.id,
                "rejected callback with invalid signature"
            );
            return Err(ServiceError::Unauthenticated);
        }

        let record = self
            .orders
            .find_by_gateway_order_id(callback.order.id)
            .await
            .map_err(|e| ServiceError::StoreWrite(e.to_string()))?
            .ok_or_else(|| {
                ServiceError::InvalidRequest(format!(
                    "no order for gateway order {}",
                    callback.order.id
                ))
            })?;

        if record.status != OrderStatus::Pending {
            info!(
                order_id = %record.order_id,
                status = %record.status,
                "callback re-delivered for settled order"
            );
            return Ok(record.status);
        }

        let target = if callback.success {
            OrderStatus::Completed
        } else {
            OrderStatus::Cancelled
        };

        self.orders
            .set_status(record.order_id, target)
            .await
            .map_err(|e| ServiceError::StoreWrite(e.to_string()))?;

        info!(order_id = %record.order_id, status = %target, "order settled");
        metrics::counter!("payment_confirmations_total").increment(1);

        Ok(target)
    }
}
