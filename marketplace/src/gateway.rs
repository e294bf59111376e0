use crate::model::{BillingContact, SessionLineItem};
use crate::payment::{GatewayOrderId, PaymentGateway};
use async_trait::async_trait;
use common::config::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::{error::Error, time::Duration};
use tracing::debug;

/// Mandatory gateway billing fields we have no data for are filled with this
/// placeholder rather than left absent.
const FIELD_PLACEHOLDER: &str = "NA";
const BILLING_COUNTRY: &str = "EG";
const PAYMENT_KEY_EXPIRATION_SECS: u32 = 3600;

/// Paymob "Accept" client implementing the three-step session protocol.
///
/// One HTTP call per step, no retries; the request timeout on the shared
/// client bounds each call so an unresponsive gateway cannot hang a checkout
/// forever.
pub struct PaymobGateway {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl PaymobGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { http, config })
    }
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Serialize)]
struct OrderRegistration<'a> {
    auth_token: &'a str,
    delivery_needed: bool,
    amount_cents: i64,
    currency: &'a str,
    items: &'a [SessionLineItem],
}

#[derive(Deserialize)]
struct OrderResponse {
    id: i64,
}

#[derive(Serialize)]
struct GatewayBillingData<'a> {
    apartment: &'static str,
    email: &'a str,
    floor: &'static str,
    first_name: &'a str,
    street: &'static str,
    building: &'static str,
    phone_number: &'a str,
    shipping_method: &'static str,
    postal_code: &'static str,
    city: &'static str,
    country: &'static str,
    last_name: &'a str,
    state: &'static str,
}

impl<'a> GatewayBillingData<'a> {
    fn from_contact(contact: &'a BillingContact) -> Self {
        Self {
            apartment: FIELD_PLACEHOLDER,
            email: &contact.email,
            floor: FIELD_PLACEHOLDER,
            first_name: &contact.first_name,
            street: FIELD_PLACEHOLDER,
            building: FIELD_PLACEHOLDER,
            phone_number: &contact.phone,
            shipping_method: FIELD_PLACEHOLDER,
            postal_code: FIELD_PLACEHOLDER,
            city: FIELD_PLACEHOLDER,
            country: BILLING_COUNTRY,
            last_name: &contact.last_name,
            state: FIELD_PLACEHOLDER,
        }
    }
}

#[derive(Serialize)]
struct PaymentKeyRequest<'a> {
    auth_token: &'a str,
    amount_cents: i64,
    expiration: u32,
    order_id: i64,
    billing_data: GatewayBillingData<'a>,
    currency: &'a str,
    integration_id: i64,
}

#[derive(Deserialize)]
struct PaymentKeyResponse {
    token: String,
}

#[async_trait]
impl PaymentGateway for PaymobGateway {
    async fn authenticate(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/auth/tokens", self.config.api_base_url);
        let response = self
            .http
            .post(&url)
            .json(&AuthRequest {
                api_key: &self.config.api_key,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("gateway auth returned {}", response.status()).into());
        }
        let body: AuthResponse = response.json().await?;
        debug!("obtained gateway auth token");
        Ok(body.token)
    }

    async fn register_order(
        &self,
        auth_token: &str,
        amount_cents: i64,
        currency: &str,
        items: &[SessionLineItem],
    ) -> Result<GatewayOrderId, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/ecommerce/orders", self.config.api_base_url);
        let response = self
            .http
            .post(&url)
            .json(&OrderRegistration {
                auth_token,
                delivery_needed: false,
                amount_cents,
                currency,
                items,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("gateway order registration returned {}", response.status()).into());
        }
        let body: OrderResponse = response.json().await?;
        debug!(gateway_order_id = body.id, "registered gateway order");
        Ok(body.id)
    }

    async fn request_payment_key(
        &self,
        auth_token: &str,
        amount_cents: i64,
        currency: &str,
        gateway_order_id: GatewayOrderId,
        billing: &BillingContact,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/acceptance/payment_keys", self.config.api_base_url);
        let response = self
            .http
            .post(&url)
            .json(&PaymentKeyRequest {
                auth_token,
                amount_cents,
                expiration: PAYMENT_KEY_EXPIRATION_SECS,
                order_id: gateway_order_id,
                billing_data: GatewayBillingData::from_contact(billing),
                currency,
                integration_id: self.config.integration_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("gateway payment key returned {}", response.status()).into());
        }
        let body: PaymentKeyResponse = response.json().await?;
        Ok(body.token)
    }

    fn iframe_url(&self, payment_token: &str) -> String {
        format!(
            "{}/acceptance/iframes/{}?payment_token={}",
            self.config.api_base_url, self.config.iframe_id, payment_token
        )
    }
}
