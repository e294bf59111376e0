use thiserror::Error;

/// Error taxonomy shared by the marketplace services.
///
/// The payment pipeline maps each gateway step to its own variant so a
/// failure identifies exactly where the chain stopped.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("gateway authentication failed: {0}")]
    GatewayAuth(String),

    #[error("gateway order registration failed: {0}")]
    GatewayOrder(String),

    #[error("gateway payment key request failed: {0}")]
    GatewayPaymentKey(String),

    #[error("store write failed: {0}")]
    StoreWrite(String),

    #[error("upstream request failed: {0}")]
    UpstreamRequest(String),

    #[error("upstream response was not parseable: {0}")]
    UpstreamParse(String),
}
