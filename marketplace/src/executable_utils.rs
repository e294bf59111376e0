use crate::auth::{AuthVerifier, AuthenticatedUser};
use crate::catalog::{CatalogParams, CatalogService};
use crate::error::ServiceError;
use crate::evaluation::EvaluationService;
use crate::model::PaymentSessionRequest;
use crate::payment::PaymentSessionService;
use crate::webhook::{ConfirmationService, TransactionCallback};
use axum::{
    extract::{Json, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use common::config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use serde_json::json;
use std::{error::Error, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config/backend.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    // Config carries secrets once loaded; log only where it came from.
    println!("Loaded config from: {}", args.config);

    Ok(config)
}

pub fn initialize_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub evaluations: Arc<EvaluationService>,
    pub payments: Arc<PaymentSessionService>,
    pub confirmations: Arc<ConfirmationService>,
    pub auth: Arc<dyn AuthVerifier>,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogService>,
        evaluations: Arc<EvaluationService>,
        payments: Arc<PaymentSessionService>,
        confirmations: Arc<ConfirmationService>,
        auth: Arc<dyn AuthVerifier>,
    ) -> Self {
        Self {
            catalog,
            evaluations,
            payments,
            confirmations,
            auth,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    // An empty allow-list falls back to allowing any origin; prod configs
    // are expected to name the storefront origins.
    if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/products", get(get_products))
        .route("/api/evaluations", post(create_evaluation))
        .route("/api/payments/session", post(create_payment_session))
        .route("/api/payments/callback", post(payment_callback))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

pub async fn run_backend(
    config: common::config::BackendConfig,
    state: AppState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    let app = build_router(state, &config.allowed_origins).route(
        "/metrics",
        get(move || {
            let handle = prometheus.clone();
            async move { handle.render() }
        }),
    );

    info!("Starting backend service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller's identity, treating verifier transport failures the
/// same as a rejected token.
async fn resolve_identity(
    auth: &dyn AuthVerifier,
    headers: &HeaderMap,
) -> Option<AuthenticatedUser> {
    let token = bearer_token(headers)?;
    match auth.verify(token).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "auth verifier unavailable, treating caller as unauthenticated");
            None
        }
    }
}

fn error_body(err: &ServiceError) -> Json<serde_json::Value> {
    Json(json!({ "error": err.to_string() }))
}

pub async fn get_products(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Response {
    match state.catalog.query(&params).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch product page");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// The evaluation endpoint answers 400 with `{ error }` on every failure,
/// matching the storefront's existing contract.
pub async fn create_evaluation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<crate::model::EvaluationRequest>,
) -> Response {
    let identity = resolve_identity(state.auth.as_ref(), &headers).await;

    match state.evaluations.evaluate(identity.as_ref(), request).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            error!(error = %e, "evaluation request failed");
            (StatusCode::BAD_REQUEST, error_body(&e)).into_response()
        }
    }
}

pub async fn create_payment_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PaymentSessionRequest>,
) -> Response {
    let identity = resolve_identity(state.auth.as_ref(), &headers).await;
    let order_id = request.order_id;

    match state.payments.create_session(identity.as_ref(), request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!(error = %e, %order_id, "payment session creation failed");
            let status = match &e {
                ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, error_body(&e)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub hmac: String,
}

/// Envelope the gateway posts: the transaction object plus a type tag we
/// don't branch on (only transaction callbacks are routed here).
#[derive(Debug, Deserialize)]
pub struct CallbackEnvelope {
    pub obj: TransactionCallback,
}

pub async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    Json(envelope): Json<CallbackEnvelope>,
) -> Response {
    match state.confirmations.process(&envelope.obj, &query.hmac).await {
        Ok(status) => (
            StatusCode::OK,
            Json(json!({ "success": true, "order_status": status })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, gateway_order_id = envelope.obj.order.id, "payment callback rejected");
            let status = match &e {
                ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, error_body(&e)).into_response()
        }
    }
}
