use std::error::Error;
use std::sync::Arc;

use marketplace::auth::PlatformAuthVerifier;
use marketplace::catalog::CatalogService;
use marketplace::evaluation::EvaluationService;
use marketplace::executable_utils::{initialize_executable, initialize_tracing, run_backend, AppState};
use marketplace::gateway::PaymobGateway;
use marketplace::inference::OpenAiChatClient;
use marketplace::payment::PaymentSessionService;
use marketplace::storage::PgStorage;
use marketplace::webhook::ConfirmationService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting backend...");
    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);

    let storage = Arc::new(PgStorage::connect(&config.common.database_url).await?);
    let gateway = Arc::new(PaymobGateway::new(config.gateway.clone())?);
    let inference = Arc::new(OpenAiChatClient::new(config.inference.clone())?);
    let auth = Arc::new(PlatformAuthVerifier::new(config.auth.clone())?);

    let state = AppState::new(
        Arc::new(CatalogService::new(storage.clone())),
        Arc::new(EvaluationService::new(inference, storage.clone())),
        Arc::new(PaymentSessionService::new(gateway, storage.clone())),
        Arc::new(ConfirmationService::new(
            storage,
            config.gateway.hmac_secret.clone(),
        )),
        auth,
    );

    run_backend(config.backend, state).await
}
