use async_trait::async_trait;
use common::config::AuthConfig;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::{error::Error, time::Duration};
use uuid::Uuid;

/// Identity resolved from a caller-supplied bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Resolves bearer tokens into user identities.
///
/// `Ok(None)` means the token was rejected; `Err` means the verifier itself
/// could not be reached. Handlers treat both as unauthenticated.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(
        &self,
        bearer_token: &str,
    ) -> Result<Option<AuthenticatedUser>, Box<dyn Error + Send + Sync>>;
}

/// Prod verifier backed by the managed auth platform's user-info endpoint.
pub struct PlatformAuthVerifier {
    http: reqwest::Client,
    config: AuthConfig,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    id: Uuid,
    email: Option<String>,
}

impl PlatformAuthVerifier {
    pub fn new(config: AuthConfig) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl AuthVerifier for PlatformAuthVerifier {
    async fn verify(
        &self,
        bearer_token: &str,
    ) -> Result<Option<AuthenticatedUser>, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/auth/v1/user", self.config.api_base_url);
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: UserInfoResponse = response.json().await?;
                Ok(Some(AuthenticatedUser {
                    id: user.id,
                    email: user.email,
                }))
            }
            status => Err(format!("auth platform returned {status}").into()),
        }
    }
}
