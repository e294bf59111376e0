use serde::Deserialize;
use std::{env, error::Error, fs};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendConfig {
    pub server_address: String,
    pub log_level: String,
    /// Origins allowed by the CORS layer. The storefront and the mobile
    /// client dev server are the usual entries.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Payment gateway settings. `api_key` and `hmac_secret` are never read from
/// the config file; they are filled from the process environment at load time
/// and must not appear in logs or responses.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GatewayConfig {
    pub api_base_url: String,
    pub iframe_id: String,
    pub integration_id: i64,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub hmac_secret: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct InferenceConfig {
    pub api_base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Base URL of the managed auth platform used to resolve bearer tokens
    /// into user identities.
    pub api_base_url: String,
    #[serde(default)]
    pub anon_key: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub backend: BackendConfig,
    pub gateway: GatewayConfig,
    pub inference: InferenceConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let contents = fs::read_to_string(config_path)?;
        let mut config: Config = serde_yml::from_str(&contents)?;
        config.apply_env_secrets();

        Ok(config)
    }

    /// Secrets live in the environment, not in the config file. Empty values
    /// are tolerated here so tests can build configs by hand; the prod
    /// clients fail on first use instead.
    fn apply_env_secrets(&mut self) {
        if let Ok(key) = env::var("GATEWAY_API_KEY") {
            self.gateway.api_key = key;
        }
        if let Ok(secret) = env::var("GATEWAY_HMAC_SECRET") {
            self.gateway.hmac_secret = secret;
        }
        if let Ok(key) = env::var("INFERENCE_API_KEY") {
            self.inference.api_key = key;
        }
        if let Ok(key) = env::var("AUTH_ANON_KEY") {
            self.auth.anon_key = key;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.common.database_url = url;
        }
    }
}
