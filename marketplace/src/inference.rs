use async_trait::async_trait;
use common::config::InferenceConfig;
use serde::{Deserialize, Serialize};
use std::{error::Error, time::Duration};

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 1500;

/// Single-shot completion against the external inference API.
///
/// Returns the raw text content of the first choice; the evaluation service
/// owns parsing it into a structured result.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Chat-completions client for an OpenAI-compatible API.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    config: InferenceConfig,
}

impl OpenAiChatClient {
    pub fn new(config: InferenceConfig) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { http, config })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[async_trait]
impl InferenceClient for OpenAiChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/chat/completions", self.config.api_base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&ChatRequest {
                model: &self.config.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: system_prompt,
                    },
                    ChatMessage {
                        role: "user",
                        content: user_prompt,
                    },
                ],
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("inference API returned {}", response.status()).into());
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or("inference API returned no choices")?;

        Ok(content)
    }
}
