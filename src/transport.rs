use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::models::{GenerateContentRequest, GenerateContentResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, req: &GenerateContentRequest) -> Result<GenerateContentResponse>;
}

pub struct GeminiTransport {
    client: Client,
    url: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.generate_content_url(),
            cfg.gemini.api_key.clone(),
            cfg.get_request_timeout(),
        )
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(&self, req: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json; charset=UTF-8")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // An error body still decodes; it just carries no candidates.
            tracing::warn!(%status, "Gemini API returned non-success status");
        }

        let body = response.text().await?;
        tracing::debug!(%status, body = %body, "Gemini response");

        serde_json::from_str(&body).map_err(|e| {
            ChatError::Upstream(format!("Failed to parse Gemini API response: {e}"))
        })
    }
}
