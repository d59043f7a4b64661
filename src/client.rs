use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::error::Result;
use crate::models::{ChatRequest, ChatResponse};
use crate::server::CHAT_PATH;

/// Sends an assembled prompt to the chat proxy and returns its reply
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, message: &str) -> Result<String>;
}

pub struct HttpChatClient {
    client: Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpChatClient {
    pub fn new(proxy_url: &str, bearer_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}{}", proxy_url.trim_end_matches('/'), CHAT_PATH),
            bearer_token,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.client.proxy_url, cfg.client.bearer_token.clone())
    }
}

#[async_trait]
impl CompletionClient for HttpChatClient {
    async fn complete(&self, message: &str) -> Result<String> {
        let mut request = self.client.post(&self.url).json(&ChatRequest {
            message: Some(message.to_string()),
        });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response: ChatResponse = request.send().await?.error_for_status()?.json().await?;
        Ok(response.reply)
    }
}
