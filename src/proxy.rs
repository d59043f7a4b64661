use std::sync::Arc;

use crate::models::GenerateContentRequest;
use crate::transport::Transport;

pub const NO_MESSAGE_REPLY: &str = "❌ No message provided.";
pub const NO_REPLY_REPLY: &str = "⚠️ Gemini returned no reply.";
pub const UNREACHABLE_REPLY: &str = "❌ Failed to reach Gemini.";

/// Stateless forwarder from a chat message to the completion service.
/// Every outcome is a displayable reply string.
pub struct ChatProxy {
    tx: Arc<dyn Transport>,
}

impl ChatProxy {
    pub fn new(tx: Arc<dyn Transport>) -> Self {
        Self { tx }
    }

    pub async fn reply(&self, message: Option<&str>) -> String {
        let message = match message {
            Some(m) if !m.trim().is_empty() => m,
            _ => {
                tracing::info!("Rejecting empty chat message");
                return NO_MESSAGE_REPLY.to_string();
            }
        };

        tracing::info!(chars = message.chars().count(), "Forwarding chat message to Gemini");

        let request = GenerateContentRequest::user_turn(message);
        match self.tx.generate(&request).await {
            Ok(response) => match response.first_text() {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => {
                    tracing::warn!("Gemini response carried no candidate text");
                    NO_REPLY_REPLY.to_string()
                }
            },
            Err(e) => {
                tracing::error!("Gemini API error: {}", e);
                UNREACHABLE_REPLY.to_string()
            }
        }
    }
}
