use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single entry in a chat session. Immutable once pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: u64, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Label for the control that switches away from this theme
    pub fn toggle_label(self) -> &'static str {
        match self {
            Theme::Light => "🌙 Dark Mode",
            Theme::Dark => "🌞 Light Mode",
        }
    }
}

// Proxy wire format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

// Gemini generateContent request format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// A single user turn with no prior history
    pub fn user_turn(text: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: Some(vec![Part {
                    text: Some(text.to_string()),
                }]),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// Gemini generateContent response format. Every level is optional so an
// error body decodes cleanly and simply yields no candidate text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text at `candidates[0].content.parts[0].text`, if present
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .first()?
            .text
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_turn_wire_shape() {
        let req = GenerateContentRequest::user_turn("hi there");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi there" }] }]
            })
        );
    }

    #[test]
    fn test_first_text_present() {
        let resp: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "first" }, { "text": "second" }] } },
                { "content": { "parts": [{ "text": "other" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(resp.first_text(), Some("first"));
    }

    #[test]
    fn test_first_text_missing_levels() {
        for body in [
            serde_json::json!({}),
            serde_json::json!({ "candidates": [] }),
            serde_json::json!({ "candidates": [{}] }),
            serde_json::json!({ "candidates": [{ "content": {} }] }),
            serde_json::json!({ "candidates": [{ "content": { "parts": [] } }] }),
            serde_json::json!({ "candidates": [{ "content": { "parts": [{}] } }] }),
            serde_json::json!({ "error": { "code": 400, "message": "API key not valid" } }),
        ] {
            let resp: GenerateContentResponse = serde_json::from_value(body.clone()).unwrap();
            assert_eq!(resp.first_text(), None, "body: {body}");
        }
    }

    #[test]
    fn test_chat_request_missing_message() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.message.is_none());
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::Bot).unwrap(), "\"bot\"");
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggle_label(), "🌙 Dark Mode");
    }
}
