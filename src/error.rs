use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
