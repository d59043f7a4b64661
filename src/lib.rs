pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pdf;
pub mod proxy;
pub mod server;
pub mod session;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::proxy::ChatProxy;
use crate::transport::{GeminiTransport, Transport};

/// Wire the Gemini transport into a proxy ready to serve
pub fn build_proxy(cfg: &Config) -> Result<Arc<ChatProxy>> {
    let transport = Arc::new(GeminiTransport::from_config(cfg)?);
    Ok(Arc::new(ChatProxy::new(transport as Arc<dyn Transport>)))
}
