use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use gemini_chat::config::Config;
use gemini_chat::{build_proxy, server};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    let bind: SocketAddr = config.server.bind.parse().with_context(|| {
        format!(
            "Invalid server.bind '{}' (expected host:port)",
            config.server.bind
        )
    })?;

    let proxy = build_proxy(&config)?;
    let router = server::router(proxy, config.server.bearer_token.clone());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        model = %config.gemini.model,
        auth = %config.server.bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
        "Starting chat proxy"
    );

    axum::serve(listener, router).await?;
    Ok(())
}
