use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;

use crate::models::{ChatRequest, ChatResponse};
use crate::proxy::{ChatProxy, UNREACHABLE_REPLY};

pub const CHAT_PATH: &str = "/api/chat";
pub const HEALTH_PATH: &str = "/health";

/// Build the proxy router, with bearer auth in front of the chat route when a token is set.
/// `/health` is added after the auth layer and stays open.
pub fn router(proxy: Arc<ChatProxy>, bearer_token: Option<String>) -> Router {
    let mut router = Router::new()
        .route(CHAT_PATH, post(chat))
        .with_state(proxy);

    if let Some(expected) = bearer_token {
        router = router.layer(middleware::from_fn_with_state(
            Arc::new(expected),
            require_bearer,
        ));
    }

    router.route(HEALTH_PATH, get(|| async { "ok" }))
}

/// POST /api/chat. Always answers 200 with a reply, including for bodies that do not parse.
async fn chat(State(proxy): State<Arc<ChatProxy>>, body: Bytes) -> Json<ChatResponse> {
    let reply = match serde_json::from_slice::<ChatRequest>(&body) {
        Ok(req) => proxy.reply(req.message.as_deref()).await,
        Err(e) => {
            tracing::error!("Rejecting malformed chat request body: {}", e);
            UNREACHABLE_REPLY.to_string()
        }
    };
    Json(ChatResponse { reply })
}

async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let headers: &HeaderMap = req.headers();
    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", expected.as_str()))
        || token_in_query(req.uri().query(), expected.as_str());
    if !authorized {
        tracing::warn!(path = %req.uri().path(), "Unauthorized request");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}

// Fallback for clients that cannot set headers. Accepted keys: access_token, token
fn token_in_query(query: Option<&str>, expected: &str) -> bool {
    query.is_some_and(|q| {
        q.split('&').any(|pair| {
            pair.split_once('=')
                .is_some_and(|(k, v)| (k == "access_token" || k == "token") && v == expected)
        })
    })
}
