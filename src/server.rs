use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::logging::{LogLevel, SharedLogger};
use crate::relay::{ByteStream, Relay, RelayOutcome};
use crate::translate::openai_types::{ErrorResponse, InboundChatRequest, ModelCard, ModelList};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Creation timestamp reported for the configured model in `/v1/models`.
const MODEL_CREATED: i64 = 1_677_610_602;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub relay: Relay,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/v1/models", get(handle_models))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// The caller's Authorization header is deliberately not extracted: the relay
// always authenticates upstream with its own key.
async fn handle_chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let raw: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            state
                .logger
                .error("server", format!("JSON decode error: {}", e));
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::json_decode(e))).into_response();
        }
    };

    state
        .logger
        .log_with_context(LogLevel::Info, "server", "Incoming request", raw.clone());

    let req = match InboundChatRequest::from_json(raw) {
        Ok(r) => r,
        Err(e) => return proxy_error_response(&state, e),
    };

    state.logger.info(
        "server",
        format!(
            "Request: model={} stream={} messages={}",
            req.model.as_ref().map_or_else(|| "<default>".to_string(), |m| m.to_string()),
            req.stream,
            req.messages.as_array().map_or(0, Vec::len)
        ),
    );

    match state.relay.chat_completions(req, &state.logger).await {
        Ok(RelayOutcome::Completion(resp)) => Json(resp).into_response(),
        Ok(RelayOutcome::Stream(stream)) => event_stream_response(stream),
        Ok(RelayOutcome::UpstreamError { status, body }) => {
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (code, Json(ErrorResponse::glm_api(status, &body))).into_response()
        }
        Err(e) => proxy_error_response(&state, e),
    }
}

fn proxy_error_response(state: &AppState, err: ProxyError) -> Response {
    state.logger.error("server", format!("Proxy error: {}", err));
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::proxy(err)),
    )
        .into_response()
}

fn event_stream_response(stream: ByteStream) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(ModelList {
        object: "list".to_string(),
        data: vec![ModelCard {
            id: state.config.upstream.default_model.clone(),
            object: "model".to_string(),
            created: MODEL_CREATED,
            owned_by: "glm".to_string(),
        }],
    })
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "GLM Proxy",
        "version": env!("CARGO_PKG_VERSION"),
        "target_api": state.config.upstream.base_url,
        "model": state.config.upstream.default_model,
    }))
}
