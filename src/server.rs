use std::any::Any;
use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::error::ChatError;
use crate::models::{ChatRequest, ChatResponse};

#[derive(Clone)]
struct AppState {
    chat: ChatService,
}

pub fn build_router(chat: ChatService) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { chat })
}

pub async fn run_server(config: AppConfig, chat: ChatService) -> Result<()> {
    let app = build_router(chat);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let response = state.chat.answer(request).await?;
    Ok(Json(response))
}

/// Turns a panic anywhere below the router into a 500 instead of a dropped connection.
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::from(ChatError::Internal(anyhow::anyhow!(
        "unexpected failure: {detail}"
    )))
    .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(value: ChatError) -> Self {
        let status = if value.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = value.to_string();
        if status.is_server_error() {
            tracing::error!("chat request failed: {}", message);
        }
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
