//! HTTP daemon mode for `chanlist`.
//!
//! - `POST /api/channels` – accepts the JSON query body and returns a
//!   `ChannelPage` (`{ "data": [...], "total": n }`).
//! - `GET /api/health` – health check with the catalog size.
//!
//! The server is thin: it decodes the body, hands it to the query
//! parser and engine, and converts errors into JSON responses. CORS is
//! open to every origin.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::Catalog;
use crate::models::{ChannelPage, CoercionPolicy, HealthResponse};
use crate::search::query::{parse_channel_query, QueryError};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub policy: CoercionPolicy,
}

impl AppState {
    pub fn new(catalog: Catalog, policy: CoercionPolicy) -> Self {
        Self {
            catalog: Arc::new(catalog),
            policy,
        }
    }
}

/// JSON error body returned by the API.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Build the Axum router for the channel API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/channels", post(channels))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server bound to the provided socket address.
pub async fn run(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        channels = state.catalog.len(),
        source = ?state.catalog.source(),
        "chanlist server listening"
    );
    serve_with_listener(listener, state).await
}

/// Run the HTTP server using an existing `TcpListener`.
pub async fn serve_with_listener(listener: TcpListener, state: AppState) -> Result<()> {
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("chanlist server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        channels: state.catalog.len(),
        loaded_at: state.catalog.loaded_at(),
    })
}

async fn channels(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChannelPage>, ApiError> {
    let value = decode_body(&body)?;
    let query = parse_channel_query(&value, state.policy)?;
    let page = state.catalog.query(&query);

    tracing::debug!(
        search = %query.search,
        page = query.page,
        limit = query.limit,
        total = page.total,
        returned = page.data.len(),
        "channel query"
    );

    Ok(Json(page))
}

/// An empty or whitespace-only body counts as `{}`.
fn decode_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("invalid JSON body: {err}")))
}
