//! Read-only HTTP query surface over the profit cache.

pub mod rank;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::config::ApiConfig;
use crate::domain::{ProfitRecord, Server};
use crate::error::Result;
use crate::port::store::{keys, SnapshotStore};
use rank::{rank_crafting, rank_gathering, CraftingQuery, GatheringQuery};

/// Shared state of the query endpoints.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn SnapshotStore>,
    pub result_limit: usize,
}

/// Build the query router.
#[must_use]
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/crafting", get(crafting))
        .route("/gathering", get(gathering))
        .with_state(state)
}

/// Serve the query API until shutdown is signalled.
///
/// # Errors
///
/// Returns an error when the listener cannot bind or the server fails.
pub async fn serve(config: &ApiConfig, state: ApiState, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Query API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;
    Ok(())
}

enum ApiError {
    MissingCache(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingCache(server) => (
                StatusCode::NOT_FOUND,
                format!("no profit cache for server {server}"),
            ),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn status(State(state): State<ApiState>) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let status = state
        .store
        .get(keys::STATUS)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .unwrap_or_else(|| "unknown".to_string());
    Ok(Json(json!({ "status": status })))
}

async fn crafting(
    State(state): State<ApiState>,
    Query(query): Query<CraftingQuery>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let (records, updated) = load_cache(&state, &query.server).await?;
    let items = rank_crafting(&records, &query, state.result_limit);
    Ok(Json(json!({ "items": items, "updated": updated })))
}

async fn gathering(
    State(state): State<ApiState>,
    Query(query): Query<GatheringQuery>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let (records, updated) = load_cache(&state, &query.server).await?;
    let items = rank_gathering(&records, &query, state.result_limit);
    Ok(Json(json!({ "items": items, "updated": updated })))
}

/// Load a server's profit array and last-update timestamp.
///
/// An absent array is the caller's 404; an empty array is a valid, empty
/// result set.
async fn load_cache(
    state: &ApiState,
    server: &str,
) -> std::result::Result<(Vec<ProfitRecord>, Option<i64>), ApiError> {
    let server = Server::from(server);
    let raw = state
        .store
        .get(&keys::profit(&server))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .ok_or_else(|| ApiError::MissingCache(server.to_string()))?;
    let records: Vec<ProfitRecord> =
        serde_json::from_str(&raw).map_err(|err| ApiError::Internal(err.to_string()))?;

    let updated = state
        .store
        .get(&keys::profit_updated(&server))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .and_then(|millis| millis.parse().ok());
    Ok((records, updated))
}
