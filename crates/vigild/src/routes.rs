//! API routes for vigild
//!
//! - `GET    /v1/progress`            account ids with a record
//! - `GET    /v1/progress/:user_id`   whole record, 404 when absent
//! - `PUT    /v1/progress/:user_id`   replace the whole record
//! - `DELETE /v1/progress/:user_id`   drop the record
//! - `GET    /v1/health`

use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vigil_common::{FileStore, Identity, ProgressBackend, ProgressionError, UserId, UserProgress};

type AppStateArc = Arc<AppState>;
type ApiError = (StatusCode, String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub records: usize,
}

// ============================================================================
// Progress Routes
// ============================================================================

pub fn progress_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/progress", get(list_users))
        .route(
            "/v1/progress/:user_id",
            get(get_progress).put(put_progress).delete(delete_progress),
        )
}

async fn list_users(State(state): State<AppStateArc>) -> Result<Json<Vec<UserId>>, ApiError> {
    with_store(&state, |store| store.user_ids()).await.map(Json)
}

async fn get_progress(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProgress>, ApiError> {
    let identity = account(user_id)?;
    let key = identity.clone();
    let progress = with_store(&state, move |store| store.load(&key)).await?;
    debug!("  Served {} (xp {})", identity, progress.xp);
    Ok(Json(progress))
}

async fn put_progress(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
    Json(progress): Json<UserProgress>,
) -> Result<StatusCode, ApiError> {
    let identity = account(user_id)?;
    let progress = progress.normalized();
    let (key, record) = (identity.clone(), progress.clone());
    with_store(&state, move |store| store.save(&key, &record)).await?;
    info!("  Stored {} (xp {}, level {})", identity, progress.xp, progress.level());
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_progress(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let identity = account(user_id)?;
    let key = identity.clone();
    with_store(&state, move |store| store.remove(&key)).await?;
    info!("  Removed {}", identity);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let (status, records) = match with_store(&state, |store| store.user_ids()).await {
        Ok(ids) => ("healthy", ids.len()),
        Err((_, message)) => {
            warn!("  Health check cannot read the data dir: {}", message);
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        records,
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// Run a store operation on the blocking pool while holding the store lock
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&FileStore) -> vigil_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| {
            error!("  Storage task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("storage task failed: {}", e))
        })?
        .map_err(error_response)
}

fn account(user_id: String) -> Result<Identity, ApiError> {
    UserId::new(user_id)
        .map(Identity::User)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn error_response(e: ProgressionError) -> ApiError {
    let status = match &e {
        ProgressionError::NotFound(_) => StatusCode::NOT_FOUND,
        ProgressionError::InvalidIdentity(_) | ProgressionError::InvalidEvent(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => {
            error!("  Storage failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}
