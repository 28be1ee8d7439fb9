use super::state::AppState;
use crate::error::{SessionError, StorageError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StartReplayRequest {
    /// File name of the replay to play; `None` when the picker was dismissed
    pub replay: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(e: SessionError) -> Response {
    let status = match &e {
        SessionError::ActionUnavailable { .. } => StatusCode::CONFLICT,
        SessionError::StartFailed { .. } | SessionError::ControllerClosed => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
        SessionError::Storage(StorageError::InvalidName(_)) => StatusCode::BAD_REQUEST,
        SessionError::Storage(StorageError::InUse(_)) => StatusCode::CONFLICT,
        SessionError::Replay(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::MissingCapability(_) | SessionError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

async fn status_response(state: &AppState) -> Response {
    match state.session.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
/// Current mode and the actions it offers
pub async fn get_session_status(State(state): State<AppState>) -> Response {
    status_response(&state).await
}

/// POST /session/recording/start
/// Start recording into a new replay file
pub async fn start_recording(State(state): State<AppState>) -> Response {
    match state.session.start_recording().await {
        Ok(path) => {
            info!("Recording started: {}", path.display());
            status_response(&state).await
        }
        Err(e) => error_response(e),
    }
}

/// POST /session/recording/stop
/// Finish the recording in progress
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    match state.session.stop_recording().await {
        Ok(()) => status_response(&state).await,
        Err(e) => error_response(e),
    }
}

/// POST /session/replay/start
/// Replay a stored file by name
pub async fn start_replay(
    State(state): State<AppState>,
    Json(req): Json<StartReplayRequest>,
) -> Response {
    let selection = match req.replay.as_deref().map(|name| state.store.resolve(name)) {
        Some(Ok(path)) => Some(path),
        Some(Err(e)) => return error_response(e.into()),
        None => None,
    };

    match state.session.start_replay(selection).await {
        Ok(Some(backend)) => {
            info!("Replay started with the {} reader", backend);
            status_response(&state).await
        }
        Ok(None) => status_response(&state).await,
        Err(e) => error_response(e),
    }
}

/// POST /session/replay/stop
/// Leave the replay and resume live sensing
pub async fn stop_replay(State(state): State<AppState>) -> Response {
    match state.session.stop_replay().await {
        Ok(()) => status_response(&state).await,
        Err(e) => error_response(e),
    }
}

/// GET /replays
/// Stored replays in display order
pub async fn list_replays(State(state): State<AppState>) -> Response {
    match state.session.list_replays().await {
        Ok(paths) => {
            let entries: Vec<ReplayEntry> = paths
                .into_iter()
                .map(|path| ReplayEntry {
                    name: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    path,
                })
                .collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /replays/:name
/// Delete a stored replay
pub async fn delete_replay(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let path = match state.store.resolve(&name) {
        Ok(path) => path,
        Err(e) => return error_response(e.into()),
    };

    match state.session.delete_replay(path).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
