use crate::config::AppConfig;
use crate::data::{EntryId, GenerationResult, SchedulingInput, StoredEntry, TimetableId};
use crate::entry_validator;
use crate::error::GenerationError;
use crate::preflight::{self, PreflightReport};
use crate::queue::{
    CancelOutcome, GenerationQueue, QueueError, Timetable, TimetableStatus, TimetableStore,
};
use crate::solver::{self, CancellationToken};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("timetable {0} not found")]
    NotFound(TimetableId),

    #[error("timetable {0} is not being generated")]
    NotGenerating(TimetableId),

    #[error("timetable {0} is still being generated")]
    StillGenerating(TimetableId),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("generation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Generation(GenerationError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Generation(GenerationError::Cancelled)
            | ApiError::NotGenerating(_)
            | ApiError::StillGenerating(_) => StatusCode::CONFLICT,
            ApiError::Queue(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("Rejected request: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    queue: GenerationQueue,
}

impl AppState {
    /// Starts the generation worker on the current runtime.
    pub fn new() -> Self {
        Self {
            queue: GenerationQueue::start(Arc::new(TimetableStore::new())),
        }
    }

    fn store(&self) -> &TimetableStore {
        self.queue.store()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryValidationResponse {
    pub entry_id: EntryId,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

async fn generate_handler(
    Json(input): Json<SchedulingInput>,
) -> Result<Json<GenerationResult>, ApiError> {
    let result = tokio::task::spawn_blocking(move || {
        solver::generate(&input, None, &CancellationToken::new())
    })
    .await??;
    Ok(Json(result))
}

async fn enqueue_handler(
    State(state): State<AppState>,
    Json(input): Json<SchedulingInput>,
) -> Result<(StatusCode, Json<Timetable>), ApiError> {
    let id = state.queue.enqueue(input)?;
    let timetable = state.store().get(id).ok_or(ApiError::NotFound(id))?;
    Ok((StatusCode::ACCEPTED, Json(timetable)))
}

async fn timetable_handler(
    State(state): State<AppState>,
    Path(id): Path<TimetableId>,
) -> Result<Json<Timetable>, ApiError> {
    state.store().get(id).map(Json).ok_or(ApiError::NotFound(id))
}

async fn cancel_handler(
    State(state): State<AppState>,
    Path(id): Path<TimetableId>,
) -> Result<StatusCode, ApiError> {
    match state.store().cancel(id) {
        CancelOutcome::Requested => Ok(StatusCode::ACCEPTED),
        CancelOutcome::NotGenerating => Err(ApiError::NotGenerating(id)),
        CancelOutcome::NotFound => Err(ApiError::NotFound(id)),
    }
}

async fn validate_entry_handler(
    State(state): State<AppState>,
    Path(id): Path<TimetableId>,
    Json(entry): Json<StoredEntry>,
) -> Result<Json<EntryValidationResponse>, ApiError> {
    let timetable = state.store().get(id).ok_or(ApiError::NotFound(id))?;
    if timetable.status == TimetableStatus::Generating {
        return Err(ApiError::StillGenerating(id));
    }
    let input = state.store().input(id).ok_or(ApiError::NotFound(id))?;

    let violations = entry_validator::validate_entry(&input, &entry, &timetable.entries)?;
    let issues: Vec<String> = violations
        .iter()
        .map(|v| format!("Entry {}: {}", entry.id, v))
        .collect();
    Ok(Json(EntryValidationResponse {
        entry_id: entry.id,
        is_valid: issues.is_empty(),
        issues,
    }))
}

async fn preflight_handler(Json(input): Json<SchedulingInput>) -> Json<PreflightReport> {
    Json(preflight::validate(&input))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/timetables/generate", post(generate_handler))
        .route("/v1/timetables", post(enqueue_handler))
        .route("/v1/timetables/:id", get(timetable_handler))
        .route("/v1/timetables/:id/cancel", post(cancel_handler))
        .route("/v1/timetables/:id/entries/validate", post(validate_entry_handler))
        .route("/v1/preflight", post(preflight_handler))
        .with_state(state)
}

pub async fn run_server(config: &AppConfig) -> std::io::Result<()> {
    let app = router(AppState::new());
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
