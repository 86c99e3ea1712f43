//! REST endpoints for the wizard session and the generated document.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use crate::error::WizardError;
use crate::pipeline::ArtifactHandle;
use crate::presenter::ResultView;
use crate::wizard::{FormPatch, Weekday, WizardSession};

/// Shared state for the wizard routes.
#[derive(Clone)]
pub struct WizardRouteState {
    pub session: Arc<Mutex<WizardSession>>,
}

impl WizardRouteState {
    pub fn new(session: WizardSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Grab the session without queueing behind a running submission.
    fn session(&self) -> Result<MutexGuard<'_, WizardSession>, ApiError> {
        self.session
            .try_lock()
            .map_err(|_| ApiError::Wizard(WizardError::SubmissionInFlight))
    }
}

#[derive(Debug, Deserialize)]
struct DaysBody {
    days: Vec<Weekday>,
}

/// Errors surfaced by the HTTP layer.
enum ApiError {
    Wizard(WizardError),
    NotFound(&'static str),
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        Self::Wizard(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Wizard(err) => {
                let status = match &err {
                    WizardError::StepInvalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    WizardError::InvalidTransition { .. }
                    | WizardError::FormLocked { .. }
                    | WizardError::SubmissionInFlight => StatusCode::CONFLICT,
                };
                let problems = match &err {
                    WizardError::StepInvalid { problems, .. } => problems.clone(),
                    _ => Vec::new(),
                };
                (
                    status,
                    Json(serde_json::json!({
                        "error": err.to_string(),
                        "problems": problems,
                    })),
                )
                    .into_response()
            }
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": what })),
            )
                .into_response(),
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/wizard
///
/// While a submission is running only the in-flight flag is reported.
async fn get_status(State(state): State<WizardRouteState>) -> Response {
    match state.session.try_lock() {
        Ok(session) => Json(session.status()).into_response(),
        Err(_) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "submitting": true })),
        )
            .into_response(),
    }
}

async fn start(State(state): State<WizardRouteState>) -> Result<Response, ApiError> {
    let mut session = state.session()?;
    session.start()?;
    Ok(Json(session.status()).into_response())
}

async fn back(State(state): State<WizardRouteState>) -> Result<Response, ApiError> {
    let mut session = state.session()?;
    session.back()?;
    Ok(Json(session.status()).into_response())
}

/// POST /api/wizard/forward
///
/// On the objective step this runs the submission and answers once it has
/// finished.
async fn forward(State(state): State<WizardRouteState>) -> Result<Response, ApiError> {
    let mut session = state.session()?;
    session.forward().await?;
    Ok(Json(session.status()).into_response())
}

async fn retry(State(state): State<WizardRouteState>) -> Result<Response, ApiError> {
    let mut session = state.session()?;
    session.retry().await?;
    Ok(Json(session.status()).into_response())
}

async fn update_form(
    State(state): State<WizardRouteState>,
    Json(patch): Json<FormPatch>,
) -> Result<Response, ApiError> {
    let mut session = state.session()?;
    session.update(patch)?;
    Ok(Json(session.status()).into_response())
}

async fn select_days(
    State(state): State<WizardRouteState>,
    Json(body): Json<DaysBody>,
) -> Result<Response, ApiError> {
    let mut session = state.session()?;
    session.select_days(&body.days)?;
    Ok(Json(session.status()).into_response())
}

/// The live artifact plus its download name, if the last run succeeded.
fn current_document(session: &WizardSession) -> Option<(ArtifactHandle, String)> {
    match session.result()? {
        ResultView::Ready(view) if !view.handle().is_released() => {
            Some((view.handle().clone(), view.file_name.clone()))
        }
        _ => None,
    }
}

async fn document_response(
    state: &WizardRouteState,
    disposition: &str,
) -> Result<Response, ApiError> {
    // Clone the handle out so the file read does not hold the session.
    let (handle, file_name) = {
        let session = state.session()?;
        current_document(&session).ok_or(ApiError::NotFound("No document generated yet"))?
    };

    let bytes = handle
        .read()
        .await
        .map_err(|_| ApiError::NotFound("Document is no longer available"))?;
    debug!(artifact = %handle.id(), disposition, "Serving document");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/artifact — the document for inline preview.
async fn preview_artifact(State(state): State<WizardRouteState>) -> Result<Response, ApiError> {
    document_response(&state, "inline").await
}

/// GET /api/artifact/download — the document as an attachment.
async fn download_artifact(State(state): State<WizardRouteState>) -> Result<Response, ApiError> {
    document_response(&state, "attachment").await
}

/// Build the wizard REST routes.
pub fn wizard_routes(state: WizardRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/wizard", get(get_status))
        .route("/api/wizard/start", post(start))
        .route("/api/wizard/forward", post(forward))
        .route("/api/wizard/back", post(back))
        .route("/api/wizard/retry", post(retry))
        .route("/api/wizard/form", patch(update_form))
        .route("/api/wizard/days", put(select_days))
        .route("/api/artifact", get(preview_artifact))
        .route("/api/artifact/download", get(download_artifact))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
