//! HTTP request handlers

use super::sse::speech_stream;
use super::types::{ErrorResponse, UtteranceRequest, UtteranceResponse};
use super::ws::presentation_socket;
use super::AppState;
use crate::orchestrator::TextMessageHandler;
use crate::presentation::PresentationSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Presentation front-end
        .route("/ws", get(presentation_socket))
        // Speech adapters
        .route("/api/utterance", post(post_utterance))
        .route("/api/speech", get(stream_speech))
        // Diagnostics
        .route("/api/presentation", get(get_presentation))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Speech
// ============================================================

/// Accept an utterance and handle it in its own task.
///
/// Returns before the handler finishes so a newer utterance can always start
/// an invocation that supersedes a running one.
async fn post_utterance(
    State(state): State<AppState>,
    Json(request): Json<UtteranceRequest>,
) -> Result<(StatusCode, Json<UtteranceResponse>), AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("Utterance text is empty".to_string()));
    }

    tracing::info!(chars = request.text.len(), "Utterance received");
    let handler = state.handler.clone();
    tokio::spawn(async move {
        handler.handle_text(&request.text).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UtteranceResponse { accepted: true }),
    ))
}

async fn stream_speech(State(state): State<AppState>) -> impl IntoResponse {
    speech_stream(state.speech.subscribe())
}

// ============================================================
// Diagnostics
// ============================================================

async fn get_presentation(State(state): State<AppState>) -> Json<PresentationSnapshot> {
    Json(state.presentation.snapshot())
}

async fn get_version() -> &'static str {
    concat!("slide-pilot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
