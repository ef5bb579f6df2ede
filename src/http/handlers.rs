use super::state::AppState;
use crate::error::SessionError;
use crate::session::{SegmentRecord, SegmentSelector};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// Voice target to join (channel identifier in the gateway's terms)
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub context: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub context: String,
    pub segment: u64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub context: String,
    pub segment: u64,
    #[serde(flatten)]
    pub record: SegmentRecord,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn session_error(context: &str, err: SessionError) -> axum::response::Response {
    let status = match err {
        SessionError::AlreadyConnected
        | SessionError::NotConnected
        | SessionError::AlreadyRecording
        | SessionError::NotRecording => StatusCode::CONFLICT,
        SessionError::SegmentNotFound => StatusCode::NOT_FOUND,
        SessionError::Connection(_) => StatusCode::BAD_GATEWAY,
        SessionError::CaptureFile(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorResponse {
        error: err.to_string(),
    };
    tracing::warn!(context, "request failed: {}", body.error);
    (status, Json(body)).into_response()
}

fn unknown_context(context: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("no session for context {context}"),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/:context/join
pub async fn join(
    State(state): State<AppState>,
    Path(context): Path<String>,
    Json(req): Json<JoinRequest>,
) -> impl IntoResponse {
    let session = state.sessions.get_or_create(&context).await;
    match session.join(&req.target).await {
        Ok(()) => (
            StatusCode::OK,
            Json(JoinResponse {
                context,
                status: "connected".to_string(),
            }),
        )
            .into_response(),
        Err(e) => session_error(&context, e),
    }
}

/// POST /sessions/:context/record/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(context): Path<String>,
) -> impl IntoResponse {
    let session = state.sessions.get_or_create(&context).await;
    match session.start_recording().await {
        Ok(segment) => {
            info!(context = context.as_str(), segment, "recording started via API");
            (
                StatusCode::OK,
                Json(StartRecordingResponse {
                    context,
                    segment,
                    status: "recording".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => session_error(&context, e),
    }
}

/// POST /sessions/:context/record/stop
///
/// Blocks through conversion, transcription, and summarization; the
/// response carries the archived (transcript, summary) pair, which may
/// contain failure sentinels.
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(context): Path<String>,
) -> impl IntoResponse {
    let Some(session) = state.sessions.get(&context).await else {
        return unknown_context(&context);
    };
    match session.stop_recording().await {
        Ok((segment, record)) => (
            StatusCode::OK,
            Json(SegmentResponse {
                context,
                segment,
                record,
            }),
        )
            .into_response(),
        Err(e) => session_error(&context, e),
    }
}

/// POST /sessions/:context/leave
pub async fn leave(
    State(state): State<AppState>,
    Path(context): Path<String>,
) -> impl IntoResponse {
    let Some(session) = state.sessions.get(&context).await else {
        return unknown_context(&context);
    };
    match session.leave().await {
        Ok(()) => (
            StatusCode::OK,
            Json(JoinResponse {
                context,
                status: "disconnected".to_string(),
            }),
        )
            .into_response(),
        Err(e) => session_error(&context, e),
    }
}

/// GET /sessions/:context/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(context): Path<String>,
) -> impl IntoResponse {
    let Some(session) = state.sessions.get(&context).await else {
        return unknown_context(&context);
    };
    (StatusCode::OK, Json(session.status().await)).into_response()
}

/// GET /sessions/:context/segments/recent
pub async fn get_recent_segment(
    State(state): State<AppState>,
    Path(context): Path<String>,
) -> impl IntoResponse {
    get_segment_inner(state, context, SegmentSelector::Recent).await
}

/// GET /sessions/:context/segments/:id
pub async fn get_segment(
    State(state): State<AppState>,
    Path((context, id)): Path<(String, u64)>,
) -> impl IntoResponse {
    get_segment_inner(state, context, SegmentSelector::Id(id)).await
}

async fn get_segment_inner(
    state: AppState,
    context: String,
    selector: SegmentSelector,
) -> axum::response::Response {
    let Some(session) = state.sessions.get(&context).await else {
        return unknown_context(&context);
    };
    match session.get_segment(selector).await {
        Ok((segment, record)) => (
            StatusCode::OK,
            Json(SegmentResponse {
                context,
                segment,
                record,
            }),
        )
            .into_response(),
        Err(e) => session_error(&context, e),
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
