//! Request handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use plocky_core::{PloggingId, RegisterForm, SessionForm, TrashcanForm, TrashcanId};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, identity::Viewer, state::AppState};

/// Body returned after a session is recorded.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    plogging_id: PloggingId,
}

/// Query string of `DELETE /trashcan`.
#[derive(Deserialize)]
pub struct DeleteTrashcan {
    #[serde(rename = "trashcanId")]
    trashcan_id: u64,
}

/// Liveness probe.
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// `POST /members`: register the acting member with a new pet.
pub async fn register_member_handler(
    State(state): State<AppState>,
    Viewer(member): Viewer,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.members.register(member, form).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `GET /members/me`: the acting member's totals and pet.
pub async fn member_profile_handler(
    State(state): State<AppState>,
    Viewer(member): Viewer,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.members.profile(&member).await?;
    Ok(Json(profile))
}

/// `POST /plogging`: record a finished session.
pub async fn create_plogging_handler(
    State(state): State<AppState>,
    Viewer(member): Viewer,
    Json(form): Json<SessionForm>,
) -> Result<impl IntoResponse, AppError> {
    let plogging_id = state.ploggings.create_session(form, &member).await?;
    Ok((StatusCode::CREATED, Json(CreatedSession { plogging_id })))
}

/// `GET /plogging`: the acting member's sessions, newest first.
pub async fn list_ploggings_handler(
    State(state): State<AppState>,
    Viewer(member): Viewer,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.ploggings.list_sessions(&member).await?;
    Ok(Json(sessions))
}

/// `GET /plogging/{id}`: detail view of one of the acting member's sessions.
pub async fn get_plogging_handler(
    State(state): State<AppState>,
    Viewer(member): Viewer,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.ploggings.get_session(&member, PloggingId(id)).await?;
    Ok(Json(summary))
}

/// `GET /trashcan`: every registered trash can.
pub async fn list_trashcans_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let trashcans = state.trashcans.list().await?;
    Ok(Json(trashcans))
}

/// `POST /trashcan`: register a trash can.
pub async fn create_trashcan_handler(
    State(state): State<AppState>,
    Json(form): Json<TrashcanForm>,
) -> Result<impl IntoResponse, AppError> {
    let trashcan = state.trashcans.create(form).await?;
    Ok((StatusCode::CREATED, Json(trashcan)))
}

/// `DELETE /trashcan?trashcanId=`: remove a trash can.
pub async fn delete_trashcan_handler(
    State(state): State<AppState>,
    Query(params): Query<DeleteTrashcan>,
) -> Result<impl IntoResponse, AppError> {
    state.trashcans.delete(TrashcanId(params.trashcan_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
