use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::access::AccessController;
use crate::error::{AppError, Result, msg};
use crate::extractors::{Json, Path};
use crate::models::{QuizMode, SessionPayload};
use crate::store::AppState;

use super::authorize;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub token: Option<String>,
    pub session_type: String,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub success: bool,
    pub session_id: i64,
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>> {
    let store = state.store(&tenant_id)?;
    let user = authorize(store, request.token.as_deref()).await?;

    let mode = request
        .session_type
        .parse::<QuizMode>()
        .map_err(|_| AppError::Validation(msg::UNKNOWN_MODE.into()))?;

    if mode == QuizMode::ExamSimulation
        && !AccessController::new(store).can_take_exam(user.id).await?
    {
        return Err(AppError::ExamLimit);
    }

    let session_id = store.create_session(user.id, mode.as_str()).await?;

    tracing::info!(
        tenant = %tenant_id,
        user_id = user.id,
        session_id,
        session_type = %mode,
        "session started"
    );

    Ok(Json(StartSessionResponse {
        success: true,
        session_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub token: Option<String>,
    pub session_id: i64,
    pub question_id: i64,
    pub selected_answer: String,
    #[serde(default)]
    pub time_spent_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub success: bool,
    pub is_correct: bool,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>> {
    let store = state.store(&tenant_id)?;
    let user = authorize(store, request.token.as_deref()).await?;

    let selected = request.selected_answer.trim().to_ascii_lowercase();
    if !matches!(selected.as_str(), "a" | "b" | "c" | "d") {
        return Err(AppError::Validation(msg::INVALID_ANSWER.into()));
    }

    // Ownership check: the session must belong to the authenticated user.
    let session = store
        .find_session(request.session_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(msg::SESSION_NOT_FOUND.into()))?;
    if session.completed {
        return Err(AppError::Validation(msg::SESSION_COMPLETED.into()));
    }

    let question = store
        .find_question(request.question_id)
        .await?
        .ok_or_else(|| AppError::NotFound(msg::QUESTION_NOT_FOUND.into()))?;

    let is_correct = question.is_correct_choice(&selected);
    store
        .record_answer(
            user.id,
            request.session_id,
            request.question_id,
            &selected,
            is_correct,
            request.time_spent_seconds.unwrap_or(0),
        )
        .await?;
    store.refresh_session_stats(request.session_id).await?;

    Ok(Json(SubmitAnswerResponse {
        success: true,
        is_correct,
        correct_answer: question.correct_answer,
        explanation: question.explanation,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CompleteSessionRequest {
    #[serde(default)]
    pub token: Option<String>,
    pub session_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CompleteSessionResponse {
    pub success: bool,
    pub session: SessionPayload,
}

pub async fn complete_session(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<CompleteSessionRequest>,
) -> Result<Json<CompleteSessionResponse>> {
    let store = state.store(&tenant_id)?;
    let user = authorize(store, request.token.as_deref()).await?;

    store
        .find_session(request.session_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(msg::SESSION_NOT_FOUND.into()))?;

    store.finalize_session(request.session_id, user.id).await?;
    store.refresh_user_stats(user.id).await?;

    let session = store
        .find_session(request.session_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(msg::SESSION_NOT_FOUND.into()))?;

    tracing::info!(
        tenant = %tenant_id,
        user_id = user.id,
        session_id = session.id,
        score = ?session.score_percentage,
        "session completed"
    );

    Ok(Json(CompleteSessionResponse {
        success: true,
        session: session.payload(store.tenant().pass_score),
    }))
}
