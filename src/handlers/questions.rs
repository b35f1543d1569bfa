use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};
use crate::extractors::{Json, Path, Query};
use crate::models::{CategoryCount, QuestionPayload, QuizMode};
use crate::questions::QuestionService;
use crate::store::AppState;

use super::{TokenRequest, authorize};

#[derive(Debug, Deserialize)]
pub struct QuestionsRequest {
    #[serde(default)]
    pub token: Option<String>,
    /// Defaults to quick practice when absent.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub success: bool,
    pub mode: &'static str,
    pub total_count: usize,
    pub questions: Vec<QuestionPayload>,
}

pub async fn get_questions(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<QuestionsRequest>,
) -> Result<Json<QuestionsResponse>> {
    let store = state.store(&tenant_id)?;
    let user = authorize(store, request.token.as_deref()).await?;

    let mode = match request.mode.as_deref() {
        None => QuizMode::QuickPractice,
        Some(raw) => raw
            .parse::<QuizMode>()
            .map_err(|_| AppError::Validation(msg::UNKNOWN_MODE.into()))?,
    };

    let questions = QuestionService::new(store)
        .deliver(
            &user,
            mode,
            request.category.as_deref(),
            request.difficulty.as_deref(),
            request.limit,
        )
        .await?;

    tracing::debug!(
        tenant = %tenant_id,
        user_id = user.id,
        mode = %mode,
        count = questions.len(),
        "questions delivered"
    );

    Ok(Json(QuestionsResponse {
        success: true,
        mode: mode.as_str(),
        total_count: questions.len(),
        questions,
    }))
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub success: bool,
    pub categories: Vec<CategoryCount>,
}

pub async fn list_categories(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(request): Query<TokenRequest>,
) -> Result<Json<CategoriesResponse>> {
    let store = state.store(&tenant_id)?;
    authorize(store, request.token.as_deref()).await?;

    let categories = store.list_categories().await?;

    Ok(Json(CategoriesResponse {
        success: true,
        categories,
    }))
}
