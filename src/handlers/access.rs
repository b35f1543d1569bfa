use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::access::AccessController;
use crate::error::Result;
use crate::extractors::{Json, Path, Query};
use crate::models::{ProgressReport, UserPayload};
use crate::store::AppState;

use super::authorize;

/// Token carrier shared by the JSON-body and query-string variants of the
/// token-gated endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateAccessResponse {
    pub success: bool,
    pub user: UserPayload,
    pub progress: ProgressReport,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub success: bool,
    pub progress: ProgressReport,
}

pub async fn validate_access(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<ValidateAccessResponse>> {
    run_validate(&state, &tenant_id, request.token.as_deref()).await
}

/// Same contract as the POST variant; some clients pass the token as a
/// query parameter.
pub async fn validate_access_query(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(request): Query<TokenRequest>,
) -> Result<Json<ValidateAccessResponse>> {
    run_validate(&state, &tenant_id, request.token.as_deref()).await
}

async fn run_validate(
    state: &AppState,
    tenant_id: &str,
    token: Option<&str>,
) -> Result<Json<ValidateAccessResponse>> {
    let store = state.store(tenant_id)?;
    let user = authorize(store, token).await?;

    let access = AccessController::new(store);
    access.record_login(&user).await;
    let progress = access.user_progress(user.id).await?;

    tracing::debug!(tenant = %tenant_id, user_id = user.id, "access token validated");

    Ok(Json(ValidateAccessResponse {
        success: true,
        user: user.payload(),
        progress,
    }))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<ProgressResponse>> {
    run_progress(&state, &tenant_id, request.token.as_deref()).await
}

pub async fn get_progress_query(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(request): Query<TokenRequest>,
) -> Result<Json<ProgressResponse>> {
    run_progress(&state, &tenant_id, request.token.as_deref()).await
}

async fn run_progress(
    state: &AppState,
    tenant_id: &str,
    token: Option<&str>,
) -> Result<Json<ProgressResponse>> {
    let store = state.store(tenant_id)?;
    let user = authorize(store, token).await?;
    let progress = AccessController::new(store).user_progress(user.id).await?;

    Ok(Json(ProgressResponse {
        success: true,
        progress,
    }))
}
