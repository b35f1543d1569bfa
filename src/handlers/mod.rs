mod access;
mod checkout;
mod health;
mod questions;
mod sessions;
mod webhook;

pub use access::*;
pub use checkout::*;
pub use health::*;
pub use questions::*;
pub use sessions::*;
pub use webhook::*;

use axum::Router;
use axum::routing::{get, post};

use crate::access::AccessController;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::store::{AppState, TenantStore};

/// Resolves an access token to its user. Any failure along the way,
/// including a missing token or an unreachable store, reads as 401.
pub(crate) async fn authorize(store: &TenantStore, token: Option<&str>) -> Result<User> {
    let token = token.ok_or(AppError::Auth)?;
    AccessController::new(store)
        .validate_access(token)
        .await
        .ok_or(AppError::Auth)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_report))
        .route("/webhook", post(stripe_webhook))
        .route("/webhook/stripe", post(stripe_webhook))
        .route("/{tenant}/checkout", post(create_checkout))
        .route(
            "/{tenant}/validate-access",
            post(validate_access).get(validate_access_query),
        )
        .route("/{tenant}/get-questions", post(get_questions))
        .route("/{tenant}/start-session", post(start_session))
        .route("/{tenant}/submit-answer", post(submit_answer))
        .route("/{tenant}/complete-session", post(complete_session))
        .route(
            "/{tenant}/get-progress",
            post(get_progress).get(get_progress_query),
        )
        .route("/{tenant}/categories", get(list_categories))
}
