use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Stable user-facing message strings.
pub mod msg {
    pub const INVALID_TOKEN: &str = "Invalid or expired access token";
    pub const UNKNOWN_TENANT: &str = "Unknown tenant";
    pub const EMAIL_EMPTY: &str = "Email cannot be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const UNKNOWN_PRODUCT: &str = "Unknown product";
    pub const UNKNOWN_MODE: &str = "Unknown quiz mode";
    pub const CATEGORY_REQUIRED: &str = "category is required for category_practice";
    pub const SESSION_NOT_FOUND: &str = "Session not found";
    pub const SESSION_COMPLETED: &str = "Session is already completed";
    pub const QUESTION_NOT_FOUND: &str = "Question not found";
    pub const INVALID_ANSWER: &str = "selected_answer must be one of a, b, c, d";
    pub const EXAM_LIMIT_REACHED: &str = "Daily exam limit reached";
    pub const INVALID_WEBHOOK_SIGNATURE: &str = "Webhook signature verification failed";
    pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature header format";
    pub const INVALID_TIMESTAMP_IN_SIGNATURE: &str = "Invalid timestamp in signature header";
    pub const INVALID_WEBHOOK_SECRET: &str = "Webhook secret rejected as HMAC key";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Auth,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Daily exam limit reached")]
    ExamLimit,

    #[error("Store unreachable: {0}")]
    Transport(String),

    #[error("Store rejected operation: {0}")]
    StoreRejected(String),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body shared by every endpoint.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Controls whether 5xx responses carry the underlying error text.
/// Enabled for non-production deployments only.
pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

fn expose_internal_errors() -> bool {
    EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed)
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connect(msg) | StoreError::Transport(msg) => AppError::Transport(msg),
            StoreError::Rejected(msg) => AppError::StoreRejected(msg),
            StoreError::Decode(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let internal_detail = |detail: &str| {
            if expose_internal_errors() {
                Some(detail.to_string())
            } else {
                None
            }
        };

        let (status, error, message) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::Auth => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                Some(msg::INVALID_TOKEN.to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::ExamLimit => (
                StatusCode::TOO_MANY_REQUESTS,
                "exam_limit_reached",
                Some(msg::EXAM_LIMIT_REACHED.to_string()),
            ),
            AppError::Transport(e) => {
                tracing::error!("Store unreachable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    internal_detail(e),
                )
            }
            AppError::StoreRejected(e) => {
                tracing::error!("Store rejected operation: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_rejected",
                    internal_detail(e),
                )
            }
            AppError::Payment(e) => {
                tracing::error!("Payment provider error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "payment_provider_error",
                    internal_detail(e),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    internal_detail(e),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
