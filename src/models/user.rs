use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};
use crate::store::row::opt_f64_lenient;

/// Basic email format validation.
///
/// Intentionally permissive: one @, non-empty local part, a domain with at
/// least one dot. Not RFC 5322, just enough to catch garbage before Stripe
/// or the tenant store sees it.
pub fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::Validation(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::Validation(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let (local_part, domain_part) = (parts[0], parts[1]);

    if local_part.is_empty() || local_part.contains(' ') {
        return Err(AppError::Validation(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty()
        || !domain_part.contains('.')
        || domain_part.starts_with('.')
        || domain_part.ends_with('.')
    {
        return Err(AppError::Validation(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

/// A paid user row. Stat columns may be NULL on live databases that predate
/// them, so they decode as options and are zero-coalesced in payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub subscription_status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub exam_attempts: Option<i64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    pub best_score: Option<f64>,
    #[serde(default)]
    pub total_questions_answered: Option<i64>,
}

impl User {
    pub fn payload(&self) -> UserPayload {
        UserPayload {
            id: self.id,
            email: self.email.clone(),
            subscription_status: self.subscription_status.clone(),
            exam_attempts: self.exam_attempts.unwrap_or(0),
            best_score: self.best_score.unwrap_or(0.0),
            total_questions_answered: self.total_questions_answered.unwrap_or(0),
        }
    }
}

/// What `validate-access` returns about the user. The access token is never
/// echoed back.
#[derive(Debug, Clone, Serialize)]
pub struct UserPayload {
    pub id: i64,
    pub email: String,
    pub subscription_status: String,
    pub exam_attempts: i64,
    pub best_score: f64,
    pub total_questions_answered: i64,
}
