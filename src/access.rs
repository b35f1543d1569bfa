//! Token validation, exam limits, progress assembly and entitlement grants.

use chrono::{DateTime, Days, NaiveTime, Utc};

use crate::error::Result;
use crate::models::{ProgressReport, User};
use crate::store::{DATETIME_FORMAT, TenantStore};
use crate::token::{generate_access_token, is_plausible_token};

/// Exam simulations allowed per user per UTC calendar day.
pub const EXAM_DAILY_LIMIT: i64 = 3;

const RECENT_SESSIONS_LIMIT: u32 = 10;

/// What granting access did for one verified payment.
#[derive(Debug)]
pub enum EntitlementOutcome {
    /// A token was minted for this payment.
    Granted { user: Option<User>, token: String },
    /// This payment id was already processed; nothing changed.
    AlreadyProcessed,
}

pub struct AccessController<'a> {
    store: &'a TenantStore,
}

impl<'a> AccessController<'a> {
    pub fn new(store: &'a TenantStore) -> Self {
        Self { store }
    }

    /// Resolves a token to its user. Fail-closed: implausible tokens are
    /// rejected without a query, and any store failure reads as no access.
    pub async fn validate_access(&self, token: &str) -> Option<User> {
        if !is_plausible_token(token) {
            return None;
        }
        match self.store.find_user_by_token(token).await {
            Ok(user) => user,
            Err(error) => {
                tracing::error!(
                    tenant = %self.store.tenant().id,
                    %error,
                    "token lookup failed"
                );
                None
            }
        }
    }

    /// Best-effort timestamp update; a failed write never blocks a login.
    pub async fn record_login(&self, user: &User) {
        if let Err(error) = self.store.touch_last_login(user.id).await {
            tracing::warn!(
                tenant = %self.store.tenant().id,
                user_id = user.id,
                %error,
                "failed to update last_login"
            );
        }
    }

    /// Whether the user may start another exam simulation today (UTC).
    pub async fn can_take_exam(&self, user_id: i64) -> Result<bool> {
        let (from, to) = utc_day_bounds(Utc::now());
        let taken = self
            .store
            .count_exam_sessions_between(user_id, &from, &to)
            .await?;
        Ok(taken < EXAM_DAILY_LIMIT)
    }

    /// Progress is recomputed from answers and sessions on every read, so
    /// it survives counter drift in the rollup columns.
    pub async fn user_progress(&self, user_id: i64) -> Result<ProgressReport> {
        let general = self.store.general_progress(user_id).await?;
        let categories = self.store.category_progress(user_id).await?;
        let pass_score = self.store.tenant().pass_score;
        let recent_sessions = self
            .store
            .recent_sessions(user_id, RECENT_SESSIONS_LIMIT)
            .await?
            .iter()
            .map(|s| s.payload(pass_score))
            .collect();
        Ok(ProgressReport {
            general,
            categories,
            recent_sessions,
        })
    }

    /// Mints an access token for a verified payment and upserts the user.
    /// Re-deliveries of the same payment id leave the account untouched.
    pub async fn grant_entitlement(
        &self,
        email: &str,
        customer_id: &str,
        payment_id: &str,
    ) -> Result<EntitlementOutcome> {
        if let Some(user) = self.store.find_user_by_payment(payment_id).await? {
            tracing::info!(
                tenant = %self.store.tenant().id,
                user_id = user.id,
                payment_id = %payment_id,
                "payment already processed"
            );
            return Ok(EntitlementOutcome::AlreadyProcessed);
        }

        let token = generate_access_token();
        self.store
            .upsert_user_on_payment(email, customer_id, payment_id, &token)
            .await?;

        // The grant is durable at this point; a failed re-read only costs
        // log detail.
        let user = match self.store.find_user_by_token(&token).await {
            Ok(user) => user,
            Err(error) => {
                tracing::warn!(
                    tenant = %self.store.tenant().id,
                    %error,
                    "entitlement granted but user re-read failed"
                );
                None
            }
        };

        Ok(EntitlementOutcome::Granted { user, token })
    }
}

/// Start of the given UTC day and of the next one, rendered for SQL.
pub fn utc_day_bounds(now: DateTime<Utc>) -> (String, String) {
    let today = now.date_naive();
    let start = today.and_time(NaiveTime::MIN);
    let end = (today + Days::new(1)).and_time(NaiveTime::MIN);
    (
        start.format(DATETIME_FORMAT).to_string(),
        end.format(DATETIME_FORMAT).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 58).unwrap();
        let (from, to) = utc_day_bounds(now);
        assert_eq!(from, "2025-03-31 00:00:00");
        assert_eq!(to, "2025-04-01 00:00:00");
    }

    #[test]
    fn day_bounds_roll_over_year_end() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 1).unwrap();
        let (from, to) = utc_day_bounds(now);
        assert_eq!(from, "2024-12-31 00:00:00");
        assert_eq!(to, "2025-01-01 00:00:00");
    }
}
