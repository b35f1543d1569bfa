//! Per-tenant data access. Every tenant database is reached through a
//! [`DataAccessStrategy`]; the [`TenantStore`] facade turns typed operations
//! into rows and rows back into models, so handlers never touch SQL or
//! transports.

pub mod direct;
pub mod op;
pub mod proxy;
pub mod row;
pub mod sql;
pub mod strategy;
pub mod tunnel;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub use op::{Operation, OperationKind};
pub use row::Row;
pub use strategy::{DataAccessStrategy, FallbackStrategy, StoreError};

use crate::config::Config;
use crate::email::{Notifier, ResendNotifier};
use crate::error::{AppError, msg};
use crate::models::{
    CategoryCount, CategoryProgress, GeneralProgress, PracticeSession, Question, User,
    accuracy_percentage,
};
use crate::payments::StripeClient;
use crate::tenant::{Tenant, TenantRegistry, TransportKind};

use direct::DirectStrategy;
use proxy::ProxyStrategy;
use tunnel::TunnelStrategy;

/// MySQL DATETIME rendering for timestamps generated on this side.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_datetime() -> String {
    Utc::now().format(DATETIME_FORMAT).to_string()
}

fn strategy_for(tenant: &Tenant) -> Arc<dyn DataAccessStrategy> {
    match tenant.transport {
        TransportKind::Direct => Arc::new(DirectStrategy),
        TransportKind::Tunnel => Arc::new(TunnelStrategy),
        TransportKind::Proxy => Arc::new(ProxyStrategy::new()),
        TransportKind::Auto => Arc::new(FallbackStrategy::new(
            Arc::new(DirectStrategy),
            Arc::new(TunnelStrategy),
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
struct WriteAck {
    #[serde(default)]
    affected_rows: u64,
    #[serde(default)]
    last_insert_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CountRow {
    #[serde(default)]
    total: i64,
}

#[derive(Debug, Default, Deserialize)]
struct GeneralRow {
    #[serde(default)]
    total_questions: i64,
    #[serde(default)]
    correct_answers: i64,
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    category: String,
    #[serde(default)]
    questions_answered: i64,
    #[serde(default)]
    correct_answers: i64,
}

/// All reads and writes for one tenant's database.
#[derive(Clone)]
pub struct TenantStore {
    tenant: Arc<Tenant>,
    strategy: Arc<dyn DataAccessStrategy>,
}

impl TenantStore {
    pub fn new(tenant: Arc<Tenant>) -> Self {
        let strategy = strategy_for(&tenant);
        Self { tenant, strategy }
    }

    /// Store with an explicit strategy, bypassing transport selection.
    pub fn for_tenant(tenant: Arc<Tenant>, strategy: Arc<dyn DataAccessStrategy>) -> Self {
        Self { tenant, strategy }
    }

    pub fn tenant(&self) -> &Arc<Tenant> {
        &self.tenant
    }

    pub fn transport_name(&self) -> &'static str {
        self.strategy.name()
    }

    async fn run(&self, op: Operation) -> Result<Vec<Row>, StoreError> {
        self.strategy.execute(&self.tenant, &op).await
    }

    async fn fetch_all<T: DeserializeOwned>(&self, op: Operation) -> Result<Vec<T>, StoreError> {
        self.run(op).await?.into_iter().map(row::decode).collect()
    }

    async fn fetch_first<T: DeserializeOwned>(
        &self,
        op: Operation,
    ) -> Result<Option<T>, StoreError> {
        let mut rows = self.run(op).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            row::decode(rows.remove(0)).map(Some)
        }
    }

    async fn execute(&self, op: Operation) -> Result<WriteAck, StoreError> {
        let mut rows = self.run(op).await?;
        if rows.is_empty() {
            Ok(WriteAck::default())
        } else {
            row::decode(rows.remove(0))
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.run(Operation::Ping).await?;
        Ok(())
    }

    pub async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.fetch_first(Operation::FindUserByToken {
            token: token.to_string(),
        })
        .await
    }

    pub async fn find_user_by_payment(&self, payment_id: &str) -> Result<Option<User>, StoreError> {
        self.fetch_first(Operation::FindUserByPayment {
            payment_id: payment_id.to_string(),
        })
        .await
    }

    pub async fn upsert_user_on_payment(
        &self,
        email: &str,
        customer_id: &str,
        payment_id: &str,
        access_token: &str,
    ) -> Result<(), StoreError> {
        self.execute(Operation::UpsertUserOnPayment {
            email: email.to_string(),
            customer_id: customer_id.to_string(),
            payment_id: payment_id.to_string(),
            access_token: access_token.to_string(),
        })
        .await?;
        Ok(())
    }

    pub async fn touch_last_login(&self, user_id: i64) -> Result<(), StoreError> {
        self.execute(Operation::TouchLastLogin { user_id }).await?;
        Ok(())
    }

    pub async fn fetch_questions(
        &self,
        category: Option<&str>,
        difficulty: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Question>, StoreError> {
        self.fetch_all(Operation::FetchQuestions {
            category: category.map(str::to_string),
            difficulty: difficulty.map(str::to_string),
            limit,
        })
        .await
    }

    /// Questions the user has answered least often, for exam assembly.
    pub async fn fetch_exam_questions(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<Question>, StoreError> {
        self.fetch_all(Operation::FetchExamQuestions { user_id, limit })
            .await
    }

    pub async fn find_question(&self, question_id: i64) -> Result<Option<Question>, StoreError> {
        self.fetch_first(Operation::FindQuestion { question_id })
            .await
    }

    /// Returns the new session id.
    pub async fn create_session(
        &self,
        user_id: i64,
        session_type: &str,
    ) -> Result<i64, StoreError> {
        let ack = self
            .execute(Operation::CreateSession {
                user_id,
                session_type: session_type.to_string(),
                started_at: now_datetime(),
            })
            .await?;
        let id = ack
            .last_insert_id
            .filter(|id| *id != 0)
            .ok_or_else(|| StoreError::Decode("create_session returned no insert id".into()))?;
        i64::try_from(id).map_err(|_| StoreError::Decode("insert id out of range".into()))
    }

    pub async fn find_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<Option<PracticeSession>, StoreError> {
        self.fetch_first(Operation::FindSession {
            session_id,
            user_id,
        })
        .await
    }

    pub async fn record_answer(
        &self,
        user_id: i64,
        session_id: i64,
        question_id: i64,
        selected_answer: &str,
        is_correct: bool,
        time_spent_seconds: i64,
    ) -> Result<(), StoreError> {
        self.execute(Operation::RecordAnswer {
            user_id,
            session_id,
            question_id,
            selected_answer: selected_answer.to_string(),
            is_correct,
            time_spent_seconds,
            answered_at: now_datetime(),
        })
        .await?;
        Ok(())
    }

    /// Recomputes the session's answer counters from its recorded answers.
    pub async fn refresh_session_stats(&self, session_id: i64) -> Result<(), StoreError> {
        self.execute(Operation::RefreshSessionStats { session_id })
            .await?;
        Ok(())
    }

    pub async fn finalize_session(&self, session_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.execute(Operation::FinalizeSession {
            session_id,
            user_id,
            completed_at: now_datetime(),
        })
        .await?;
        Ok(())
    }

    /// Recomputes the user's rollup columns from sessions and answers.
    pub async fn refresh_user_stats(&self, user_id: i64) -> Result<(), StoreError> {
        self.execute(Operation::RefreshUserStats { user_id }).await?;
        Ok(())
    }

    pub async fn count_exam_sessions_between(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> Result<i64, StoreError> {
        let row: Option<CountRow> = self
            .fetch_first(Operation::CountExamSessions {
                user_id,
                from: from.to_string(),
                to: to.to_string(),
            })
            .await?;
        Ok(row.map(|r| r.total).unwrap_or(0))
    }

    pub async fn general_progress(&self, user_id: i64) -> Result<GeneralProgress, StoreError> {
        let row: Option<GeneralRow> = self
            .fetch_first(Operation::GeneralProgress { user_id })
            .await?;
        let row = row.unwrap_or_default();
        Ok(GeneralProgress {
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            accuracy_percentage: accuracy_percentage(row.correct_answers, row.total_questions),
        })
    }

    pub async fn category_progress(
        &self,
        user_id: i64,
    ) -> Result<Vec<CategoryProgress>, StoreError> {
        let rows: Vec<CategoryRow> = self
            .fetch_all(Operation::CategoryProgress { user_id })
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| CategoryProgress {
                category: r.category,
                questions_answered: r.questions_answered,
                correct_answers: r.correct_answers,
                accuracy_percentage: accuracy_percentage(r.correct_answers, r.questions_answered),
            })
            .collect())
    }

    pub async fn recent_sessions(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<PracticeSession>, StoreError> {
        self.fetch_all(Operation::RecentSessions { user_id, limit })
            .await
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryCount>, StoreError> {
        self.fetch_all(Operation::ListCategories).await
    }

    pub async fn count_questions(&self) -> Result<i64, StoreError> {
        let row: Option<CountRow> = self.fetch_first(Operation::CountQuestions).await?;
        Ok(row.map(|r| r.total).unwrap_or(0))
    }

    pub async fn count_users(&self) -> Result<i64, StoreError> {
        let row: Option<CountRow> = self.fetch_first(Operation::CountUsers).await?;
        Ok(row.map(|r| r.total).unwrap_or(0))
    }

    pub async fn count_sessions(&self) -> Result<i64, StoreError> {
        let row: Option<CountRow> = self.fetch_first(Operation::CountSessions).await?;
        Ok(row.map(|r| r.total).unwrap_or(0))
    }
}

/// Application state shared by all handlers: the tenant registry, one store
/// per tenant and the outbound service clients.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TenantRegistry>,
    stores: Arc<HashMap<String, TenantStore>>,
    pub stripe: Arc<StripeClient>,
    pub notifier: Arc<dyn Notifier>,
    pub stripe_configured: bool,
    pub mail_configured: bool,
    pub dev_mode: bool,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let registry = Arc::new(TenantRegistry::from_config(config));
        let stores = registry
            .iter()
            .map(|tenant| (tenant.id.clone(), TenantStore::new(tenant.clone())))
            .collect();
        Self {
            registry,
            stores: Arc::new(stores),
            stripe: Arc::new(StripeClient::new(
                config.stripe_secret_key.clone(),
                config.stripe_webhook_secret.clone(),
            )),
            notifier: Arc::new(ResendNotifier::new(
                config.resend_api_key.clone(),
                config.mail_from.clone(),
            )),
            stripe_configured: !config.stripe_secret_key.is_empty(),
            mail_configured: config.resend_api_key.is_some(),
            dev_mode: config.dev_mode,
        }
    }

    /// Assembles state from pre-built parts so tests can swap transports
    /// and the mail client.
    pub fn from_parts(
        registry: Arc<TenantRegistry>,
        stores: HashMap<String, TenantStore>,
        stripe: Arc<StripeClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            stores: Arc::new(stores),
            stripe,
            notifier,
            stripe_configured: true,
            mail_configured: true,
            dev_mode: false,
        }
    }

    pub fn store(&self, tenant_id: &str) -> Result<&TenantStore, AppError> {
        self.stores
            .get(tenant_id)
            .ok_or_else(|| AppError::NotFound(msg::UNKNOWN_TENANT.into()))
    }
}
