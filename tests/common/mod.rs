//! Shared fixtures: an in-memory transport that mimics a tenant database,
//! a recording mail client and signed Stripe webhook payloads.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;

use examgate::config::Config;
use examgate::email::Notifier;
use examgate::error::{AppError, Result};
use examgate::handlers;
use examgate::models::accuracy_percentage;
use examgate::payments::StripeClient;
use examgate::store::{AppState, DataAccessStrategy, Operation, Row, StoreError, TenantStore};
use examgate::tenant::{Tenant, TenantRegistry};

pub const STRIPE_SECRET: &str = "sk_test_examgate";
pub const WEBHOOK_SECRET: &str = "whsec_examgate_test";

/// 64-hex tokens of the shape the service mints.
pub const TOKEN_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const TOKEN_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

pub fn test_config() -> Config {
    let vars = HashMap::from([
        ("STRIPE_SECRET_KEY", STRIPE_SECRET),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("DB_PASSWORD", "pw"),
        ("SSH_USER", "u"),
        ("SSH_PASSWORD", "p"),
    ]);
    Config::from_vars(move |name| vars.get(name).map(|v| v.to_string())).expect("test config")
}

#[derive(Clone)]
struct UserRec {
    id: i64,
    email: String,
    customer_id: String,
    payment_id: String,
    access_token: String,
    subscription_status: String,
    last_login: Option<String>,
    exam_attempts: i64,
    best_score: f64,
    total_questions_answered: i64,
}

#[derive(Clone)]
struct QuestionRec {
    id: i64,
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: Option<String>,
    option_d: Option<String>,
    correct_answer: String,
    explanation: Option<String>,
    category: Option<String>,
    difficulty: Option<String>,
}

#[derive(Clone)]
struct SessionRec {
    id: i64,
    user_id: i64,
    session_type: String,
    questions_answered: i64,
    correct_answers: i64,
    score_percentage: f64,
    completed: bool,
    started_at: String,
    completed_at: Option<String>,
}

#[derive(Clone)]
struct AnswerRec {
    user_id: i64,
    session_id: i64,
    question_id: i64,
    selected_answer: String,
    is_correct: bool,
}

struct MemoryState {
    users: Vec<UserRec>,
    questions: Vec<QuestionRec>,
    sessions: Vec<SessionRec>,
    answers: Vec<AnswerRec>,
    next_user_id: i64,
    next_session_id: i64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            questions: Vec::new(),
            sessions: Vec::new(),
            answers: Vec::new(),
            next_user_id: 1,
            next_session_id: 1,
        }
    }
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("row builders always produce objects"),
    }
}

fn ack(affected_rows: u64, last_insert_id: Option<i64>) -> Row {
    object(json!({
        "affected_rows": affected_rows,
        "last_insert_id": last_insert_id,
    }))
}

fn user_row(user: &UserRec) -> Row {
    object(json!({
        "id": user.id,
        "email": user.email,
        "stripe_customer_id": user.customer_id,
        "stripe_payment_id": user.payment_id,
        "access_token": user.access_token,
        "subscription_status": user.subscription_status,
        "created_at": "2026-01-01 00:00:00",
        "last_login": user.last_login,
        "exam_attempts": user.exam_attempts,
        "best_score": user.best_score,
        "total_questions_answered": user.total_questions_answered,
    }))
}

fn question_row(question: &QuestionRec) -> Row {
    object(json!({
        "id": question.id,
        "question_text": question.question_text,
        "option_a": question.option_a,
        "option_b": question.option_b,
        "option_c": question.option_c,
        "option_d": question.option_d,
        "correct_answer": question.correct_answer,
        "explanation": question.explanation,
        "category": question.category,
        "difficulty": question.difficulty,
    }))
}

fn session_row(session: &SessionRec) -> Row {
    // Booleans travel as TINYINT on the MySQL wire.
    object(json!({
        "id": session.id,
        "user_id": session.user_id,
        "session_type": session.session_type,
        "questions_answered": session.questions_answered,
        "correct_answers": session.correct_answers,
        "score_percentage": session.score_percentage,
        "completed": if session.completed { 1 } else { 0 },
        "started_at": session.started_at,
        "completed_at": session.completed_at,
    }))
}

/// In-memory stand-in for one tenant's database, reached like any other
/// transport. Mirrors the operation semantics of the SQL renderer.
#[derive(Default)]
pub struct MemoryStrategy {
    state: Mutex<MemoryState>,
}

impl MemoryStrategy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds an active paid user and returns its id.
    pub fn seed_user(&self, email: &str, access_token: &str, payment_id: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_user_id;
        state.next_user_id += 1;
        state.users.push(UserRec {
            id,
            email: email.to_string(),
            customer_id: format!("cus_{id}"),
            payment_id: payment_id.to_string(),
            access_token: access_token.to_string(),
            subscription_status: "active".to_string(),
            last_login: None,
            exam_attempts: 0,
            best_score: 0.0,
            total_questions_answered: 0,
        });
        id
    }

    /// Seeds a four-option question; `correct` is the winning letter.
    pub fn seed_question(
        &self,
        id: i64,
        category: Option<&str>,
        difficulty: Option<&str>,
        correct: &str,
    ) {
        let mut state = self.state.lock().unwrap();
        state.questions.push(QuestionRec {
            id,
            question_text: format!("Question {id}?"),
            option_a: "Option A".to_string(),
            option_b: "Option B".to_string(),
            option_c: Some("Option C".to_string()),
            option_d: Some("Option D".to_string()),
            correct_answer: correct.to_string(),
            explanation: Some(format!("Option {correct} is the right one.")),
            category: category.map(str::to_string),
            difficulty: difficulty.map(str::to_string),
        });
    }

    /// Seeds a completed exam attempt that started at the given time.
    pub fn seed_exam_session(&self, user_id: i64, started_at: &str, score: f64) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_session_id;
        state.next_session_id += 1;
        state.sessions.push(SessionRec {
            id,
            user_id,
            session_type: "exam_simulation".to_string(),
            questions_answered: 10,
            correct_answers: (score / 10.0) as i64,
            score_percentage: score,
            completed: true,
            started_at: started_at.to_string(),
            completed_at: Some(started_at.to_string()),
        });
        id
    }

    /// Seeds a recorded answer, as if submitted through a session.
    pub fn seed_answer(&self, user_id: i64, session_id: i64, question_id: i64, is_correct: bool) {
        let mut state = self.state.lock().unwrap();
        state.answers.push(AnswerRec {
            user_id,
            session_id,
            question_id,
            selected_answer: if is_correct { "a" } else { "b" }.to_string(),
            is_correct,
        });
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn answer_count(&self) -> usize {
        self.state.lock().unwrap().answers.len()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn token_for_payment(&self, payment_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.payment_id == payment_id)
            .map(|u| u.access_token.clone())
    }

    pub fn token_for_email(&self, email: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.access_token.clone())
    }

    pub fn last_login_of(&self, user_id: i64) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| u.last_login.clone())
    }
}

#[async_trait]
impl DataAccessStrategy for MemoryStrategy {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn execute(
        &self,
        _tenant: &Tenant,
        op: &Operation,
    ) -> std::result::Result<Vec<Row>, StoreError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let rows = match op {
            Operation::Ping => Vec::new(),

            Operation::FindUserByToken { token } => state
                .users
                .iter()
                .filter(|u| u.access_token == *token)
                .map(user_row)
                .collect(),

            Operation::FindUserByPayment { payment_id } => state
                .users
                .iter()
                .filter(|u| u.payment_id == *payment_id)
                .map(user_row)
                .collect(),

            Operation::UpsertUserOnPayment {
                email,
                customer_id,
                payment_id,
                access_token,
            } => match state.users.iter_mut().find(|u| u.email == *email) {
                Some(user) => {
                    user.payment_id = payment_id.clone();
                    user.access_token = access_token.clone();
                    user.subscription_status = "active".to_string();
                    let id = user.id;
                    vec![ack(2, Some(id))]
                }
                None => {
                    let id = state.next_user_id;
                    state.next_user_id += 1;
                    state.users.push(UserRec {
                        id,
                        email: email.clone(),
                        customer_id: customer_id.clone(),
                        payment_id: payment_id.clone(),
                        access_token: access_token.clone(),
                        subscription_status: "active".to_string(),
                        last_login: None,
                        exam_attempts: 0,
                        best_score: 0.0,
                        total_questions_answered: 0,
                    });
                    vec![ack(1, Some(id))]
                }
            },

            Operation::TouchLastLogin { user_id } => {
                if let Some(user) = state.users.iter_mut().find(|u| u.id == *user_id) {
                    user.last_login = Some("2026-08-22 12:00:00".to_string());
                }
                vec![ack(1, None)]
            }

            Operation::FetchQuestions {
                category,
                difficulty,
                limit,
            } => state
                .questions
                .iter()
                .filter(|q| {
                    category
                        .as_deref()
                        .is_none_or(|c| q.category.as_deref() == Some(c))
                })
                .filter(|q| {
                    difficulty
                        .as_deref()
                        .is_none_or(|d| q.difficulty.as_deref() == Some(d))
                })
                .take(*limit as usize)
                .map(question_row)
                .collect(),

            Operation::FetchExamQuestions { user_id, limit } => {
                let answers = &state.answers;
                let mut counted: Vec<(usize, &QuestionRec)> = state
                    .questions
                    .iter()
                    .map(|q| {
                        let times = answers
                            .iter()
                            .filter(|a| a.user_id == *user_id && a.question_id == q.id)
                            .count();
                        (times, q)
                    })
                    .collect();
                counted.sort_by_key(|(times, q)| (*times, q.id));
                counted
                    .into_iter()
                    .take(*limit as usize)
                    .map(|(_, q)| question_row(q))
                    .collect()
            }

            Operation::FindQuestion { question_id } => state
                .questions
                .iter()
                .filter(|q| q.id == *question_id)
                .map(question_row)
                .collect(),

            Operation::CreateSession {
                user_id,
                session_type,
                started_at,
            } => {
                let id = state.next_session_id;
                state.next_session_id += 1;
                state.sessions.push(SessionRec {
                    id,
                    user_id: *user_id,
                    session_type: session_type.clone(),
                    questions_answered: 0,
                    correct_answers: 0,
                    score_percentage: 0.0,
                    completed: false,
                    started_at: started_at.clone(),
                    completed_at: None,
                });
                vec![ack(1, Some(id))]
            }

            Operation::FindSession {
                session_id,
                user_id,
            } => state
                .sessions
                .iter()
                .filter(|s| s.id == *session_id && s.user_id == *user_id)
                .map(session_row)
                .collect(),

            Operation::RecordAnswer {
                user_id,
                session_id,
                question_id,
                selected_answer,
                is_correct,
                ..
            } => {
                state.answers.push(AnswerRec {
                    user_id: *user_id,
                    session_id: *session_id,
                    question_id: *question_id,
                    selected_answer: selected_answer.clone(),
                    is_correct: *is_correct,
                });
                vec![ack(1, None)]
            }

            Operation::RefreshSessionStats { session_id } => {
                let total = state
                    .answers
                    .iter()
                    .filter(|a| a.session_id == *session_id)
                    .count() as i64;
                let correct = state
                    .answers
                    .iter()
                    .filter(|a| a.session_id == *session_id && a.is_correct)
                    .count() as i64;
                if let Some(session) = state.sessions.iter_mut().find(|s| s.id == *session_id) {
                    session.questions_answered = total;
                    session.correct_answers = correct;
                    session.score_percentage = accuracy_percentage(correct, total);
                }
                vec![ack(1, None)]
            }

            Operation::FinalizeSession {
                session_id,
                user_id,
                completed_at,
            } => {
                if let Some(session) = state
                    .sessions
                    .iter_mut()
                    .find(|s| s.id == *session_id && s.user_id == *user_id)
                {
                    session.completed = true;
                    session.completed_at = Some(completed_at.clone());
                }
                vec![ack(1, None)]
            }

            Operation::RefreshUserStats { user_id } => {
                let attempts = state
                    .sessions
                    .iter()
                    .filter(|s| {
                        s.user_id == *user_id && s.session_type == "exam_simulation" && s.completed
                    })
                    .count() as i64;
                let best = state
                    .sessions
                    .iter()
                    .filter(|s| {
                        s.user_id == *user_id && s.session_type == "exam_simulation" && s.completed
                    })
                    .map(|s| s.score_percentage)
                    .fold(0.0, f64::max);
                let answered = state
                    .answers
                    .iter()
                    .filter(|a| a.user_id == *user_id)
                    .count() as i64;
                if let Some(user) = state.users.iter_mut().find(|u| u.id == *user_id) {
                    user.exam_attempts = attempts;
                    user.best_score = best;
                    user.total_questions_answered = answered;
                }
                vec![ack(1, None)]
            }

            Operation::CountExamSessions { user_id, from, to } => {
                let total = state
                    .sessions
                    .iter()
                    .filter(|s| {
                        s.user_id == *user_id
                            && s.session_type == "exam_simulation"
                            && s.started_at.as_str() >= from.as_str()
                            && s.started_at.as_str() < to.as_str()
                    })
                    .count() as i64;
                vec![object(json!({ "total": total }))]
            }

            Operation::GeneralProgress { user_id } => {
                let total = state
                    .answers
                    .iter()
                    .filter(|a| a.user_id == *user_id)
                    .count() as i64;
                let correct = state
                    .answers
                    .iter()
                    .filter(|a| a.user_id == *user_id && a.is_correct)
                    .count() as i64;
                vec![object(json!({
                    "total_questions": total,
                    "correct_answers": correct,
                }))]
            }

            Operation::CategoryProgress { user_id } => {
                let mut by_category: BTreeMap<String, (i64, i64)> = BTreeMap::new();
                for answer in state.answers.iter().filter(|a| a.user_id == *user_id) {
                    let category = state
                        .questions
                        .iter()
                        .find(|q| q.id == answer.question_id)
                        .and_then(|q| q.category.clone());
                    if let Some(category) = category {
                        let entry = by_category.entry(category).or_insert((0, 0));
                        entry.0 += 1;
                        if answer.is_correct {
                            entry.1 += 1;
                        }
                    }
                }
                by_category
                    .into_iter()
                    .map(|(category, (answered, correct))| {
                        object(json!({
                            "category": category,
                            "questions_answered": answered,
                            "correct_answers": correct,
                        }))
                    })
                    .collect()
            }

            Operation::RecentSessions { user_id, limit } => {
                let mut sessions: Vec<&SessionRec> = state
                    .sessions
                    .iter()
                    .filter(|s| s.user_id == *user_id && s.completed)
                    .collect();
                sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
                sessions
                    .into_iter()
                    .take(*limit as usize)
                    .map(session_row)
                    .collect()
            }

            Operation::ListCategories => {
                let mut counts: BTreeMap<String, i64> = BTreeMap::new();
                for question in &state.questions {
                    if let Some(category) = &question.category {
                        *counts.entry(category.clone()).or_insert(0) += 1;
                    }
                }
                counts
                    .into_iter()
                    .map(|(category, question_count)| {
                        object(json!({
                            "category": category,
                            "question_count": question_count,
                        }))
                    })
                    .collect()
            }

            Operation::CountQuestions => {
                vec![object(json!({ "total": state.questions.len() }))]
            }
            Operation::CountUsers => vec![object(json!({ "total": state.users.len() }))],
            Operation::CountSessions => {
                vec![object(json!({ "total": state.sessions.len() }))]
            }
        };
        Ok(rows)
    }
}

/// Delegates to an inner memory store but fails the listed actions.
pub struct FlakyStrategy {
    inner: Arc<MemoryStrategy>,
    failing: Vec<&'static str>,
    error: StoreError,
}

impl FlakyStrategy {
    pub fn wrap(
        inner: Arc<MemoryStrategy>,
        failing: &[&'static str],
        error: StoreError,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: failing.to_vec(),
            error,
        })
    }
}

#[async_trait]
impl DataAccessStrategy for FlakyStrategy {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn execute(
        &self,
        tenant: &Tenant,
        op: &Operation,
    ) -> std::result::Result<Vec<Row>, StoreError> {
        if self.failing.contains(&op.action()) {
            return Err(self.error.clone());
        }
        self.inner.execute(tenant, op).await
    }
}

/// A tenant whose transport is down for every operation.
pub struct DownStrategy;

#[async_trait]
impl DataAccessStrategy for DownStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn execute(
        &self,
        _tenant: &Tenant,
        _op: &Operation,
    ) -> std::result::Result<Vec<Row>, StoreError> {
        Err(StoreError::Connect("connection refused".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Mail client whose sends always fail.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _to: &str, _subject: &str, _text: &str, _html: &str) -> Result<()> {
        Err(AppError::Internal("mail service down".to_string()))
    }
}

/// Three tenants with independent in-memory stores behind one app.
pub struct TestHarness {
    pub state: AppState,
    pub aprobado: Arc<MemoryStrategy>,
    pub ciudadania: Arc<MemoryStrategy>,
    pub lifeinuk: Arc<MemoryStrategy>,
    pub mail: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(HashMap::new(), None)
    }

    /// Replaces selected tenants' transports, e.g. with a flaky or down one.
    pub fn with_strategies(overrides: HashMap<&'static str, Arc<dyn DataAccessStrategy>>) -> Self {
        Self::build(overrides, None)
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::build(HashMap::new(), Some(notifier))
    }

    fn build(
        mut overrides: HashMap<&'static str, Arc<dyn DataAccessStrategy>>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let config = test_config();
        let registry = Arc::new(TenantRegistry::from_config(&config));
        let aprobado = MemoryStrategy::new();
        let ciudadania = MemoryStrategy::new();
        let lifeinuk = MemoryStrategy::new();

        let mut stores = HashMap::new();
        for tenant in registry.iter() {
            let default: Arc<dyn DataAccessStrategy> = match tenant.id.as_str() {
                "aprobado" => aprobado.clone(),
                "ciudadania" => ciudadania.clone(),
                _ => lifeinuk.clone(),
            };
            let strategy = overrides.remove(tenant.id.as_str()).unwrap_or(default);
            stores.insert(
                tenant.id.clone(),
                TenantStore::for_tenant(tenant.clone(), strategy),
            );
        }

        let mail = RecordingNotifier::new();
        let notifier: Arc<dyn Notifier> = match notifier {
            Some(notifier) => notifier,
            None => mail.clone(),
        };
        let stripe = Arc::new(StripeClient::new(
            STRIPE_SECRET.to_string(),
            WEBHOOK_SECRET.to_string(),
        ));
        let state = AppState::from_parts(registry, stores, stripe, notifier);

        Self {
            state,
            aprobado,
            ciudadania,
            lifeinuk,
            mail,
        }
    }

    pub fn app(&self) -> Router {
        handlers::router().with_state(self.state.clone())
    }
}

type HmacSha256 = Hmac<Sha256>;

pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn stripe_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed_payload = format!("{timestamp}.{payload}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// A `checkout.session.completed` body for a paid session.
pub fn checkout_completed_event(project: &str, email: &str, payment_intent: &str) -> String {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_1",
                "payment_status": "paid",
                "customer": "cus_123",
                "payment_intent": payment_intent,
                "amount_total": 2499,
                "currency": "eur",
                "metadata": { "project": project, "user_email": email },
                "customer_details": { "email": email }
            }
        }
    })
    .to_string()
}
