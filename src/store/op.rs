use serde_json::{Map, Value, json};

/// Whether an operation returns result rows or a write acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Fetch,
    Execute,
}

/// Typed descriptor for every statement the service runs against a tenant
/// store. Handlers never see SQL; each transport renders or forwards these.
#[derive(Debug, Clone)]
pub enum Operation {
    Ping,
    FindUserByToken {
        token: String,
    },
    FindUserByPayment {
        payment_id: String,
    },
    UpsertUserOnPayment {
        email: String,
        customer_id: String,
        payment_id: String,
        access_token: String,
    },
    TouchLastLogin {
        user_id: i64,
    },
    FetchQuestions {
        category: Option<String>,
        difficulty: Option<String>,
        limit: u32,
    },
    FetchExamQuestions {
        user_id: i64,
        limit: u32,
    },
    FindQuestion {
        question_id: i64,
    },
    CreateSession {
        user_id: i64,
        session_type: String,
        started_at: String,
    },
    FindSession {
        session_id: i64,
        user_id: i64,
    },
    RecordAnswer {
        user_id: i64,
        session_id: i64,
        question_id: i64,
        selected_answer: String,
        is_correct: bool,
        time_spent_seconds: i64,
        answered_at: String,
    },
    RefreshSessionStats {
        session_id: i64,
    },
    FinalizeSession {
        session_id: i64,
        user_id: i64,
        completed_at: String,
    },
    RefreshUserStats {
        user_id: i64,
    },
    CountExamSessions {
        user_id: i64,
        from: String,
        to: String,
    },
    GeneralProgress {
        user_id: i64,
    },
    CategoryProgress {
        user_id: i64,
    },
    RecentSessions {
        user_id: i64,
        limit: u32,
    },
    ListCategories,
    CountQuestions,
    CountUsers,
    CountSessions,
}

impl Operation {
    /// Stable action name, also the RPC verb understood by proxy bridges.
    pub fn action(&self) -> &'static str {
        match self {
            Operation::Ping => "ping",
            Operation::FindUserByToken { .. } => "find_user_by_token",
            Operation::FindUserByPayment { .. } => "find_user_by_payment",
            Operation::UpsertUserOnPayment { .. } => "upsert_user",
            Operation::TouchLastLogin { .. } => "touch_last_login",
            Operation::FetchQuestions { .. } => "get_questions",
            Operation::FetchExamQuestions { .. } => "get_exam_questions",
            Operation::FindQuestion { .. } => "get_question",
            Operation::CreateSession { .. } => "create_session",
            Operation::FindSession { .. } => "get_session",
            Operation::RecordAnswer { .. } => "record_answer",
            Operation::RefreshSessionStats { .. } => "refresh_session_stats",
            Operation::FinalizeSession { .. } => "finalize_session",
            Operation::RefreshUserStats { .. } => "refresh_user_stats",
            Operation::CountExamSessions { .. } => "count_exam_sessions",
            Operation::GeneralProgress { .. } => "general_progress",
            Operation::CategoryProgress { .. } => "category_progress",
            Operation::RecentSessions { .. } => "recent_sessions",
            Operation::ListCategories => "get_categories",
            Operation::CountQuestions => "count_questions",
            Operation::CountUsers => "count_users",
            Operation::CountSessions => "count_sessions",
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::UpsertUserOnPayment { .. }
            | Operation::TouchLastLogin { .. }
            | Operation::CreateSession { .. }
            | Operation::RecordAnswer { .. }
            | Operation::RefreshSessionStats { .. }
            | Operation::FinalizeSession { .. }
            | Operation::RefreshUserStats { .. } => OperationKind::Execute,
            _ => OperationKind::Fetch,
        }
    }

    /// Parameters for the proxy envelope, keyed by field name.
    pub fn params(&self) -> Map<String, Value> {
        let value = match self {
            Operation::Ping
            | Operation::ListCategories
            | Operation::CountQuestions
            | Operation::CountUsers
            | Operation::CountSessions => json!({}),
            Operation::FindUserByToken { token } => json!({ "token": token }),
            Operation::FindUserByPayment { payment_id } => json!({ "payment_id": payment_id }),
            Operation::UpsertUserOnPayment {
                email,
                customer_id,
                payment_id,
                access_token,
            } => json!({
                "email": email,
                "stripe_customer_id": customer_id,
                "stripe_payment_id": payment_id,
                "access_token": access_token,
            }),
            Operation::TouchLastLogin { user_id } => json!({ "user_id": user_id }),
            Operation::FetchQuestions {
                category,
                difficulty,
                limit,
            } => json!({
                "category": category,
                "difficulty": difficulty,
                "limit": limit,
            }),
            Operation::FetchExamQuestions { user_id, limit } => {
                json!({ "user_id": user_id, "limit": limit })
            }
            Operation::FindQuestion { question_id } => json!({ "question_id": question_id }),
            Operation::CreateSession {
                user_id,
                session_type,
                started_at,
            } => json!({
                "user_id": user_id,
                "session_type": session_type,
                "started_at": started_at,
            }),
            Operation::FindSession {
                session_id,
                user_id,
            } => json!({ "session_id": session_id, "user_id": user_id }),
            Operation::RecordAnswer {
                user_id,
                session_id,
                question_id,
                selected_answer,
                is_correct,
                time_spent_seconds,
                answered_at,
            } => json!({
                "user_id": user_id,
                "session_id": session_id,
                "question_id": question_id,
                "selected_answer": selected_answer,
                "is_correct": is_correct,
                "time_spent_seconds": time_spent_seconds,
                "answered_at": answered_at,
            }),
            Operation::RefreshSessionStats { session_id } => {
                json!({ "session_id": session_id })
            }
            Operation::FinalizeSession {
                session_id,
                user_id,
                completed_at,
            } => json!({
                "session_id": session_id,
                "user_id": user_id,
                "completed_at": completed_at,
            }),
            Operation::RefreshUserStats { user_id } => json!({ "user_id": user_id }),
            Operation::CountExamSessions { user_id, from, to } => {
                json!({ "user_id": user_id, "from": from, "to": to })
            }
            Operation::GeneralProgress { user_id }
            | Operation::CategoryProgress { user_id } => json!({ "user_id": user_id }),
            Operation::RecentSessions { user_id, limit } => {
                json!({ "user_id": user_id, "limit": limit })
            }
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
