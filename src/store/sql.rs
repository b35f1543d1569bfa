use mysql_async::{Params, Value};

use super::op::Operation;

pub(crate) const USER_COLUMNS: &str = "id, email, subscription_status, created_at, last_login, \
     exam_attempts, best_score, total_questions_answered";

pub(crate) const QUESTION_COLUMNS: &str = "id, question_text, option_a, option_b, option_c, \
     option_d, correct_answer, explanation, category, difficulty";

pub(crate) const SESSION_COLUMNS: &str = "id, user_id, session_type, questions_answered, \
     correct_answers, score_percentage, completed, started_at, completed_at";

/// Renders a descriptor into a MySQL statement with positional parameters.
/// This is the only place SQL text exists.
pub fn render(op: &Operation) -> (String, Params) {
    match op {
        Operation::Ping => ("SELECT 1 AS ok".to_string(), Params::Empty),

        Operation::FindUserByToken { token } => (
            format!(
                "SELECT {USER_COLUMNS} FROM users \
                 WHERE access_token = ? AND subscription_status = 'active' LIMIT 1"
            ),
            positional(vec![Value::from(token.as_str())]),
        ),

        Operation::FindUserByPayment { payment_id } => (
            format!("SELECT {USER_COLUMNS} FROM users WHERE stripe_payment_id = ? LIMIT 1"),
            positional(vec![Value::from(payment_id.as_str())]),
        ),

        // Keyed on the unique email. A returning buyer gets a rotated token
        // and a reactivated subscription; the first customer id is kept.
        Operation::UpsertUserOnPayment {
            email,
            customer_id,
            payment_id,
            access_token,
        } => (
            "INSERT INTO users \
             (email, stripe_customer_id, stripe_payment_id, access_token, subscription_status) \
             VALUES (?, ?, ?, ?, 'active') \
             ON DUPLICATE KEY UPDATE \
             stripe_payment_id = VALUES(stripe_payment_id), \
             access_token = VALUES(access_token), \
             subscription_status = 'active'"
                .to_string(),
            positional(vec![
                Value::from(email.as_str()),
                Value::from(customer_id.as_str()),
                Value::from(payment_id.as_str()),
                Value::from(access_token.as_str()),
            ]),
        ),

        Operation::TouchLastLogin { user_id } => (
            "UPDATE users SET last_login = NOW() WHERE id = ?".to_string(),
            positional(vec![Value::from(*user_id)]),
        ),

        Operation::FetchQuestions {
            category,
            difficulty,
            limit,
        } => {
            let mut sql = format!("SELECT {QUESTION_COLUMNS} FROM questions");
            let mut clauses: Vec<&str> = Vec::new();
            let mut params: Vec<Value> = Vec::new();
            if let Some(category) = category {
                clauses.push("category = ?");
                params.push(Value::from(category.as_str()));
            }
            if let Some(difficulty) = difficulty {
                clauses.push("difficulty = ?");
                params.push(Value::from(difficulty.as_str()));
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY RAND() LIMIT ?");
            params.push(Value::from(*limit));
            (sql, positional(params))
        }

        // Least-answered questions first, random order within each count.
        Operation::FetchExamQuestions { user_id, limit } => (
            format!(
                "SELECT q.id, q.question_text, q.option_a, q.option_b, q.option_c, q.option_d, \
                 q.correct_answer, q.explanation, q.category, q.difficulty, \
                 COUNT(ua.id) AS times_answered \
                 FROM questions q \
                 LEFT JOIN user_answers ua ON ua.question_id = q.id AND ua.user_id = ? \
                 GROUP BY q.id \
                 ORDER BY times_answered ASC, RAND() \
                 LIMIT ?"
            ),
            positional(vec![Value::from(*user_id), Value::from(*limit)]),
        ),

        Operation::FindQuestion { question_id } => (
            format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ? LIMIT 1"),
            positional(vec![Value::from(*question_id)]),
        ),

        Operation::CreateSession {
            user_id,
            session_type,
            started_at,
        } => (
            "INSERT INTO practice_sessions (user_id, session_type, started_at, completed) \
             VALUES (?, ?, ?, 0)"
                .to_string(),
            positional(vec![
                Value::from(*user_id),
                Value::from(session_type.as_str()),
                Value::from(started_at.as_str()),
            ]),
        ),

        Operation::FindSession {
            session_id,
            user_id,
        } => (
            format!(
                "SELECT {SESSION_COLUMNS} FROM practice_sessions \
                 WHERE id = ? AND user_id = ? LIMIT 1"
            ),
            positional(vec![Value::from(*session_id), Value::from(*user_id)]),
        ),

        Operation::RecordAnswer {
            user_id,
            session_id,
            question_id,
            selected_answer,
            is_correct,
            time_spent_seconds,
            answered_at,
        } => (
            "INSERT INTO user_answers \
             (user_id, session_id, question_id, selected_answer, is_correct, \
             time_spent_seconds, answered_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)"
                .to_string(),
            positional(vec![
                Value::from(*user_id),
                Value::from(*session_id),
                Value::from(*question_id),
                Value::from(selected_answer.as_str()),
                Value::from(*is_correct),
                Value::from(*time_spent_seconds),
                Value::from(answered_at.as_str()),
            ]),
        ),

        // Session aggregates are recomputed from the answer log, never
        // incremented.
        Operation::RefreshSessionStats { session_id } => (
            "UPDATE practice_sessions SET \
             questions_answered = (SELECT COUNT(*) FROM user_answers WHERE session_id = ?), \
             correct_answers = (SELECT COUNT(*) FROM user_answers \
             WHERE session_id = ? AND is_correct = 1), \
             score_percentage = (SELECT IFNULL(ROUND(SUM(is_correct) * 100.0 / COUNT(*), 2), 0) \
             FROM user_answers WHERE session_id = ?) \
             WHERE id = ?"
                .to_string(),
            positional(vec![
                Value::from(*session_id),
                Value::from(*session_id),
                Value::from(*session_id),
                Value::from(*session_id),
            ]),
        ),

        Operation::FinalizeSession {
            session_id,
            user_id,
            completed_at,
        } => (
            "UPDATE practice_sessions SET \
             completed = 1, \
             completed_at = ?, \
             questions_answered = (SELECT COUNT(*) FROM user_answers WHERE session_id = ?), \
             correct_answers = (SELECT COUNT(*) FROM user_answers \
             WHERE session_id = ? AND is_correct = 1), \
             score_percentage = (SELECT IFNULL(ROUND(SUM(is_correct) * 100.0 / COUNT(*), 2), 0) \
             FROM user_answers WHERE session_id = ?) \
             WHERE id = ? AND user_id = ?"
                .to_string(),
            positional(vec![
                Value::from(completed_at.as_str()),
                Value::from(*session_id),
                Value::from(*session_id),
                Value::from(*session_id),
                Value::from(*session_id),
                Value::from(*user_id),
            ]),
        ),

        Operation::RefreshUserStats { user_id } => (
            "UPDATE users SET \
             total_questions_answered = (SELECT COUNT(*) FROM user_answers WHERE user_id = ?), \
             exam_attempts = (SELECT COUNT(*) FROM practice_sessions \
             WHERE user_id = ? AND session_type = 'exam_simulation' AND completed = 1), \
             best_score = (SELECT IFNULL(MAX(score_percentage), 0) FROM practice_sessions \
             WHERE user_id = ? AND completed = 1) \
             WHERE id = ?"
                .to_string(),
            positional(vec![
                Value::from(*user_id),
                Value::from(*user_id),
                Value::from(*user_id),
                Value::from(*user_id),
            ]),
        ),

        Operation::CountExamSessions { user_id, from, to } => (
            "SELECT COUNT(*) AS total FROM practice_sessions \
             WHERE user_id = ? AND session_type = 'exam_simulation' \
             AND started_at >= ? AND started_at < ?"
                .to_string(),
            positional(vec![
                Value::from(*user_id),
                Value::from(from.as_str()),
                Value::from(to.as_str()),
            ]),
        ),

        // SUM over TINYINT comes back as DECIMAL; CAST keeps the wire type
        // integral for every transport.
        Operation::GeneralProgress { user_id } => (
            "SELECT COUNT(*) AS total_questions, \
             CAST(IFNULL(SUM(is_correct), 0) AS SIGNED) AS correct_answers \
             FROM user_answers WHERE user_id = ?"
                .to_string(),
            positional(vec![Value::from(*user_id)]),
        ),

        Operation::CategoryProgress { user_id } => (
            "SELECT q.category AS category, COUNT(*) AS questions_answered, \
             CAST(IFNULL(SUM(ua.is_correct), 0) AS SIGNED) AS correct_answers \
             FROM user_answers ua \
             JOIN questions q ON q.id = ua.question_id \
             WHERE ua.user_id = ? AND q.category IS NOT NULL \
             GROUP BY q.category \
             ORDER BY q.category"
                .to_string(),
            positional(vec![Value::from(*user_id)]),
        ),

        Operation::RecentSessions { user_id, limit } => (
            format!(
                "SELECT {SESSION_COLUMNS} FROM practice_sessions \
                 WHERE user_id = ? AND completed = 1 \
                 ORDER BY started_at DESC LIMIT ?"
            ),
            positional(vec![Value::from(*user_id), Value::from(*limit)]),
        ),

        Operation::ListCategories => (
            "SELECT category, COUNT(*) AS question_count FROM questions \
             WHERE category IS NOT NULL \
             GROUP BY category ORDER BY category"
                .to_string(),
            Params::Empty,
        ),

        Operation::CountQuestions => (
            "SELECT COUNT(*) AS total FROM questions".to_string(),
            Params::Empty,
        ),

        Operation::CountUsers => (
            "SELECT COUNT(*) AS total FROM users".to_string(),
            Params::Empty,
        ),

        Operation::CountSessions => (
            "SELECT COUNT(*) AS total FROM practice_sessions".to_string(),
            Params::Empty,
        ),
    }
}

fn positional(params: Vec<Value>) -> Params {
    Params::Positional(params)
}
