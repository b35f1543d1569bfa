use serde::Serialize;

use crate::models::SessionPayload;

/// Computed from the answer log at read time, never from cached counters.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub general: GeneralProgress,
    pub categories: Vec<CategoryProgress>,
    pub recent_sessions: Vec<SessionPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneralProgress {
    pub total_questions: i64,
    pub correct_answers: i64,
    pub accuracy_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryProgress {
    pub category: String,
    pub questions_answered: i64,
    pub correct_answers: i64,
    pub accuracy_percentage: f64,
}

/// Percentage of correct answers, two decimals, 0 when nothing was answered.
pub fn accuracy_percentage(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = correct as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}
