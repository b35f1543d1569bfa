use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::row::{bool_from_int, opt_f64_lenient};

/// Delivery modes. The mode decides question count, selection policy and
/// whether answers ship with the questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizMode {
    QuickPractice,
    CategoryPractice,
    Review,
    ExamSimulation,
}

impl QuizMode {
    pub fn as_str(self) -> &'static str {
        match self {
            QuizMode::QuickPractice => "quick_practice",
            QuizMode::CategoryPractice => "category_practice",
            QuizMode::Review => "review",
            QuizMode::ExamSimulation => "exam_simulation",
        }
    }

    /// Only review mode may see correct answers and explanations.
    pub fn includes_answers(self) -> bool {
        matches!(self, QuizMode::Review)
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick_practice" => Ok(QuizMode::QuickPractice),
            "category_practice" => Ok(QuizMode::CategoryPractice),
            "review" => Ok(QuizMode::Review),
            "exam_simulation" => Ok(QuizMode::ExamSimulation),
            other => Err(format!("unknown quiz mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeSession {
    pub id: i64,
    pub user_id: i64,
    pub session_type: String,
    #[serde(default)]
    pub questions_answered: Option<i64>,
    #[serde(default)]
    pub correct_answers: Option<i64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    pub score_percentage: Option<f64>,
    #[serde(default, deserialize_with = "bool_from_int")]
    pub completed: bool,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl PracticeSession {
    pub fn payload(&self, pass_score: u32) -> SessionPayload {
        let score = self.score_percentage.unwrap_or(0.0);
        SessionPayload {
            id: self.id,
            session_type: self.session_type.clone(),
            questions_answered: self.questions_answered.unwrap_or(0),
            correct_answers: self.correct_answers.unwrap_or(0),
            score_percentage: score,
            completed: self.completed,
            passed: score >= pass_score as f64,
            started_at: self.started_at.clone(),
            completed_at: self.completed_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionPayload {
    pub id: i64,
    pub session_type: String,
    pub questions_answered: i64,
    pub correct_answers: i64,
    pub score_percentage: f64,
    pub completed: bool,
    /// Score at or above the tenant pass mark.
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}
