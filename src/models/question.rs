use serde::{Deserialize, Serialize};

/// A question row as stored per tenant. Banks have two to four options;
/// `option_c`/`option_d` are NULL where unused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    #[serde(default)]
    pub option_c: Option<String>,
    #[serde(default)]
    pub option_d: Option<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl Question {
    /// Server-side correctness check. Client-reported correctness is never
    /// trusted.
    pub fn is_correct_choice(&self, selected: &str) -> bool {
        self.correct_answer.trim().eq_ignore_ascii_case(selected.trim())
    }

    pub fn payload(&self, include_answers: bool) -> QuestionPayload {
        QuestionPayload {
            id: self.id,
            question_text: self.question_text.clone(),
            option_a: self.option_a.clone(),
            option_b: self.option_b.clone(),
            option_c: self.option_c.clone(),
            option_d: self.option_d.clone(),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            correct_answer: include_answers.then(|| self.correct_answer.clone()),
            explanation: if include_answers {
                self.explanation.clone()
            } else {
                None
            },
        }
    }
}

/// Client-facing question. Answer fields are omitted entirely outside review
/// mode, not serialized as null.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionPayload {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub question_count: i64,
}
