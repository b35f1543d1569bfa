//! Question delivery by quiz mode, with answer redaction.

use crate::error::{AppError, Result, msg};
use crate::models::{QuestionPayload, QuizMode, User};
use crate::store::TenantStore;

const QUICK_PRACTICE_LIMIT: u32 = 10;
const DEFAULT_PRACTICE_LIMIT: u32 = 20;
const MAX_PRACTICE_LIMIT: u32 = 50;

pub struct QuestionService<'a> {
    store: &'a TenantStore,
}

impl<'a> QuestionService<'a> {
    pub fn new(store: &'a TenantStore) -> Self {
        Self { store }
    }

    /// Applies the mode's selection policy, then redacts answers unless the
    /// mode is review.
    pub async fn deliver(
        &self,
        user: &User,
        mode: QuizMode,
        category: Option<&str>,
        difficulty: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<QuestionPayload>> {
        let questions = match mode {
            QuizMode::QuickPractice => {
                self.store
                    .fetch_questions(category, difficulty, QUICK_PRACTICE_LIMIT)
                    .await?
            }
            QuizMode::CategoryPractice => {
                let category = category
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| AppError::Validation(msg::CATEGORY_REQUIRED.into()))?;
                self.store
                    .fetch_questions(Some(category), difficulty, clamp_limit(limit))
                    .await?
            }
            QuizMode::Review => {
                self.store
                    .fetch_questions(category, difficulty, clamp_limit(limit))
                    .await?
            }
            QuizMode::ExamSimulation => {
                let size = self.store.tenant().exam_questions;
                self.store.fetch_exam_questions(user.id, size).await?
            }
        };

        let include_answers = mode.includes_answers();
        Ok(questions
            .iter()
            .map(|q| q.payload(include_answers))
            .collect())
    }
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_PRACTICE_LIMIT)
        .clamp(1, MAX_PRACTICE_LIMIT)
}
