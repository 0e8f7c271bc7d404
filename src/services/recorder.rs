// src/services/recorder.rs

use sqlx::SqlitePool;

use crate::{error::AppError, models::quiz_result::QuizResult};

/// Appends completed quiz results. Never updates or deletes rows.
#[derive(Clone)]
pub struct ResultRecorder {
    pool: SqlitePool,
}

impl ResultRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists `result` for `user_id` and returns the new row id.
    ///
    /// Not idempotent: recording the same result twice stores two rows.
    pub async fn record(&self, user_id: i64, result: &QuizResult) -> Result<i64, AppError> {
        if result.total_questions <= 0 {
            return Err(AppError::InvalidArgument(
                "A result needs at least one question".to_string(),
            ));
        }
        if result.score < 0 || result.score > result.total_questions {
            return Err(AppError::InvalidArgument(format!(
                "Score {} is outside 0..={}",
                result.score, result.total_questions
            )));
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quiz_results
            (user_id, category, score, total_questions, time_spent, difficulty, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&result.category)
        .bind(result.score)
        .bind(result.total_questions)
        .bind(result.time_spent.max(0))
        .bind(&result.difficulty)
        .bind(result.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record quiz result: {:?}", e);
            AppError::from(e)
        })?;

        tracing::info!(
            user_id,
            result_id = id,
            score = result.score,
            total = result.total_questions,
            category = %result.category,
            "Quiz result recorded"
        );

        Ok(id)
    }
}
