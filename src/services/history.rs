// src/services/history.rs

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::quiz_result::{LeaderboardEntry, QuizResult, UserStats},
};

/// Read-only queries over recorded results.
#[derive(Clone)]
pub struct HistoryQuery {
    pool: SqlitePool,
}

impl HistoryQuery {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All results of `user_id`, most recent first.
    pub async fn user_history(&self, user_id: i64) -> Result<Vec<QuizResult>, AppError> {
        let results = sqlx::query_as::<_, QuizResult>(
            r#"
            SELECT id, user_id, category, score, total_questions, time_spent, difficulty, completed_at
            FROM quiz_results
            WHERE user_id = ?
            ORDER BY completed_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user history: {:?}", e);
            AppError::from(e)
        })?;

        Ok(results)
    }

    /// Best results in `category`: highest accuracy first, faster runs win ties.
    pub async fn top_scores(
        &self,
        category: &str,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT
                u.username,
                r.id, r.user_id, r.category, r.score, r.total_questions,
                r.time_spent, r.difficulty, r.completed_at
            FROM quiz_results r
            JOIN users u ON r.user_id = u.id
            WHERE r.category = ?
            ORDER BY (CAST(r.score AS REAL) / r.total_questions) DESC, r.time_spent ASC, r.id ASC
            LIMIT ?
            "#,
        )
        .bind(category)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard: {:?}", e);
            AppError::from(e)
        })?;

        Ok(entries)
    }

    pub async fn aggregate_stats(&self, user_id: i64) -> Result<UserStats, AppError> {
        let history = self.user_history(user_id).await?;
        Ok(aggregate(&history))
    }
}

/// Unweighted mean of per-result percentages, plus the best result.
/// Ties on percentage go to the earliest completion.
pub fn aggregate(results: &[QuizResult]) -> UserStats {
    if results.is_empty() {
        return UserStats {
            count: 0,
            average_percentage: 0.0,
            best: None,
        };
    }

    let total: f64 = results.iter().map(QuizResult::percentage).sum();
    let best = results.iter().fold(None::<&QuizResult>, |best, r| match best {
        None => Some(r),
        Some(b) => {
            let (rp, bp) = (r.percentage(), b.percentage());
            if rp > bp || (rp == bp && r.completed_at < b.completed_at) {
                Some(r)
            } else {
                Some(b)
            }
        }
    });

    UserStats {
        count: results.len(),
        average_percentage: total / results.len() as f64,
        best: best.cloned(),
    }
}
