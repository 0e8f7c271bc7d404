// src/models/quiz_result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Category label stored when a quiz was drawn from every category.
pub const MIXED_CATEGORY: &str = "Mixed";

/// Difficulty label stored when a quiz was drawn from every difficulty.
pub const MIXED_DIFFICULTY: &str = "mixed";

/// Represents the 'quiz_results' table in the database.
/// Rows are append-only; a result is never updated after it is recorded.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    /// Assigned by the store; `None` until recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    pub category: String,
    pub score: i64,
    pub total_questions: i64,
    /// Elapsed time in seconds.
    pub time_spent: i64,
    pub difficulty: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl QuizResult {
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.score as f64 / self.total_questions as f64 * 100.0
    }

    pub fn grade(&self) -> &'static str {
        let percentage = self.percentage();
        if percentage >= 90.0 {
            "A+"
        } else if percentage >= 80.0 {
            "A"
        } else if percentage >= 70.0 {
            "B"
        } else if percentage >= 60.0 {
            "C"
        } else if percentage >= 50.0 {
            "D"
        } else {
            "F"
        }
    }
}

/// Result row joined with its owner's username, for leaderboards.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub result: QuizResult,
}

/// Aggregated statistics over one user's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub count: usize,
    pub average_percentage: f64,
    pub best: Option<QuizResult>,
}

/// Result plus derived display fields.
#[derive(Debug, Serialize)]
pub struct ResultSummary {
    #[serde(flatten)]
    pub result: QuizResult,
    pub percentage: f64,
    pub grade: &'static str,
}

impl From<QuizResult> for ResultSummary {
    fn from(result: QuizResult) -> Self {
        Self {
            percentage: result.percentage(),
            grade: result.grade(),
            result,
        }
    }
}

/// Query parameters for the leaderboard.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub category: Option<String>,
    pub limit: Option<i64>,
}
