// src/services/question_repo.rs

use rand::{Rng, seq::SliceRandom};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    models::question::{
        Difficulty, NewQuestion, Question, UpdateQuestionRequest, into_option_array,
        normalize_label,
    },
};

const QUESTION_COLUMNS: &str = "SELECT id, category, content, option_a, option_b, option_c, \
     option_d, correct_answer, difficulty, created_at FROM questions";

/// Access to the question bank.
#[derive(Clone)]
pub struct QuestionRepository {
    pool: SqlitePool,
}

impl QuestionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Draws up to `count` distinct questions matching both filters.
    ///
    /// The matching set is shuffled with `rng` before truncation, so every
    /// subset is equally likely. An empty bank yields an empty vector.
    pub async fn sample<R>(
        &self,
        count: usize,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
        rng: &mut R,
    ) -> Result<Vec<Question>, AppError>
    where
        R: Rng + ?Sized,
    {
        if count == 0 {
            return Err(AppError::InvalidArgument(
                "Question count must be positive".to_string(),
            ));
        }

        let mut questions = self.list_filtered(category, difficulty).await?;
        questions.shuffle(rng);
        questions.truncate(count);

        tracing::debug!(
            requested = count,
            returned = questions.len(),
            ?category,
            ?difficulty,
            "Sampled questions"
        );
        Ok(questions)
    }

    pub async fn list_all(&self) -> Result<Vec<Question>, AppError> {
        self.list_filtered(None, None).await
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Question>, AppError> {
        self.list_filtered(Some(category), None).await
    }

    pub async fn list_by_difficulty(
        &self,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>, AppError> {
        self.list_filtered(None, Some(difficulty)).await
    }

    /// Lists questions matching every provided filter. Blank category labels
    /// are treated as absent.
    pub async fn list_filtered(
        &self,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Question>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(QUESTION_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(category) = normalize_label(category) {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }
        if let Some(difficulty) = difficulty {
            builder.push(" AND difficulty = ");
            builder.push_bind(difficulty);
        }
        builder.push(" ORDER BY category, created_at DESC, id DESC");

        let questions = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch questions: {:?}", e);
                AppError::from(e)
            })?;

        Ok(questions)
    }

    pub async fn get(&self, id: i64) -> Result<Question, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(QUESTION_COLUMNS);
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        builder
            .build_query_as::<Question>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Question not found".to_string()))
    }

    pub async fn insert(&self, question: &NewQuestion) -> Result<i64, AppError> {
        let [a, b, c, d] = &question.options;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions
            (category, content, option_a, option_b, option_c, option_d, correct_answer, difficulty)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&question.category)
        .bind(&question.content)
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(question.correct_answer as i64)
        .bind(question.difficulty)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert question: {:?}", e);
            AppError::from(e)
        })?;

        Ok(id)
    }

    /// Applies the present fields of `changes` to question `id`.
    pub async fn update(&self, id: i64, changes: UpdateQuestionRequest) -> Result<(), AppError> {
        if changes.is_empty() {
            // Still report a missing row.
            self.get(id).await?;
            return Ok(());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");

        if let Some(category) = changes.category {
            separated.push("category = ");
            separated.push_bind_unseparated(category);
        }

        if let Some(content) = changes.content {
            separated.push("content = ");
            separated.push_bind_unseparated(content);
        }

        if let Some(options) = changes.options {
            let [a, b, c, d] = into_option_array(options)?;
            for (column, value) in [("option_a", a), ("option_b", b), ("option_c", c), ("option_d", d)] {
                separated.push(column);
                separated.push_unseparated(" = ");
                separated.push_bind_unseparated(value);
            }
        }

        if let Some(correct_answer) = changes.correct_answer {
            if correct_answer > 3 {
                return Err(AppError::InvalidArgument(format!(
                    "Correct answer index {} does not reference an option",
                    correct_answer
                )));
            }
            separated.push("correct_answer = ");
            separated.push_bind_unseparated(correct_answer as i64);
        }

        if let Some(difficulty) = changes.difficulty {
            separated.push("difficulty = ");
            separated.push_bind_unseparated(difficulty);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&self.pool).await.map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Question not found".to_string()));
        }

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete question: {:?}", e);
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Question not found".to_string()));
        }

        Ok(())
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Distinct category labels, sorted.
    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        let categories =
            sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM questions ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Inserts `questions` in a single transaction.
    pub async fn insert_many(&self, questions: &[NewQuestion]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for question in questions {
            let [a, b, c, d] = &question.options;
            sqlx::query(
                r#"
                INSERT INTO questions
                (category, content, option_a, option_b, option_c, option_d, correct_answer, difficulty)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&question.category)
            .bind(&question.content)
            .bind(a)
            .bind(b)
            .bind(c)
            .bind(d)
            .bind(question.correct_answer as i64)
            .bind(question.difficulty)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
