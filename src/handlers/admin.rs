// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, NewQuestion, QuestionFilter, UpdateQuestionRequest},
    services::question_repo::QuestionRepository,
    utils::html::clean_html,
};

/// Lists the question bank, optionally filtered.
/// Admin only.
pub async fn list_questions(
    State(questions): State<QuestionRepository>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let difficulty = filter.difficulty()?;
    let list = questions.list_filtered(filter.category(), difficulty).await?;
    Ok(Json(list))
}

/// Fetches one question including its answer.
/// Admin only.
pub async fn get_question(
    State(questions): State<QuestionRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.get(id).await?))
}

/// Creates a new question.
/// Admin only.
pub async fn create_question(
    State(questions): State<QuestionRepository>,
    Json(mut payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.category = clean_html(&payload.category);
    payload.content = clean_html(&payload.content);
    payload.options = payload.options.iter().map(|o| clean_html(o)).collect();

    // Validate what will be stored, not what was sent.
    payload.validate()?;

    let question = NewQuestion::try_from(payload)?;
    let id = questions.insert(&question).await?;

    tracing::info!("Created question {} in '{}'", id, question.category);
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Updates a question by ID. Sessions already running keep their copy.
/// Admin only.
pub async fn update_question(
    State(questions): State<QuestionRepository>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.category = payload.category.as_deref().map(clean_html);
    payload.content = payload.content.as_deref().map(clean_html);
    payload.options = payload
        .options
        .map(|opts| opts.iter().map(|o| clean_html(o)).collect());
    payload.validate()?;

    questions.update(id, payload).await?;
    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
/// Admin only.
pub async fn delete_question(
    State(questions): State<QuestionRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    questions.delete(id).await?;
    tracing::info!("Deleted question {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Question count and categories for the admin dashboard.
pub async fn bank_stats(
    State(questions): State<QuestionRepository>,
) -> Result<impl IntoResponse, AppError> {
    let count = questions.count().await?;
    let categories = questions.categories().await?;
    Ok(Json(json!({
        "question_count": count,
        "categories": categories,
    })))
}
