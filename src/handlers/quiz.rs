// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_LEADERBOARD_LIMIT, DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT},
    error::AppError,
    models::{
        question::{PublicQuestion, QuestionFilter},
        quiz_result::{LeaderboardParams, MIXED_CATEGORY, QuizResult, ResultSummary},
    },
    services::{
        history::HistoryQuery,
        question_repo::QuestionRepository,
        recorder::ResultRecorder,
        session::{AnswerOutcome, QuizSession, SessionState, parse_option},
    },
    state::SessionStore,
    utils::jwt::Claims,
};

/// DTO for starting a quiz. Absent filters mean "any".
#[derive(Debug, Default, Deserialize)]
pub struct StartQuizRequest {
    pub count: Option<usize>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

/// DTO for answering the current question with a letter A-D.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
}

/// Progress of the caller's session, with the question to show next.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub position: usize,
    pub total: usize,
    pub score: usize,
    pub question: Option<PublicQuestion>,
}

impl From<&QuizSession> for SessionView {
    fn from(session: &QuizSession) -> Self {
        Self {
            state: session.state(),
            position: session.position(),
            total: session.len(),
            score: session.score(),
            question: session.current_question().ok().map(PublicQuestion::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    #[serde(flatten)]
    pub outcome: AnswerOutcome,
    pub next: SessionView,
}

fn no_active_quiz() -> AppError {
    AppError::NotFound("No active quiz".to_string())
}

/// Lists distinct question categories.
pub async fn list_categories(
    State(questions): State<QuestionRepository>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.categories().await?))
}

/// Samples questions and starts a new session for the caller.
///
/// An unfinished session is discarded; a completed one must be finished
/// (recorded) first so its result is not lost.
pub async fn start_quiz(
    State(questions): State<QuestionRepository>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let count = req.count.unwrap_or(DEFAULT_QUESTION_COUNT);
    if count == 0 || count > MAX_QUESTION_COUNT {
        return Err(AppError::InvalidArgument(format!(
            "Question count must be between 1 and {}",
            MAX_QUESTION_COUNT
        )));
    }

    if sessions
        .snapshot(user_id)
        .is_some_and(|s| s.state() == SessionState::Completed)
    {
        return Err(AppError::IllegalState(
            "Finish the completed quiz before starting another".to_string(),
        ));
    }

    let filter = QuestionFilter {
        category: req.category,
        difficulty: req.difficulty,
    };
    let category = filter.category().map(str::to_string);
    let difficulty = filter.difficulty()?;

    let mut rng = StdRng::from_entropy();
    let picked = questions
        .sample(count, category.as_deref(), difficulty, &mut rng)
        .await?;

    if picked.is_empty() {
        return Err(AppError::NotFound(
            "No questions available for the selected criteria".to_string(),
        ));
    }

    let mut session = QuizSession::new(user_id, category, difficulty);
    session.start(picked)?;
    let view = SessionView::from(&session);

    if sessions.insert(session)?.is_some() {
        tracing::info!("Discarded unfinished quiz of user {}", user_id);
    }

    Ok((StatusCode::CREATED, Json(view)))
}

/// Returns the caller's progress and current question.
pub async fn current_question(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let view = sessions
        .with_session(user_id, |s| SessionView::from(&*s))
        .ok_or_else(no_active_quiz)?;
    Ok(Json(view))
}

/// Scores the answer to the current question and advances.
pub async fn submit_answer(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let selected = parse_option(&req.answer)?;

    let response = sessions
        .with_session(user_id, |s| {
            s.submit_answer(selected).map(|outcome| AnswerResponse {
                outcome,
                next: SessionView::from(&*s),
            })
        })
        .ok_or_else(no_active_quiz)??;

    Ok(Json(response))
}

/// Moves past the current question without answering it.
pub async fn skip_question(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let view = sessions
        .with_session(user_id, |s| s.skip().map(|_| SessionView::from(&*s)))
        .ok_or_else(no_active_quiz)??;

    Ok(Json(view))
}

/// Records the completed session and drops it.
///
/// The session leaves the store before the write, so concurrent calls record
/// it once. On a storage failure it is put back and the call can be retried.
pub async fn finish_quiz(
    State(sessions): State<SessionStore>,
    State(recorder): State<ResultRecorder>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let session = sessions.take_completed(user_id)?;

    match record_session(&recorder, &session).await {
        Ok(result) => Ok((StatusCode::CREATED, Json(ResultSummary::from(result)))),
        Err(e) => {
            if !sessions.restore(session) {
                tracing::warn!(
                    "Unsaved result of user {} dropped, a new quiz was started",
                    user_id
                );
            }
            Err(e)
        }
    }
}

async fn record_session(
    recorder: &ResultRecorder,
    session: &QuizSession,
) -> Result<QuizResult, AppError> {
    let mut result = session.to_result()?;
    let id = recorder.record(session.user_id(), &result).await?;
    result.id = Some(id);
    Ok(result)
}

/// Abandons the caller's session. Nothing is persisted.
pub async fn abandon_quiz(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    sessions.remove(user_id).ok_or_else(no_active_quiz)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's results, most recent first.
pub async fn get_history(
    State(history): State<HistoryQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let results: Vec<ResultSummary> = history
        .user_history(user_id)
        .await?
        .into_iter()
        .map(ResultSummary::from)
        .collect();
    Ok(Json(results))
}

pub async fn get_stats(
    State(history): State<HistoryQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(history.aggregate_stats(user_id).await?))
}

/// Top results for a category (defaults to mixed quizzes).
pub async fn get_leaderboard(
    State(history): State<HistoryQuery>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let category = params
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(MIXED_CATEGORY);
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT).clamp(1, 100);

    Ok(Json(history.top_scores(category, limit).await?))
}
