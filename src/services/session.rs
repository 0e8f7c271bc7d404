// src/services/session.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        question::{Difficulty, OPTION_COUNT, Question},
        quiz_result::{MIXED_CATEGORY, MIXED_DIFFICULTY, QuizResult},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

/// What happened to a single answer submission.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_answer: char,
    pub position: usize,
    pub total: usize,
    pub score: usize,
    pub completed: bool,
}

/// In-memory state of one quiz attempt.
///
/// Questions are copied in at [`QuizSession::start`], so edits to the bank
/// do not affect a running attempt. `position` only moves forward; once it
/// reaches the number of questions the session is terminal.
#[derive(Debug, Clone)]
pub struct QuizSession {
    user_id: i64,
    category: Option<String>,
    difficulty: Option<Difficulty>,
    questions: Vec<Question>,
    answers: Vec<Option<u8>>,
    position: usize,
    score: usize,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Creates a session in the `NotStarted` state. The filters are only
    /// labels for the result record; sampling happens in the repository.
    pub fn new(user_id: i64, category: Option<String>, difficulty: Option<Difficulty>) -> Self {
        Self {
            user_id,
            category,
            difficulty,
            questions: Vec::new(),
            answers: Vec::new(),
            position: 0,
            score: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self, questions: Vec<Question>) -> Result<(), AppError> {
        self.start_at(questions, Utc::now())
    }

    pub fn start_at(&mut self, questions: Vec<Question>, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.state() != SessionState::NotStarted {
            return Err(AppError::IllegalState("Quiz session already started".to_string()));
        }
        if questions.is_empty() {
            return Err(AppError::InvalidArgument(
                "Cannot start a quiz without questions".to_string(),
            ));
        }

        self.answers = vec![None; questions.len()];
        self.questions = questions;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        if self.started_at.is_none() {
            SessionState::NotStarted
        } else if self.position == self.questions.len() {
            SessionState::Completed
        } else {
            SessionState::InProgress
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == SessionState::Completed
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Recorded answers so far; `None` for skipped or unreached questions.
    pub fn answers(&self) -> &[Option<u8>] {
        &self.answers
    }

    pub fn current_question(&self) -> Result<&Question, AppError> {
        self.ensure_in_progress()?;
        Ok(&self.questions[self.position])
    }

    pub fn submit_answer(&mut self, selected: u8) -> Result<AnswerOutcome, AppError> {
        self.submit_answer_at(selected, Utc::now())
    }

    pub fn submit_answer_at(
        &mut self,
        selected: u8,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, AppError> {
        self.ensure_in_progress()?;
        if selected as usize >= OPTION_COUNT {
            return Err(AppError::InvalidArgument(format!(
                "Option index {} is out of range",
                selected
            )));
        }

        let question = &self.questions[self.position];
        let correct = question.is_correct(selected);
        let correct_answer = option_letter(question.correct_answer);
        if correct {
            self.score += 1;
        }
        self.answers[self.position] = Some(selected);
        self.advance(now);

        Ok(AnswerOutcome {
            correct,
            correct_answer,
            position: self.position,
            total: self.questions.len(),
            score: self.score,
            completed: self.is_complete(),
        })
    }

    /// Moves past the current question without scoring it.
    pub fn skip(&mut self) -> Result<(), AppError> {
        self.skip_at(Utc::now())
    }

    pub fn skip_at(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_in_progress()?;
        self.advance(now);
        Ok(())
    }

    pub fn final_score(&self) -> Result<usize, AppError> {
        self.ensure_completed()?;
        Ok(self.score)
    }

    pub fn total_questions(&self) -> Result<usize, AppError> {
        self.ensure_completed()?;
        Ok(self.questions.len())
    }

    pub fn elapsed_seconds(&self) -> Result<i64, AppError> {
        self.ensure_completed()?;
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Ok((end - start).num_seconds().max(0)),
            _ => Err(AppError::IllegalState("Quiz session has no timing".to_string())),
        }
    }

    /// Builds the record handed to the result recorder.
    pub fn to_result(&self) -> Result<QuizResult, AppError> {
        let completed_at = match self.completed_at {
            Some(at) if self.is_complete() => at,
            _ => return Err(AppError::IllegalState("Quiz session is not complete".to_string())),
        };

        Ok(QuizResult {
            id: None,
            user_id: self.user_id,
            category: self
                .category
                .clone()
                .unwrap_or_else(|| MIXED_CATEGORY.to_string()),
            score: self.final_score()? as i64,
            total_questions: self.total_questions()? as i64,
            time_spent: self.elapsed_seconds()?,
            difficulty: self
                .difficulty
                .map(|d| d.to_string())
                .unwrap_or_else(|| MIXED_DIFFICULTY.to_string()),
            completed_at,
        })
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        self.position += 1;
        if self.position == self.questions.len() {
            self.completed_at = Some(now);
        }
    }

    fn ensure_in_progress(&self) -> Result<(), AppError> {
        match self.state() {
            SessionState::InProgress => Ok(()),
            SessionState::NotStarted => {
                Err(AppError::IllegalState("Quiz session has not started".to_string()))
            }
            SessionState::Completed => {
                Err(AppError::IllegalState("Quiz session is already complete".to_string()))
            }
        }
    }

    fn ensure_completed(&self) -> Result<(), AppError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(AppError::IllegalState("Quiz session is not complete".to_string()))
        }
    }
}

/// Converts an option letter (A-D, any case) to its zero-based index.
pub fn parse_option(input: &str) -> Result<u8, AppError> {
    let mut chars = input.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let upper = c.to_ascii_uppercase();
            if ('A'..='D').contains(&upper) {
                Ok(upper as u8 - b'A')
            } else {
                Err(AppError::InvalidArgument(format!("Unknown option '{}'", input)))
            }
        }
        _ => Err(AppError::InvalidArgument(format!("Unknown option '{}'", input))),
    }
}

pub fn option_letter(index: u8) -> char {
    (b'A' + index) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn question(id: i64, correct: u8) -> Question {
        Question {
            id,
            category: "Geography".to_string(),
            content: format!("Question {}", id),
            options: [
                "London".to_string(),
                "Berlin".to_string(),
                "Paris".to_string(),
                "Madrid".to_string(),
            ],
            correct_answer: correct,
            difficulty: Difficulty::Easy,
            created_at: None,
        }
    }

    fn started(questions: Vec<Question>) -> QuizSession {
        let mut session = QuizSession::new(7, Some("Geography".to_string()), None);
        session.start(questions).unwrap();
        session
    }

    #[test]
    fn start_rejects_empty_question_list() {
        let mut session = QuizSession::new(1, None, None);
        assert!(matches!(
            session.start(Vec::new()),
            Err(AppError::InvalidArgument(_))
        ));
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[test]
    fn start_twice_is_illegal() {
        let mut session = started(vec![question(1, 0)]);
        assert!(matches!(
            session.start(vec![question(2, 0)]),
            Err(AppError::IllegalState(_))
        ));
    }

    #[test]
    fn operations_before_start_are_illegal() {
        let mut session = QuizSession::new(1, None, None);
        assert!(!session.is_complete());
        assert!(matches!(session.current_question(), Err(AppError::IllegalState(_))));
        assert!(matches!(session.submit_answer(0), Err(AppError::IllegalState(_))));
        assert!(matches!(session.final_score(), Err(AppError::IllegalState(_))));
    }

    #[test]
    fn single_correct_answer_completes_session() {
        let mut session = started(vec![question(1, 2)]);
        let answer = parse_option("C").unwrap();
        let outcome = session.submit_answer(answer).unwrap();

        assert!(outcome.correct);
        assert_eq!(outcome.correct_answer, 'C');
        assert_eq!(session.score(), 1);
        assert_eq!(session.position(), 1);
        assert!(session.is_complete());
        assert_eq!(session.final_score().unwrap(), 1);
        assert_eq!(session.total_questions().unwrap(), 1);
    }

    #[test]
    fn submit_on_completed_session_is_illegal() {
        let mut session = started(vec![question(1, 2)]);
        session.submit_answer(2).unwrap();
        assert!(matches!(session.submit_answer(2), Err(AppError::IllegalState(_))));
        assert!(matches!(session.skip(), Err(AppError::IllegalState(_))));
        assert!(matches!(session.current_question(), Err(AppError::IllegalState(_))));
        assert_eq!(session.score(), 1);
        assert_eq!(session.position(), 1);
    }

    #[test]
    fn position_tracks_submissions_and_score_never_exceeds_it() {
        let questions: Vec<Question> = (0..6).map(|i| question(i, (i % 4) as u8)).collect();
        let mut session = started(questions);

        for n in 0..6u8 {
            session.submit_answer(n % 2).unwrap();
            assert_eq!(session.position(), (n + 1) as usize);
            assert!(session.score() <= session.position());
        }
        assert!(session.is_complete());
    }

    #[test]
    fn wrong_answers_and_skips_advance_without_scoring() {
        let mut session = started(vec![question(1, 0), question(2, 1), question(3, 3)]);

        let outcome = session.submit_answer(3).unwrap();
        assert!(!outcome.correct);
        session.skip().unwrap();
        assert_eq!(session.current_question().unwrap().id, 3);
        session.submit_answer(3).unwrap();

        assert_eq!(session.final_score().unwrap(), 1);
        assert_eq!(session.answers(), &[Some(3), None, Some(3)]);
    }

    #[test]
    fn out_of_range_option_leaves_state_untouched() {
        let mut session = started(vec![question(1, 0)]);
        assert!(matches!(session.submit_answer(4), Err(AppError::InvalidArgument(_))));
        assert_eq!(session.position(), 0);
        assert_eq!(session.state(), SessionState::InProgress);
    }

    #[test]
    fn result_uses_mixed_labels_and_elapsed_time() {
        let start = Utc::now();
        let mut session = QuizSession::new(3, None, None);
        session.start_at(vec![question(1, 0), question(2, 0)], start).unwrap();
        assert!(matches!(session.to_result(), Err(AppError::IllegalState(_))));

        session.submit_answer_at(0, start + Duration::seconds(10)).unwrap();
        session.submit_answer_at(1, start + Duration::seconds(42)).unwrap();

        let result = session.to_result().unwrap();
        assert_eq!(result.user_id, 3);
        assert_eq!(result.category, MIXED_CATEGORY);
        assert_eq!(result.difficulty, MIXED_DIFFICULTY);
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.time_spent, 42);
        assert_eq!(result.completed_at, start + Duration::seconds(42));
    }

    #[test]
    fn result_keeps_requested_filters() {
        let mut session = QuizSession::new(3, Some("Science".to_string()), Some(Difficulty::Hard));
        session.start(vec![question(1, 0)]).unwrap();
        session.skip().unwrap();

        let result = session.to_result().unwrap();
        assert_eq!(result.category, "Science");
        assert_eq!(result.difficulty, "hard");
        assert_eq!(result.score, 0);
    }

    #[test]
    fn option_letters_convert_both_ways() {
        assert_eq!(parse_option("a").unwrap(), 0);
        assert_eq!(parse_option(" D ").unwrap(), 3);
        assert!(parse_option("E").is_err());
        assert!(parse_option("AB").is_err());
        assert!(parse_option("").is_err());
        assert_eq!(option_letter(2), 'C');
    }
}
