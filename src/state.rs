use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::config::Config;
use crate::error::AppError;
use crate::services::{
    accounts::UserStore, history::HistoryQuery, question_repo::QuestionRepository,
    recorder::ResultRecorder, session::QuizSession,
};
use axum::extract::FromRef;
use sqlx::SqlitePool;

/// Active quiz sessions keyed by user id. Each user drives at most one.
///
/// The lock is never held across an `.await`.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<i64, QuizSession>>>,
}

impl SessionStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<i64, QuizSession>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `session`, replacing any session the user abandoned.
    ///
    /// A completed session still waiting to be recorded is never replaced.
    pub fn insert(&self, session: QuizSession) -> Result<Option<QuizSession>, AppError> {
        let mut sessions = self.lock();
        if sessions
            .get(&session.user_id())
            .is_some_and(QuizSession::is_complete)
        {
            return Err(AppError::IllegalState(
                "Finish the completed quiz before starting another".to_string(),
            ));
        }
        Ok(sessions.insert(session.user_id(), session))
    }

    /// Removes the user's session if it is completed.
    ///
    /// Only one caller can take a given session, so it is recorded at most once.
    /// An unfinished session stays in place.
    pub fn take_completed(&self, user_id: i64) -> Result<QuizSession, AppError> {
        let mut sessions = self.lock();
        match sessions.get(&user_id).map(QuizSession::is_complete) {
            Some(true) => sessions
                .remove(&user_id)
                .ok_or_else(|| AppError::NotFound("No active quiz".to_string())),
            Some(false) => Err(AppError::IllegalState(
                "Quiz session is not complete".to_string(),
            )),
            None => Err(AppError::NotFound("No active quiz".to_string())),
        }
    }

    /// Puts back a session taken by `take_completed` after its save failed.
    ///
    /// Returns false when the user has started another quiz in the meantime.
    pub fn restore(&self, session: QuizSession) -> bool {
        match self.lock().entry(session.user_id()) {
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Runs `f` against the user's session, if any.
    pub fn with_session<T>(&self, user_id: i64, f: impl FnOnce(&mut QuizSession) -> T) -> Option<T> {
        self.lock().get_mut(&user_id).map(f)
    }

    /// Clones the user's session out of the store.
    pub fn snapshot(&self, user_id: i64) -> Option<QuizSession> {
        self.lock().get(&user_id).cloned()
    }

    pub fn remove(&self, user_id: i64) -> Option<QuizSession> {
        self.lock().remove(&user_id)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub questions: QuestionRepository,
    pub recorder: ResultRecorder,
    pub history: HistoryQuery,
    pub users: UserStore,
    pub sessions: SessionStore,
}

impl AppState {
    /// Hands a clone of `pool` to every storage component.
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            config,
            questions: QuestionRepository::new(pool.clone()),
            recorder: ResultRecorder::new(pool.clone()),
            history: HistoryQuery::new(pool.clone()),
            users: UserStore::new(pool),
            sessions: SessionStore::default(),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for QuestionRepository {
    fn from_ref(state: &AppState) -> Self {
        state.questions.clone()
    }
}

impl FromRef<AppState> for ResultRecorder {
    fn from_ref(state: &AppState) -> Self {
        state.recorder.clone()
    }
}

impl FromRef<AppState> for HistoryQuery {
    fn from_ref(state: &AppState) -> Self {
        state.history.clone()
    }
}

impl FromRef<AppState> for UserStore {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
