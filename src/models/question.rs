// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, sqlite::SqliteRow};
use validator::Validate;

use crate::error::AppError;

/// Number of answer options every question carries (A-D).
pub const OPTION_COUNT: usize = 4;

/// Difficulty tag of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown difficulty '{}'",
                other
            ))),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: i64,

    /// Free-text category label, e.g. "Geography".
    pub category: String,

    /// The prompt shown to the user.
    pub content: String,

    /// Options A-D, stored as four columns.
    pub options: [String; OPTION_COUNT],

    /// Zero-based index into `options`.
    pub correct_answer: u8,

    pub difficulty: Difficulty,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    pub fn is_correct(&self, selected: u8) -> bool {
        self.correct_answer == selected
    }

    pub fn correct_option_text(&self) -> &str {
        &self.options[self.correct_answer as usize]
    }
}

impl<'r> FromRow<'r, SqliteRow> for Question {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_answer: i64 = row.try_get("correct_answer")?;
        let correct_answer = u8::try_from(raw_answer)
            .ok()
            .filter(|idx| (*idx as usize) < OPTION_COUNT)
            .ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "correct_answer".to_string(),
                source: format!("option index {} out of range", raw_answer).into(),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            category: row.try_get("category")?,
            content: row.try_get("content")?,
            options: [
                row.try_get("option_a")?,
                row.try_get("option_b")?,
                row.try_get("option_c")?,
                row.try_get("option_d")?,
            ],
            correct_answer,
            difficulty: row.try_get("difficulty")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// DTO for sending a question to a quiz taker (excludes the answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub category: String,
    pub content: String,
    pub options: [String; OPTION_COUNT],
    pub difficulty: Difficulty,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            category: q.category.clone(),
            content: q.content.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
        }
    }
}

/// A validated question ready to be inserted into the bank.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub category: String,
    pub content: String,
    pub options: [String; OPTION_COUNT],
    pub correct_answer: u8,
    pub difficulty: Difficulty,
}

impl NewQuestion {
    pub fn new(
        category: impl Into<String>,
        content: impl Into<String>,
        options: [&str; OPTION_COUNT],
        correct_answer: u8,
        difficulty: Difficulty,
    ) -> Result<Self, AppError> {
        if correct_answer as usize >= OPTION_COUNT {
            return Err(AppError::InvalidArgument(format!(
                "Correct answer index {} does not reference an option",
                correct_answer
            )));
        }
        Ok(Self {
            category: category.into(),
            content: content.into(),
            options: options.map(str::to_string),
            correct_answer,
            difficulty,
        })
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(max = 3))]
    pub correct_answer: u8,
    pub difficulty: Difficulty,
}

impl TryFrom<CreateQuestionRequest> for NewQuestion {
    type Error = AppError;

    fn try_from(req: CreateQuestionRequest) -> Result<Self, Self::Error> {
        let options = into_option_array(req.options)?;
        let options = [
            options[0].as_str(),
            options[1].as_str(),
            options[2].as_str(),
            options[3].as_str(),
        ];
        NewQuestion::new(
            req.category,
            req.content,
            options,
            req.correct_answer,
            req.difficulty,
        )
    }
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub content: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(range(max = 3))]
    pub correct_answer: Option<u8>,
    pub difficulty: Option<Difficulty>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.content.is_none()
            && self.options.is_none()
            && self.correct_answer.is_none()
            && self.difficulty.is_none()
    }
}

/// Converts a request's option list into the fixed A-D array.
pub fn into_option_array(options: Vec<String>) -> Result<[String; OPTION_COUNT], AppError> {
    options.try_into().map_err(|opts: Vec<String>| {
        AppError::InvalidArgument(format!(
            "Expected {} options, got {}",
            OPTION_COUNT,
            opts.len()
        ))
    })
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("exactly_four_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Query parameters accepted by quiz and admin listings.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionFilter {
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

impl QuestionFilter {
    /// Blank labels mean "no filter".
    pub fn category(&self) -> Option<&str> {
        normalize_label(self.category.as_deref())
    }

    pub fn difficulty(&self) -> Result<Option<Difficulty>, AppError> {
        normalize_label(self.difficulty.as_deref())
            .map(str::parse)
            .transpose()
    }
}

pub fn normalize_label(label: Option<&str>) -> Option<&str> {
    label.map(str::trim).filter(|l| !l.is_empty())
}
