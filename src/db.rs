// src/db.rs

use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    config::Config,
    error::AppError,
    models::{question::{Difficulty, NewQuestion}, user::Role},
    services::{accounts::UserStore, question_repo::QuestionRepository},
};

/// Opens the SQLite database at `database_url`, creating the file if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    tracing::info!("Database connected...");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migrations applied successfully.");
    Ok(())
}

/// Creates the configured admin account if it does not exist yet.
pub async fn seed_admin_user(users: &UserStore, config: &Config) -> Result<(), AppError> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        if !users.exists(username).await? {
            tracing::info!("Seeding admin user: {}", username);
            users
                .create(username, &config.admin_email, password, Role::Admin)
                .await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}

/// Fills an empty question bank with the starter set.
pub async fn seed_sample_questions(questions: &QuestionRepository) -> Result<(), AppError> {
    if questions.count().await? > 0 {
        return Ok(());
    }

    let samples = sample_questions()?;
    questions.insert_many(&samples).await?;
    tracing::info!("Inserted {} sample questions", samples.len());
    Ok(())
}

fn sample_questions() -> Result<Vec<NewQuestion>, AppError> {
    use Difficulty::*;

    [
        ("Geography", "What is the capital of France?", ["London", "Berlin", "Paris", "Madrid"], 2, Easy),
        ("Science", "What is the chemical symbol for gold?", ["Go", "Gd", "Au", "Ag"], 2, Medium),
        ("Technology", "Which programming language is known for machine learning?", ["JavaScript", "Python", "C++", "PHP"], 1, Medium),
        ("History", "In which year did World War II end?", ["1944", "1945", "1946", "1947"], 1, Easy),
        ("Mathematics", "What is the value of pi to 2 decimal places?", ["3.14", "3.15", "3.16", "3.13"], 0, Easy),
        ("Literature", "Who wrote 'Romeo and Juliet'?", ["Charles Dickens", "William Shakespeare", "Jane Austen", "Mark Twain"], 1, Medium),
        ("Science", "What is the hardest natural substance on Earth?", ["Gold", "Iron", "Diamond", "Platinum"], 2, Medium),
        ("Geography", "Which is the largest ocean on Earth?", ["Atlantic", "Indian", "Arctic", "Pacific"], 3, Easy),
        (
            "Technology",
            "What does 'HTTP' stand for?",
            [
                "HyperText Transfer Protocol",
                "High Tech Transfer Protocol",
                "Home Tool Transfer Protocol",
                "Hyperlink Text Transfer Protocol",
            ],
            0,
            Hard,
        ),
        ("Mathematics", "What is the square root of 144?", ["11", "12", "13", "14"], 1, Easy),
    ]
    .into_iter()
    .map(|(category, content, options, correct, difficulty)| {
        NewQuestion::new(category, content, options, correct, difficulty)
    })
    .collect()
}
