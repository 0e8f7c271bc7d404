#![allow(dead_code)]

use std::time::Duration;

use smartquiz::{
    config::Config,
    db,
    models::question::{Difficulty, NewQuestion},
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

/// Fresh in-memory database with migrations applied.
///
/// A single connection that never expires keeps the in-memory database alive.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(Option::<Duration>::None)
        .max_lifetime(Option::<Duration>::None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    db::migrate(&pool).await.expect("Failed to migrate database");
    pool
}

/// Inserts a user row directly, skipping password hashing.
pub async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (username, email, password, role) VALUES (?, ?, 'x', 'user') RETURNING id",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .fetch_one(pool)
    .await
    .expect("Failed to insert user")
}

pub fn question(category: &str, content: &str, correct: u8, difficulty: Difficulty) -> NewQuestion {
    NewQuestion::new(category, content, ["A1", "B1", "C1", "D1"], correct, difficulty)
        .expect("valid question")
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        admin_username: Some("admin".to_string()),
        admin_password: Some("admin123".to_string()),
        admin_email: "admin@example.com".to_string(),
        seed_sample_questions: false,
    }
}
