// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Number of questions drawn when a quiz request does not specify a count.
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// Upper bound on questions per quiz.
pub const MAX_QUESTION_COUNT: usize = 50;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_email: String,
    /// Insert the sample question set into an empty bank on startup.
    pub seed_sample_questions: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://quiz_app.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string());

        let admin_email = env::var("ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@smartquiz.local".to_string());

        let seed_sample_questions = env::var("SEED_SAMPLE_QUESTIONS")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_email,
            seed_sample_questions,
        }
    }
}
