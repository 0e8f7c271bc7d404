// src/services/accounts.rs

use sqlx::SqlitePool;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{Role, User},
    utils::hash::{hash_password, verify_password},
};

/// Credential store. Callers only ever see the resulting `User` (id + role).
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Hashes `password` with Argon2 and inserts a new account.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let hashed_password = hash_password(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password, role)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, email, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' or email already exists", username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password, role, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    /// Returns the user when `password` matches, `AuthError` otherwise.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

        if !verify_password(password, &user.password)? {
            tracing::warn!("Rejected login for '{}'", username);
            return Err(AppError::AuthError("Invalid username or password".to_string()));
        }

        Ok(user)
    }
}
