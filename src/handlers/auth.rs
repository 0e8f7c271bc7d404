// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, Role},
    services::accounts::UserStore,
    utils::jwt::sign_jwt,
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(users): State<UserStore>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = users
        .create(&payload.username, &payload.email, &payload.password, Role::User)
        .await?;

    tracing::info!("Registered user '{}'", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token carrying id and role.
pub async fn login(
    State(users): State<UserStore>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = users.authenticate(&payload.username, &payload.password).await?;

    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role,
        "username": user.username,
    })))
}
