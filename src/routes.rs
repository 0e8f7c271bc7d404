// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            header::HeaderValue::from_static("http://localhost:3000"),
            header::HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route("/categories", get(quiz::list_categories))
        .route("/leaderboard", get(quiz::get_leaderboard))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/", axum::routing::delete(quiz::abandon_quiz))
                .route("/start", post(quiz::start_quiz))
                .route("/current", get(quiz::current_question))
                .route("/answer", post(quiz::submit_answer))
                .route("/skip", post(quiz::skip_question))
                .route("/finish", post(quiz::finish_quiz))
                .route("/history", get(quiz::get_history))
                .route("/stats", get(quiz::get_stats))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/stats", get(admin::bank_stats))
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            get(admin::get_question)
                .put(admin::update_question)
                .delete(admin::delete_question),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
