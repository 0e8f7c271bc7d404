// tests/api_tests.rs

mod common;

use axum::{body::Body, http::Request};
use reqwest::StatusCode;
use serde_json::{Value, json};
use smartquiz::{db, routes, state::AppState};
use sqlx::SqlitePool;
use tower::ServiceExt;

use common::{test_config, test_pool};

/// Spawns the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and the pool behind it.
async fn spawn_app() -> (String, SqlitePool) {
    let pool = test_pool().await;
    let config = test_config();
    let state = AppState::new(pool.clone(), config.clone());

    db::seed_admin_user(&state.users, &config)
        .await
        .expect("Failed to seed admin");
    db::seed_sample_questions(&state.questions)
        .await
        .expect("Failed to seed questions");

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_name() -> String {
    format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8])
}

async fn register_and_login(client: &reqwest::Client, address: &str) -> String {
    let username = unique_name();
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status(), StatusCode::CREATED);

    login(client, address, &username, "password123").await
}

async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str) -> String {
    let body: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    body["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn unknown_route_is_404() {
    let pool = test_pool().await;
    let app = routes::create_router(AppState::new(pool, test_config()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/random_path_that_does_not_exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Password without a digit
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "username": "someone",
            "email": "someone@example.com",
            "password": "password"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "username": "admin",
            "email": "other@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": "admin", "password": "nope12345" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn quiz_routes_require_a_token() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quiz/start", address))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_quiz_flow_records_history() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;
    let auth = format!("Bearer {}", token);

    // The seeded bank has two Geography questions.
    let start: Value = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", &auth)
        .json(&json!({ "count": 5, "category": "Geography" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(start["state"], "in_progress");
    assert_eq!(start["total"], 2);
    assert_eq!(start["position"], 0);
    assert!(start["question"].get("correct_answer").is_none());

    // Answer every question with "A"; position must advance each time.
    for expected_position in 1..=2u64 {
        let answer: Value = client
            .post(format!("{}/api/quiz/answer", address))
            .header("Authorization", &auth)
            .json(&json!({ "answer": "a" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(answer["position"], expected_position);
        assert!(answer["score"].as_u64().unwrap() <= expected_position);
    }

    // Completed sessions reject further answers.
    let late = client
        .post(format!("{}/api/quiz/answer", address))
        .header("Authorization", &auth)
        .json(&json!({ "answer": "B" }))
        .send()
        .await
        .unwrap();
    assert_eq!(late.status(), StatusCode::CONFLICT);

    let finish = client
        .post(format!("{}/api/quiz/finish", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(finish.status(), StatusCode::CREATED);
    let finished: Value = finish.json().await.unwrap();
    assert_eq!(finished["category"], "Geography");
    assert_eq!(finished["difficulty"], "mixed");
    assert_eq!(finished["total_questions"], 2);

    // Session is gone once recorded.
    let current = client
        .get(format!("{}/api/quiz/current", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(current.status(), StatusCode::NOT_FOUND);

    let history: Vec<Value> = client
        .get(format!("{}/api/quiz/history", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], finished["id"]);

    let stats: Value = client
        .get(format!("{}/api/quiz/stats", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["count"], 1);

    let leaderboard: Vec<Value> = client
        .get(format!("{}/api/quiz/leaderboard?category=Geography&limit=3", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(leaderboard.len(), 1);
    assert_eq!(leaderboard[0]["id"], finished["id"]);
}

#[tokio::test]
async fn finishing_early_is_illegal_and_skip_advances() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;
    let auth = format!("Bearer {}", token);

    let start = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", &auth)
        .json(&json!({ "count": 2, "category": "Mathematics", "difficulty": "easy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status(), StatusCode::CREATED);

    let early = client
        .post(format!("{}/api/quiz/finish", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(early.status(), StatusCode::CONFLICT);

    let skipped: Value = client
        .post(format!("{}/api/quiz/skip", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(skipped["position"], 1);
    assert_eq!(skipped["score"], 0);

    let abandon = client
        .delete(format!("{}/api/quiz", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(abandon.status(), StatusCode::NO_CONTENT);

    let history: Vec<Value> = client
        .get(format!("{}/api/quiz/history", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn empty_selection_reports_no_quiz_available() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "category": "Astrology" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bad_difficulty = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "difficulty": "impossible" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_difficulty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    let response = client
        .get(format!("{}/api/admin/questions", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_manages_question_bank() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123").await;
    let auth = format!("Bearer {}", token);

    let created = client
        .post(format!("{}/api/admin/questions", address))
        .header("Authorization", &auth)
        .json(&json!({
            "category": "Art",
            "content": "Who painted <b>Guernica</b>?<script>alert(1)</script>",
            "options": ["Picasso", "Dali", "Miro", "Goya"],
            "correct_answer": 0,
            "difficulty": "medium"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = created.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let question: Value = client
        .get(format!("{}/api/admin/questions/{}", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(question["content"], "Who painted <b>Guernica</b>?");
    assert_eq!(question["correct_answer"], 0);

    let invalid = client
        .post(format!("{}/api/admin/questions", address))
        .header("Authorization", &auth)
        .json(&json!({
            "category": "Art",
            "content": "Too few options",
            "options": ["One", "Two"],
            "correct_answer": 0,
            "difficulty": "easy"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let updated = client
        .put(format!("{}/api/admin/questions/{}", address, id))
        .header("Authorization", &auth)
        .json(&json!({ "difficulty": "hard" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);

    let art: Vec<Value> = client
        .get(format!("{}/api/admin/questions?category=Art&difficulty=hard", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(art.len(), 1);

    let stats: Value = client
        .get(format!("{}/api/admin/stats", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["question_count"], 11);

    let deleted = client
        .delete(format!("{}/api/admin/questions/{}", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = client
        .get(format!("{}/api/admin/questions/{}", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

/// Starts and answers the single seeded History question.
async fn complete_history_quiz(client: &reqwest::Client, address: &str, auth: &str) {
    let start = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", auth)
        .json(&json!({ "count": 1, "category": "History" }))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status(), StatusCode::CREATED);

    let answer: Value = client
        .post(format!("{}/api/quiz/answer", address))
        .header("Authorization", auth)
        .json(&json!({ "answer": "B" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer["completed"], true);
}

async fn result_rows(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM quiz_results")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finishes_record_once() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;
    let auth = format!("Bearer {}", token);

    complete_history_quiz(&client, &address, &auth).await;

    let mut finishes = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = format!("{}/api/quiz/finish", address);
        let auth = auth.clone();
        finishes.spawn(async move {
            client
                .post(url)
                .header("Authorization", auth)
                .send()
                .await
                .unwrap()
                .status()
        });
    }

    let mut statuses = Vec::new();
    while let Some(status) = finishes.join_next().await {
        statuses.push(status.unwrap());
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    assert_eq!(created, 1, "statuses: {:?}", statuses);
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::CREATED || *s == StatusCode::NOT_FOUND));
    assert_eq!(result_rows(&pool).await, 1);
}

#[tokio::test]
async fn failed_save_keeps_session_for_retry() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;
    let auth = format!("Bearer {}", token);

    complete_history_quiz(&client, &address, &auth).await;

    sqlx::query("ALTER TABLE quiz_results RENAME TO quiz_results_offline")
        .execute(&pool)
        .await
        .unwrap();

    let failed = client
        .post(format!("{}/api/quiz/finish", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let current: Value = client
        .get(format!("{}/api/quiz/current", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["state"], "completed");
    assert_eq!(current["score"], 1);

    // A new quiz cannot discard the unsaved result.
    let restart = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", &auth)
        .json(&json!({ "count": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(restart.status(), StatusCode::CONFLICT);

    sqlx::query("ALTER TABLE quiz_results_offline RENAME TO quiz_results")
        .execute(&pool)
        .await
        .unwrap();

    let retried = client
        .post(format!("{}/api/quiz/finish", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(retried.status(), StatusCode::CREATED);
    let summary: Value = retried.json().await.unwrap();
    assert_eq!(summary["score"], 1);
    assert_eq!(summary["category"], "History");

    assert_eq!(result_rows(&pool).await, 1);
}

#[tokio::test]
async fn question_text_is_validated_after_cleaning() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "admin123").await;
    let auth = format!("Bearer {}", token);

    let script_only = client
        .post(format!("{}/api/admin/questions", address))
        .header("Authorization", &auth)
        .json(&json!({
            "category": "Art",
            "content": "<script>alert(1)</script>",
            "options": ["Picasso", "Dali", "Miro", "Goya"],
            "correct_answer": 0,
            "difficulty": "easy"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(script_only.status(), StatusCode::BAD_REQUEST);

    let blank_category = client
        .post(format!("{}/api/admin/questions", address))
        .header("Authorization", &auth)
        .json(&json!({
            "category": "   ",
            "content": "Who painted Guernica?",
            "options": ["Picasso", "Dali", "Miro", "Goya"],
            "correct_answer": 0,
            "difficulty": "easy"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(blank_category.status(), StatusCode::BAD_REQUEST);

    let id = client
        .get(format!("{}/api/admin/questions?category=Geography", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap()[0]["id"]
        .as_i64()
        .unwrap();

    let emptied = client
        .put(format!("{}/api/admin/questions/{}", address, id))
        .header("Authorization", &auth)
        .json(&json!({ "content": "<script>x</script>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(emptied.status(), StatusCode::BAD_REQUEST);

    let stats: Value = client
        .get(format!("{}/api/admin/stats", address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["question_count"], 10);
}
