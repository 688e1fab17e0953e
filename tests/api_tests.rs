// tests/api_tests.rs

use std::sync::Arc;

use indcric_backend::{build_router, config::QuizConfig, db, state::AppState};
use serde_json::{json, Value};

/// Spawn the app on a random port against a fresh in-memory database.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let pool = db::connect_in_memory().await.expect("Failed to open in-memory database");
    let state = AppState::build(pool, QuizConfig::default(), None).await;
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

async fn post_quiz(address: &str, body: impl Into<reqwest::Body>) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(&format!("{}/quiz", address))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to execute request");
    let status = response.status().as_u16();
    (status, response.json().await.expect("quiz response is JSON"))
}

fn question_ids(body: &Value) -> Vec<String> {
    body["quiz"]["questions"]
        .as_array()
        .expect("questions array")
        .iter()
        .map(|q| q["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn unknown_path_is_404() {
    let address = spawn_app().await;
    let response = reqwest::get(&format!("{}/random_path_that_does_not_exist", address))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_reports_generator_disabled() {
    let address = spawn_app().await;
    let body: Value = reqwest::get(&format!("{}/health", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "ok": true, "generator": false }));
}

#[tokio::test]
async fn malformed_json_still_gets_a_mixed_quiz() {
    let address = spawn_app().await;
    let (status, body) = post_quiz(&address, "{not json").await;

    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["errorDetails"]["code"], "INVALID_JSON");
    let ids = question_ids(&body);
    assert_eq!(ids.len(), 5);
    assert!(ids.iter().all(|id| id.starts_with("mixed-")));
    assert!(!body["requestId"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn missing_user_id_is_invalid_payload() {
    let address = spawn_app().await;
    let (status, body) = post_quiz(&address, json!({ "format": "ipl" }).to_string()).await;

    assert_eq!(status, 200);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["errorDetails"]["code"], "INVALID_PAYLOAD");
    assert_eq!(question_ids(&body).len(), 5);
}

#[tokio::test]
async fn unknown_format_without_generator_falls_back_to_mixed() {
    let address = spawn_app().await;
    let (status, body) = post_quiz(&address, json!({ "format": "t20i", "userId": "fan-1" }).to_string()).await;

    assert_eq!(status, 200);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["errorDetails"]["code"], "GENERATOR_DISABLED");
    let ids = question_ids(&body);
    assert_eq!(ids.len(), 5);
    assert!(ids.iter().all(|id| id.starts_with("mixed-")));
    for q in body["quiz"]["questions"].as_array().unwrap() {
        let options: Vec<&str> = q["options"].as_array().unwrap().iter().map(|o| o.as_str().unwrap()).collect();
        assert_eq!(options.len(), 4);
        assert!(options.contains(&q["correctAnswer"].as_str().unwrap()));
    }
}

/// Fetch a quiz for `user_id` and return the response body.
async fn fetch_quiz(address: &str, user_id: &str) -> Value {
    let (status, body) = post_quiz(address, json!({ "format": "ipl", "userId": user_id }).to_string()).await;
    assert_eq!(status, 200);
    body
}

/// Answers for every question in `quiz`, choosing with `pick(correct, options)`.
fn answer_all(quiz: &Value, pick: impl Fn(&str, &[Value]) -> String) -> Vec<Value> {
    quiz["quiz"]["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| {
            let correct = q["correctAnswer"].as_str().unwrap();
            json!({ "questionId": q["id"], "selectedAnswer": pick(correct, q["options"].as_array().unwrap()) })
        })
        .collect()
}

async fn submit(address: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(&format!("{}/quiz/attempts", address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn perfect_attempt_earns_rewards_once() {
    let address = spawn_app().await;
    let quiz = fetch_quiz(&address, "fan-2").await;
    let attempt = json!({
        "requestId": quiz["requestId"],
        "userId": "fan-2",
        "answers": answer_all(&quiz, |correct, _| correct.to_string()),
    });

    let response = submit(&address, attempt.clone()).await;
    assert_eq!(response.status().as_u16(), 201);
    let receipt: Value = response.json().await.unwrap();
    assert_eq!(receipt["score"], 5);
    assert_eq!(receipt["total"], 5);
    assert_eq!(receipt["perfect"], true);
    assert_eq!(receipt["pointsAwarded"], 100);

    let again = submit(&address, attempt).await;
    assert_eq!(again.status().as_u16(), 409);

    let rewards: Value = reqwest::get(&format!("{}/quiz/rewards/fan-2", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rewards["userId"], "fan-2");
    assert_eq!(rewards["points"], 100);
    assert_eq!(rewards["perfectQuizzes"], 1);
}

#[tokio::test]
async fn forged_answer_keys_earn_nothing() {
    let address = spawn_app().await;
    let quiz = fetch_quiz(&address, "fan-4").await;
    let answers: Vec<Value> = answer_all(&quiz, |correct, options| {
        options.iter().map(|o| o.as_str().unwrap()).find(|o| *o != correct).unwrap().to_string()
    })
    .into_iter()
    .map(|mut a| {
        a["correctAnswer"] = a["selectedAnswer"].clone();
        a
    })
    .collect();

    let response = submit(&address, json!({ "requestId": quiz["requestId"], "userId": "fan-4", "answers": answers })).await;
    assert_eq!(response.status().as_u16(), 201);
    let receipt: Value = response.json().await.unwrap();
    assert_eq!(receipt["score"], 0);
    assert_eq!(receipt["pointsAwarded"], 0);

    let rewards: Value = reqwest::get(&format!("{}/quiz/rewards/fan-4", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rewards["points"], 0);
}

#[tokio::test]
async fn attempts_on_unknown_or_foreign_quizzes_are_404() {
    let address = spawn_app().await;
    let quiz = fetch_quiz(&address, "fan-5").await;
    let answers = answer_all(&quiz, |correct, _| correct.to_string());

    let foreign = submit(&address, json!({ "requestId": quiz["requestId"], "userId": "fan-6", "answers": answers })).await;
    assert_eq!(foreign.status().as_u16(), 404);

    let unknown = submit(&address, json!({ "requestId": "no-such-quiz", "userId": "fan-5", "answers": answers })).await;
    assert_eq!(unknown.status().as_u16(), 404);
}

#[tokio::test]
async fn attempt_without_answers_is_rejected() {
    let address = spawn_app().await;
    let response = submit(&address, json!({ "requestId": "r", "userId": "fan-3", "answers": [] })).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 400);
}
