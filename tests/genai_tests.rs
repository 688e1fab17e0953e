// tests/genai_tests.rs
//
// Exercises the generator client against a local stand-in for the chat/completions API.

use std::sync::Arc;

use axum::{http::HeaderMap, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use indcric_backend::{
    build_router,
    config::{Prompts, QuizConfig},
    db,
    error::GenerationError,
    genai::{GenAi, GenerationRequest, QuizGenerator},
    state::AppState,
};
use serde_json::{json, Value};

const API_KEY: &str = "test-key";

fn fenced_quiz() -> String {
    let questions: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "id": format!("gen-{i}"),
                "question": format!("Generated question {i}?"),
                "options": ["A", "B", "C", "D"],
                "correctAnswer": "C",
                "explanation": "Because."
            })
        })
        .collect();
    format!("```json\n{}\n```", json!({ "questions": questions }))
}

async fn completions(headers: HeaderMap, Json(req): Json<Value>) -> impl IntoResponse {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {API_KEY}"));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, r#"[{"error":{"message":"API key not valid"}}]"#.to_string()).into_response();
    }
    assert_eq!(req["response_format"]["type"], "json_object");

    let content = match req["model"].as_str() {
        Some("garbage-model") => "I'd rather talk about football.".to_string(),
        _ => fenced_quiz(),
    };
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    }))
    .into_response()
}

/// Start the stub API and return its base URL.
async fn spawn_stub() -> String {
    let app = Router::new().route("/chat/completions", post(completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}/", port)
}

fn client(base_url: &str, api_key: &str, model: &str) -> GenAi {
    GenAi::new(api_key.into(), base_url.into(), model.into(), Prompts::default()).unwrap()
}

fn request() -> GenerationRequest {
    GenerationRequest { format: "ipl".into(), recent_questions: vec!["Old question?".into()], count: 5 }
}

#[tokio::test]
async fn fenced_json_is_parsed() {
    let base = spawn_stub().await;
    let genai = client(&base, API_KEY, "test-model");

    let value = genai.generate_quiz(&request()).await.unwrap();
    let questions = value["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);
    assert_eq!(questions[0]["correctAnswer"], "C");
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let base = spawn_stub().await;
    let genai = client(&base, "wrong-key", "test-model");

    match genai.generate_quiz(&request()).await {
        Err(GenerationError::Http { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn prose_output_is_unparseable() {
    let base = spawn_stub().await;
    let genai = client(&base, API_KEY, "garbage-model");

    let err = genai.generate_quiz(&request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Unparseable(_)), "{err:?}");
}

#[tokio::test]
async fn quiz_endpoint_serves_generated_questions() {
    let base = spawn_stub().await;
    let generator: Arc<dyn QuizGenerator> = Arc::new(client(&base, API_KEY, "test-model"));

    let pool = db::connect_in_memory().await.unwrap();
    let state = AppState::build(pool, QuizConfig::default(), Some(generator)).await;
    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let body: Value = reqwest::Client::new()
        .post(&format!("http://127.0.0.1:{}/quiz", port))
        .json(&json!({ "format": "IPL", "userId": "fan-9" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["source"], "ai");
    assert!(body.get("errorDetails").is_none());
    assert_eq!(body["quiz"]["questions"].as_array().unwrap().len(), 5);
    assert_eq!(body["quiz"]["questions"][4]["id"], "gen-5");
}
