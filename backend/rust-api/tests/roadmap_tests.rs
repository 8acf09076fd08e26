mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{create_test_app, create_test_app_with, ScriptedOracle};
use serde_json::json;
use studyhelper_api::models::roadmap::Roadmap;
use studyhelper_api::oracle::RoadmapPayload;
use studyhelper_api::store::DocumentStore;

#[tokio::test]
async fn test_roadmap_is_empty_before_generation() {
    let app = create_test_app();
    let (token, _) = app.register("none@example.com").await;

    let (status, body) = app.send("GET", "/api/roadmap", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "roadmap": [] }));
}

#[tokio::test]
async fn test_fallback_roadmap_is_persisted() {
    let app = create_test_app();
    let (token, _) = app.register("fallback@example.com").await;

    let (status, body) = app.send("POST", "/api/roadmap", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["roadmap"],
        json!([
            "Understand fundamentals",
            "Review tutorials",
            "Practice coding problems",
            "Take quizzes",
            "Advance to next level"
        ])
    );

    let (_, stored) = app.send("GET", "/api/roadmap", Some(&token), None).await;
    assert_eq!(stored, body);
}

#[tokio::test]
async fn test_default_prompt_lists_task_titles() {
    let app = create_test_app_with(ScriptedOracle {
        roadmap: Some(RoadmapPayload::Steps(vec!["Learn".to_string()])),
        ..ScriptedOracle::default()
    });
    let (token, _) = app.register("prompt@example.com").await;

    app.send("POST", "/api/roadmap", Some(&token), Some(json!({}))).await;
    assert_eq!(
        app.oracle.last_roadmap_prompt().unwrap(),
        "Generate a beginner-friendly learning roadmap for a new student"
    );

    app.create_task(&token, "Rust").await;
    app.create_task(&token, "SQL").await;
    app.send("POST", "/api/roadmap", Some(&token), None).await;
    let prompt = app.oracle.last_roadmap_prompt().unwrap();
    assert!(prompt.starts_with("Generate a personalized learning roadmap for these tasks:"));
    assert!(prompt.contains("Rust"));
    assert!(prompt.contains("SQL"));

    app.send(
        "POST",
        "/api/roadmap",
        Some(&token),
        Some(json!({ "prompt": "  Focus on async Rust  " })),
    )
    .await;
    assert_eq!(app.oracle.last_roadmap_prompt().unwrap(), "Focus on async Rust");
}

#[tokio::test]
async fn test_text_shapes_are_split_into_steps() {
    let app = create_test_app_with(ScriptedOracle {
        roadmap: Some(RoadmapPayload::Text(
            "1. Read the book\n\n- Build a project\n* Ship it".to_string(),
        )),
        ..ScriptedOracle::default()
    });
    let (token, _) = app.register("text@example.com").await;

    let (status, body) = app.send("POST", "/api/roadmap", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["roadmap"],
        json!(["Read the book", "Build a project", "Ship it"])
    );
}

#[tokio::test]
async fn test_blank_oracle_steps_fall_back() {
    let app = create_test_app_with(ScriptedOracle {
        roadmap: Some(RoadmapPayload::Nested(vec!["  ".to_string(), String::new()])),
        ..ScriptedOracle::default()
    });
    let (token, _) = app.register("blank@example.com").await;

    let (_, body) = app.send("POST", "/api/roadmap", Some(&token), None).await;
    assert_eq!(body["roadmap"][0], "Understand fundamentals");
}

#[tokio::test]
async fn test_regenerate_replaces_previous_roadmap() {
    let app = create_test_app_with(ScriptedOracle {
        roadmap: Some(RoadmapPayload::Steps(vec!["Fresh step".to_string()])),
        ..ScriptedOracle::default()
    });
    let (token, user_id) = app.register("replace@example.com").await;
    app.store
        .upsert_roadmap(&Roadmap {
            user_id: user_id.clone(),
            steps: vec!["Old step".to_string(), "Another old step".to_string()],
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let (_, before) = app.send("GET", "/api/roadmap", Some(&token), None).await;
    assert_eq!(before["roadmap"], json!(["Old step", "Another old step"]));

    app.send("POST", "/api/roadmap", Some(&token), None).await;
    let (_, after) = app.send("GET", "/api/roadmap", Some(&token), None).await;
    assert_eq!(after["roadmap"], json!(["Fresh step"]));
}
