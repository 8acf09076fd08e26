mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{create_test_app, create_test_app_with, raw_question, ScriptedOracle};
use serde_json::{json, Value};
use studyhelper_api::oracle::{RawQuestion, RoadmapPayload};

async fn generate(app: &common::TestApp, token: &str, task_id: &Value) -> Value {
    let (status, quiz) = app
        .send(
            "POST",
            "/api/quiz",
            Some(token),
            Some(json!({ "action": "generate", "taskId": task_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "generate failed: {}", quiz);
    quiz
}

async fn submit(app: &common::TestApp, token: &str, quiz_id: &Value, answers: &[&str]) -> Value {
    let (status, result) = app
        .send(
            "POST",
            "/api/quiz",
            Some(token),
            Some(json!({ "action": "submit", "quizId": quiz_id, "answers": answers })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {}", result);
    result
}

#[tokio::test]
async fn test_generate_falls_back_to_fixed_quiz() {
    let app = create_test_app();
    let (token, _) = app.register("fallback@example.com").await;
    let task = app.create_task(&token, "Rust").await;

    let quiz = generate(&app, &token, &task["id"]).await;
    assert_eq!(quiz["taskId"], task["id"]);
    assert_eq!(quiz["score"], 0);
    assert!(quiz["attempts"].as_array().unwrap().is_empty());

    let questions = quiz["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["question"], "What is \"Rust\" mainly about?");
    assert_eq!(questions[0]["correctAnswer"], "Syntax");
    assert_eq!(questions[1]["correctAnswer"], "Functions");
}

#[tokio::test]
async fn test_generated_questions_accept_answer_alias() {
    let app = create_test_app_with(ScriptedOracle {
        quiz: Some(vec![
            raw_question("2 + 2?", &["3", "4"], "4"),
            RawQuestion {
                question: "Capital of France?".to_string(),
                options: Some(vec!["Paris".to_string(), "Rome".to_string()]),
                correct_answer: None,
                answer: Some("Paris".to_string()),
            },
        ]),
        ..ScriptedOracle::default()
    });
    let (token, _) = app.register("alias@example.com").await;
    let task = app.create_task(&token, "Trivia").await;

    let quiz = generate(&app, &token, &task["id"]).await;
    assert_eq!(quiz["questions"][0]["correctAnswer"], "4");
    assert_eq!(quiz["questions"][1]["correctAnswer"], "Paris");
}

#[tokio::test]
async fn test_unanswerable_questions_fall_back_and_blank_submission_scores_zero() {
    let app = create_test_app_with(ScriptedOracle {
        quiz: Some(vec![
            RawQuestion {
                question: "What is ownership?".to_string(),
                ..RawQuestion::default()
            },
            raw_question("One option only?", &["yes"], "yes"),
        ]),
        ..ScriptedOracle::default()
    });
    let (token, _) = app.register("ungradable@example.com").await;
    let task = app.create_task(&token, "Rust").await;

    let quiz = generate(&app, &token, &task["id"]).await;
    let questions = quiz["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["question"], "What is \"Rust\" mainly about?");
    assert!(questions
        .iter()
        .all(|q| q["options"].as_array().unwrap().len() >= 2 && q["correctAnswer"] != ""));

    let result = submit(&app, &token, &quiz["id"], &[]).await;
    assert_eq!(result["score"], 0);
    assert_eq!(result["total"], 2);
    assert!(result["answers"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["isCorrect"] == false));
}

#[tokio::test]
async fn test_generate_for_foreign_task_is_not_found() {
    let app = create_test_app();
    let (owner, _) = app.register("owner@example.com").await;
    let (other, _) = app.register("other@example.com").await;
    let task = app.create_task(&owner, "Rust").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&other),
            Some(json!({ "action": "generate", "taskId": task["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_scores_and_appends_attempt() {
    let app = create_test_app();
    let (token, _) = app.register("submit@example.com").await;
    let task = app.create_task(&token, "Rust").await;
    let quiz = generate(&app, &token, &task["id"]).await;

    let result = submit(&app, &token, &quiz["id"], &["Syntax", "Loops"]).await;
    assert_eq!(result["score"], 1);
    assert_eq!(result["total"], 2);
    assert_eq!(result["answers"][0]["isCorrect"], true);
    assert_eq!(result["answers"][1]["isCorrect"], false);
    assert_eq!(result["answers"][1]["submitted"], "Loops");
    assert_eq!(result["answers"][1]["correctAnswer"], "Functions");
    assert_eq!(result["roadmap"].as_array().unwrap().len(), 5);
    assert_eq!(result["roadmap"][0], "Review the fundamentals again");

    let uri = format!("/api/quiz/{}", quiz["id"].as_str().unwrap());
    let (status, detail) = app.send("GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["taskTitle"], "Rust");
    let attempts = detail["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["id"], result["attemptId"]);
    assert_eq!(attempts[0]["score"], 1);
}

#[tokio::test]
async fn test_submit_uses_oracle_improvement_roadmap() {
    let app = create_test_app_with(ScriptedOracle {
        roadmap: Some(RoadmapPayload::Lines("1. Revisit loops\n2) Write tests\n".to_string())),
        ..ScriptedOracle::default()
    });
    let (token, _) = app.register("improve@example.com").await;
    let task = app.create_task(&token, "Rust").await;
    let quiz = generate(&app, &token, &task["id"]).await;

    let result = submit(&app, &token, &quiz["id"], &["Syntax", "Loops"]).await;
    assert_eq!(result["roadmap"], json!(["Revisit loops", "Write tests"]));

    let prompt = app.oracle.last_roadmap_prompt().unwrap();
    assert!(prompt.contains("\"Rust\""));
    assert!(prompt.contains("scored 1/2"));
    assert!(prompt.contains("Which concept is most important in \"Rust\"?"));
}

#[tokio::test]
async fn test_missing_answers_count_as_wrong() {
    let app = create_test_app();
    let (token, _) = app.register("short@example.com").await;
    let task = app.create_task(&token, "Rust").await;
    let quiz = generate(&app, &token, &task["id"]).await;

    let result = submit(&app, &token, &quiz["id"], &["Syntax"]).await;
    assert_eq!(result["score"], 1);
    assert_eq!(result["answers"][1]["submitted"], "");
}

#[tokio::test]
async fn test_submit_without_answers_is_bad_request() {
    let app = create_test_app();
    let (token, _) = app.register("noanswers@example.com").await;
    let task = app.create_task(&token, "Rust").await;
    let quiz = generate(&app, &token, &task["id"]).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "submit", "quizId": quiz["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Answers are required");

    let (status, _) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "submit", "quizId": "missing", "answers": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retry_reuses_latest_quiz() {
    let app = create_test_app();
    let (token, _) = app.register("retry@example.com").await;
    let task = app.create_task(&token, "Rust").await;

    let (status, first) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "retry", "taskId": task["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    submit(&app, &token, &first["id"], &["Syntax", "Functions"]).await;

    let (_, again) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "retry", "taskId": task["id"] })),
        )
        .await;
    assert_eq!(again["id"], first["id"]);
    assert_eq!(again["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(again["score"], 2);

    let newer = generate(&app, &token, &task["id"]).await;
    let (_, latest) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "retry", "taskId": task["id"] })),
        )
        .await;
    assert_eq!(latest["id"], newer["id"]);
}

#[tokio::test]
async fn test_unknown_quiz_action_is_bad_request() {
    let app = create_test_app();
    let (token, _) = app.register("badaction@example.com").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "grade", "quizId": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_paginates_attempts_newest_first() {
    let app = create_test_app();
    let (token, _) = app.register("history@example.com").await;
    let rust = app.create_task(&token, "Rust").await;
    let sql = app.create_task(&token, "SQL").await;
    let rust_quiz = generate(&app, &token, &rust["id"]).await;
    let sql_quiz = generate(&app, &token, &sql["id"]).await;

    for i in 0..12 {
        let quiz_id = if i % 2 == 0 { &rust_quiz["id"] } else { &sql_quiz["id"] };
        submit(&app, &token, quiz_id, &["Syntax", "Functions"]).await;
    }

    let (status, page) = app
        .send("GET", "/api/quiz/history?page=1&limit=5", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 12);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["page"], 1);
    assert_eq!(page["attempts"].as_array().unwrap().len(), 5);

    let dates: Vec<DateTime<Utc>> = page["attempts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["date"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(dates.windows(2).all(|pair| pair[0] >= pair[1]));

    let (_, last) = app
        .send("GET", "/api/quiz/history?page=3&limit=5", Some(&token), None)
        .await;
    assert_eq!(last["attempts"].as_array().unwrap().len(), 2);
    let titles: Vec<&str> = last["attempts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["taskTitle"].as_str().unwrap())
        .collect();
    assert!(titles.iter().all(|t| *t == "Rust" || *t == "SQL"));

    let (_, beyond) = app
        .send("GET", "/api/quiz/history?page=9&limit=5", Some(&token), None)
        .await;
    assert!(beyond["attempts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_defaults_to_configured_page_size() {
    let app = create_test_app();
    let (token, _) = app.register("defaults@example.com").await;
    let task = app.create_task(&token, "Rust").await;
    let quiz = generate(&app, &token, &task["id"]).await;
    for _ in 0..7 {
        submit(&app, &token, &quiz["id"], &["Syntax"]).await;
    }

    let (_, page) = app.send("GET", "/api/quiz/history", Some(&token), None).await;
    assert_eq!(
        page["attempts"].as_array().unwrap().len(),
        app.config.history_page_size as usize
    );
    assert_eq!(page["total"], 7);
}

#[tokio::test]
async fn test_history_rejects_malformed_paging_with_json_error() {
    let app = create_test_app();
    let (token, _) = app.register("badpage@example.com").await;

    for uri in ["/api/quiz/history?page=abc", "/api/quiz/history?limit=-1"] {
        let (status, body) = app.send("GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid query string"));
    }
}

#[tokio::test]
async fn test_quiz_of_deleted_task_shows_untitled() {
    let app = create_test_app();
    let (token, _) = app.register("untitled@example.com").await;
    let task = app.create_task(&token, "Rust").await;
    let quiz = generate(&app, &token, &task["id"]).await;
    submit(&app, &token, &quiz["id"], &["Syntax", "Functions"]).await;

    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());
    app.send("DELETE", &uri, Some(&token), None).await;

    let uri = format!("/api/quiz/{}", quiz["id"].as_str().unwrap());
    let (status, detail) = app.send("GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["taskTitle"], "Untitled Task");

    let (_, page) = app.send("GET", "/api/quiz/history", Some(&token), None).await;
    assert_eq!(page["attempts"][0]["taskTitle"], "Untitled Task");
}

#[tokio::test]
async fn test_quiz_of_other_user_is_not_found() {
    let app = create_test_app();
    let (owner, _) = app.register("qowner@example.com").await;
    let (other, _) = app.register("qother@example.com").await;
    let task = app.create_task(&owner, "Rust").await;
    let quiz = generate(&app, &owner, &task["id"]).await;

    let uri = format!("/api/quiz/{}", quiz["id"].as_str().unwrap());
    let (status, _) = app.send("GET", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
