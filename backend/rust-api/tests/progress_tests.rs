mod common;

use axum::http::StatusCode;
use common::create_test_app;
use serde_json::json;

#[tokio::test]
async fn test_new_user_has_zero_progress() {
    let app = create_test_app();
    let (token, user_id) = app.register("empty@example.com").await;

    let (status, report) = app.send("GET", "/api/progress", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        report,
        json!({
            "completedTasks": 0,
            "totalTasks": 0,
            "completedSubtasks": 0,
            "totalSubtasks": 0,
            "quizzesTaken": 0,
            "avgScore": 0.0,
            "percentage": 0
        })
    );

    let snapshot = app.store.progress_snapshot(&user_id).await.unwrap();
    assert_eq!(snapshot.percentage, 0);
}

#[tokio::test]
async fn test_progress_weighs_tasks_and_quizzes() {
    let app = create_test_app();
    let (token, user_id) = app.register("weighted@example.com").await;
    let done = app.create_task(&token, "Rust").await;
    app.create_task(&token, "SQL").await;

    app.send(
        "PATCH",
        "/api/tasks",
        Some(&token),
        Some(json!({ "action": "toggle-task-done", "taskId": done["id"] })),
    )
    .await;

    let (_, quiz) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "generate", "taskId": done["id"] })),
        )
        .await;
    app.send(
        "POST",
        "/api/quiz",
        Some(&token),
        Some(json!({ "action": "submit", "quizId": quiz["id"], "answers": ["Syntax", "Loops"] })),
    )
    .await;

    let (status, report) = app.send("GET", "/api/progress", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    // tasks 1/2 and subtasks 3/6 -> 50; quiz 1/2 -> 50; 50 * 0.7 + 50 * 0.3
    assert_eq!(report["completedTasks"], 1);
    assert_eq!(report["totalTasks"], 2);
    assert_eq!(report["completedSubtasks"], 3);
    assert_eq!(report["totalSubtasks"], 6);
    assert_eq!(report["quizzesTaken"], 1);
    assert_eq!(report["avgScore"], 50.0);
    assert_eq!(report["percentage"], 50);

    let snapshot = app.store.progress_snapshot(&user_id).await.unwrap();
    assert_eq!(snapshot.completed_tasks, 1);
    assert_eq!(snapshot.quizzes_taken, 1);
    assert_eq!(snapshot.percentage, 50);
}

#[tokio::test]
async fn test_only_latest_attempt_counts() {
    let app = create_test_app();
    let (token, _) = app.register("latest@example.com").await;
    let task = app.create_task(&token, "Rust").await;

    let (_, quiz) = app
        .send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "generate", "taskId": task["id"] })),
        )
        .await;
    for answers in [json!(["Loops", "Loops"]), json!(["Syntax", "Functions"])] {
        app.send(
            "POST",
            "/api/quiz",
            Some(&token),
            Some(json!({ "action": "submit", "quizId": quiz["id"], "answers": answers })),
        )
        .await;
    }

    let (_, report) = app.send("GET", "/api/progress", Some(&token), None).await;
    assert_eq!(report["quizzesTaken"], 1);
    assert_eq!(report["avgScore"], 100.0);
    // no task progress, quiz 100 -> 30
    assert_eq!(report["percentage"], 30);
}
