//! Test run composition and execution.

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::test_server;

#[tokio::test]
async fn test_list_runs_for_project() {
    let server = test_server();

    let runs: Value = server.get("/api/projects/proj1/testruns").await.json();

    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["name"], "Regression Test - v1.2");
    assert_eq!(runs[0]["status"], "In Progress");
}

#[tokio::test]
async fn test_create_run_requires_name() {
    let server = test_server();

    let response = server
        .post("/api/projects/proj1/testruns")
        .json(&json!({ "name": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/projects/proj1/testruns")
        .json(&json!({ "name": "Release 1.4", "description": "Release candidate" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let run: Value = response.json();
    assert_eq!(run["testCases"], json!([]));

    let runs: Value = server.get("/api/projects/proj1/testruns").await.json();
    assert_eq!(runs.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_available_pool_excludes_members() {
    let server = test_server();

    let response = server.get("/api/testruns/tr1/available").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let available: Value = response.json();
    let ids: Vec<&str> = available["cases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["tc3"]);
    // Modules with nothing left to add are not offered.
    assert_eq!(available["nodes"][0]["id"], "mod-cart");
    assert_eq!(available["nodes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_add_selected_cases_to_run() {
    let server = test_server();
    server
        .post("/api/selected/toggle")
        .json(&json!({ "id": "tc3" }))
        .await;

    let response = server
        .post("/api/testruns/tr1/test-cases")
        .json(&json!({}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let run: Value = response.json();
    assert_eq!(run["testCases"].as_array().unwrap().len(), 3);
    assert_eq!(run["testCases"][2]["status"], "Not Executed");

    let selected: Value = server.get("/api/selected").await.json();
    assert_eq!(selected["ids"], json!([]));

    let metrics: Value = server.get("/api/testruns/tr1/metrics").await.json();
    assert_eq!(metrics["total"], 3);
    assert_eq!(metrics["notExecuted"], 2);
}

#[tokio::test]
async fn test_adding_only_members_is_rejected() {
    let server = test_server();

    let response = server
        .post("/api/testruns/tr1/test-cases")
        .json(&json!({ "testCaseIds": ["tc1", "tc2"] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_execution_history_accumulates() {
    let server = test_server();

    let response = server
        .post("/api/testruns/tr1/test-cases/tc1/execute")
        .json(&json!({ "status": "Failed", "actualResults": "Error 500 on submit" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .post("/api/testruns/tr1/test-cases/tc1/execute")
        .json(&json!({ "status": "Passed", "actualResults": "Dashboard loaded" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let run: Value = server.get("/api/testruns/tr1").await.json();
    let member = run["testCases"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["testCaseId"] == "tc1")
        .unwrap();
    assert_eq!(member["status"], "Passed");
    assert_eq!(member["history"].as_array().unwrap().len(), 1);
    assert_eq!(member["history"][0]["status"], "Failed");
    assert_eq!(member["history"][0]["actualResults"], "Error 500 on submit");

    let metrics: Value = server.get("/api/testruns/tr1/metrics").await.json();
    assert_eq!(metrics["passed"], 2);
    assert_eq!(metrics["passRate"], 100.0);
}

#[tokio::test]
async fn test_execute_requires_actual_results() {
    let server = test_server();

    let response = server
        .post("/api/testruns/tr1/test-cases/tc1/execute")
        .json(&json!({ "status": "Blocked", "actualResults": "n/a" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/testruns/tr1/test-cases/tc1/execute")
        .json(&json!({ "status": "Pending", "actualResults": "Waiting for data" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_case_discards_history() {
    let server = test_server();

    let response = server.delete("/api/testruns/tr2/test-cases/tc4").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let run: Value = response.json();
    assert_eq!(run["testCases"], json!([]));

    let run: Value = server
        .post("/api/testruns/tr2/test-cases")
        .json(&json!({ "testCaseIds": ["tc4"] }))
        .await
        .json();
    assert_eq!(run["testCases"][0]["status"], "Not Executed");
    assert_eq!(run["testCases"][0]["history"], json!([]));
}

#[tokio::test]
async fn test_run_status_is_set_explicitly() {
    let server = test_server();

    let response = server
        .put("/api/testruns/tr1/status")
        .json(&json!({ "status": "Cancelled" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let run: Value = server.get("/api/testruns/tr1").await.json();
    assert_eq!(run["status"], "Cancelled");
    assert_eq!(run["testCases"][0]["status"], "Not Executed");
}

#[tokio::test]
async fn test_case_history_follows_executions() {
    let server = test_server();

    let history: Value = server
        .get("/api/testruns/tr2/test-cases/tc4/history")
        .await
        .json();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["actualResults"], "No reset email received");

    server
        .post("/api/testruns/tr2/test-cases/tc4/execute")
        .json(&json!({ "status": "Passed", "actualResults": "Reset email arrived" }))
        .await;

    let history: Value = server
        .get("/api/testruns/tr2/test-cases/tc4/history")
        .await
        .json();
    assert_eq!(history.as_array().unwrap().len(), 2);
    assert_eq!(history[1]["actualResults"], "Email not received");

    let response = server
        .get("/api/testruns/tr1/test-cases/tc4/history")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
