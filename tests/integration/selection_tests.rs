//! Active module/suite tracking and the test-case multi-select.

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::test_server;

#[tokio::test]
async fn test_activating_module_clears_suite() {
    let server = test_server();

    server
        .post("/api/selection")
        .json(&json!({ "target": "module", "id": "mod-auth" }))
        .await;
    let selection: Value = server
        .post("/api/selection")
        .json(&json!({ "target": "testSuite", "id": "suite-login" }))
        .await
        .json();
    assert_eq!(selection["activeModuleId"], "mod-auth");
    assert_eq!(selection["activeTestSuiteId"], "suite-login");

    let selection: Value = server
        .post("/api/selection")
        .json(&json!({ "target": "module", "id": "mod-cart" }))
        .await
        .json();
    assert_eq!(selection["activeModuleId"], "mod-cart");
    assert_eq!(selection["activeTestSuiteId"], Value::Null);

    let current: Value = server.get("/api/selection").await.json();
    assert_eq!(current, selection);
}

#[tokio::test]
async fn test_opening_project_resets_selection() {
    let server = test_server();
    server
        .post("/api/selection")
        .json(&json!({ "target": "module", "id": "mod-auth" }))
        .await;
    server
        .post("/api/selected/toggle")
        .json(&json!({ "id": "tc1" }))
        .await;

    let response = server.post("/api/projects/proj2/open").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let selection: Value = server.get("/api/selection").await.json();
    assert_eq!(selection["activeModuleId"], Value::Null);
    let selected: Value = server.get("/api/selected").await.json();
    assert_eq!(selected["ids"], json!([]));
}

#[tokio::test]
async fn test_toggle_twice_restores_set() {
    let server = test_server();

    let first: Value = server
        .post("/api/selected/toggle")
        .json(&json!({ "id": "tc2" }))
        .await
        .json();
    assert_eq!(first["selected"], true);
    assert_eq!(first["ids"], json!(["tc2"]));

    let second: Value = server
        .post("/api/selected/toggle")
        .json(&json!({ "id": "tc2" }))
        .await
        .json();
    assert_eq!(second["selected"], false);
    assert_eq!(second["ids"], json!([]));
}

#[tokio::test]
async fn test_select_all_in_suite_leaves_others_alone() {
    let server = test_server();
    server.post("/api/projects/proj1/open").await;
    server
        .post("/api/selected/toggle")
        .json(&json!({ "id": "tc3" }))
        .await;

    let response: Value = server
        .post("/api/selected/scope")
        .json(&json!({ "scope": { "kind": "module", "id": "mod-auth" } }))
        .await
        .json();
    assert_eq!(response["state"], "all");
    assert_eq!(response["ids"], json!(["tc1", "tc2", "tc3"]));

    let tree: Value = server.get("/api/projects/proj1/tree").await.json();
    assert_eq!(tree["selectedCount"], 3);

    let response: Value = server
        .post("/api/selected/scope")
        .json(&json!({ "scope": { "kind": "module", "id": "mod-auth" } }))
        .await
        .json();
    assert_eq!(response["state"], "none");
    assert_eq!(response["ids"], json!(["tc3"]));
}

#[tokio::test]
async fn test_partial_scope_is_completed_first() {
    let server = test_server();
    server
        .post("/api/selected/toggle")
        .json(&json!({ "id": "tc1" }))
        .await;

    let tree: Value = server.get("/api/projects/proj1/tree").await.json();
    assert_eq!(tree["nodes"][0]["id"], "mod-auth");
    assert_eq!(tree["nodes"][0]["selection"], "partial");

    let response: Value = server
        .post("/api/selected/scope")
        .json(&json!({
            "projectId": "proj1",
            "scope": { "kind": "module", "id": "mod-auth" }
        }))
        .await
        .json();
    assert_eq!(response["state"], "all");
}

#[tokio::test]
async fn test_scope_requires_a_project() {
    let server = test_server();

    let response = server
        .post("/api/selected/scope")
        .json(&json!({ "scope": { "kind": "project" } }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scope_skips_run_members() {
    let server = test_server();

    let response: Value = server
        .post("/api/selected/scope")
        .json(&json!({
            "projectId": "proj1",
            "runId": "tr1",
            "scope": { "kind": "project" }
        }))
        .await
        .json();

    assert_eq!(response["ids"], json!(["tc3"]));
}

#[tokio::test]
async fn test_clear_selected() {
    let server = test_server();
    server
        .post("/api/selected/toggle")
        .json(&json!({ "id": "tc5" }))
        .await;

    let response = server.delete("/api/selected").await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let selected: Value = server.get("/api/selected").await.json();
    assert_eq!(selected["ids"], json!([]));
}
