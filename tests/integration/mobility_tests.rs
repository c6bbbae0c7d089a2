//! Moving and copying suites and test cases, and bulk deletion.

use axum::http::StatusCode;
use casebook::api::TestApi;
use casebook::memory::MemoryApi;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::common::{test_server, test_server_with};

#[tokio::test]
async fn test_move_suite_carries_its_cases() {
    let server = test_server();
    let before: Value = server.get("/api/projects/proj1/tree").await.json();
    assert_eq!(before["nodes"][0]["caseCount"], 2);

    let response = server
        .post("/api/testsuites/suite-login/move")
        .json(&json!({ "targetModuleId": "mod-cart" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let suite: Value = response.json();
    assert_eq!(suite["module"]["_id"], "mod-cart");

    let after: Value = server.get("/api/projects/proj1/tree").await.json();
    let nodes = after["nodes"].as_array().unwrap();
    let auth = nodes.iter().find(|n| n["id"] == "mod-auth").unwrap();
    let cart = nodes.iter().find(|n| n["id"] == "mod-cart").unwrap();
    assert_eq!(auth["caseCount"], 1);
    assert_eq!(cart["caseCount"], 2);
    let tc1 = nodes.iter().find(|n| n["id"] == "tc1").unwrap();
    assert_eq!(tc1["parentId"], "suite-login");
}

#[tokio::test]
async fn test_move_suite_to_its_own_module_is_rejected() {
    let api = Arc::new(MemoryApi::with_sample_data());
    let server = test_server_with(api.clone());

    let response = server
        .post("/api/testsuites/suite-login/move")
        .json(&json!({ "targetModuleId": "mod-auth" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let notice: Value = response.json();
    assert_eq!(notice["title"], "Invalid Target");
    // Only the suite lookup reached the API.
    assert_eq!(api.request_count(), 1);
}

#[tokio::test]
async fn test_move_unknown_suite_is_not_found() {
    let server = test_server();

    let response = server
        .post("/api/testsuites/missing/move")
        .json(&json!({ "targetModuleId": "mod-cart" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_copy_suite_leaves_source_in_place() {
    let server = test_server();

    let response = server
        .post("/api/testsuites/suite-cart/copy")
        .json(&json!({ "targetModuleId": "mod-auth" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let copy: Value = response.json();
    assert_ne!(copy["_id"], "suite-cart");
    assert_eq!(copy["name"], "Cart Management");

    let targets: Value = server
        .get("/api/projects/proj1/targets")
        .add_query_param("module", "mod-auth")
        .await
        .json();
    assert_eq!(targets["suites"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_move_selected_cases() {
    let server = test_server();
    for id in ["tc1", "tc2"] {
        server
            .post("/api/selected/toggle")
            .json(&json!({ "id": id }))
            .await;
    }

    let response = server
        .post("/api/testcases/move")
        .json(&json!({ "targetTestSuiteId": "suite-cart" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["notice"]["level"], "success");
    assert_eq!(body["succeeded"], json!(["tc1", "tc2"]));
    assert!(
        body["records"]
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["moduleId"] == "mod-cart")
    );

    let selected: Value = server.get("/api/selected").await.json();
    assert_eq!(selected["ids"], json!([]));
}

#[tokio::test]
async fn test_copy_cases_requires_target() {
    let server = test_server();

    let response = server
        .post("/api/testcases/copy")
        .json(&json!({ "ids": ["tc1"] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_partial_bulk_delete_applies_the_rest() {
    let api = Arc::new(MemoryApi::with_sample_data());
    api.fail_on("tc2");
    let server = test_server_with(api.clone());

    let response = server
        .post("/api/testcases/delete")
        .json(&json!({ "ids": ["tc1", "tc2", "tc3"] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::MULTI_STATUS);
    let body: Value = response.json();
    assert_eq!(body["notice"]["level"], "warning");
    assert_eq!(body["succeeded"], json!(["tc1", "tc3"]));
    assert_eq!(body["failed"][0]["id"], "tc2");
    assert_eq!(body["failed"][0]["message"], "Simulated failure for tc2");

    api.clear_failures();
    let remaining = api.list_test_cases("proj1").await.unwrap();
    let ids: Vec<&str> = remaining.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["tc2"]);
}

#[tokio::test]
async fn test_bulk_delete_that_fails_entirely() {
    let api = Arc::new(MemoryApi::with_sample_data());
    api.fail_on("tc1");
    let server = test_server_with(api);

    let response = server
        .post("/api/testcases/delete")
        .json(&json!({ "ids": ["tc1"] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["notice"]["level"], "error");
}
