//! Project tree, move targets and structure mutations.

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::test_server;

#[tokio::test]
async fn test_health_check() {
    let server = test_server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_list_projects() {
    let server = test_server();

    let response = server.get("/api/projects").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let projects: Value = response.json();
    let names: Vec<&str> = projects
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["E-commerce Platform", "CRM System"]);
}

#[tokio::test]
async fn test_open_unknown_project_is_not_found() {
    let server = test_server();

    let response = server.post("/api/projects/nope/open").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let notice: Value = response.json();
    assert_eq!(notice["level"], "error");
    assert_eq!(notice["title"], "Request Failed");
}

#[tokio::test]
async fn test_tree_is_flattened_in_display_order() {
    let server = test_server();

    let response = server.get("/api/projects/proj1/tree").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let tree: Value = response.json();
    let rows: Vec<(String, String)> = tree["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| {
            (
                n["kind"].as_str().unwrap().to_string(),
                n["id"].as_str().unwrap().to_string(),
            )
        })
        .collect();

    let expected = [
        ("module", "mod-auth"),
        ("suite", "suite-login"),
        ("case", "tc1"),
        ("suite", "suite-signup"),
        ("case", "tc2"),
        ("module", "mod-cart"),
        ("suite", "suite-cart"),
        ("case", "tc3"),
    ];
    let expected: Vec<(String, String)> = expected
        .iter()
        .map(|(k, id)| (k.to_string(), id.to_string()))
        .collect();
    assert_eq!(rows, expected);
    assert_eq!(tree["nodes"][0]["caseCount"], 2);
    assert_eq!(tree["nodes"][0]["selection"], "none");
}

#[tokio::test]
async fn test_move_targets_exclude_current_module() {
    let server = test_server();

    let response = server
        .get("/api/projects/proj1/targets")
        .add_query_param("suite", "suite-login")
        .add_query_param("module", "mod-auth")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let targets: Value = response.json();
    let modules: Vec<&str> = targets["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["_id"].as_str().unwrap())
        .collect();
    assert_eq!(modules, vec!["mod-cart"]);
    assert_eq!(targets["suites"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_module_validates_name() {
    let server = test_server();

    let response = server
        .post("/api/projects/proj1/modules")
        .json(&json!({ "name": "UI" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let notice: Value = response.json();
    assert_eq!(notice["title"], "Validation Error");
    assert_eq!(
        notice["description"],
        "Module name must be at least 3 characters."
    );
}

#[tokio::test]
async fn test_created_module_appears_in_tree_targets() {
    let server = test_server();
    server.get("/api/projects/proj1/targets").await;

    let response = server
        .post("/api/projects/proj1/modules")
        .json(&json!({ "name": "Payments", "description": "Card and wallet flows" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let module: Value = response.json();

    let targets: Value = server.get("/api/projects/proj1/targets").await.json();
    let ids: Vec<&str> = targets["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["_id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&module["_id"].as_str().unwrap()));
}

#[tokio::test]
async fn test_create_suite_and_case() {
    let server = test_server();

    let suite: Value = server
        .post("/api/projects/proj1/testsuites")
        .json(&json!({ "module": "mod-cart", "name": "Checkout" }))
        .await
        .json();
    assert_eq!(suite["module"]["_id"], "mod-cart");

    let response = server
        .post("/api/testcases")
        .json(&json!({
            "project": "proj1",
            "testSuite": suite["_id"],
            "title": "Pay with saved card",
            "description": "Checkout completes with a stored card",
            "priority": "High",
            "type": "Functional",
            "steps": "1. Add item\n2. Checkout\n3. Pick saved card",
            "expectedResults": "Order confirmed"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let case: Value = response.json();
    assert_eq!(case["testCaseId"], "TC-0006");
    assert_eq!(case["moduleId"], "mod-cart");

    let tree: Value = server.get("/api/projects/proj1/tree").await.json();
    assert!(
        tree["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["id"] == case["_id"])
    );
}

#[tokio::test]
async fn test_update_case() {
    let server = test_server();

    let response = server
        .put("/api/testcases/tc3")
        .json(&json!({ "priority": "Critical", "title": "Add product to empty cart" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let case: Value = response.json();
    assert_eq!(case["priority"], "Critical");
    assert_eq!(case["title"], "Add product to empty cart");
    assert_eq!(case["steps"], "1. Browse product\n2. Click add to cart");
}

#[tokio::test]
async fn test_update_case_rejects_short_title() {
    let server = test_server();

    let response = server
        .put("/api/testcases/tc3")
        .json(&json!({ "title": "Add" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
