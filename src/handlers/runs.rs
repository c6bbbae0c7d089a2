use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::api::{CreateTestRun, ExecuteTestCase};
use crate::model::{ExecutionRecord, RunMetrics, RunStatus, TestCase, TestRun};
use crate::runs;
use crate::tree::TreeNode;

pub async fn list_runs(
    State(state): State<crate::SharedAppState>,
    Path(project_id): Path<String>,
) -> crate::AppResult<Json<Vec<TestRun>>> {
    Ok(Json(state.workspace.test_runs(&project_id).await?))
}

#[derive(Deserialize)]
pub struct NewTestRun {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_run(
    State(state): State<crate::SharedAppState>,
    Path(project_id): Path<String>,
    Json(body): Json<NewTestRun>,
) -> crate::AppResult<(StatusCode, Json<TestRun>)> {
    let request = CreateTestRun {
        project_id,
        name: body.name,
        description: body.description,
    };
    let run = state.workspace.runs().create_run(&request).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn get_run(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
) -> crate::AppResult<Json<TestRun>> {
    Ok(Json(state.workspace.test_run(&id).await?))
}

#[derive(Deserialize)]
pub struct StatusChange {
    pub status: RunStatus,
}

pub async fn set_run_status(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusChange>,
) -> crate::AppResult<Json<TestRun>> {
    let run = state
        .workspace
        .runs()
        .set_run_status(&id, body.status)
        .await?;
    Ok(Json(run))
}

pub async fn run_metrics(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
) -> crate::AppResult<Json<RunMetrics>> {
    Ok(Json(state.workspace.run_metrics(&id).await?))
}

#[derive(Serialize)]
pub struct AvailableCases {
    pub cases: Vec<TestCase>,
    pub nodes: Vec<TreeNode>,
}

/// Candidate pool for the add-to-run dialog: the run's project cases that
/// are not members yet, flat and as a selection tree.
pub async fn available_cases(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
) -> crate::AppResult<Json<AvailableCases>> {
    let workspace = &state.workspace;
    let run = workspace.test_run(&id).await?;
    let tree = workspace.tree(run.project_id()).await?;

    let cases = runs::available_cases(&run, tree.cases())
        .into_iter()
        .cloned()
        .collect();
    let members: HashSet<String> = run.member_ids().map(str::to_string).collect();
    let nodes = tree.flatten(&workspace.selected_snapshot(), &members);

    Ok(Json(AvailableCases { cases, nodes }))
}

/// Without `testCaseIds` the current multi-select is added.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToRun {
    pub test_case_ids: Option<Vec<String>>,
}

pub async fn add_cases(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
    Json(body): Json<AddToRun>,
) -> crate::AppResult<Json<TestRun>> {
    let workspace = &state.workspace;
    let from_selection = body.test_case_ids.is_none();
    let ids = body.test_case_ids.unwrap_or_else(|| workspace.selected());

    let run = workspace.test_run(&id).await?;
    let updated = workspace.runs().add_cases(&run, &ids).await?;
    if from_selection {
        workspace.clear_selected();
    }
    Ok(Json(updated))
}

pub async fn execute_case(
    State(state): State<crate::SharedAppState>,
    Path((id, case_id)): Path<(String, String)>,
    Json(request): Json<ExecuteTestCase>,
) -> crate::AppResult<Json<TestRun>> {
    let run = state
        .workspace
        .runs()
        .execute(&id, &case_id, &request)
        .await?;
    Ok(Json(run))
}

pub async fn remove_case(
    State(state): State<crate::SharedAppState>,
    Path((id, case_id)): Path<(String, String)>,
) -> crate::AppResult<Json<TestRun>> {
    let run = state.workspace.runs().remove_case(&id, &case_id).await?;
    Ok(Json(run))
}

pub async fn case_history(
    State(state): State<crate::SharedAppState>,
    Path((id, case_id)): Path<(String, String)>,
) -> crate::AppResult<Json<Vec<ExecutionRecord>>> {
    let history = state.workspace.runs().history(&id, &case_id).await?;
    Ok(Json(history))
}
