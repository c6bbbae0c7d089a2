use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::AppError;
use crate::error::Notice;
use crate::mobility::{BatchFailure, BatchOutcome};
use crate::model::{TestCase, TestSuite};
use crate::workspace::Workspace;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse<T> {
    pub notice: Notice,
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<T>,
}

/// 200 when every item succeeded, 207 when some did, 502 when none did.
fn batch_status<T>(outcome: &BatchOutcome<T>) -> StatusCode {
    if outcome.is_complete() {
        StatusCode::OK
    } else if outcome.all_failed() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::MULTI_STATUS
    }
}

fn batch_response<T: Serialize>(
    outcome: BatchOutcome<T>,
    verb: &str,
) -> (StatusCode, Json<BatchResponse<T>>) {
    let status = batch_status(&outcome);
    let notice = outcome.notice(verb);
    let succeeded = outcome
        .succeeded_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let failed = outcome.failed.clone();

    (
        status,
        Json(BatchResponse {
            notice,
            succeeded,
            failed,
            records: outcome.into_values(),
        }),
    )
}

async fn find_suite(workspace: &Workspace, id: &str) -> crate::AppResult<TestSuite> {
    workspace
        .suites(None)
        .await?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Test suite {}", id)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteTarget {
    pub target_module_id: String,
}

pub async fn move_suite(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
    Json(body): Json<SuiteTarget>,
) -> crate::AppResult<Json<TestSuite>> {
    let suite = find_suite(&state.workspace, &id).await?;
    let moved = state
        .workspace
        .mobility()
        .move_suite(&suite, &body.target_module_id)
        .await?;
    Ok(Json(moved))
}

pub async fn copy_suite(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
    Json(body): Json<SuiteTarget>,
) -> crate::AppResult<(StatusCode, Json<TestSuite>)> {
    let suite = find_suite(&state.workspace, &id).await?;
    let copy = state
        .workspace
        .mobility()
        .copy_suite(&suite, &body.target_module_id)
        .await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// Test case batch. Without `ids` the current multi-select is used.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseBatch {
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub target_test_suite_id: String,
}

pub async fn move_cases(
    State(state): State<crate::SharedAppState>,
    Json(body): Json<CaseBatch>,
) -> crate::AppResult<(StatusCode, Json<BatchResponse<TestCase>>)> {
    let workspace = &state.workspace;
    let ids = body.ids.unwrap_or_else(|| workspace.selected());
    let outcome = workspace.move_cases(&ids, &body.target_test_suite_id).await?;
    Ok(batch_response(outcome, "moved"))
}

pub async fn copy_cases(
    State(state): State<crate::SharedAppState>,
    Json(body): Json<CaseBatch>,
) -> crate::AppResult<(StatusCode, Json<BatchResponse<TestCase>>)> {
    let workspace = &state.workspace;
    let ids = body.ids.unwrap_or_else(|| workspace.selected());
    let outcome = workspace.copy_cases(&ids, &body.target_test_suite_id).await?;
    Ok(batch_response(outcome, "copied"))
}

#[derive(Deserialize)]
pub struct DeleteBatch {
    pub ids: Option<Vec<String>>,
}

pub async fn delete_cases(
    State(state): State<crate::SharedAppState>,
    Json(body): Json<DeleteBatch>,
) -> crate::AppResult<(StatusCode, Json<BatchResponse<()>>)> {
    let workspace = &state.workspace;
    let ids = body.ids.unwrap_or_else(|| workspace.selected());
    let outcome = workspace.delete_cases(&ids).await?;
    let (status, Json(mut response)) = batch_response(outcome, "deleted");
    response.records.clear();
    Ok((status, Json(response)))
}
