use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{Module, Project, TestSuite};
use crate::tree::TreeNode;

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_projects(
    State(state): State<crate::SharedAppState>,
) -> crate::AppResult<Json<Vec<Project>>> {
    Ok(Json(state.workspace.projects().await?))
}

pub async fn open_project(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
) -> crate::AppResult<Json<Project>> {
    Ok(Json(state.workspace.open_project(&id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    /// Hide cases that are already members of this run.
    pub run_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    pub project_id: String,
    pub selected_count: usize,
    pub nodes: Vec<TreeNode>,
}

pub async fn project_tree(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
    Query(query): Query<TreeQuery>,
) -> crate::AppResult<Json<TreeView>> {
    let workspace = &state.workspace;
    let tree = workspace.tree(&id).await?;

    let exclude: HashSet<String> = match &query.run_id {
        Some(run_id) => workspace
            .test_run(run_id)
            .await?
            .member_ids()
            .map(str::to_string)
            .collect(),
        None => HashSet::new(),
    };

    let selected = workspace.selected_snapshot();
    Ok(Json(TreeView {
        project_id: id,
        selected_count: selected.len(),
        nodes: tree.flatten(&selected, &exclude),
    }))
}

#[derive(Deserialize)]
pub struct TargetsQuery {
    /// Suite being moved or copied.
    pub suite: Option<String>,
    /// Module chosen as destination for test cases.
    pub module: Option<String>,
}

#[derive(Serialize)]
pub struct MoveTargets {
    pub modules: Vec<Module>,
    pub suites: Vec<TestSuite>,
}

/// Destinations offered by the move/copy dialogs.
pub async fn move_targets(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
    Query(query): Query<TargetsQuery>,
) -> crate::AppResult<Json<MoveTargets>> {
    let tree = state.workspace.tree(&id).await?;

    let modules = match &query.suite {
        Some(suite_id) => {
            if tree.suite(suite_id).is_none() {
                return Err(crate::AppError::NotFound(format!("Test suite {}", suite_id)));
            }
            tree.suite_move_targets(suite_id)
                .into_iter()
                .cloned()
                .collect()
        }
        None => tree.modules().to_vec(),
    };
    let suites = match &query.module {
        Some(module_id) => tree
            .case_move_targets(module_id)
            .into_iter()
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    Ok(Json(MoveTargets { modules, suites }))
}
