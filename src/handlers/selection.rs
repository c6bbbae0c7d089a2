use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::AppError;
use crate::multiselect::ScopeState;
use crate::selection::SelectionStore;
use crate::tree::Scope;

pub async fn get_selection(State(state): State<crate::SharedAppState>) -> Json<SelectionStore> {
    Json(state.workspace.selection())
}

/// `{"target": "module", "id": "..."}` or `{"target": "testSuite", "id": null}`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", tag = "target", content = "id")]
pub enum SelectionChange {
    Module(Option<String>),
    TestSuite(Option<String>),
}

pub async fn update_selection(
    State(state): State<crate::SharedAppState>,
    Json(change): Json<SelectionChange>,
) -> Json<SelectionStore> {
    let selection = match change {
        SelectionChange::Module(id) => state.workspace.set_active_module(id),
        SelectionChange::TestSuite(id) => state.workspace.set_active_test_suite(id),
    };
    Json(selection)
}

#[derive(Serialize)]
pub struct Selected {
    pub ids: Vec<String>,
}

pub async fn get_selected(State(state): State<crate::SharedAppState>) -> Json<Selected> {
    Json(Selected {
        ids: state.workspace.selected(),
    })
}

pub async fn clear_selected(State(state): State<crate::SharedAppState>) -> StatusCode {
    state.workspace.clear_selected();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub id: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub id: String,
    pub selected: bool,
    pub ids: Vec<String>,
}

pub async fn toggle_selected(
    State(state): State<crate::SharedAppState>,
    Json(request): Json<ToggleRequest>,
) -> crate::AppResult<Json<ToggleResponse>> {
    if request.id.trim().is_empty() {
        return Err(AppError::Validation("A test case id is required".to_string()));
    }
    let selected = state.workspace.toggle_selected(&request.id);
    Ok(Json(ToggleResponse {
        id: request.id,
        selected,
        ids: state.workspace.selected(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRequest {
    /// Defaults to the open project.
    pub project_id: Option<String>,
    pub scope: Scope,
    /// Members of this run are left out of the scope.
    pub run_id: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Serialize)]
pub struct ScopeResponse {
    pub state: ScopeState,
    pub ids: Vec<String>,
}

pub async fn toggle_scope(
    State(state): State<crate::SharedAppState>,
    Json(request): Json<ScopeRequest>,
) -> crate::AppResult<Json<ScopeResponse>> {
    let workspace = &state.workspace;
    let project_id = request
        .project_id
        .or_else(|| workspace.active_project())
        .ok_or_else(|| AppError::Validation("No project is open".to_string()))?;

    let mut exclude: HashSet<String> = request.exclude.into_iter().collect();
    if let Some(run_id) = &request.run_id {
        let run = workspace.test_run(run_id).await?;
        exclude.extend(run.member_ids().map(str::to_string));
    }

    let scope_state = workspace
        .toggle_scope(&project_id, &request.scope, &exclude)
        .await?;
    Ok(Json(ScopeResponse {
        state: scope_state,
        ids: workspace.selected(),
    }))
}
