use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::api::{CreateModule, CreateTestCase, CreateTestSuite, UpdateTestCase};
use crate::model::{Module, TestCase, TestSuite};

#[derive(Deserialize)]
pub struct NewModule {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn create_module(
    State(state): State<crate::SharedAppState>,
    Path(project_id): Path<String>,
    Json(body): Json<NewModule>,
) -> crate::AppResult<(StatusCode, Json<Module>)> {
    let request = CreateModule {
        name: body.name,
        project: project_id,
        description: body.description,
    };
    let module = state.workspace.create_module(&request).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

#[derive(Deserialize)]
pub struct NewTestSuite {
    pub module: String,
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_test_suite(
    State(state): State<crate::SharedAppState>,
    Path(project_id): Path<String>,
    Json(body): Json<NewTestSuite>,
) -> crate::AppResult<(StatusCode, Json<TestSuite>)> {
    let request = CreateTestSuite {
        module: body.module,
        project: project_id,
        name: body.name,
        description: body.description.filter(|d| !d.trim().is_empty()),
    };
    let suite = state.workspace.create_test_suite(&request).await?;
    Ok((StatusCode::CREATED, Json(suite)))
}

pub async fn create_test_case(
    State(state): State<crate::SharedAppState>,
    Json(request): Json<CreateTestCase>,
) -> crate::AppResult<(StatusCode, Json<TestCase>)> {
    let case = state.workspace.create_test_case(&request).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn update_test_case(
    State(state): State<crate::SharedAppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTestCase>,
) -> crate::AppResult<Json<TestCase>> {
    Ok(Json(state.workspace.update_test_case(&id, &request).await?))
}
