//! Remote test-management API: the [`TestApi`] contract, typed request
//! bodies and the reqwest-backed [`HttpClient`].

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::error::AppError;
use crate::model::{
    CaseType, ExecutionRecord, ExecutionStatus, Module, Priority, Project, RunMetrics,
    RunStatus, TestCase, TestRun, TestSuite,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::NotFound(_) => true,
            ApiError::Status { status, .. } => *status == StatusCode::NOT_FOUND.as_u16(),
            _ => false,
        }
    }
}

#[async_trait]
pub trait TestApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn get_project(&self, project_id: &str) -> Result<Project>;

    async fn list_modules(&self, project_id: &str) -> Result<Vec<Module>>;
    async fn create_module(&self, request: &CreateModule) -> Result<Module>;

    /// All suites, or only those under `module_id`.
    async fn list_test_suites(&self, module_id: Option<&str>) -> Result<Vec<TestSuite>>;
    async fn create_test_suite(&self, request: &CreateTestSuite) -> Result<TestSuite>;
    async fn move_test_suite(&self, suite_id: &str, request: &MoveTestSuite) -> Result<TestSuite>;
    async fn copy_test_suite(&self, suite_id: &str, request: &MoveTestSuite) -> Result<TestSuite>;

    async fn list_test_cases(&self, project_id: &str) -> Result<Vec<TestCase>>;
    async fn get_test_case(&self, case_id: &str) -> Result<TestCase>;
    async fn create_test_case(&self, request: &CreateTestCase) -> Result<TestCase>;
    async fn update_test_case(&self, case_id: &str, request: &UpdateTestCase) -> Result<TestCase>;
    async fn delete_test_case(&self, case_id: &str) -> Result<()>;
    async fn move_test_case(&self, case_id: &str, request: &MoveTestCase) -> Result<TestCase>;
    async fn copy_test_case(&self, case_id: &str, request: &MoveTestCase) -> Result<TestCase>;

    async fn list_test_runs(&self, project_id: &str) -> Result<Vec<TestRun>>;
    async fn create_test_run(&self, request: &CreateTestRun) -> Result<TestRun>;
    async fn get_test_run(&self, run_id: &str) -> Result<TestRun>;
    async fn set_test_run_status(&self, run_id: &str, status: RunStatus) -> Result<TestRun>;
    async fn get_run_metrics(&self, run_id: &str) -> Result<RunMetrics>;
    async fn add_test_cases_to_run(&self, run_id: &str, request: &AddTestCases) -> Result<TestRun>;
    async fn execute_test_case(
        &self,
        run_id: &str,
        case_id: &str,
        request: &ExecuteTestCase,
    ) -> Result<TestRun>;
    async fn remove_test_case_from_run(&self, run_id: &str, case_id: &str) -> Result<TestRun>;
    /// Earlier outcomes of a run member, oldest first.
    async fn get_test_case_history(&self, run_id: &str, case_id: &str) -> Result<Vec<ExecutionRecord>>;
}

// Request bodies

fn require_len(value: &str, min: usize, message: &str) -> std::result::Result<(), AppError> {
    if value.trim().chars().count() < min {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}

fn require_id(value: &str, message: &str) -> std::result::Result<(), AppError> {
    require_len(value, 1, message)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModule {
    pub name: String,
    pub project: String,
    #[serde(default)]
    pub description: String,
}

impl CreateModule {
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        require_id(&self.project, "A project is required")?;
        require_len(&self.name, 3, "Module name must be at least 3 characters.")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTestSuite {
    pub module: String,
    pub project: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateTestSuite {
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        require_id(&self.module, "Please select a module")?;
        require_len(&self.name, 3, "Test suite name must be at least 3 characters.")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestCase {
    pub project: String,
    pub test_suite: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub case_type: CaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    pub steps: String,
    pub expected_results: String,
}

impl CreateTestCase {
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        require_id(&self.test_suite, "Please select a test suite")?;
        require_len(&self.title, 5, "Title must be at least 5 characters.")?;
        require_len(&self.description, 10, "Description must be at least 10 characters.")?;
        require_len(&self.steps, 10, "Test steps are required.")?;
        require_len(&self.expected_results, 5, "Expected results are required.")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub case_type: Option<CaseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
}

impl UpdateTestCase {
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        if let Some(title) = &self.title {
            require_len(title, 5, "Title must be at least 5 characters.")?;
        }
        if let Some(description) = &self.description {
            require_len(description, 10, "Description must be at least 10 characters.")?;
        }
        if let Some(steps) = &self.steps {
            require_len(steps, 10, "Test steps are required.")?;
        }
        if let Some(expected) = &self.expected_results {
            require_len(expected, 5, "Expected results are required.")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestRun {
    pub project_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateTestRun {
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        require_id(&self.project_id, "A project is required")?;
        require_id(&self.name, "Please provide a name for the test run")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTestSuite {
    pub target_module_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTestCase {
    pub target_test_suite_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTestCases {
    pub test_case_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteTestCase {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub actual_results: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
}

impl ExecuteTestCase {
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        match self.status {
            ExecutionStatus::Pending => Err(AppError::Validation(
                "Pending is not a valid execution outcome".to_string(),
            )),
            ExecutionStatus::NotExecuted => Ok(()),
            _ => require_len(&self.actual_results, 5, "Please describe the actual results."),
        }
    }
}

#[derive(Debug, Serialize)]
struct SetRunStatus {
    status: RunStatus,
}

#[derive(Deserialize)]
struct ModulesEnvelope {
    modules: Vec<Module>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: Option<String>,
}

/// Pulls `message` out of an error body, or falls back to a generic one.
pub fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

/// [`TestApi`] over HTTP+JSON.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate().map_err(ApiError::InvalidConfig)?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Body of a successful response; the error payload's message otherwise.
    async fn body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::warn!(status = status.as_u16(), %message, "API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = Self::body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        Self::read(self.http.get(&url).send().await?).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        Self::read(self.http.post(&url).json(body).send().await?).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("PUT {}", url);
        Self::read(self.http.put(&url).json(body).send().await?).await
    }

    async fn delete(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);
        Self::body(self.http.delete(&url).send().await?).await
    }
}

#[async_trait]
impl TestApi for HttpClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get("projects").await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.get(&format!("projects/project/{}", project_id)).await
    }

    async fn list_modules(&self, project_id: &str) -> Result<Vec<Module>> {
        let url = self.url("modules/getModules");
        tracing::debug!("GET {} project={}", url, project_id);
        let response = self
            .http
            .get(&url)
            .query(&[("project", project_id)])
            .send()
            .await?;
        let envelope: ModulesEnvelope = Self::read(response).await?;
        Ok(envelope.modules)
    }

    async fn create_module(&self, request: &CreateModule) -> Result<Module> {
        self.post("modules/createModule", request).await
    }

    async fn list_test_suites(&self, module_id: Option<&str>) -> Result<Vec<TestSuite>> {
        match module_id {
            Some(id) => self.get(&format!("testsuites/getTestSuites/{}", id)).await,
            None => self.get("testsuites/getTestSuites").await,
        }
    }

    async fn create_test_suite(&self, request: &CreateTestSuite) -> Result<TestSuite> {
        self.post("testsuites/createTestSuite", request).await
    }

    async fn move_test_suite(&self, suite_id: &str, request: &MoveTestSuite) -> Result<TestSuite> {
        self.post(&format!("testsuites/{}/move", suite_id), request)
            .await
    }

    async fn copy_test_suite(&self, suite_id: &str, request: &MoveTestSuite) -> Result<TestSuite> {
        self.post(&format!("testsuites/{}/copy", suite_id), request)
            .await
    }

    async fn list_test_cases(&self, project_id: &str) -> Result<Vec<TestCase>> {
        self.get(&format!("projects/{}/testcases", project_id)).await
    }

    async fn get_test_case(&self, case_id: &str) -> Result<TestCase> {
        self.get(&format!("testcases/{}", case_id)).await
    }

    async fn create_test_case(&self, request: &CreateTestCase) -> Result<TestCase> {
        self.post("testcases/createTestCase", request).await
    }

    async fn update_test_case(&self, case_id: &str, request: &UpdateTestCase) -> Result<TestCase> {
        self.put(&format!("testcases/updateTestCase/{}", case_id), request)
            .await
    }

    async fn delete_test_case(&self, case_id: &str) -> Result<()> {
        self.delete(&format!("testcases/{}", case_id)).await?;
        Ok(())
    }

    async fn move_test_case(&self, case_id: &str, request: &MoveTestCase) -> Result<TestCase> {
        self.post(&format!("testcases/{}/move", case_id), request)
            .await
    }

    async fn copy_test_case(&self, case_id: &str, request: &MoveTestCase) -> Result<TestCase> {
        self.post(&format!("testcases/{}/copy", case_id), request)
            .await
    }

    async fn list_test_runs(&self, project_id: &str) -> Result<Vec<TestRun>> {
        self.get(&format!("testruns/project/{}", project_id)).await
    }

    async fn create_test_run(&self, request: &CreateTestRun) -> Result<TestRun> {
        self.post("testruns/create", request).await
    }

    async fn get_test_run(&self, run_id: &str) -> Result<TestRun> {
        self.get(&format!("testruns/{}", run_id)).await
    }

    async fn set_test_run_status(&self, run_id: &str, status: RunStatus) -> Result<TestRun> {
        self.put(&format!("testruns/{}", run_id), &SetRunStatus { status })
            .await
    }

    async fn get_run_metrics(&self, run_id: &str) -> Result<RunMetrics> {
        self.get(&format!("testruns/{}/metrics", run_id)).await
    }

    async fn add_test_cases_to_run(&self, run_id: &str, request: &AddTestCases) -> Result<TestRun> {
        self.post(&format!("testruns/{}/test-cases", run_id), request)
            .await
    }

    async fn execute_test_case(
        &self,
        run_id: &str,
        case_id: &str,
        request: &ExecuteTestCase,
    ) -> Result<TestRun> {
        self.post(
            &format!("testruns/{}/test-cases/{}/execute", run_id, case_id),
            request,
        )
        .await
    }

    async fn remove_test_case_from_run(&self, run_id: &str, case_id: &str) -> Result<TestRun> {
        let body = self
            .delete(&format!("testruns/{}/test-cases/{}", run_id, case_id))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_test_case_history(&self, run_id: &str, case_id: &str) -> Result<Vec<ExecutionRecord>> {
        self.get(&format!("test-runs/{}/test-cases/{}/history", run_id, case_id))
            .await
    }
}
