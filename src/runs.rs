use std::collections::HashSet;

use crate::api::{AddTestCases, CreateTestRun, ExecuteTestCase, TestApi};
use crate::cache::{QueryCache, QueryKey, QueryKind};
use crate::error::{AppError, AppResult};
use crate::mobility::distinct_ids;
use crate::model::{ExecutionRecord, RunMetrics, RunStatus, TestCase, TestRun, TestRunTestCase};

/// Project cases that are not yet members of `run`, in their original order.
pub fn available_cases<'c>(run: &TestRun, cases: &'c [TestCase]) -> Vec<&'c TestCase> {
    let members: HashSet<&str> = run.member_ids().collect();
    cases
        .iter()
        .filter(|case| !members.contains(case.id.as_str()))
        .collect()
}

/// Splits members into (not executed, executed).
pub fn partition(run: &TestRun) -> (Vec<&TestRunTestCase>, Vec<&TestRunTestCase>) {
    run.test_cases
        .iter()
        .partition(|member| !member.status.is_executed())
}

/// Builds and executes test runs.
pub struct RunComposer<'a> {
    api: &'a dyn TestApi,
    cache: &'a QueryCache,
    user: Option<&'a str>,
}

impl<'a> RunComposer<'a> {
    pub fn new(api: &'a dyn TestApi, cache: &'a QueryCache, user: Option<&'a str>) -> Self {
        Self { api, cache, user }
    }

    fn invalidate_run(&self, run_id: &str) {
        self.cache.invalidate(&QueryKey::TestRun(run_id.to_string()));
        self.cache
            .invalidate(&QueryKey::RunMetrics(run_id.to_string()));
        self.cache.invalidate_kind(QueryKind::TestRuns);
    }

    pub async fn run(&self, run_id: &str) -> AppResult<TestRun> {
        let key = QueryKey::TestRun(run_id.to_string());
        Ok(self
            .cache
            .get_or_fetch(key, || self.api.get_test_run(run_id))
            .await?)
    }

    pub async fn metrics(&self, run_id: &str) -> AppResult<RunMetrics> {
        let key = QueryKey::RunMetrics(run_id.to_string());
        Ok(self
            .cache
            .get_or_fetch(key, || self.api.get_run_metrics(run_id))
            .await?)
    }

    pub async fn create_run(&self, request: &CreateTestRun) -> AppResult<TestRun> {
        request.validate()?;

        let run = self.api.create_test_run(request).await?;
        tracing::info!(run = %run.id, project = %request.project_id, "created test run");
        self.cache
            .invalidate(&QueryKey::TestRuns(request.project_id.clone()));
        Ok(run)
    }

    /// Run status is set explicitly and never derived from case outcomes.
    pub async fn set_run_status(&self, run_id: &str, status: RunStatus) -> AppResult<TestRun> {
        let run = self.api.set_test_run_status(run_id, status).await?;
        tracing::info!(run = %run_id, %status, "updated run status");
        self.cache
            .invalidate(&QueryKey::TestRun(run_id.to_string()));
        self.cache.invalidate_kind(QueryKind::TestRuns);
        Ok(run)
    }

    /// Adds the given cases, skipping current members and repeats.
    pub async fn add_cases(&self, run: &TestRun, ids: &[String]) -> AppResult<TestRun> {
        let requested = distinct_ids(ids);
        if requested.is_empty() {
            return Err(AppError::Validation(
                "Please select at least one test case".to_string(),
            ));
        }

        let test_case_ids: Vec<String> = requested
            .into_iter()
            .filter(|id| !run.contains(id))
            .collect();
        if test_case_ids.is_empty() {
            return Err(AppError::Validation(
                "All selected test cases are already in this run".to_string(),
            ));
        }

        tracing::info!(run = %run.id, count = test_case_ids.len(), "adding test cases to run");
        let updated = self
            .api
            .add_test_cases_to_run(&run.id, &AddTestCases { test_case_ids })
            .await?;
        self.invalidate_run(&run.id);
        Ok(updated)
    }

    /// Previous outcomes of one member, oldest first.
    pub async fn history(&self, run_id: &str, case_id: &str) -> AppResult<Vec<ExecutionRecord>> {
        let key = QueryKey::CaseHistory(run_id.to_string(), case_id.to_string());
        Ok(self
            .cache
            .get_or_fetch(key, || self.api.get_test_case_history(run_id, case_id))
            .await?)
    }

    /// Records an outcome and caches the run the server returns. The
    /// workspace user is sent as the executor unless the request names one.
    /// A failed request leaves the cache untouched.
    pub async fn execute(
        &self,
        run_id: &str,
        case_id: &str,
        request: &ExecuteTestCase,
    ) -> AppResult<TestRun> {
        request.validate()?;

        let request = ExecuteTestCase {
            executed_by: request
                .executed_by
                .clone()
                .or_else(|| self.user.map(str::to_string)),
            ..request.clone()
        };
        let updated = self.api.execute_test_case(run_id, case_id, &request).await?;
        tracing::info!(run = %run_id, case = %case_id, status = %request.status, "executed test case");

        self.cache
            .put(QueryKey::TestRun(run_id.to_string()), updated.clone());
        self.cache
            .invalidate(&QueryKey::RunMetrics(run_id.to_string()));
        self.cache.invalidate(&QueryKey::CaseHistory(
            run_id.to_string(),
            case_id.to_string(),
        ));
        self.cache.invalidate_kind(QueryKind::TestRuns);

        Ok(updated)
    }

    /// Drops the case from the run together with its execution history.
    pub async fn remove_case(&self, run_id: &str, case_id: &str) -> AppResult<TestRun> {
        let updated = self.api.remove_test_case_from_run(run_id, case_id).await?;
        tracing::info!(run = %run_id, case = %case_id, "removed test case from run");
        self.invalidate_run(run_id);
        self.cache.invalidate(&QueryKey::CaseHistory(
            run_id.to_string(),
            case_id.to_string(),
        ));
        Ok(updated)
    }
}
