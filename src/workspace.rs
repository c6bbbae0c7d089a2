use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{CreateModule, CreateTestCase, CreateTestSuite, TestApi, UpdateTestCase};
use crate::cache::{QueryCache, QueryKey, QueryKind};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::mobility::{BatchOutcome, MobilityEngine};
use crate::model::{Module, Project, RunMetrics, TestCase, TestRun, TestSuite};
use crate::multiselect::{MultiSelect, ScopeState};
use crate::runs::RunComposer;
use crate::selection::SelectionStore;
use crate::tree::{ProjectTree, Scope};

/// Client-side state for one user: the open project, the active
/// module/suite, the test-case multi-select and the read cache.
///
/// Locks are taken briefly and never held across an API call.
pub struct Workspace {
    api: Arc<dyn TestApi>,
    cache: QueryCache,
    user: Option<String>,
    project: RwLock<Option<String>>,
    selection: Mutex<SelectionStore>,
    selected: Mutex<MultiSelect>,
}

impl Workspace {
    pub fn new(api: Arc<dyn TestApi>, config: &Config) -> Self {
        Self {
            api,
            cache: QueryCache::new(config.cache_ttl),
            user: config.user.clone(),
            project: RwLock::new(None),
            selection: Mutex::new(SelectionStore::new()),
            selected: Mutex::new(MultiSelect::new()),
        }
    }

    pub fn api(&self) -> &dyn TestApi {
        self.api.as_ref()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mobility(&self) -> MobilityEngine<'_> {
        MobilityEngine::new(self.api.as_ref(), &self.cache)
    }

    pub fn runs(&self) -> RunComposer<'_> {
        RunComposer::new(self.api.as_ref(), &self.cache, self.user.as_deref())
    }

    // Project

    pub fn active_project(&self) -> Option<String> {
        self.project.read().clone()
    }

    /// Switches to another project, dropping the active module/suite and
    /// every selected test case.
    pub async fn open_project(&self, project_id: &str) -> AppResult<Project> {
        let key = QueryKey::Project(project_id.to_string());
        let project = self
            .cache
            .get_or_fetch(key, || self.api.get_project(project_id))
            .await?;

        *self.project.write() = Some(project.id.clone());
        self.selection.lock().reset();
        self.selected.lock().clear();
        tracing::info!(project = %project.id, name = %project.name, "opened project");
        Ok(project)
    }

    // Cached reads

    pub async fn projects(&self) -> AppResult<Vec<Project>> {
        Ok(self
            .cache
            .get_or_fetch(QueryKey::Projects, || self.api.list_projects())
            .await?)
    }

    pub async fn modules(&self, project_id: &str) -> AppResult<Vec<Module>> {
        let key = QueryKey::Modules(project_id.to_string());
        Ok(self
            .cache
            .get_or_fetch(key, || self.api.list_modules(project_id))
            .await?)
    }

    pub async fn suites(&self, module_id: Option<&str>) -> AppResult<Vec<TestSuite>> {
        let key = QueryKey::TestSuites(module_id.map(str::to_string));
        Ok(self
            .cache
            .get_or_fetch(key, || self.api.list_test_suites(module_id))
            .await?)
    }

    pub async fn cases(&self, project_id: &str) -> AppResult<Vec<TestCase>> {
        let key = QueryKey::TestCases(project_id.to_string());
        Ok(self
            .cache
            .get_or_fetch(key, || self.api.list_test_cases(project_id))
            .await?)
    }

    pub async fn test_runs(&self, project_id: &str) -> AppResult<Vec<TestRun>> {
        let key = QueryKey::TestRuns(project_id.to_string());
        Ok(self
            .cache
            .get_or_fetch(key, || self.api.list_test_runs(project_id))
            .await?)
    }

    pub async fn test_run(&self, run_id: &str) -> AppResult<TestRun> {
        self.runs().run(run_id).await
    }

    pub async fn run_metrics(&self, run_id: &str) -> AppResult<RunMetrics> {
        self.runs().metrics(run_id).await
    }

    /// Modules, suites and cases of a project, indexed. Suites are listed
    /// across all modules and kept only when their module belongs here.
    pub async fn tree(&self, project_id: &str) -> AppResult<ProjectTree> {
        let modules = self.modules(project_id).await?;
        let module_ids: HashSet<&str> = modules.iter().map(|m| m.id.as_str()).collect();
        let suites: Vec<TestSuite> = self
            .suites(None)
            .await?
            .into_iter()
            .filter(|s| module_ids.contains(s.module_id()))
            .collect();
        let cases = self.cases(project_id).await?;

        Ok(ProjectTree::build(modules, suites, cases))
    }

    // Selection

    pub fn selection(&self) -> SelectionStore {
        self.selection.lock().clone()
    }

    pub fn set_active_module(&self, module_id: Option<String>) -> SelectionStore {
        let mut selection = self.selection.lock();
        selection.set_active_module_id(module_id);
        selection.clone()
    }

    pub fn set_active_test_suite(&self, suite_id: Option<String>) -> SelectionStore {
        let mut selection = self.selection.lock();
        selection.set_active_test_suite_id(suite_id);
        selection.clone()
    }

    // Multi-select

    pub fn selected(&self) -> Vec<String> {
        self.selected.lock().selected_ids()
    }

    pub fn toggle_selected(&self, case_id: &str) -> bool {
        self.selected.lock().toggle(case_id)
    }

    pub fn clear_selected(&self) {
        self.selected.lock().clear();
    }

    /// Select-all checkbox for `scope` within the open project. `exclude`
    /// removes ids from the scope first, e.g. the members of a run.
    pub async fn toggle_scope(
        &self,
        project_id: &str,
        scope: &Scope,
        exclude: &HashSet<String>,
    ) -> AppResult<ScopeState> {
        let tree = self.tree(project_id).await?;
        let ids = tree.scope_ids(scope, exclude);
        if ids.is_empty() {
            return Err(AppError::Validation(
                "There are no test cases to select here".to_string(),
            ));
        }
        Ok(self.selected.lock().toggle_scope(&ids))
    }

    pub fn selected_snapshot(&self) -> MultiSelect {
        self.selected.lock().clone()
    }

    // Structure mutations

    pub async fn create_module(&self, request: &CreateModule) -> AppResult<Module> {
        request.validate()?;
        let module = self.api.create_module(request).await?;
        tracing::info!(module = %module.id, project = %request.project, "created module");
        self.cache
            .invalidate(&QueryKey::Modules(request.project.clone()));
        Ok(module)
    }

    pub async fn create_test_suite(&self, request: &CreateTestSuite) -> AppResult<TestSuite> {
        request.validate()?;
        let suite = self.api.create_test_suite(request).await?;
        tracing::info!(suite = %suite.id, module = %request.module, "created test suite");
        self.cache.invalidate_kind(QueryKind::TestSuites);
        Ok(suite)
    }

    pub async fn create_test_case(&self, request: &CreateTestCase) -> AppResult<TestCase> {
        request.validate()?;
        let case = self.api.create_test_case(request).await?;
        tracing::info!(case = %case.id, suite = %request.test_suite, "created test case");
        self.cache.invalidate_kind(QueryKind::TestCases);
        Ok(case)
    }

    pub async fn update_test_case(&self, case_id: &str, request: &UpdateTestCase) -> AppResult<TestCase> {
        request.validate()?;
        let case = self.api.update_test_case(case_id, request).await?;
        tracing::info!(case = %case_id, "updated test case");
        self.cache.invalidate_kind(QueryKind::TestCases);
        Ok(case)
    }

    fn deselect<T>(&self, outcome: &BatchOutcome<T>) {
        let done: HashSet<&str> = outcome.succeeded_ids().into_iter().collect();
        let mut selected = self.selected.lock();
        let remaining: Vec<String> = selected
            .selected_ids()
            .into_iter()
            .filter(|id| !done.contains(id.as_str()))
            .collect();
        selected.retain(remaining.iter().map(String::as_str));
    }

    /// Moved ids leave the multi-select; failed ones stay for a retry.
    pub async fn move_cases(&self, ids: &[String], target_suite_id: &str) -> AppResult<BatchOutcome<TestCase>> {
        let outcome = self.mobility().move_cases(ids, target_suite_id).await?;
        self.deselect(&outcome);
        Ok(outcome)
    }

    /// Copied ids leave the multi-select; failed ones stay for a retry.
    pub async fn copy_cases(&self, ids: &[String], target_suite_id: &str) -> AppResult<BatchOutcome<TestCase>> {
        let outcome = self.mobility().copy_cases(ids, target_suite_id).await?;
        self.deselect(&outcome);
        Ok(outcome)
    }

    /// Bulk delete; successfully deleted ids leave the multi-select.
    pub async fn delete_cases(&self, ids: &[String]) -> AppResult<BatchOutcome<()>> {
        let outcome = self.mobility().delete_cases(ids).await?;
        self.deselect(&outcome);
        Ok(outcome)
    }
}
