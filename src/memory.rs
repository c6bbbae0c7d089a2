//! In-memory [`TestApi`] with the remote server's semantics. Backs the
//! `--sample-data` mode and the test suites.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::api::{
    AddTestCases, ApiError, CreateModule, CreateTestCase, CreateTestRun, CreateTestSuite,
    ExecuteTestCase, MoveTestCase, MoveTestSuite, Result, TestApi, UpdateTestCase,
};
use crate::model::{
    CaseType, ExecutionRecord, ExecutionStatus, Module, Named, Owner, Priority, Project,
    ProjectStatus, Reference, RunMetrics, RunStatus, TestCase, TestRun, TestRunTestCase,
    TestSuite,
};

#[derive(Default)]
struct Store {
    projects: Vec<Project>,
    modules: Vec<Module>,
    suites: Vec<TestSuite>,
    cases: Vec<TestCase>,
    runs: Vec<TestRun>,
    case_counter: usize,
}

impl Store {
    fn project(&self, id: &str) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Project {}", id)))
    }

    fn module(&self, id: &str) -> Result<&Module> {
        self.modules
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Module {}", id)))
    }

    fn suite(&self, id: &str) -> Result<&TestSuite> {
        self.suites
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Test suite {}", id)))
    }

    fn case_index(&self, id: &str) -> Result<usize> {
        self.cases
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Test case {}", id)))
    }

    fn run(&self, id: &str) -> Result<&TestRun> {
        self.runs
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Test run {}", id)))
    }

    fn run_mut(&mut self, id: &str) -> Result<&mut TestRun> {
        self.runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Test run {}", id)))
    }

    fn next_code(&mut self) -> String {
        self.case_counter += 1;
        format!("TC-{:04}", self.case_counter)
    }

    fn insert_module(&mut self, id: String, project_id: &str, name: &str, description: Option<String>) -> Module {
        let now = Utc::now();
        let module = Module {
            id,
            project_id: project_id.to_string(),
            name: name.to_string(),
            description,
            created_at: now,
            updated_at: now,
        };
        self.modules.push(module.clone());
        module
    }

    fn insert_suite(&mut self, id: String, module: &Module, name: &str, description: Option<String>) -> TestSuite {
        let now = Utc::now();
        let suite = TestSuite {
            id,
            module: Named::new(&module.id, &module.name),
            name: name.to_string(),
            description,
            created_at: now,
            updated_at: now,
        };
        self.suites.push(suite.clone());
        suite
    }

    fn insert_case(&mut self, id: String, suite_id: &str, request: &CreateTestCase) -> Result<TestCase> {
        let suite = self.suite(suite_id)?.clone();
        let project_id = self.module(suite.module_id())?.project_id.clone();
        let now = Utc::now();
        let case = TestCase {
            id,
            code: Some(self.next_code()),
            project_id,
            module_id: suite.module_id().to_string(),
            test_suite: Named::new(&suite.id, &suite.name),
            title: request.title.clone(),
            description: request.description.clone(),
            priority: request.priority,
            case_type: request.case_type,
            preconditions: request.preconditions.clone(),
            steps: request.steps.clone(),
            expected_results: request.expected_results.clone(),
            status: None,
            executed_at: None,
            executed_by: None,
            actual_results: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.cases.push(case.clone());
        Ok(case)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::Status {
        status: 400,
        message: message.into(),
    }
}

/// Thread-safe in-memory test-management backend.
///
/// Every trait call counts as one request. Ids registered with
/// [`MemoryApi::fail_on`] make any request naming them fail with a 500.
pub struct MemoryApi {
    store: RwLock<Store>,
    failing: RwLock<HashSet<String>>,
    requests: AtomicUsize,
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryApi {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            failing: RwLock::new(HashSet::new()),
            requests: AtomicUsize::new(0),
        }
    }

    /// Two projects with modules, suites, cases and runs, one of them with
    /// a recorded history.
    pub fn with_sample_data() -> Self {
        let api = Self::new();
        api.load_sample_data();
        api
    }

    pub fn fail_on(&self, id: &str) {
        self.failing.write().insert(id.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn begin(&self, ids: &[&str]) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing.read();
        if let Some(id) = ids.iter().find(|id| failing.contains(**id)) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("Simulated failure for {}", id),
            });
        }
        Ok(())
    }

    // Seeding helpers. These bypass request counting and failure injection.

    pub fn seed_project(&self, name: &str) -> String {
        let id = new_id();
        self.insert_project(&id, name, "", None);
        id
    }

    pub fn seed_module(&self, project_id: &str, name: &str) -> String {
        let id = new_id();
        self.store
            .write()
            .insert_module(id.clone(), project_id, name, None);
        id
    }

    pub fn seed_suite(&self, module_id: &str, name: &str) -> Result<String> {
        let id = new_id();
        let mut store = self.store.write();
        let module = store.module(module_id)?.clone();
        store.insert_suite(id.clone(), &module, name, None);
        Ok(id)
    }

    pub fn seed_case(&self, suite_id: &str, title: &str) -> Result<String> {
        let id = new_id();
        let request = CreateTestCase {
            project: String::new(),
            test_suite: suite_id.to_string(),
            title: title.to_string(),
            description: format!("{} behaves as documented", title),
            priority: Priority::Medium,
            case_type: CaseType::Functional,
            preconditions: None,
            steps: "1. Prepare\n2. Perform\n3. Observe".to_string(),
            expected_results: "Outcome matches the description".to_string(),
        };
        self.store.write().insert_case(id.clone(), suite_id, &request)?;
        Ok(id)
    }

    pub fn seed_run(&self, project_id: &str, name: &str, members: &[&str]) -> String {
        let id = new_id();
        let now = Utc::now();
        self.store.write().runs.push(TestRun {
            id: id.clone(),
            project: Reference::Id(project_id.to_string()),
            name: name.to_string(),
            description: None,
            status: RunStatus::InProgress,
            created_by: None,
            created_at: now,
            updated_at: now,
            test_cases: members
                .iter()
                .map(|m| TestRunTestCase::new(Reference::Id(m.to_string())))
                .collect(),
        });
        id
    }

    /// Snapshot lookups that do not count as requests.
    pub fn suite(&self, id: &str) -> Option<TestSuite> {
        self.store.read().suite(id).ok().cloned()
    }

    pub fn run(&self, id: &str) -> Option<TestRun> {
        self.store.read().run(id).ok().cloned()
    }

    fn insert_project(&self, id: &str, name: &str, description: &str, owner: Option<Owner>) {
        let now = Utc::now();
        self.store.write().projects.push(Project {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            status: ProjectStatus::Active,
            owner,
            created_at: now,
            updated_at: now,
        });
    }

    fn load_sample_data(&self) {
        self.insert_project(
            "proj1",
            "E-commerce Platform",
            "Handles online shopping and payment.",
            Some(Owner {
                id: "u1".to_string(),
                name: "John Doe".to_string(),
            }),
        );
        self.insert_project(
            "proj2",
            "CRM System",
            "Manages customer relationships and workflows.",
            Some(Owner {
                id: "u2".to_string(),
                name: "Jane Smith".to_string(),
            }),
        );

        let mut store = self.store.write();
        let auth = store.insert_module("mod-auth".into(), "proj1", "Authentication", None);
        let cart = store.insert_module("mod-cart".into(), "proj1", "Shopping Cart", None);
        let accounts = store.insert_module("mod-accounts".into(), "proj2", "Accounts", None);
        let contacts = store.insert_module("mod-contacts".into(), "proj2", "Contacts", None);

        store.insert_suite("suite-login".into(), &auth, "Login", None);
        store.insert_suite("suite-signup".into(), &auth, "Signup", None);
        store.insert_suite("suite-cart".into(), &cart, "Cart Management", None);
        store.insert_suite("suite-password".into(), &accounts, "Password Recovery", None);
        store.insert_suite("suite-contacts".into(), &contacts, "Contact Management", None);

        let cases = [
            (
                "tc1",
                "suite-login",
                "Verify Login with Valid Credentials",
                "Ensure user can login with valid credentials",
                "1. Navigate to login\n2. Enter credentials\n3. Submit",
                "User dashboard should load",
                Priority::High,
                CaseType::Functional,
            ),
            (
                "tc2",
                "suite-signup",
                "Validate Signup Flow",
                "Test user registration with valid data",
                "1. Go to signup\n2. Fill form\n3. Submit",
                "User account should be created",
                Priority::Medium,
                CaseType::Functional,
            ),
            (
                "tc3",
                "suite-cart",
                "Add Product to Cart",
                "Check cart functionality for adding product",
                "1. Browse product\n2. Click add to cart",
                "Product should be visible in cart",
                Priority::High,
                CaseType::Other,
            ),
            (
                "tc4",
                "suite-password",
                "Verify Password Reset",
                "Ensure password reset via email works",
                "1. Click forgot password\n2. Check email",
                "Password reset link should be sent",
                Priority::Low,
                CaseType::Security,
            ),
            (
                "tc5",
                "suite-contacts",
                "Create New Contact",
                "Validate new contact creation in CRM",
                "1. Click Add Contact\n2. Fill form\n3. Submit",
                "Contact should be saved in list",
                Priority::Medium,
                CaseType::Functional,
            ),
        ];
        for (id, suite, title, description, steps, expected, priority, case_type) in cases {
            let request = CreateTestCase {
                project: String::new(),
                test_suite: suite.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                priority,
                case_type,
                preconditions: None,
                steps: steps.to_string(),
                expected_results: expected.to_string(),
            };
            // Ids above are consistent, so the lookups cannot miss.
            if let Err(err) = store.insert_case(id.to_string(), suite, &request) {
                tracing::error!(error = %err, "failed to seed sample case");
            }
        }

        let mut regression = TestRun {
            id: "tr1".to_string(),
            project: Reference::Populated(Named::new("proj1", "E-commerce Platform")),
            name: "Regression Test - v1.2".to_string(),
            description: Some("Full regression test for version 1.2".to_string()),
            status: RunStatus::InProgress,
            created_by: Some("John Doe".to_string()),
            created_at: sample_date(2023, 11, 15),
            updated_at: sample_date(2023, 11, 16),
            test_cases: vec![
                TestRunTestCase::new(Reference::Id("tc1".to_string())),
                TestRunTestCase::new(Reference::Id("tc2".to_string())),
            ],
        };
        if let Some(member) = regression.member_mut("tc2") {
            member.record_execution(ExecutionRecord {
                status: ExecutionStatus::Passed,
                actual_results: Some("Dashboard loaded successfully".to_string()),
                notes: None,
                executed_by: Some("Alice".to_string()),
                executed_at: Some(sample_date(2023, 11, 16)),
            });
        }

        let mut smoke = TestRun {
            id: "tr2".to_string(),
            project: Reference::Populated(Named::new("proj2", "CRM System")),
            name: "Smoke Test - v1.3".to_string(),
            description: Some("Quick smoke test for version 1.3".to_string()),
            status: RunStatus::Completed,
            created_by: Some("Jane Smith".to_string()),
            created_at: sample_date(2023, 11, 10),
            updated_at: sample_date(2023, 11, 11),
            test_cases: vec![TestRunTestCase::new(Reference::Id("tc4".to_string()))],
        };
        if let Some(member) = smoke.member_mut("tc4") {
            member.record_execution(ExecutionRecord {
                status: ExecutionStatus::Failed,
                actual_results: Some("No reset email received".to_string()),
                notes: Some("Issue with SMTP".to_string()),
                executed_by: Some("Bob".to_string()),
                executed_at: Some(sample_date(2023, 11, 11)),
            });
            member.record_execution(ExecutionRecord {
                status: ExecutionStatus::Failed,
                actual_results: Some("Email not received".to_string()),
                notes: Some("SMTP server was down".to_string()),
                executed_by: Some("Bob".to_string()),
                executed_at: Some(sample_date(2023, 11, 11)),
            });
        }

        store.runs.push(regression);
        store.runs.push(smoke);
    }
}

fn sample_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl TestApi for MemoryApi {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.begin(&[])?;
        Ok(self.store.read().projects.clone())
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.begin(&[project_id])?;
        self.store.read().project(project_id).cloned()
    }

    async fn list_modules(&self, project_id: &str) -> Result<Vec<Module>> {
        self.begin(&[project_id])?;
        let store = self.store.read();
        Ok(store
            .modules
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_module(&self, request: &CreateModule) -> Result<Module> {
        self.begin(&[&request.project])?;
        let mut store = self.store.write();
        store.project(&request.project)?;
        let description = Some(request.description.clone()).filter(|d| !d.is_empty());
        Ok(store.insert_module(new_id(), &request.project, &request.name, description))
    }

    async fn list_test_suites(&self, module_id: Option<&str>) -> Result<Vec<TestSuite>> {
        self.begin(module_id.as_slice())?;
        let store = self.store.read();
        Ok(store
            .suites
            .iter()
            .filter(|s| module_id.is_none_or(|id| s.module_id() == id))
            .cloned()
            .collect())
    }

    async fn create_test_suite(&self, request: &CreateTestSuite) -> Result<TestSuite> {
        self.begin(&[&request.module])?;
        let mut store = self.store.write();
        let module = store.module(&request.module)?.clone();
        Ok(store.insert_suite(new_id(), &module, &request.name, request.description.clone()))
    }

    async fn move_test_suite(&self, suite_id: &str, request: &MoveTestSuite) -> Result<TestSuite> {
        self.begin(&[suite_id, &request.target_module_id])?;
        let mut store = self.store.write();
        let target = store.module(&request.target_module_id)?.clone();
        store.suite(suite_id)?;

        for case in store.cases.iter_mut().filter(|c| c.suite_id() == suite_id) {
            case.module_id = target.id.clone();
        }
        let suite = store
            .suites
            .iter_mut()
            .find(|s| s.id == suite_id)
            .ok_or_else(|| ApiError::NotFound(format!("Test suite {}", suite_id)))?;
        suite.module = Named::new(&target.id, &target.name);
        suite.updated_at = Utc::now();
        Ok(suite.clone())
    }

    async fn copy_test_suite(&self, suite_id: &str, request: &MoveTestSuite) -> Result<TestSuite> {
        self.begin(&[suite_id, &request.target_module_id])?;
        let mut store = self.store.write();
        let target = store.module(&request.target_module_id)?.clone();
        let source = store.suite(suite_id)?.clone();
        Ok(store.insert_suite(new_id(), &target, &source.name, source.description))
    }

    async fn list_test_cases(&self, project_id: &str) -> Result<Vec<TestCase>> {
        self.begin(&[project_id])?;
        let store = self.store.read();
        Ok(store
            .cases
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn get_test_case(&self, case_id: &str) -> Result<TestCase> {
        self.begin(&[case_id])?;
        let store = self.store.read();
        let index = store.case_index(case_id)?;
        Ok(store.cases[index].clone())
    }

    async fn create_test_case(&self, request: &CreateTestCase) -> Result<TestCase> {
        self.begin(&[&request.test_suite])?;
        self.store
            .write()
            .insert_case(new_id(), &request.test_suite, request)
    }

    async fn update_test_case(&self, case_id: &str, request: &UpdateTestCase) -> Result<TestCase> {
        self.begin(&[case_id])?;
        let mut store = self.store.write();
        let index = store.case_index(case_id)?;
        let case = &mut store.cases[index];

        if let Some(title) = &request.title {
            case.title = title.clone();
        }
        if let Some(description) = &request.description {
            case.description = description.clone();
        }
        if let Some(priority) = request.priority {
            case.priority = priority;
        }
        if let Some(case_type) = request.case_type {
            case.case_type = case_type;
        }
        if let Some(preconditions) = &request.preconditions {
            case.preconditions = Some(preconditions.clone());
        }
        if let Some(steps) = &request.steps {
            case.steps = steps.clone();
        }
        if let Some(expected) = &request.expected_results {
            case.expected_results = expected.clone();
        }
        if let Some(status) = request.status {
            case.status = Some(status);
        }
        case.updated_at = Utc::now();
        Ok(case.clone())
    }

    async fn delete_test_case(&self, case_id: &str) -> Result<()> {
        self.begin(&[case_id])?;
        let mut store = self.store.write();
        let index = store.case_index(case_id)?;
        store.cases.remove(index);
        for run in &mut store.runs {
            run.test_cases.retain(|tc| tc.test_case_id() != case_id);
        }
        Ok(())
    }

    async fn move_test_case(&self, case_id: &str, request: &MoveTestCase) -> Result<TestCase> {
        self.begin(&[case_id, &request.target_test_suite_id])?;
        let mut store = self.store.write();
        let target = store.suite(&request.target_test_suite_id)?.clone();
        let index = store.case_index(case_id)?;

        let case = &mut store.cases[index];
        case.test_suite = Named::new(&target.id, &target.name);
        case.module_id = target.module_id().to_string();
        case.updated_at = Utc::now();
        Ok(case.clone())
    }

    async fn copy_test_case(&self, case_id: &str, request: &MoveTestCase) -> Result<TestCase> {
        self.begin(&[case_id, &request.target_test_suite_id])?;
        let mut store = self.store.write();
        let index = store.case_index(case_id)?;
        let source = store.cases[index].clone();

        let copy = CreateTestCase {
            project: source.project_id.clone(),
            test_suite: request.target_test_suite_id.clone(),
            title: source.title,
            description: source.description,
            priority: source.priority,
            case_type: source.case_type,
            preconditions: source.preconditions,
            steps: source.steps,
            expected_results: source.expected_results,
        };
        store.insert_case(new_id(), &request.target_test_suite_id, &copy)
    }

    async fn list_test_runs(&self, project_id: &str) -> Result<Vec<TestRun>> {
        self.begin(&[project_id])?;
        let store = self.store.read();
        Ok(store
            .runs
            .iter()
            .filter(|r| r.project_id() == project_id)
            .cloned()
            .collect())
    }

    async fn create_test_run(&self, request: &CreateTestRun) -> Result<TestRun> {
        self.begin(&[&request.project_id])?;
        if request.name.trim().is_empty() {
            return Err(bad_request("Name is required"));
        }
        let mut store = self.store.write();
        let project = store.project(&request.project_id)?;
        let now = Utc::now();
        let run = TestRun {
            id: new_id(),
            project: Reference::Populated(Named::new(&project.id, &project.name)),
            name: request.name.clone(),
            description: request.description.clone(),
            status: RunStatus::InProgress,
            created_by: None,
            created_at: now,
            updated_at: now,
            test_cases: Vec::new(),
        };
        store.runs.push(run.clone());
        Ok(run)
    }

    async fn get_test_run(&self, run_id: &str) -> Result<TestRun> {
        self.begin(&[run_id])?;
        self.store.read().run(run_id).cloned()
    }

    async fn set_test_run_status(&self, run_id: &str, status: RunStatus) -> Result<TestRun> {
        self.begin(&[run_id])?;
        let mut store = self.store.write();
        let run = store.run_mut(run_id)?;
        run.status = status;
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn get_run_metrics(&self, run_id: &str) -> Result<RunMetrics> {
        self.begin(&[run_id])?;
        Ok(RunMetrics::from_run(self.store.read().run(run_id)?))
    }

    async fn add_test_cases_to_run(&self, run_id: &str, request: &AddTestCases) -> Result<TestRun> {
        let mut ids: Vec<&str> = vec![run_id];
        ids.extend(request.test_case_ids.iter().map(String::as_str));
        self.begin(&ids)?;

        let mut store = self.store.write();
        for case_id in &request.test_case_ids {
            store.case_index(case_id)?;
        }
        let run = store.run_mut(run_id)?;
        if let Some(existing) = request.test_case_ids.iter().find(|id| run.contains(id)) {
            return Err(bad_request(format!(
                "Test case {} is already part of this run",
                existing
            )));
        }
        for case_id in &request.test_case_ids {
            if !run.contains(case_id) {
                run.test_cases
                    .push(TestRunTestCase::new(Reference::Id(case_id.clone())));
            }
        }
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn execute_test_case(
        &self,
        run_id: &str,
        case_id: &str,
        request: &ExecuteTestCase,
    ) -> Result<TestRun> {
        self.begin(&[run_id, case_id])?;
        if request.status == ExecutionStatus::Pending {
            return Err(bad_request("Invalid status"));
        }

        let mut store = self.store.write();
        let now = Utc::now();
        let run = store.run_mut(run_id)?;
        let member = run
            .member_mut(case_id)
            .ok_or_else(|| ApiError::NotFound(format!("Test case {} in run {}", case_id, run_id)))?;
        member.record_execution(ExecutionRecord {
            status: request.status,
            actual_results: Some(request.actual_results.clone()),
            notes: request.notes.clone(),
            executed_by: request.executed_by.clone(),
            executed_at: Some(now),
        });
        run.updated_at = now;
        let run = run.clone();

        let index = store.case_index(case_id)?;
        let case = &mut store.cases[index];
        case.status = Some(request.status);
        case.executed_at = Some(now);
        case.actual_results = Some(request.actual_results.clone());
        case.notes = request.notes.clone();
        case.executed_by = request.executed_by.clone();

        Ok(run)
    }

    async fn remove_test_case_from_run(&self, run_id: &str, case_id: &str) -> Result<TestRun> {
        self.begin(&[run_id, case_id])?;
        let mut store = self.store.write();
        let run = store.run_mut(run_id)?;
        let before = run.test_cases.len();
        run.test_cases.retain(|tc| tc.test_case_id() != case_id);
        if run.test_cases.len() == before {
            return Err(ApiError::NotFound(format!(
                "Test case {} in run {}",
                case_id, run_id
            )));
        }
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn get_test_case_history(&self, run_id: &str, case_id: &str) -> Result<Vec<ExecutionRecord>> {
        self.begin(&[run_id, case_id])?;
        let store = self.store.read();
        let member = store
            .run(run_id)?
            .member(case_id)
            .ok_or_else(|| ApiError::NotFound(format!("Test case {} in run {}", case_id, run_id)))?;
        Ok(member.history().to_vec())
    }
}
