use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything the remote API hands out with an `_id`.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A wire reference that is either a bare id or the populated record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Reference<T> {
    Id(String),
    Populated(T),
}

impl<T: Identified> Reference<T> {
    pub fn id(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Populated(record) => record.id(),
        }
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Reference::Id(_) => None,
            Reference::Populated(record) => Some(record),
        }
    }
}

/// Populated parent reference: `{ "_id": ..., "name": ... }`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Named {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Named {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Identified for Named {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Owner {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub owner: Option<Owner>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Planning,
    Active,
    #[serde(rename = "On Hold")]
    OnHold,
    Completed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Planning => write!(f, "Planning"),
            ProjectStatus::Active => write!(f, "Active"),
            ProjectStatus::OnHold => write!(f, "On Hold"),
            ProjectStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    #[serde(rename = "_id")]
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Module {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    #[serde(rename = "_id")]
    pub id: String,
    pub module: Named,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestSuite {
    pub fn module_id(&self) -> &str {
        &self.module.id
    }
}

impl Identified for TestSuite {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(rename = "_id")]
    pub id: String,
    /// Human-readable code such as `TC-0001`.
    #[serde(rename = "testCaseId", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub project_id: String,
    pub module_id: String,
    pub test_suite: Named,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub case_type: CaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    #[serde(default)]
    pub steps: String,
    #[serde(default)]
    pub expected_results: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestCase {
    pub fn suite_id(&self) -> &str {
        &self.test_suite.id
    }
}

impl Identified for TestCase {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
            Priority::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CaseType {
    Functional,
    Performance,
    Security,
    Usability,
    Compatibility,
    Other,
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseType::Functional => write!(f, "Functional"),
            CaseType::Performance => write!(f, "Performance"),
            CaseType::Security => write!(f, "Security"),
            CaseType::Usability => write!(f, "Usability"),
            CaseType::Compatibility => write!(f, "Compatibility"),
            CaseType::Other => write!(f, "Other"),
        }
    }
}

/// Outcome of a test case. `Pending` only appears on test case records,
/// never inside a run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStatus {
    Passed,
    Failed,
    Blocked,
    Rejected,
    Pending,
    #[default]
    #[serde(rename = "Not Executed")]
    NotExecuted,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Passed => "Passed",
            ExecutionStatus::Failed => "Failed",
            ExecutionStatus::Blocked => "Blocked",
            ExecutionStatus::Rejected => "Rejected",
            ExecutionStatus::Pending => "Pending",
            ExecutionStatus::NotExecuted => "Not Executed",
        }
    }

    pub fn is_executed(&self) -> bool {
        !matches!(self, ExecutionStatus::NotExecuted | ExecutionStatus::Pending)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::InProgress => write!(f, "In Progress"),
            RunStatus::Completed => write!(f, "Completed"),
            RunStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "projectId")]
    pub project: Reference<Named>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub test_cases: Vec<TestRunTestCase>,
}

impl TestRun {
    pub fn project_id(&self) -> &str {
        self.project.id()
    }

    pub fn member(&self, test_case_id: &str) -> Option<&TestRunTestCase> {
        self.test_cases
            .iter()
            .find(|tc| tc.test_case_id() == test_case_id)
    }

    pub fn member_mut(&mut self, test_case_id: &str) -> Option<&mut TestRunTestCase> {
        self.test_cases
            .iter_mut()
            .find(|tc| tc.test_case_id() == test_case_id)
    }

    pub fn contains(&self, test_case_id: &str) -> bool {
        self.member(test_case_id).is_some()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.test_cases.iter().map(|tc| tc.test_case_id())
    }
}

impl Identified for TestRun {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Snapshot of an execution outcome, pushed to history before being
/// overwritten.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

/// Membership of a test case in a run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRunTestCase {
    #[serde(rename = "testCaseId")]
    pub test_case: Reference<TestCase>,
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    history: Vec<ExecutionRecord>,
}

impl TestRunTestCase {
    pub fn new(test_case: Reference<TestCase>) -> Self {
        Self {
            test_case,
            status: ExecutionStatus::NotExecuted,
            executed_by: None,
            executed_at: None,
            actual_results: None,
            notes: None,
            history: Vec::new(),
        }
    }

    pub fn test_case_id(&self) -> &str {
        self.test_case.id()
    }

    /// Oldest first.
    pub fn history(&self) -> &[ExecutionRecord] {
        &self.history
    }

    fn current(&self) -> ExecutionRecord {
        ExecutionRecord {
            status: self.status,
            actual_results: self.actual_results.clone(),
            notes: self.notes.clone(),
            executed_by: self.executed_by.clone(),
            executed_at: self.executed_at,
        }
    }

    /// Applies a new outcome. The previous outcome is archived unless the
    /// case was still `Not Executed`. Returns whether history grew.
    pub fn record_execution(&mut self, outcome: ExecutionRecord) -> bool {
        let archived = self.status != ExecutionStatus::NotExecuted;
        if archived {
            let previous = self.current();
            self.history.push(previous);
        }

        self.status = outcome.status;
        self.actual_results = outcome.actual_results;
        self.notes = outcome.notes;
        self.executed_by = outcome.executed_by;
        self.executed_at = outcome.executed_at;

        archived
    }
}

/// Per-run outcome counts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    #[serde(default)]
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub blocked: usize,
    #[serde(default)]
    pub rejected: usize,
    pub executed: usize,
    pub not_executed: usize,
    pub pass_rate: f64,
}

impl RunMetrics {
    pub fn from_run(run: &TestRun) -> Self {
        let mut metrics = RunMetrics {
            total: run.test_cases.len(),
            ..Default::default()
        };

        for tc in &run.test_cases {
            match tc.status {
                ExecutionStatus::Passed => metrics.passed += 1,
                ExecutionStatus::Failed => metrics.failed += 1,
                ExecutionStatus::Blocked => metrics.blocked += 1,
                ExecutionStatus::Rejected => metrics.rejected += 1,
                ExecutionStatus::Pending | ExecutionStatus::NotExecuted => {}
            }
            if tc.status.is_executed() {
                metrics.executed += 1;
            } else {
                metrics.not_executed += 1;
            }
        }

        metrics.pass_rate = if metrics.total > 0 {
            (metrics.passed as f64 * 100.0 / metrics.total as f64).round()
        } else {
            0.0
        };

        metrics
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_first_execution_creates_no_history() {
        let mut run = run("r1", &["a"]);
        let member = run.member_mut("a").unwrap();

        let archived = member.record_execution(outcome(ExecutionStatus::Failed, "X"));

        assert!(!archived);
        assert_eq!(member.status, ExecutionStatus::Failed);
        assert!(member.history().is_empty());
    }

    #[test]
    fn test_re_execution_archives_previous_outcome() {
        let mut member = TestRunTestCase::new(Reference::Id("a".to_string()));
        member.record_execution(outcome(ExecutionStatus::Failed, "X"));
        let archived = member.record_execution(outcome(ExecutionStatus::Passed, "Y"));

        assert!(archived);
        assert_eq!(member.status, ExecutionStatus::Passed);
        assert_eq!(member.actual_results.as_deref(), Some("Y"));
        assert_eq!(member.history().len(), 1);
        assert_eq!(member.history()[0].status, ExecutionStatus::Failed);
        assert_eq!(member.history()[0].actual_results.as_deref(), Some("X"));
    }

    #[test]
    fn test_same_status_can_be_recorded_again() {
        let mut member = TestRunTestCase::new(Reference::Id("a".to_string()));
        member.record_execution(outcome(ExecutionStatus::Blocked, "env down"));
        member.record_execution(outcome(ExecutionStatus::Blocked, "still down"));

        assert_eq!(member.status, ExecutionStatus::Blocked);
        assert_eq!(member.history().len(), 1);
    }

    #[test]
    fn test_reference_resolves_id_either_way() {
        let bare: Reference<TestCase> = serde_json::from_str("\"tc-1\"").unwrap();
        assert_eq!(bare.id(), "tc-1");

        let populated = Reference::Populated(case("tc-2", "s1", "m1"));
        let json = serde_json::to_string(&populated).unwrap();
        let parsed: Reference<TestCase> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), "tc-2");
        assert!(parsed.populated().is_some());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::NotExecuted).unwrap(),
            "\"Not Executed\""
        );
        assert_eq!(
            serde_json::to_string(&RunStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        let status: ProjectStatus = serde_json::from_str("\"On Hold\"").unwrap();
        assert_eq!(status, ProjectStatus::OnHold);
    }

    #[test]
    fn test_run_deserializes_from_api_payload() {
        let payload = serde_json::json!({
            "_id": "r1",
            "projectId": { "_id": "p1", "name": "Shop" },
            "name": "Regression",
            "status": "In Progress",
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z",
            "testCases": [
                {
                    "testCaseId": "a",
                    "status": "Failed",
                    "actualResults": "boom",
                    "history": [{ "status": "Blocked", "executedBy": "bob" }]
                },
                { "testCaseId": "b", "status": "Not Executed" }
            ]
        });

        let run: TestRun = serde_json::from_value(payload).unwrap();
        assert_eq!(run.project_id(), "p1");
        assert_eq!(run.member_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(run.member("a").unwrap().history().len(), 1);
        assert!(run.member("b").unwrap().history().is_empty());
    }

    #[test]
    fn test_metrics_from_run() {
        let mut run = run("r1", &["a", "b", "c", "d"]);
        run.member_mut("a")
            .unwrap()
            .record_execution(outcome(ExecutionStatus::Passed, "fine"));
        run.member_mut("b")
            .unwrap()
            .record_execution(outcome(ExecutionStatus::Failed, "broken"));
        run.member_mut("c")
            .unwrap()
            .record_execution(outcome(ExecutionStatus::Passed, "fine"));

        let metrics = RunMetrics::from_run(&run);
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.passed, 2);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.executed, 3);
        assert_eq!(metrics.not_executed, 1);
        assert_eq!(metrics.pass_rate, 50.0);
    }

    #[test]
    fn test_metrics_for_empty_run() {
        let metrics = RunMetrics::from_run(&run("r1", &[]));
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.pass_rate, 0.0);
    }
}
