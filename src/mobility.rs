use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;

use crate::api::{MoveTestCase, MoveTestSuite, TestApi};
use crate::cache::{QueryCache, QueryKind};
use crate::error::{AppError, AppResult, Notice};
use crate::model::{TestCase, TestSuite};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub id: String,
    pub message: String,
}

/// Per-item result of a fan-out batch. Nothing is rolled back: succeeded
/// items stay applied even when others failed.
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<(String, T)>,
    pub failed: Vec<BatchFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }

    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.succeeded.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    pub fn into_values(self) -> Vec<T> {
        self.succeeded.into_iter().map(|(_, value)| value).collect()
    }

    /// `verb` is the past participle, e.g. "moved".
    pub fn notice(&self, verb: &str) -> Notice {
        let done = self.succeeded.len();
        let total = self.total();
        if self.is_complete() {
            Notice::success(
                format!("Test cases {}", verb),
                format!("{} test case(s) {} successfully.", done, verb),
            )
        } else if self.all_failed() {
            Notice::error(
                "Request Failed",
                format!("No test case could be {}: {}", verb, self.failed[0].message),
            )
        } else {
            Notice::warning(
                "Partially completed",
                format!(
                    "{} of {} test case(s) {}; failed: {}",
                    done,
                    total,
                    verb,
                    self.failed_ids().join(", ")
                ),
            )
        }
    }
}

/// Order-preserving de-duplication; blank ids are dropped.
pub(crate) fn distinct_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| !id.trim().is_empty())
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Runs one request per id concurrently and settles each independently.
async fn settle<T, F, Fut>(ids: Vec<String>, request: F) -> BatchOutcome<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let results = join_all(ids.iter().cloned().map(&request)).await;

    let mut outcome = BatchOutcome::default();
    for (id, result) in ids.into_iter().zip(results) {
        match result {
            Ok(value) => outcome.succeeded.push((id, value)),
            Err(err) => {
                tracing::warn!(%id, error = %err, "batch item failed");
                outcome.failed.push(BatchFailure {
                    id,
                    message: err.to_string(),
                });
            }
        }
    }
    outcome
}

/// Moves and copies test suites between modules and test cases between
/// suites, invalidating the affected cached reads on success.
pub struct MobilityEngine<'a> {
    api: &'a dyn TestApi,
    cache: &'a QueryCache,
}

impl<'a> MobilityEngine<'a> {
    pub fn new(api: &'a dyn TestApi, cache: &'a QueryCache) -> Self {
        Self { api, cache }
    }

    fn invalidate_structure(&self) {
        self.cache.invalidate_kind(QueryKind::TestCases);
        self.cache.invalidate_kind(QueryKind::TestSuites);
        self.cache.invalidate_kind(QueryKind::Modules);
    }

    /// Runs embed case records, so they go stale with the cases.
    fn invalidate_runs(&self) {
        self.cache.invalidate_kind(QueryKind::TestRun);
        self.cache.invalidate_kind(QueryKind::TestRuns);
    }

    fn suite_target(target_module_id: &str) -> AppResult<MoveTestSuite> {
        if target_module_id.trim().is_empty() {
            return Err(AppError::Validation("Please select a target module".to_string()));
        }
        Ok(MoveTestSuite {
            target_module_id: target_module_id.to_string(),
        })
    }

    fn case_batch(ids: &[String], target_suite_id: &str) -> AppResult<(Vec<String>, MoveTestCase)> {
        let ids = distinct_ids(ids);
        if ids.is_empty() {
            return Err(AppError::Validation("No test cases selected".to_string()));
        }
        if target_suite_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Please select a target test suite".to_string(),
            ));
        }
        Ok((
            ids,
            MoveTestCase {
                target_test_suite_id: target_suite_id.to_string(),
            },
        ))
    }

    /// Re-parents a suite. Its cases keep pointing at the suite and follow
    /// it to the new module.
    pub async fn move_suite(&self, suite: &TestSuite, target_module_id: &str) -> AppResult<TestSuite> {
        let request = Self::suite_target(target_module_id)?;
        if suite.module_id() == target_module_id {
            return Err(AppError::InvalidTarget(format!(
                "Test suite {} already belongs to module {}",
                suite.id, target_module_id
            )));
        }

        tracing::info!(suite = %suite.id, from = %suite.module_id(), to = %target_module_id, "moving test suite");
        let moved = self.api.move_test_suite(&suite.id, &request).await?;
        self.invalidate_structure();
        Ok(moved)
    }

    /// Creates a new suite with the same name and description under the
    /// target module. Child cases are not duplicated.
    pub async fn copy_suite(&self, suite: &TestSuite, target_module_id: &str) -> AppResult<TestSuite> {
        let request = Self::suite_target(target_module_id)?;

        tracing::info!(suite = %suite.id, to = %target_module_id, "copying test suite");
        let copy = self.api.copy_test_suite(&suite.id, &request).await?;
        self.invalidate_structure();
        Ok(copy)
    }

    pub async fn move_cases(&self, ids: &[String], target_suite_id: &str) -> AppResult<BatchOutcome<TestCase>> {
        let (ids, request) = Self::case_batch(ids, target_suite_id)?;
        tracing::info!(count = ids.len(), to = %target_suite_id, "moving test cases");

        let request = &request;
        let outcome = settle(ids, |id| async move {
            Ok(self.api.move_test_case(&id, request).await?)
        })
        .await;

        if !outcome.succeeded.is_empty() {
            self.invalidate_structure();
            self.invalidate_runs();
        }
        Ok(outcome)
    }

    /// Duplicates each case under the target suite. Copies get fresh ids
    /// and no execution history.
    pub async fn copy_cases(&self, ids: &[String], target_suite_id: &str) -> AppResult<BatchOutcome<TestCase>> {
        let (ids, request) = Self::case_batch(ids, target_suite_id)?;
        tracing::info!(count = ids.len(), to = %target_suite_id, "copying test cases");

        let request = &request;
        let outcome = settle(ids, |id| async move {
            Ok(self.api.copy_test_case(&id, request).await?)
        })
        .await;

        if !outcome.succeeded.is_empty() {
            self.invalidate_structure();
            self.invalidate_runs();
        }
        Ok(outcome)
    }

    pub async fn delete_cases(&self, ids: &[String]) -> AppResult<BatchOutcome<()>> {
        let ids = distinct_ids(ids);
        if ids.is_empty() {
            return Err(AppError::Validation("No test cases selected".to_string()));
        }
        tracing::info!(count = ids.len(), "deleting test cases");

        let outcome = settle(ids, |id| async move {
            Ok(self.api.delete_test_case(&id).await?)
        })
        .await;

        if !outcome.succeeded.is_empty() {
            self.cache.invalidate_kind(QueryKind::TestCases);
            self.cache.invalidate_kind(QueryKind::TestSuites);
            self.invalidate_runs();
            self.cache.invalidate_kind(QueryKind::RunMetrics);
            self.cache.invalidate_kind(QueryKind::CaseHistory);
        }
        Ok(outcome)
    }
}
