use serde::Serialize;

use crate::tree::ProjectTree;

/// Which module and test suite are currently active in a project view.
///
/// Only one module and one suite can be active at a time. Activating a
/// module always drops the active suite, so a suite from another module
/// never stays active. Activating a suite is not checked against the active
/// module; callers offer only suites under the active module, and
/// [`SelectionStore::suite_matches_module`] reports a mismatched pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStore {
    active_module_id: Option<String>,
    active_test_suite_id: Option<String>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_module_id(&self) -> Option<&str> {
        self.active_module_id.as_deref()
    }

    pub fn active_test_suite_id(&self) -> Option<&str> {
        self.active_test_suite_id.as_deref()
    }

    pub fn set_active_module_id(&mut self, id: Option<String>) {
        tracing::debug!(module = ?id, "active module changed");
        self.active_module_id = id;
        self.active_test_suite_id = None;
    }

    pub fn set_active_test_suite_id(&mut self, id: Option<String>) {
        tracing::debug!(suite = ?id, "active test suite changed");
        self.active_test_suite_id = id;
    }

    /// False only when a suite is active and the tree places it under a
    /// different module than the active one.
    pub fn suite_matches_module(&self, tree: &ProjectTree) -> bool {
        let Some(suite_id) = self.active_test_suite_id() else {
            return true;
        };
        match (self.active_module_id(), tree.module_of_suite(suite_id)) {
            (Some(module_id), Some(owner)) => module_id == owner,
            (None, _) => false,
            (Some(_), None) => true,
        }
    }

    pub fn reset(&mut self) {
        self.active_module_id = None;
        self.active_test_suite_id = None;
    }
}
