use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::model::{Module, TestCase, TestSuite};
use crate::multiselect::{MultiSelect, ScopeState};

/// A selectable group of test cases.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum Scope {
    Project,
    Module(String),
    Suite(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Suite,
    Case,
}

/// Flattened row of the project tree, in display order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub depth: usize,
    pub parent_id: Option<String>,
    pub case_count: usize,
    pub selection: ScopeState,
}

/// Index over one project's modules, suites and test cases.
///
/// Test cases resolve to a module through their suite, so moving a suite
/// carries its cases along without touching them.
#[derive(Debug, Clone, Default)]
pub struct ProjectTree {
    modules: Vec<Module>,
    suites: Vec<TestSuite>,
    cases: Vec<TestCase>,
    suite_module: HashMap<String, String>,
}

impl ProjectTree {
    pub fn build(modules: Vec<Module>, suites: Vec<TestSuite>, cases: Vec<TestCase>) -> Self {
        let suite_module = suites
            .iter()
            .map(|s| (s.id.clone(), s.module_id().to_string()))
            .collect();

        Self {
            modules,
            suites,
            cases,
            suite_module,
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn suite(&self, id: &str) -> Option<&TestSuite> {
        self.suites.iter().find(|s| s.id == id)
    }

    pub fn case(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn module_of_suite(&self, suite_id: &str) -> Option<&str> {
        self.suite_module.get(suite_id).map(String::as_str)
    }

    /// Falls back to the case's own `moduleId` when its suite is unknown.
    pub fn module_of_case<'a>(&'a self, case: &'a TestCase) -> &'a str {
        self.module_of_suite(case.suite_id())
            .unwrap_or(case.module_id.as_str())
    }

    pub fn suites_in_module<'a>(&'a self, module_id: &'a str) -> impl Iterator<Item = &'a TestSuite> {
        self.suites.iter().filter(move |s| s.module_id() == module_id)
    }

    pub fn cases_in_suite<'a>(&'a self, suite_id: &'a str) -> impl Iterator<Item = &'a TestCase> {
        self.cases.iter().filter(move |c| c.suite_id() == suite_id)
    }

    pub fn cases_in_module<'a>(&'a self, module_id: &'a str) -> impl Iterator<Item = &'a TestCase> {
        self.cases
            .iter()
            .filter(move |c| self.module_of_case(c) == module_id)
    }

    /// Ids of every case in `scope` not listed in `exclude`, over the full
    /// list regardless of what is expanded on screen.
    pub fn scope_ids(&self, scope: &Scope, exclude: &HashSet<String>) -> Vec<String> {
        let keep = |c: &&TestCase| !exclude.contains(&c.id);
        match scope {
            Scope::Project => self.cases.iter().filter(keep).map(|c| c.id.clone()).collect(),
            Scope::Module(id) => self
                .cases_in_module(id)
                .filter(keep)
                .map(|c| c.id.clone())
                .collect(),
            Scope::Suite(id) => self
                .cases_in_suite(id)
                .filter(keep)
                .map(|c| c.id.clone())
                .collect(),
        }
    }

    /// Modules a suite may be moved or copied to: every module except the
    /// one it lives in.
    pub fn suite_move_targets(&self, suite_id: &str) -> Vec<&Module> {
        let current = self.module_of_suite(suite_id);
        self.modules
            .iter()
            .filter(|m| Some(m.id.as_str()) != current)
            .collect()
    }

    /// Suites offered once a target module is chosen in the case move dialog.
    pub fn case_move_targets<'a>(&'a self, module_id: &'a str) -> Vec<&'a TestSuite> {
        self.suites_in_module(module_id).collect()
    }

    /// Flattens the tree for display: modules, then their suites, then
    /// their cases. Containers without any available case are skipped,
    /// like the run selection tree does.
    pub fn flatten(&self, selected: &MultiSelect, exclude: &HashSet<String>) -> Vec<TreeNode> {
        let mut nodes = Vec::new();

        let mut modules: Vec<&Module> = self.modules.iter().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        for module in modules {
            let module_scope = self.scope_ids(&Scope::Module(module.id.clone()), exclude);
            if module_scope.is_empty() {
                continue;
            }

            nodes.push(TreeNode {
                id: module.id.clone(),
                kind: NodeKind::Module,
                name: module.name.clone(),
                depth: 0,
                parent_id: None,
                case_count: module_scope.len(),
                selection: selected.scope_state(&module_scope),
            });

            let mut suites: Vec<&TestSuite> = self.suites_in_module(&module.id).collect();
            suites.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

            for suite in suites {
                let suite_scope = self.scope_ids(&Scope::Suite(suite.id.clone()), exclude);
                if suite_scope.is_empty() {
                    continue;
                }

                nodes.push(TreeNode {
                    id: suite.id.clone(),
                    kind: NodeKind::Suite,
                    name: suite.name.clone(),
                    depth: 1,
                    parent_id: Some(module.id.clone()),
                    case_count: suite_scope.len(),
                    selection: selected.scope_state(&suite_scope),
                });

                for case in self.cases_in_suite(&suite.id).filter(|c| !exclude.contains(&c.id)) {
                    let selection = if selected.contains(&case.id) {
                        ScopeState::All
                    } else {
                        ScopeState::None
                    };
                    nodes.push(TreeNode {
                        id: case.id.clone(),
                        kind: NodeKind::Case,
                        name: case.title.clone(),
                        depth: 2,
                        parent_id: Some(suite.id.clone()),
                        case_count: 1,
                        selection,
                    });
                }
            }
        }

        nodes
    }
}
