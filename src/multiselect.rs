use serde::Serialize;
use std::collections::BTreeSet;

/// Selection state of a scope (a module's or suite's test cases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeState {
    None,
    Partial,
    All,
}

/// Set of selected test case ids used for bulk operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSelect {
    selected: BTreeSet<String>,
}

impl MultiSelect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Adds the id if absent, removes it if present. Returns whether the id
    /// is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    pub fn select_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected.extend(ids.into_iter().map(Into::into));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Keeps only ids still present in `ids`.
    pub fn retain<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let alive: BTreeSet<&str> = ids.into_iter().collect();
        self.selected.retain(|id| alive.contains(id.as_str()));
    }

    /// False for an empty scope.
    pub fn all_selected(&self, scope: &[String]) -> bool {
        !scope.is_empty() && scope.iter().all(|id| self.selected.contains(id))
    }

    pub fn some_selected(&self, scope: &[String]) -> bool {
        scope.iter().any(|id| self.selected.contains(id)) && !self.all_selected(scope)
    }

    pub fn scope_state(&self, scope: &[String]) -> ScopeState {
        if self.all_selected(scope) {
            ScopeState::All
        } else if self.some_selected(scope) {
            ScopeState::Partial
        } else {
            ScopeState::None
        }
    }

    /// "Select all" checkbox on a scope: deselects the whole scope when it
    /// is fully selected, otherwise selects its missing members. Ids
    /// outside the scope are left alone. Returns the resulting state.
    pub fn toggle_scope(&mut self, scope: &[String]) -> ScopeState {
        if self.all_selected(scope) {
            for id in scope {
                self.selected.remove(id);
            }
        } else {
            for id in scope {
                if !self.selected.contains(id) {
                    self.selected.insert(id.clone());
                }
            }
        }
        self.scope_state(scope)
    }
}
