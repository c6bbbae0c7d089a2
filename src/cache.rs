use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// What a cached read holds, keyed by its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Projects,
    Project(String),
    Modules(String),
    /// `None` lists suites across all modules.
    TestSuites(Option<String>),
    TestCases(String),
    SuiteTestCases(String),
    TestRuns(String),
    TestRun(String),
    RunMetrics(String),
    /// Run id, then case id.
    CaseHistory(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Projects,
    Modules,
    TestSuites,
    TestCases,
    TestRuns,
    TestRun,
    RunMetrics,
    CaseHistory,
}

impl QueryKey {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryKey::Projects | QueryKey::Project(_) => QueryKind::Projects,
            QueryKey::Modules(_) => QueryKind::Modules,
            QueryKey::TestSuites(_) => QueryKind::TestSuites,
            QueryKey::TestCases(_) | QueryKey::SuiteTestCases(_) => QueryKind::TestCases,
            QueryKey::TestRuns(_) => QueryKind::TestRuns,
            QueryKey::TestRun(_) => QueryKind::TestRun,
            QueryKey::RunMetrics(_) => QueryKind::RunMetrics,
            QueryKey::CaseHistory(..) => QueryKind::CaseHistory,
        }
    }
}

struct Entry {
    value: Box<dyn Any + Send + Sync>,
    fetched_at: Instant,
    stale: bool,
}

/// Read-through cache for API reads.
///
/// Mutations mark the keys they affect stale through [`QueryCache::invalidate`]
/// or [`QueryCache::invalidate_kind`]; the next read re-fetches. The lock is
/// never held across a fetch.
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, Entry>>,
    max_age: Option<Duration>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl QueryCache {
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        !entry.stale
            && self
                .max_age
                .is_none_or(|max_age| entry.fetched_at.elapsed() < max_age)
    }

    /// Fresh value for `key`, if any.
    pub fn get<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if !self.is_fresh(entry) {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    pub fn put<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.entries.write().insert(
            key,
            Entry {
                value: Box::new(value),
                fetched_at: Instant::now(),
                stale: false,
            },
        );
    }

    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(&key) {
            tracing::trace!(?key, "cache hit");
            return Ok(hit);
        }

        tracing::debug!(?key, "cache miss, fetching");
        let value = fetch().await?;
        self.put(key, value.clone());
        Ok(value)
    }

    /// Marks one key stale. Returns whether it was cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.entries.write().get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Marks every key of `kind` stale. Returns how many were cached.
    pub fn invalidate_kind(&self, kind: QueryKind) -> usize {
        let mut entries = self.entries.write();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.kind() == kind {
                entry.stale = true;
                count += 1;
            }
        }
        tracing::debug!(?kind, count, "invalidated cached reads");
        count
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .read()
            .get(key)
            .is_none_or(|entry| !self.is_fresh(entry))
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
