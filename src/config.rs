use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Where the remote API lives and how the local state layer talks to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub timeout: Duration,
    /// Cached reads older than this are re-fetched even when nothing
    /// invalidated them. `None` keeps them until invalidated.
    pub cache_ttl: Option<Duration>,
    /// Recorded as `executedBy` on optimistic execution updates.
    pub user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            cache_ttl: None,
            user: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `CASEBOOK_API_URL`, `CASEBOOK_TIMEOUT_SECS`,
    /// `CASEBOOK_CACHE_TTL_SECS` and `CASEBOOK_USER`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("CASEBOOK_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url;
        }
        if let Some(secs) = lookup("CASEBOOK_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        config.cache_ttl = lookup("CASEBOOK_CACHE_TTL_SECS")
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs);
        config.user = lookup("CASEBOOK_USER").filter(|v| !v.trim().is_empty());

        config
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.is_empty() {
            return Err("API URL cannot be empty".to_string());
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err("API URL must start with http:// or https://".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}
