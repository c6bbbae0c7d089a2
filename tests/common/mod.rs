//! Shared test utilities for integration tests.

use axum_test::TestServer;
use casebook::memory::MemoryApi;
use casebook::{AppState, Config, create_app};
use std::sync::Arc;

/// Creates a test server backed by the in-memory sample projects.
pub fn test_server() -> TestServer {
    test_server_with(Arc::new(MemoryApi::with_sample_data()))
}

/// Creates a test server over `api`, so tests can inject failures or
/// inspect the backend afterwards.
pub fn test_server_with(api: Arc<MemoryApi>) -> TestServer {
    let config = Config::default().with_user("integration");
    let state = AppState::new(api, &config);
    let app = create_app(Arc::new(state));
    TestServer::new(app).unwrap()
}
