use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::{HttpClient, TestApi};
use crate::config::Config;
use crate::handlers;
use crate::memory::MemoryApi;
use crate::workspace::Workspace;

/// Format latency in human-readable units
fn format_latency(duration: std::time::Duration) -> String {
    let micros = duration.as_micros();
    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{}ms", micros / 1000)
    } else {
        format!("{:.1}s", micros as f64 / 1_000_000.0)
    }
}

pub struct AppState {
    pub workspace: Workspace,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub fn new(api: Arc<dyn TestApi>, config: &Config) -> Self {
        Self {
            workspace: Workspace::new(api, config),
        }
    }

    /// Talks to the remote API at `config.api_url`.
    pub fn remote(config: &Config) -> crate::AppResult<Self> {
        let client = HttpClient::new(config)?;
        tracing::debug!(api_url = %client.base_url(), "using remote API");
        Ok(Self::new(Arc::new(client), config))
    }

    /// Serves the built-in sample projects from memory.
    pub fn sample(config: &Config) -> Self {
        Self::new(Arc::new(MemoryApi::with_sample_data()), config)
    }
}

pub fn create_app(state: SharedAppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/projects", get(handlers::list_projects))
        .route("/api/projects/:id/open", post(handlers::open_project))
        .route("/api/projects/:id/tree", get(handlers::project_tree))
        .route("/api/projects/:id/targets", get(handlers::move_targets))
        .route(
            "/api/selection",
            get(handlers::get_selection).post(handlers::update_selection),
        )
        .route(
            "/api/selected",
            get(handlers::get_selected).delete(handlers::clear_selected),
        )
        .route("/api/selected/toggle", post(handlers::toggle_selected))
        .route("/api/selected/scope", post(handlers::toggle_scope))
        .route("/api/projects/:id/modules", post(handlers::create_module))
        .route("/api/projects/:id/testsuites", post(handlers::create_test_suite))
        .route("/api/testcases", post(handlers::create_test_case))
        .route("/api/testcases/:id", put(handlers::update_test_case))
        .route("/api/testcases/delete", post(handlers::delete_cases))
        .route("/api/testcases/move", post(handlers::move_cases))
        .route("/api/testcases/copy", post(handlers::copy_cases))
        .route("/api/testsuites/:id/move", post(handlers::move_suite))
        .route("/api/testsuites/:id/copy", post(handlers::copy_suite))
        .route(
            "/api/projects/:id/testruns",
            get(handlers::list_runs).post(handlers::create_run),
        )
        .route("/api/testruns/:id", get(handlers::get_run))
        .route("/api/testruns/:id/status", put(handlers::set_run_status))
        .route("/api/testruns/:id/metrics", get(handlers::run_metrics))
        .route("/api/testruns/:id/available", get(handlers::available_cases))
        .route("/api/testruns/:id/test-cases", post(handlers::add_cases))
        .route(
            "/api/testruns/:id/test-cases/:case_id",
            delete(handlers::remove_case),
        )
        .route(
            "/api/testruns/:id/test-cases/:case_id/execute",
            post(handlers::execute_case),
        )
        .route(
            "/api/testruns/:id/test-cases/:case_id/history",
            get(handlers::case_history),
        )
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    static REQUEST_ID: AtomicU64 = AtomicU64::new(1);
                    let request_id_num = REQUEST_ID.fetch_add(1, Ordering::Relaxed);
                    let generator = block_id::BlockId::new(
                        block_id::Alphabet::alphanumeric(),
                        1234,
                        5,
                    );
                    let request_id = generator
                        .encode_string(request_id_num)
                        .unwrap_or_else(|| request_id_num.to_string());
                    tracing::info_span!(
                        "request",
                        id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &Span| {
                    tracing::info!("-> {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::info!(
                            "<- {} latency={}",
                            response.status().as_u16(),
                            format_latency(latency)
                        );
                    },
                ),
        )
        .layer(CompressionLayer::new())
}
