pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod mobility;
pub mod model;
pub mod multiselect;
pub mod runs;
pub mod selection;
pub mod tree;
pub mod workspace;

pub use app::{AppState, SharedAppState, create_app};
pub use config::Config;
pub use error::{AppError, AppResult};
