use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AppError {
    /// A local precondition failed; no request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("{0}")]
    RequestFailed(#[from] ApiError),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RequestFailed(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            AppError::RequestFailed(ApiError::InvalidConfig(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::RequestFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn notice(&self) -> Notice {
        let title = match self {
            AppError::Validation(_) => "Validation Error",
            AppError::InvalidTarget(_) => "Invalid Target",
            AppError::RequestFailed(_) => "Request Failed",
            AppError::NotFound(_) => "Not Found",
        };
        Notice::error(title, self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// User-facing notification describing the result of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Validation(_) | AppError::InvalidTarget(_) => tracing::warn!("{}", self),
            _ => tracing::error!("{}", self),
        }
        (status, Json(self.notice())).into_response()
    }
}
