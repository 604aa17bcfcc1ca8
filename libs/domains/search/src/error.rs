use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

use crate::batch::BatchError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Internal(format!("JSON error: {}", err))
    }
}

impl From<csv::Error> for SearchError {
    fn from(err: csv::Error) -> Self {
        SearchError::Source(err.to_string())
    }
}

impl From<BatchError> for SearchError {
    fn from(err: BatchError) -> Self {
        SearchError::Config(err.to_string())
    }
}

impl From<core_config::ConfigError> for SearchError {
    fn from(err: core_config::ConfigError) -> Self {
        SearchError::Config(err.to_string())
    }
}

/// Convert SearchError to AppError for standardized HTTP error responses
impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(msg) => AppError::BadRequest(msg),
            SearchError::Embedding(msg) => {
                AppError::InternalServerError(format!("Embedding error: {}", msg))
            }
            SearchError::Store(msg) => {
                AppError::InternalServerError(format!("Vector store error: {}", msg))
            }
            SearchError::Source(msg) => {
                AppError::InternalServerError(format!("Source error: {}", msg))
            }
            SearchError::Config(msg) => {
                AppError::ServiceUnavailable(format!("Config error: {}", msg))
            }
            SearchError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
