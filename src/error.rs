use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::schemas::ErrorBody;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request to the key-value store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("key-value store answered {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("stored collection is not valid: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to encode collection: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid key-value store endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Group not found")]
    GroupNotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::GroupNotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store operation failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error })
    }
}
