use crate::services::join::JoinFailure;
use crate::services::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    VerificationRejected(String),

    #[error("{0}")]
    MethodMismatch(String),

    #[error("Verification timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<JoinFailure> for AppError {
    fn from(failure: JoinFailure) -> Self {
        match failure {
            JoinFailure::InvalidRequest(msg) => {
                AppError::BadRequest(format!("Missing required fields: {msg}"))
            }
            JoinFailure::CommunityNotFound => AppError::NotFound("Community not found".to_string()),
            JoinFailure::MethodMismatch { .. } => AppError::MethodMismatch(failure.to_string()),
            JoinFailure::VerificationRejected(msg) => AppError::VerificationRejected(msg),
            JoinFailure::Persistence(e) => AppError::Store(e),
            JoinFailure::Timeout => AppError::Timeout,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::VerificationRejected(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MethodMismatch(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Timeout => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Store(StoreError::CommunityNotFound) => {
                (StatusCode::NOT_FOUND, "Community not found".to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong!".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong!".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
