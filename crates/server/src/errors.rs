use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::UnknownMethod(method) => {
                (StatusCode::NOT_FOUND, format!("method {method} is not supported")).into_response()
            }
            ApiError::Service(ServiceError::NotFound(name)) => {
                (StatusCode::NOT_FOUND, format!("DB {name} is not found")).into_response()
            }
            ApiError::Service(ServiceError::AlreadyExists(name)) => {
                (StatusCode::CONFLICT, format!("DB {name} already exists")).into_response()
            }
            ApiError::Service(ServiceError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": msg}))).into_response()
            }
            ApiError::Service(e) => {
                let msg = e.to_string();
                error!(error = %msg, "storage operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": msg}))).into_response()
            }
        }
    }
}
