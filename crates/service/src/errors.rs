use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("store {0} not found")]
    NotFound(String),
    #[error("store {0} already exists")]
    AlreadyExists(String),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn not_found(name: &str) -> Self { Self::NotFound(name.to_string()) }

    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}
