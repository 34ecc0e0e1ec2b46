use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sled::Error> for TrackerError {
    fn from(e: sled::Error) -> Self {
        TrackerError::DatabaseError(e.to_string())
    }
}
