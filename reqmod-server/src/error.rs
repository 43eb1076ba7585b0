//! Rule Server Error Types

use thiserror::Error;

/// Main error type for rule server operations
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Engine error: {0}")]
    Engine(#[from] reqmod_core::EngineError),

    #[error("Stored rule {id} is corrupt: {details}")]
    CorruptRule { id: i64, details: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;
