use thiserror::Error;

/// Main error type for the relayer
#[derive(Error, Debug)]
pub enum RelayerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Chain errors
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Fill failed: {0}")]
    Fill(String),

    // Order data errors
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for RelayerError
pub type Result<T> = std::result::Result<T, RelayerError>;

impl RelayerError {
    /// True when the underlying database error is a unique-key violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RelayerError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
