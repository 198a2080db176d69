//! Error types for the webhook ingestion pipeline.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the upstream webhook sender should be invited to redeliver.
    ///
    /// Only infrastructure failures that a retry can plausibly fix qualify.
    /// Everything else is acknowledged to avoid redelivery storms.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(DatabaseError::Connection(_) | DatabaseError::Timeout(_)) => true,
            Self::ExternalService(
                ExternalServiceError::Unavailable(_) | ExternalServiceError::Timeout(_),
            ) => true,
            _ => false,
        }
    }
}

/// Database-specific errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut => Self::Timeout(err.to_string()),
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => Self::Connection(err.to_string()),
            sqlx::Error::Database(db_err) => {
                // 23505 = unique_violation; a concurrent duplicate delivery
                // lost the race on transaction_hash
                if db_err.code().as_deref() == Some("23505") {
                    Self::Duplicate(err.to_string())
                } else {
                    Self::Query(err.to_string())
                }
            }
            _ => Self::Query(err.to_string()),
        }
    }
}

/// Validation errors for inbound webhook payloads
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Unknown transaction structure - neither tx nor tx_fee_bump found")]
    UnknownTxShape,

    #[error("Source account could not be determined")]
    MissingSourceAccount,

    #[error("Invalid field {field}: {message}")]
    InvalidField { field: String, message: String },
}

/// Errors from external collaborators (email provider)
#[derive(Debug, Error)]
pub enum ExternalServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}
