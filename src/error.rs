// Error taxonomy shared by the evaluator, the dispatch table, the entity
// stores and the HTTP layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed input or a missing mandatory field
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Cross-entity invariant violated (e.g. account type != category type)
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Password hashing or token signing failed on our side
    #[error("credential error: {0}")]
    Credential(String),
}

impl LedgerError {
    /// Message safe to show to API clients. Storage and credential failures
    /// never leak their internal detail.
    pub fn public_message(&self) -> String {
        match self {
            LedgerError::InvalidRequest(msg)
            | LedgerError::Validation(msg)
            | LedgerError::NotFound(msg)
            | LedgerError::Unauthorized(msg) => msg.clone(),
            LedgerError::Storage(_) => "internal storage error".to_string(),
            LedgerError::Credential(_) => "internal credential error".to_string(),
        }
    }

    /// Maps `QueryReturnedNoRows` to `NotFound`, everything else to `Storage`
    pub fn from_lookup(err: rusqlite::Error, what: &str) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => LedgerError::NotFound(what.to_string()),
            other => LedgerError::Storage(other),
        }
    }

    /// Maps constraint violations (unique, foreign key) on a write to
    /// `Validation`, everything else to `Storage`
    pub fn from_write(err: rusqlite::Error, violation: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                LedgerError::Validation(violation.to_string())
            }
            other => LedgerError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
