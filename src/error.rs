//! Error classes returned by every engine operation.
//!
//! Each class maps to exactly one transport status so adapters can translate
//! them mechanically.

use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Referenced user, club or membership is absent.
    #[error("{0}")]
    NotFound(String),
    /// Authenticated caller lacks the role the operation requires.
    #[error("{0}")]
    Unauthorized(String),
    /// No usable identity: missing/invalid token or bad credentials.
    #[error("{0}")]
    Unauthenticated(String),
    /// The operation would break an invariant.
    #[error("{0}")]
    Conflict(String),
    /// Malformed input.
    #[error("{0}")]
    Invalid(String),
    /// Unexpected server-side fault outside the store.
    #[error("{0}")]
    Internal(String),
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl EngineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        EngineError::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        EngineError::Unauthorized(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        EngineError::Unauthenticated(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        EngineError::Conflict(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::Invalid(msg.into())
    }

    /// True when the failure was a lost serialization race worth retrying.
    pub fn is_contention(&self) -> bool {
        matches!(self, EngineError::Store(StoreError::Contention(_)))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => EngineError::Conflict(format!("{what} already exists")),
            other => EngineError::Store(other),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
