use thiserror::Error;

/// Errors raised by the message store and its callers.
///
/// Reads with no matching rows return empty collections rather than an
/// error; `Validation` is reserved for inserts missing required fields.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
