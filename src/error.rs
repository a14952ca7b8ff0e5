//! Error types for the conversation core.

/// Errors raised by the conversation store and its persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("failed to read stored transcript: {0}")]
    PersistenceRead(String),
    #[error("failed to write transcript: {0}")]
    PersistenceWrite(String),
    #[error("invalid storage key {0:?}: use a plain name without path separators or `..`")]
    InvalidStorageKey(String),
}

/// Ways a call to the answering service can fail.
///
/// Every variant is surfaced to the user the same way, as the configured
/// failure message; the distinction only matters for logging.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("answering service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
