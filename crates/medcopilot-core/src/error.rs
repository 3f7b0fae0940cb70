use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing backend credential: {0}")]
    Configuration(String),

    #[error("Malformed document '{filename}': {reason}")]
    MalformedDocument { filename: String, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid chunking parameters: {0}")]
    Chunking(String),

    #[error("Persistence failed: {0}")]
    Persist(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of one generative backend attempt.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("model '{model}' timed out after {secs}s")]
    Timeout { model: String, secs: u64 },

    #[error("model '{model}' rejected the request ({status}): {message}")]
    Rejected { model: String, status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Malformed(String),
}
