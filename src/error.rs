use thiserror::Error;

/// Library-level error taxonomy. CLI binaries collapse these into
/// `anyhow::Error` at the call site and print a one-line diagnostic.
#[derive(Debug, Error)]
pub enum QrsdpError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt log: {0}")]
    CorruptLog(String),

    #[error("book invariant violated: {0}")]
    InvariantViolation(String),

    #[error("sink failure: {0}")]
    SinkFailure(String),

    #[error("network send failed: {0}")]
    NetworkTransient(String),
}

pub type Result<T> = std::result::Result<T, QrsdpError>;
