//! Error types for the register store.

use thiserror::Error;

/// Main error type for register operations.
#[derive(Debug, Error)]
pub enum RegError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key already exists: {0}")]
    KeyExists(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Not readable: {0}")]
    NotReadable(String),

    #[error("Not writeable: {0}")]
    NotWriteable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type for register operations.
pub type Result<T> = std::result::Result<T, RegError>;
