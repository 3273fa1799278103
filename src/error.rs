//! Error types for the binding layer.
//!
//! Entry points that the scripting side sees keep their sentinel contracts
//! (`None`, `false`, `-1`); these errors are what the Rust API reports
//! underneath so that every failure is visible in the return type.

use thiserror::Error;

/// Main error type for binding operations.
#[derive(Debug, Error)]
pub enum BindError {
    /// The runtime handle does not map to a live descriptor
    #[error("handle does not resolve to a live switch descriptor")]
    UnresolvedHandle,

    /// A setter received something that is not a number
    #[error("value for field `{field}` is not a number")]
    NotANumber { field: &'static str },

    /// A setter value does not fit the native width of the field
    #[error("value {value} does not fit {bits}-bit field `{field}`")]
    Truncation {
        field: &'static str,
        value: i128,
        bits: u32,
    },

    /// Input image could not be parsed
    #[error("Invalid binary format: {0}")]
    InvalidFormat(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Bad configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for binding operations
pub type Result<T> = std::result::Result<T, BindError>;

impl From<serde_json::Error> for BindError {
    fn from(err: serde_json::Error) -> Self {
        BindError::Serialization(err.to_string())
    }
}

/// Convert binding errors to PyO3 exceptions
#[cfg(feature = "python-ext")]
impl From<BindError> for pyo3::PyErr {
    fn from(err: BindError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyException, PyIOError, PyOverflowError, PyTypeError, PyValueError};

        match err {
            BindError::Io(e) => PyIOError::new_err(e.to_string()),
            BindError::Truncation { .. } => PyOverflowError::new_err(err.to_string()),
            BindError::NotANumber { .. } => PyTypeError::new_err(err.to_string()),
            BindError::InvalidFormat(msg) | BindError::Config(msg) => PyValueError::new_err(msg),
            _ => PyException::new_err(err.to_string()),
        }
    }
}
