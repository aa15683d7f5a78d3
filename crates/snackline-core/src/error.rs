use thiserror::Error;

/// Top-level error type for the Snackline system.
///
/// Each variant wraps a subsystem-specific message. Subsystem crates build
/// their errors through these variants so the `?` operator works seamlessly
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnacklineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SnacklineError {
    fn from(err: toml::de::Error) -> Self {
        SnacklineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SnacklineError {
    fn from(err: toml::ser::Error) -> Self {
        SnacklineError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SnacklineError {
    fn from(err: serde_json::Error) -> Self {
        SnacklineError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Snackline operations.
pub type Result<T> = std::result::Result<T, SnacklineError>;
