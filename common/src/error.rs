//! Error handling for the sparklet-common crate.

use thiserror::Error;

/// Common error type that abstracts over underlying library errors.
///
/// Every variant carries a human readable message and, optionally, the
/// error it was raised from so callers can walk the `source()` chain.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Storage operation failed: {message}")]
    StorageError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Resource not found: {message}")]
    NotFoundError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("IO operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

impl CommonError {
    /// Create a storage error with a custom message.
    pub fn storage_error<S: Into<String>>(message: S) -> Self {
        Self::StorageError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with a custom message and source error.
    pub fn storage_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::StorageError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a not found error with a custom message and source error.
    pub fn not_found_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::NotFoundError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an IO error with a custom message and source error.
    pub fn io_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::IoError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a configuration error with a custom message and source error.
    pub fn configuration_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns true if the error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFoundError { .. })
    }

    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::StorageError { message, .. }
            | Self::NotFoundError { message, .. }
            | Self::IoError { message, .. }
            | Self::ConfigurationError { message, .. } => message,
        }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::io_error_with_source(err.to_string(), err)
    }
}

impl From<object_store::Error> for CommonError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { ref path, .. } => {
                let message = format!("object '{path}' does not exist");
                Self::not_found_error_with_source(message, err)
            }
            other => Self::storage_error_with_source(other.to_string(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = CommonError::storage_error("disk full");
        assert_eq!(err.to_string(), "Storage operation failed: disk full");
        assert_eq!(err.message(), "disk full");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: CommonError = io.into();
        assert!(matches!(err, CommonError::IoError { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_not_found_from_object_store() {
        let err: CommonError = object_store::Error::NotFound {
            path: "data/in.txt".to_string(),
            source: "missing".into(),
        }
        .into();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("data/in.txt"));
    }
}
