// src/utils/errors.rs
//! Error types for capture operations

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Error types for the capture engine.
///
/// None of these ever reach the host application from the background
/// capture paths; they surface only from constructors, configuration
/// loading, and the storage/recorder seams.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Session storage failed
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Screen recorder could not be loaded or started
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CaptureError::Configuration("missing project id".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing project id");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CaptureError = parse_err.into();
        assert!(matches!(err, CaptureError::Serialization(_)));
    }
}
