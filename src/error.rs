//! Error types for batchscribe.
//!
//! Per-item transcription failures are not errors at this level: they are
//! recorded as [`crate::stt::transcriber::TranscriptionFailure`] outcomes.
//! This enum covers misuse of the batch API and process-level problems.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchscribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unsupported language code '{code}'")]
    UnsupportedLanguage { code: String },

    #[error(
        "No API key configured. Set BATCHSCRIBE_API_KEY (or DEEPGRAM_API_KEY) or api.api_key in the config file"
    )]
    MissingApiKey,

    // Batch contract violations
    #[error("batch_size must be at least 1")]
    InvalidBatchSize,

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Duplicate request identifier '{identifier}'")]
    DuplicateIdentifier { identifier: String },

    // Transcription client setup
    #[error("HTTP client error: {message}")]
    HttpClient { message: String },

    // Input / output collaborators
    #[error("Input error for {path}: {message}")]
    Input { path: String, message: String },

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BatchscribeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_invalid_value_display() {
        let error = BatchscribeError::ConfigInvalidValue {
            key: "batch.concurrency".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for batch.concurrency: must be at least 1"
        );
    }

    #[test]
    fn test_unsupported_language_display() {
        let error = BatchscribeError::UnsupportedLanguage {
            code: "xx".to_string(),
        };
        assert_eq!(error.to_string(), "Unsupported language code 'xx'");
    }

    #[test]
    fn test_batch_contract_errors_display() {
        assert_eq!(
            BatchscribeError::InvalidBatchSize.to_string(),
            "batch_size must be at least 1"
        );
        assert_eq!(
            BatchscribeError::InvalidConcurrency.to_string(),
            "concurrency must be at least 1"
        );
        let dup = BatchscribeError::DuplicateIdentifier {
            identifier: "a.mp3".to_string(),
        };
        assert_eq!(dup.to_string(), "Duplicate request identifier 'a.mp3'");
    }

    #[test]
    fn test_missing_api_key_mentions_env_var() {
        let msg = BatchscribeError::MissingApiKey.to_string();
        assert!(msg.contains("BATCHSCRIBE_API_KEY"));
        assert!(msg.contains("DEEPGRAM_API_KEY"));
    }

    #[test]
    fn test_input_display() {
        let error = BatchscribeError::Input {
            path: "/tmp/a.txt".to_string(),
            message: "unsupported file extension".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Input error for /tmp/a.txt: unsupported file extension"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: BatchscribeError = io_error.into();
        assert!(error.to_string().contains("file not found"));

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: BatchscribeError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<BatchscribeError>();
        assert_sync::<BatchscribeError>();
    }
}
