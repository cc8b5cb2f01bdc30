//! Error types for the tax figure extractor

use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractionError>;

#[derive(Error, Debug)]
pub enum ExtractionError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unparseable numeral: {0}")]
    UnparseableNumeral(String),

    #[error("Malformed backend output: {0}")]
    MalformedBackendOutput(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task error: {0}")]
    TaskError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExtractionError {
    /// True when the failure came from the caller's text rather than a collaborator
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ExtractionError::InvalidInput(_))
    }

    /// True when the language-understanding backend misbehaved
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            ExtractionError::LlmError(_)
                | ExtractionError::MalformedBackendOutput(_)
                | ExtractionError::HttpError(_)
        )
    }
}
