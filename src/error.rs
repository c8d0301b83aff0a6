use thiserror::Error;

/// Custom error type for Liedwyser operations.
#[derive(Debug, Error)]
pub enum LiedwyserError {
    /// Corpus source unreadable or unparsable. Fatal at startup.
    #[error("Corpus ingestion failed: {0}")]
    Ingestion(String),

    /// A song record failed validation (e.g. duplicate id, missing text).
    #[error("Invalid song record '{id}': {message}")]
    Validation { id: String, message: String },

    /// Embedding model unavailable, text unembeddable, or inference failed.
    /// Surfaced to the caller as a degraded-mode condition, never a crash.
    #[error("Embedding unavailable: {0}")]
    Embedding(String),

    /// User query rejected (empty or whitespace-only). Caller error, not a fault.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl LiedwyserError {
    /// Validation error naming the offending record.
    pub fn validation(id: impl Into<String>, message: impl Into<String>) -> Self {
        LiedwyserError::Validation {
            id: id.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LiedwyserError {
    fn from(err: serde_json::Error) -> Self {
        LiedwyserError::Ingestion(format!("JSON parse error: {}", err))
    }
}
