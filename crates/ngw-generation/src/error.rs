//! Error types for the generation backend client.

use thiserror::Error;

/// Errors that can occur when talking to the generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned a non-success response
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid configuration (bad endpoint URL, header value, ...)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The byte stream broke while reading
    #[error("Streaming error: {0}")]
    StreamError(String),

    /// The backend reported a failure through the `error` event
    #[error("Generation failed: {0}")]
    Remote(String),

    /// The stream ended before a terminal `complete` or `error` event
    #[error("Stream ended before completion")]
    Incomplete,
}

impl GenerationError {
    /// Whether this error came from the transport rather than the backend's own logic.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GenerationError::HttpError(_)
                | GenerationError::ApiError { .. }
                | GenerationError::StreamError(_)
        )
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for GenerationError {
    fn from(err: url::ParseError) -> Self {
        GenerationError::ConfigError(err.to_string())
    }
}
