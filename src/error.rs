//! Error types for the Rocket assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture/playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech recognition error
    #[error("recognizer error: {0}")]
    Recognizer(String),

    /// Response generation error
    #[error("generator error: {0}")]
    Generate(String),

    /// Speech synthesis error
    #[error("synthesizer error: {0}")]
    Synthesize(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Classify a reqwest failure for degrade-path diagnostics.
    ///
    /// External-service failures map onto a small set of kinds so the
    /// orchestrator logs read the same regardless of which adapter failed.
    #[must_use]
    pub fn classify_http(e: &reqwest::Error) -> &'static str {
        if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection-refused"
        } else if e.is_decode() || e.is_body() {
            "malformed-response"
        } else {
            "request-failed"
        }
    }
}
