// ABOUTME: Error types for floatchat-core
// ABOUTME: TransportError for collaborator calls, ConfigError for widget configuration

use thiserror::Error;

/// Failures reported by the chat transport or the product catalog.
///
/// The session never shows these to the user verbatim; each one becomes a
/// single generic notice in the transcript.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty response from server")]
    EmptyResponse,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Connection(_) | TransportError::Timeout => true,
            TransportError::Status { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

/// Configuration loading or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
