//! Error types for macro data operations

use thiserror::Error;

/// Failure of a single series fetch
///
/// Cloneable so a failed outcome can be stored in the series cache and handed
/// to every caller that asks for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network failure or non-2xx HTTP status
    #[error("transport error{}: {message}", http_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Payload did not have the expected `[metadata, rows]` shape
    #[error("schema error: {0}")]
    Schema(String),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

impl FetchError {
    /// Create a transport error without an HTTP status
    pub fn network(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Create a transport error for an HTTP status
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether a retry has a chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            Self::Schema(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::status(status.as_u16(), err.to_string()),
            None if err.is_decode() => Self::Schema(err.to_string()),
            None => Self::network(err.to_string()),
        }
    }
}

/// Macro pipeline errors
#[derive(Debug, Error)]
pub enum PulseError {
    /// Series fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// User-supplied parameters are unusable
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Export sink failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for macro pipeline operations
pub type Result<T> = std::result::Result<T, PulseError>;
