use thiserror::Error;

/// Failures while talking to the decision engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing key, unsupported provider and similar setup problems.
    #[error("configuration error: {0}")]
    Config(String),
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(String),
    /// The API answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    /// The body could not be decoded.
    #[error("failed to parse response: {0}")]
    Format(String),
    #[error("failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: usize,
        last_error: Box<EngineError>,
    },
}

impl EngineError {
    /// Rate limits, server errors and transport failures are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Http(_) => true,
            EngineError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, EngineError::Api { status: 429, .. })
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EngineError::Format(err.to_string())
        } else {
            EngineError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Format(err.to_string())
    }
}
