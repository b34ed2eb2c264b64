//! Error types for sigtract

use thiserror::Error;

/// Main error type for sigtract operations
#[derive(Debug, Error)]
pub enum SigtractError {
    #[error("Player fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Extraction task failed: {0}")]
    ExtractionError(String),

    #[error("Script error: {0}")]
    ScriptError(String),

    #[error("Script timed out after {0:?}")]
    ScriptTimeout(std::time::Duration),

    #[error("Invalid binding name: {0}")]
    InvalidBinding(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl SigtractError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SigtractError::FetchFailed(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            SigtractError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if error happened while running player code
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            SigtractError::ScriptError(_) | SigtractError::ScriptTimeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_retryable() {
        let err = SigtractError::HttpStatus {
            status: 503,
            url: "https://www.youtube.com/s/player/x/base.js".to_string(),
        };
        assert!(err.is_retryable());

        let err = SigtractError::HttpStatus {
            status: 404,
            url: "https://www.youtube.com/s/player/x/base.js".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_script_errors() {
        assert!(SigtractError::ScriptTimeout(Duration::from_secs(1)).is_script_error());
        assert!(SigtractError::ScriptError("boom".to_string()).is_script_error());
        assert!(!SigtractError::ExtractionError("miss".to_string()).is_script_error());
        assert!(!SigtractError::Generic("x".to_string()).is_retryable());
    }
}
