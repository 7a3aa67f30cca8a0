//! Feed error types.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Errors from fetching a live feed payload.
#[derive(Debug)]
pub enum FeedError {
    /// HTTP request failed (network error, connect failure, etc.)
    Http(reqwest::Error),

    /// The fetch did not complete within its time budget
    Timeout(Duration),

    /// API returned an error status code
    ApiError { status: u16, message: String },

    /// Rate limited by the API
    RateLimited,

    /// Invalid API key or unauthorized
    Unauthorized,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "HTTP error: {e}"),
            FeedError::Timeout(after) => {
                write!(f, "fetch timed out after {}ms", after.as_millis())
            }
            FeedError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            FeedError::RateLimited => write!(f, "rate limited by feed API"),
            FeedError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

/// Errors from loading a replay file.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read replay file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("replay file {0} contains no payload lines")]
    Empty(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FeedError::Unauthorized;
        assert_eq!(err.to_string(), "unauthorized (invalid API key)");

        let err = FeedError::ApiError {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "API error 500: Internal Server Error");

        let err = FeedError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "fetch timed out after 5000ms");

        let err = ReplayError::Empty(PathBuf::from("data/empty.jsonl"));
        assert_eq!(
            err.to_string(),
            "replay file data/empty.jsonl contains no payload lines"
        );
    }
}
