//! Error types for Yeti API operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during Yeti API operations.
#[derive(Debug, Error)]
pub enum YetiError {
    /// Configuration is missing or incomplete.
    #[error("Yeti configuration required: {0}")]
    ConfigMissing(String),

    /// The caller supplied an unusable combination of arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered with something other than HTTP 200.
    #[error("Yeti API error ({status}) for {url}: {message}")]
    Upstream {
        status: u16,
        url: String,
        message: String,
    },

    /// A oneshot analytic reached a terminal state other than `finished`.
    #[error("Oneshot '{id}' ended with status '{status}'")]
    JobFailed { id: String, status: String },

    /// Polling a oneshot analytic ran out of time or attempts.
    #[error("Oneshot '{id}' still running after {attempts} polls ({elapsed:?})")]
    PollTimeout {
        id: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Polling a oneshot analytic was cancelled by the caller.
    #[error("Oneshot '{id}' polling cancelled")]
    Cancelled { id: String },

    /// The response body was not of the expected kind (JSON vs. binary).
    #[error("Unexpected response payload: expected {0}")]
    UnexpectedPayload(&'static str),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Local I/O error (reading files to upload).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl YetiError {
    /// HTTP status of an upstream failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server reported the requested object as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type alias for Yeti operations.
pub type Result<T> = core::result::Result<T, YetiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_only_for_404() {
        let missing = YetiError::Upstream {
            status: 404,
            url: "http://yeti/api/observable/x".to_string(),
            message: "not found".to_string(),
        };
        assert!(missing.is_not_found());

        let broken = YetiError::Upstream {
            status: 500,
            url: "http://yeti/api/observable/x".to_string(),
            message: "boom".to_string(),
        };
        assert!(!broken.is_not_found());
        assert_eq!(broken.status(), Some(500));

        assert!(YetiError::InvalidArgument("x".to_string()).status().is_none());
    }

    #[test]
    fn test_upstream_display_carries_status_and_url() {
        let err = YetiError::Upstream {
            status: 403,
            url: "http://yeti/api/entity/".to_string(),
            message: "forbidden".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("403"));
        assert!(text.contains("http://yeti/api/entity/"));
    }
}
