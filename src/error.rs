//! Error types for tanka-guard.

use thiserror::Error;

/// No usable structured object could be recovered from raw model output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("no structured object found")]
    NoObject,

    #[error("malformed structured object: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("response was blocked by the provider safety filter")]
    SafetyBlocked,

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("provider error: {0}")]
    Upstream(String),

    #[error("text is required")]
    EmptyPoem,

    #[error("submission contains a blocked word: {0}")]
    Blocked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-readable tag, used as the log status detail and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Format(_) => "format",
            Error::SafetyBlocked => "safety_blocked",
            Error::EmptyResponse => "empty_response",
            Error::Upstream(_) => "upstream",
            Error::EmptyPoem => "empty_poem",
            Error::Blocked(_) => "blocked",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }

    /// Failures worth retrying against another model.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Upstream(_) | Error::EmptyResponse | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_messages_match_failure_stage() {
        assert_eq!(FormatError::NoObject.to_string(), "no structured object found");
        assert!(FormatError::Malformed("eof".into())
            .to_string()
            .starts_with("malformed structured object"));
    }

    #[test]
    fn format_error_stays_distinct_from_transport() {
        let err: Error = FormatError::NoObject.into();
        assert_eq!(err.kind(), "format");
        assert_eq!(Error::EmptyResponse.kind(), "empty_response");
    }

    #[test]
    fn only_transport_failures_retry() {
        assert!(Error::Upstream("503".into()).is_retryable());
        assert!(Error::EmptyResponse.is_retryable());
        assert!(!Error::SafetyBlocked.is_retryable());
        assert!(!Error::Format(FormatError::NoObject).is_retryable());
        assert!(!Error::EmptyPoem.is_retryable());
    }

    #[test]
    fn unreadable_source_maps_to_io() {
        let missing = std::fs::read_to_string("/nonexistent/tanka-guard/raw.txt");
        let err: Error = missing.unwrap_err().into();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().starts_with("IO error"));
    }
}
