//! Sleeper proxy error types.
//!
//! Every error here is `Clone`: a single failed upstream load is handed to
//! every caller that was waiting on it.

use std::fmt;

/// Maximum number of characters of an upstream body kept in an error.
pub const BODY_SNIPPET_LEN: usize = 500;

/// A request parameter was missing or malformed. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Classification of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// The request exceeded the client timeout.
    Timeout,
    /// The upstream answered with a non-2xx status.
    HttpStatus(u16),
    /// The body was not valid JSON or did not match the expected record shape.
    ParseFailure,
    /// Connection-level failure (DNS, refused, reset).
    Transport,
}

impl UpstreamErrorKind {
    /// Stable machine-readable name, used in protocol error envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamErrorKind::Timeout => "timeout",
            UpstreamErrorKind::HttpStatus(_) => "http_status",
            UpstreamErrorKind::ParseFailure => "parse_failure",
            UpstreamErrorKind::Transport => "transport",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamErrorKind::HttpStatus(code) => write!(f, "HTTP {code}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Failure talking to the Sleeper API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream error ({kind}): {message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
    /// Leading part of the response body, when there was one.
    pub body_snippet: Option<String>,
}

impl UpstreamError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Timeout,
            message: message.into(),
            body_snippet: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Transport,
            message: message.into(),
            body_snippet: None,
        }
    }

    pub fn status(code: u16, body: &str) -> Self {
        Self {
            kind: UpstreamErrorKind::HttpStatus(code),
            message: format!("upstream responded with status {code}"),
            body_snippet: snippet(body),
        }
    }

    pub fn parse(message: impl Into<String>, body: &str) -> Self {
        Self {
            kind: UpstreamErrorKind::ParseFailure,
            message: message.into(),
            body_snippet: snippet(body),
        }
    }

    /// Upstream HTTP status, if the failure carried one.
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            UpstreamErrorKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// 4xx answers and parse failures are deterministic; timeouts, transport
    /// failures and 5xx answers are not.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            UpstreamErrorKind::Timeout | UpstreamErrorKind::Transport => true,
            UpstreamErrorKind::HttpStatus(code) => (500..600).contains(&code),
            UpstreamErrorKind::ParseFailure => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::timeout(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::status(status.as_u16(), "")
        } else if err.is_decode() {
            UpstreamError::parse(err.to_string(), "")
        } else {
            UpstreamError::transport(err.to_string())
        }
    }
}

/// Top-level error returned by the proxy's operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SleeperError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A load task or limiter misbehaved. Indicates a bug, not an upstream fault.
    #[error("internal rate limiting error: {0}")]
    RateLimitInternal(String),
}

impl SleeperError {
    /// The upstream failure, if this is one.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            SleeperError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

fn snippet(body: &str) -> Option<String> {
    if body.is_empty() {
        None
    } else {
        Some(body.chars().take(BODY_SNIPPET_LEN).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::new("league_id", "must not be empty");
        assert_eq!(err.to_string(), "invalid league_id: must not be empty");

        let err = UpstreamError::status(404, "null");
        assert_eq!(
            err.to_string(),
            "upstream error (HTTP 404): upstream responded with status 404"
        );

        let err = UpstreamError::timeout("deadline elapsed");
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn transient_classification() {
        assert!(UpstreamError::timeout("t").is_transient());
        assert!(UpstreamError::transport("refused").is_transient());
        assert!(UpstreamError::status(503, "").is_transient());
        assert!(!UpstreamError::status(404, "").is_transient());
        assert!(!UpstreamError::status(429, "").is_transient());
        assert!(!UpstreamError::parse("bad json", "<html>").is_transient());
    }

    #[test]
    fn snippet_is_truncated() {
        let body = "x".repeat(2000);
        let err = UpstreamError::status(500, &body);
        assert_eq!(err.body_snippet.unwrap().len(), BODY_SNIPPET_LEN);

        let err = UpstreamError::status(500, "");
        assert!(err.body_snippet.is_none());
    }

    #[test]
    fn status_code_accessor() {
        assert_eq!(UpstreamError::status(404, "").status_code(), Some(404));
        assert_eq!(UpstreamError::timeout("t").status_code(), None);
    }
}
