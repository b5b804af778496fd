//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response body: {message}")]
    Decode { message: String },
}

impl GitHubError {
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Quota exhausted; the caller should wait until the reset.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Failures worth retrying with backoff (connection trouble, timeouts, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<HttpError> for GitHubError {
    fn from(err: HttpError) -> Self {
        GitHubError::network(err.to_string())
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps progress logs and
/// the per-user error log readable.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rate_limited() {
        let rate_limited = GitHubError::RateLimited {
            reset_at: Utc::now(),
        };
        assert!(rate_limited.is_rate_limited());
        assert!(!GitHubError::not_found("users/ghost").is_rate_limited());
        assert!(!GitHubError::AuthRequired.is_rate_limited());
    }

    #[test]
    fn test_is_transient() {
        assert!(GitHubError::network("connection reset").is_transient());
        assert!(
            GitHubError::Timeout {
                url: "https://api.github.com/users/x".into(),
                seconds: 30
            }
            .is_transient()
        );
        assert!(
            GitHubError::Api {
                status: 502,
                message: "bad gateway".into()
            }
            .is_transient()
        );
        assert!(
            !GitHubError::Api {
                status: 422,
                message: "unprocessable".into()
            }
            .is_transient()
        );
        assert!(!GitHubError::not_found("x").is_transient());
        assert!(
            !GitHubError::RateLimited {
                reset_at: Utc::now()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_http_error_maps_to_network() {
        let err: GitHubError = HttpError::Transport("dns failure".into()).into();
        assert!(matches!(err, GitHubError::Network { .. }));
        assert!(err.to_string().contains("dns failure"));
    }

    #[test]
    fn test_short_error_message_multiline() {
        let err = std::io::Error::other("first line\nsecond line");
        assert_eq!(short_error_message(&err), "first line");
    }
}
