//! GitHub data structures shared by the client, the import job and the commit step.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::GitHubError;
use crate::import::ProgressCallback;

/// Page size used for list endpoints (GitHub's maximum).
pub const PER_PAGE: u32 = 100;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Direction of a connection relative to the seed user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Following,
    Followers,
}

impl Relation {
    /// Path segment of the list endpoint (`/users/{u}/{segment}`).
    pub fn as_path(self) -> &'static str {
        match self {
            Relation::Following => "following",
            Relation::Followers => "followers",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Quota snapshot read from the `x-ratelimit-*` headers of one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    /// Maximum requests allowed per window.
    pub limit: usize,
    /// Remaining requests in the current window.
    pub remaining: usize,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// A successful API call together with the quota observed on it.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    /// `None` when the server sent no rate-limit headers.
    pub rate_limit: Option<RateLimitSnapshot>,
}

/// A user as it appears in follower/following listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub html_url: String,
    pub avatar_url: String,
}

/// A fully resolved user profile (`GET /users/{login}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullUser {
    pub login: String,
    pub name: Option<String>,
    pub html_url: String,
    pub avatar_url: String,
    pub bio: Option<String>,
    /// Free-text company field, may carry `@org` references.
    pub company: Option<String>,
    /// Website as typed by the user, not necessarily a valid URL.
    pub blog: Option<String>,
    pub location: Option<String>,
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

impl FullUser {
    /// Name shown in the directory: the profile name, or the login when unset.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.login)
    }
}

/// Check whether `login` is a syntactically valid GitHub handle.
///
/// Handles are 1-39 ASCII alphanumerics or hyphens, never starting or ending
/// with a hyphen and never containing two in a row.
pub fn is_valid_login(login: &str) -> bool {
    !login.is_empty()
        && login.len() <= 39
        && login.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !login.starts_with('-')
        && !login.ends_with('-')
        && !login.contains("--")
}

/// Compare two handles the way GitHub does (case-insensitively).
#[inline]
pub fn same_login(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "following" => Ok(Relation::Following),
            "followers" => Ok(Relation::Followers),
            other => Err(format!("unknown relation: {other}")),
        }
    }
}

/// Operations the import job needs from GitHub.
///
/// Implemented by [`super::GitHubClient`] and by the pacing decorator
/// [`crate::rate_limit::RateLimitedApi`]; tests provide in-memory fakes.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// List every follower or followed account of `username`, paginating until exhausted.
    async fn list_connections(
        &self,
        username: &str,
        relation: Relation,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<ApiResponse<Vec<BasicUser>>, GitHubError>;

    /// Fetch one full profile.
    async fn get_profile(&self, username: &str) -> Result<ApiResponse<FullUser>, GitHubError>;

    /// Download an avatar image. Never fails the caller: any error yields `None`.
    async fn fetch_avatar_bytes(&self, url: &str) -> Option<Vec<u8>>;
}
