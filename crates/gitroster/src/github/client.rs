//! GitHub REST client over the [`HttpTransport`] boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use super::convert::{RawErrorBody, RawListedUser, RawProfile, to_basic_user, to_full_user};
use super::error::GitHubError;
use super::pagination::next_page;
use super::types::{
    ApiResponse, BasicUser, DEFAULT_API_URL, FullUser, GitHubApi, PER_PAGE, RateLimitSnapshot,
    Relation, is_valid_login,
};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpRequest, HttpResponse, HttpTransport, header_get};
use crate::import::{ImportEvent, ProgressCallback, emit};
use crate::rate_limit::ApiRateLimiter;

/// Default timeout for a single API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extract rate limit info from GitHub response headers.
pub fn parse_rate_limit_headers(headers: &HttpHeaders) -> Option<RateLimitSnapshot> {
    let limit = header_get(headers, "x-ratelimit-limit")?.parse::<usize>().ok()?;
    let remaining = header_get(headers, "x-ratelimit-remaining")?
        .parse::<usize>()
        .ok()?;
    let reset_epoch = header_get(headers, "x-ratelimit-reset")?.parse::<i64>().ok()?;
    let reset_at = DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);

    Some(RateLimitSnapshot {
        limit,
        remaining,
        reset_at,
    })
}

/// When a 403/429 is a quota rejection, compute the moment it lifts.
///
/// Primary limits report `x-ratelimit-remaining: 0`; secondary limits send
/// `retry-after` in seconds. Any other 403 is a plain permission error.
fn rate_limit_reset(resp: &HttpResponse) -> Option<DateTime<Utc>> {
    if resp.status != 403 && resp.status != 429 {
        return None;
    }

    if let Some(secs) = resp
        .header("retry-after")
        .and_then(|v| v.trim().parse::<i64>().ok())
    {
        return Some(Utc::now() + chrono::Duration::seconds(secs));
    }

    let exhausted = resp.header("x-ratelimit-remaining") == Some("0");
    if exhausted || resp.status == 429 {
        let reset = parse_rate_limit_headers(&resp.headers)
            .map(|snapshot| snapshot.reset_at)
            .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(1));
        return Some(reset);
    }

    None
}

/// Map a non-success response to a [`GitHubError`].
fn error_for_status(resp: &HttpResponse, resource: &str) -> GitHubError {
    if let Some(reset_at) = rate_limit_reset(resp) {
        return GitHubError::RateLimited { reset_at };
    }

    match resp.status {
        404 => GitHubError::not_found(resource),
        401 => GitHubError::AuthRequired,
        status => {
            let body: RawErrorBody = serde_json::from_slice(&resp.body).unwrap_or_default();
            GitHubError::Api {
                status,
                message: if body.message.is_empty() {
                    format!("request for {resource} failed")
                } else {
                    body.message
                },
            }
        }
    }
}

fn decode<T: DeserializeOwned>(resp: &HttpResponse, resource: &str) -> Result<T, GitHubError> {
    serde_json::from_slice(&resp.body)
        .map_err(|e| GitHubError::decode(format!("{resource}: {e}")))
}

/// GitHub API client implementing [`GitHubApi`].
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    /// API base URL without trailing slash.
    api_url: Arc<String>,
    token: Option<Arc<String>>,
    timeout: Duration,
    /// Paces listing pages after the first; the caller paces the call itself.
    page_limiter: Option<ApiRateLimiter>,
}

impl GitHubClient {
    /// Create a client backed by reqwest.
    ///
    /// `token` is optional: unauthenticated calls work but get a much smaller quota.
    pub fn new(token: Option<&str>, timeout: Duration) -> Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(timeout)?;
        Ok(Self::with_transport(Arc::new(transport))
            .with_token(token)
            .with_timeout(timeout))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            api_url: Arc::new(DEFAULT_API_URL.to_string()),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            page_limiter: None,
        }
    }

    /// Point the client at another API root (GitHub Enterprise uses `https://host/api/v3`).
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = Arc::new(api_url.trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        self.token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Arc::new(t.to_string()));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait on `limiter` before every listing page but the first.
    #[must_use]
    pub fn with_page_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.page_limiter = Some(limiter);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Send a request with the per-call timeout applied.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, GitHubError> {
        let url = request.url.clone();
        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GitHubError::Timeout {
                url,
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    /// Authenticated GET against the API; non-2xx statuses become errors.
    async fn api_get(&self, url: &str, resource: &str) -> Result<HttpResponse, GitHubError> {
        let mut request = HttpRequest::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "gitroster");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token.as_str()));
        }

        let resp = self.send(request).await?;
        if resp.is_success() {
            Ok(resp)
        } else {
            let err = error_for_status(&resp, resource);
            tracing::debug!(url, status = resp.status, error = %err, "GitHub request failed");
            Err(err)
        }
    }

    fn connections_url(&self, username: &str, relation: Relation, page: u32) -> String {
        format!(
            "{}/users/{}/{}?per_page={}&page={}",
            self.api_url,
            username,
            relation.as_path(),
            PER_PAGE,
            page
        )
    }

    fn profile_url(&self, username: &str) -> String {
        format!("{}/users/{}", self.api_url, username)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_connections(
        &self,
        username: &str,
        relation: Relation,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<ApiResponse<Vec<BasicUser>>, GitHubError> {
        if !is_valid_login(username) {
            return Err(GitHubError::not_found(format!("user {username}")));
        }

        let resource = format!("{username}/{relation}");
        let mut all_users = Vec::new();
        let mut rate_limit = None;
        let mut page = 1u32;

        loop {
            if page > 1
                && let Some(limiter) = &self.page_limiter
            {
                limiter.wait().await;
            }
            let url = self.connections_url(username, relation, page);
            let resp = self.api_get(&url, &resource).await?;
            rate_limit = parse_rate_limit_headers(&resp.headers).or(rate_limit);

            let users: Vec<RawListedUser> = decode(&resp, &resource)?;
            let count = users.len();
            all_users.extend(users.into_iter().map(to_basic_user));

            emit(
                on_progress,
                ImportEvent::ListedPage {
                    username: username.to_string(),
                    relation,
                    page,
                    count,
                    total_so_far: all_users.len(),
                },
            );

            match next_page(page, resp.header("link"), count, PER_PAGE) {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(ApiResponse {
            data: all_users,
            rate_limit,
        })
    }

    async fn get_profile(&self, username: &str) -> Result<ApiResponse<FullUser>, GitHubError> {
        if !is_valid_login(username) {
            return Err(GitHubError::not_found(format!("user {username}")));
        }

        let resource = format!("user {username}");
        let resp = self.api_get(&self.profile_url(username), &resource).await?;
        let raw: RawProfile = decode(&resp, &resource)?;

        Ok(ApiResponse {
            data: to_full_user(raw),
            rate_limit: parse_rate_limit_headers(&resp.headers),
        })
    }

    async fn fetch_avatar_bytes(&self, url: &str) -> Option<Vec<u8>> {
        // Avatars live on a CDN host, so the API token is not sent along.
        let request = HttpRequest::get(url).header("User-Agent", "gitroster");
        match self.send(request).await {
            Ok(resp) if resp.is_success() && !resp.body.is_empty() => Some(resp.body),
            Ok(resp) => {
                tracing::debug!(url, status = resp.status, "Avatar download returned no image");
                None
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "Avatar download failed");
                None
            }
        }
    }
}
