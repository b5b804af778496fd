//! Proactive request pacing with `governor`.
//!
//! GitHub's quota is enforced server-side; pacing keeps a long crawl from
//! burning through it in a burst.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::github::{
    ApiResponse, BasicUser, FullUser, GitHubApi, GitHubClient, GitHubError, Relation,
};
use crate::import::ProgressCallback;

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub allows 5000 requests/hour authenticated; 10/sec leaves room for bursts.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

fn quota(requests_per_second: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
}

/// A standalone API rate limiter.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(10);
/// limiter.wait().await;
/// client.get_profile("octocat").await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter; `0` is treated as 1 request per second.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(quota(requests_per_second))),
        }
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }

    #[cfg(test)]
    pub(crate) fn has_capacity(&self) -> bool {
        self.inner.check().is_ok()
    }
}

/// A rate-limited wrapper around any [`GitHubApi`].
///
/// Every API call waits on the shared limiter before delegating. A listing
/// is one call here; its later pages are paced only when the inner client
/// shares the limiter, as [`RateLimitedApi::github`] arranges. Avatar
/// downloads hit the CDN rather than the API and are not paced.
pub struct RateLimitedApi<C> {
    inner: C,
    limiter: ApiRateLimiter,
}

impl<C> RateLimitedApi<C> {
    pub fn new(inner: C, requests_per_second: u32) -> Self {
        Self {
            inner,
            limiter: ApiRateLimiter::new(requests_per_second),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl RateLimitedApi<GitHubClient> {
    /// Pace a GitHub client, including every page of a listing.
    pub fn github(client: GitHubClient, requests_per_second: u32) -> Self {
        let limiter = ApiRateLimiter::new(requests_per_second);
        Self {
            inner: client.with_page_limiter(limiter.clone()),
            limiter,
        }
    }
}

impl<C: Clone> Clone for RateLimitedApi<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<C: GitHubApi> GitHubApi for RateLimitedApi<C> {
    async fn list_connections(
        &self,
        username: &str,
        relation: Relation,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<ApiResponse<Vec<BasicUser>>, GitHubError> {
        self.limiter.wait().await;
        self.inner
            .list_connections(username, relation, on_progress)
            .await
    }

    async fn get_profile(&self, username: &str) -> Result<ApiResponse<FullUser>, GitHubError> {
        self.limiter.wait().await;
        self.inner.get_profile(username).await
    }

    async fn fetch_avatar_bytes(&self, url: &str) -> Option<Vec<u8>> {
        self.inner.fetch_avatar_bytes(url).await
    }
}
