//! GitHub API access for the following/followers import.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`types`] - Data structures and the [`GitHubApi`] trait
//! - [`client`] - reqwest-backed client, quota headers and status mapping
//! - [`pagination`] - Link-header pagination
//! - `convert` - Wire format to domain types
//!
//! ```ignore
//! use gitroster::github::{GitHubApi, GitHubClient, Relation};
//!
//! let client = GitHubClient::new(Some(&token), Duration::from_secs(30))?;
//! let listed = client.list_connections("octocat", Relation::Following, None).await?;
//! ```

mod client;
mod convert;
mod error;
mod pagination;
mod types;

pub use error::{GitHubError, short_error_message};

pub use types::{
    ApiResponse, BasicUser, DEFAULT_API_URL, FullUser, GitHubApi, PER_PAGE, RateLimitSnapshot,
    Relation, is_valid_login, same_login,
};

pub use client::{DEFAULT_TIMEOUT, GitHubClient, parse_rate_limit_headers};

pub use pagination::{LinkPagination, next_page, parse_link_header};
