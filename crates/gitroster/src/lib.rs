//! gitroster - import GitHub connections into a community directory.
//!
//! A seed user's following and/or followers are listed, their full profiles
//! resolved in small rate-limit-aware batches, and a chosen subset committed
//! as unpublished people. Progress is persisted between batches so a long
//! crawl survives restarts and can be paused, resumed or reset.
//!
//! # Features
//!
//! - `sqlite` (default) / `postgres` - database backends.
//! - `migrate` (default) - schema migrations and [`connect_and_migrate`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gitroster::commit::Collaborators;
//! use gitroster::directory::{FsImageStore, SqlDirectory};
//! use gitroster::github::GitHubClient;
//! use gitroster::import::{DbProgressStore, ImportController, ImportMode};
//!
//! let db = gitroster::connect_and_migrate("sqlite://gitroster.db?mode=rwc").await?;
//! let directory = Arc::new(SqlDirectory::new(db.clone()));
//! let controller = ImportController::new(
//!     Arc::new(GitHubClient::new(Some(&token), Duration::from_secs(30))?),
//!     Arc::new(DbProgressStore::new(db)),
//!     Collaborators::new(directory.clone(), directory, Arc::new(FsImageStore::new("images"))),
//! );
//!
//! controller.start("octocat", ImportMode::Following).await?;
//! let progress = controller.continue_batch().await?;
//! ```

pub mod commit;
pub mod db;
pub mod directory;
pub mod entity;
pub mod github;
pub mod http;
pub mod import;
pub mod rate_limit;
pub mod retry;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use github::{GitHubApi, GitHubClient, GitHubError};
pub use import::{
    ImportController, ImportError, ImportEvent, ImportMode, ImportOptions, ImportProgress,
    ImportStatus,
};
pub use rate_limit::{ApiRateLimiter, RateLimitedApi};
