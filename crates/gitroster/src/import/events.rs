//! Progress events emitted while an import runs.
//!
//! The CLI turns these into log lines or progress bars; the library never
//! prints anything itself.

use chrono::{DateTime, Utc};

use super::progress::{ImportMode, ImportStatus};
use crate::github::Relation;

/// Progress events emitted during import operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ImportEvent {
    /// A new crawl was started.
    JobStarted {
        username: String,
        mode: ImportMode,
    },

    /// Starting to list one relation of the seed user.
    ListingConnections {
        username: String,
        relation: Relation,
    },

    /// Fetched one page of a listing.
    ListedPage {
        username: String,
        relation: Relation,
        /// Page number (1-indexed).
        page: u32,
        count: usize,
        /// Running total for this relation.
        total_so_far: usize,
    },

    /// Listing phase finished; `total` is after deduplication.
    ListingComplete {
        username: String,
        total: usize,
    },

    /// A listing call failed transiently and will be retried.
    ListingRetry {
        /// What was being listed, e.g. `alice/following`.
        context: String,
        attempt: u32,
        retry_after_ms: u64,
        message: String,
    },

    /// Resolved one full profile.
    FetchedProfile {
        login: String,
        fetched: usize,
        total: usize,
    },

    /// A profile could not be resolved; the handle was skipped.
    ProfileError {
        login: String,
        message: String,
    },

    /// The quota is (nearly) exhausted; work resumes after `reset_at`.
    RateLimitWait {
        remaining: usize,
        reset_at: Option<DateTime<Utc>>,
    },

    /// One `continue` call finished.
    BatchComplete {
        /// Handles processed by this batch (resolved or skipped).
        processed: usize,
        fetched: usize,
        total: usize,
    },

    /// Every handle has been processed.
    JobCompleted {
        total: usize,
        profiles: usize,
        skipped: usize,
    },

    /// The crawl hit a fatal error.
    JobFailed {
        message: String,
    },

    /// Status changed through pause, resume or reset.
    StatusChanged {
        from: ImportStatus,
        to: ImportStatus,
    },

    /// A person was created by the commit step.
    Committed {
        login: String,
        name: String,
        company: Option<String>,
    },

    /// A profile was not committed because the person already exists.
    CommitSkipped {
        login: String,
        reason: String,
    },

    /// Committing one profile failed (or partially failed, e.g. its avatar).
    CommitError {
        login: String,
        message: String,
    },

    /// Non-fatal condition worth surfacing.
    Warning {
        message: String,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(ImportEvent) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: ImportEvent) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
