//! Import tuning constants and options.

use crate::retry::RetryConfig;

/// Name of the single import job record.
pub const JOB_NAME: &str = "github-following-import";

/// Profiles resolved per `continue` call.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Stop a batch early once the remaining quota is at or below this.
pub const DEFAULT_RATE_LIMIT_THRESHOLD: usize = 5;

/// Per-user errors kept in the record; older entries are dropped.
pub const MAX_LOGGED_ERRORS: usize = 100;

/// Options for processing import batches.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub rate_limit_threshold: usize,
    /// Backoff for transient failures while listing connections.
    pub retry: RetryConfig,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            rate_limit_threshold: DEFAULT_RATE_LIMIT_THRESHOLD,
            retry: RetryConfig::default(),
        }
    }
}

impl ImportOptions {
    /// A batch size of zero would never make progress.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_rate_limit_threshold(mut self, threshold: usize) -> Self {
        self.rate_limit_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
