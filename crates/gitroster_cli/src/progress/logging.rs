use gitroster::import::ImportEvent;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: ImportEvent) {
        match event {
            ImportEvent::JobStarted { username, mode } => {
                tracing::info!(username = %username, mode = %mode, "Import started");
            }

            ImportEvent::ListingConnections { username, relation } => {
                tracing::info!(username = %username, relation = %relation, "Listing connections");
            }

            ImportEvent::ListedPage {
                username,
                relation,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(username = %username, relation = %relation, page, count, total_so_far, "Listed page");
            }

            ImportEvent::ListingComplete { username, total } => {
                tracing::info!(username = %username, total, "Listing complete");
            }

            ImportEvent::ListingRetry {
                context,
                attempt,
                retry_after_ms,
                message,
            } => {
                tracing::warn!(
                    context = %context,
                    attempt,
                    retry_after_ms,
                    error = %message,
                    "Listing failed, retrying"
                );
            }

            ImportEvent::FetchedProfile {
                login,
                fetched,
                total,
            } => {
                tracing::debug!(login = %login, fetched, total, "Fetched profile");
            }

            ImportEvent::ProfileError { login, message } => {
                tracing::warn!(login = %login, error = %message, "Skipped profile");
            }

            ImportEvent::RateLimitWait {
                remaining,
                reset_at,
            } => {
                tracing::warn!(remaining, reset_at = ?reset_at, "Rate limit reached, waiting for reset");
            }

            ImportEvent::BatchComplete {
                processed,
                fetched,
                total,
            } => {
                tracing::info!(processed, fetched, total, "Batch complete");
            }

            ImportEvent::JobCompleted {
                total,
                profiles,
                skipped,
            } => {
                tracing::info!(total, profiles, skipped, "Import completed");
            }

            ImportEvent::JobFailed { message } => {
                tracing::error!(error = %message, "Import failed");
            }

            ImportEvent::StatusChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Import status changed");
            }

            ImportEvent::Committed {
                login,
                name,
                company,
            } => {
                tracing::info!(login = %login, name = %name, company = ?company, "Created person");
            }

            ImportEvent::CommitSkipped { login, reason } => {
                tracing::info!(login = %login, reason = %reason, "Skipped commit");
            }

            ImportEvent::CommitError { login, message } => {
                tracing::warn!(login = %login, error = %message, "Commit problem");
            }

            ImportEvent::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
