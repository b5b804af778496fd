//! The import job controller: the only way callers touch the import record.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;

use super::batch::process_batch;
use super::errors::{ImportError, Result};
use super::events::{ImportEvent, ProgressCallback, emit};
use super::progress::{ImportMode, ImportProgress, ImportStatus};
use super::store::ProgressStore;
use super::types::ImportOptions;
use crate::commit::{self, Collaborators, CommitOptions, CommitReport};
use crate::github::{GitHubApi, is_valid_login};

/// Clears the in-flight flag when the batch ends, however it ends.
struct BatchGuard<'a>(&'a AtomicBool);

impl<'a> BatchGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ImportError::BatchInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Combine a finished batch with whatever happened to the record meanwhile.
///
/// Returns `None` when the batch result must be thrown away. A pause that
/// arrived mid-batch holds only while the batch left the job running; a
/// batch that completed or failed the job keeps its terminal status.
fn merge_batch_result(current: &ImportProgress, mut result: ImportProgress) -> Option<ImportProgress> {
    if current.job_id != result.job_id || !current.is_active() {
        return None;
    }
    if current.status == ImportStatus::Paused && result.status == ImportStatus::Running {
        result.status = ImportStatus::Paused;
    }
    Some(result)
}

/// Drives the single GitHub connections import.
///
/// ```ignore
/// let controller = ImportController::new(api, store, collaborators);
/// controller.start("octocat", ImportMode::Following).await?;
/// loop {
///     let progress = controller.continue_batch().await?;
///     if progress.status != ImportStatus::Running { break; }
/// }
/// ```
pub struct ImportController {
    api: Arc<dyn GitHubApi>,
    store: Arc<dyn ProgressStore>,
    collaborators: Collaborators,
    options: ImportOptions,
    on_progress: Option<ProgressCallback>,
    /// Serializes load-modify-save cycles on the store.
    lock: Mutex<()>,
    batch_in_flight: AtomicBool,
}

impl ImportController {
    pub fn new(
        api: Arc<dyn GitHubApi>,
        store: Arc<dyn ProgressStore>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            api,
            store,
            collaborators,
            options: ImportOptions::default(),
            on_progress: None,
            lock: Mutex::new(()),
            batch_in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    fn callback(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    /// Begin a new crawl of `username`'s connections.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty or malformed login, `AlreadyActive` when a
    /// job is running or paused (including a stale one).
    pub async fn start(&self, username: &str, mode: ImportMode) -> Result<ImportProgress> {
        let username = username.trim().trim_start_matches('@');
        if username.is_empty() {
            return Err(ImportError::invalid_argument("username must not be empty"));
        }
        if !is_valid_login(username) {
            return Err(ImportError::invalid_argument(format!(
                "{username:?} is not a valid GitHub username"
            )));
        }

        let _lock = self.lock.lock().await;
        let current = self.store.load().await?;
        if current.is_active() {
            return Err(ImportError::AlreadyActive {
                username: current
                    .source_username
                    .unwrap_or_else(|| "an unknown user".to_string()),
                status: current.status.to_string(),
            });
        }

        let progress = ImportProgress::started(username, mode, Utc::now());
        self.store.save(&progress).await?;

        tracing::info!(username, %mode, job_id = ?progress.job_id, "Import started");
        emit(
            self.callback(),
            ImportEvent::JobStarted {
                username: username.to_string(),
                mode,
            },
        );
        Ok(progress)
    }

    /// Run one batch: the listing phase first, then profile slices.
    ///
    /// Returns the record unchanged when there is nothing to do (not running,
    /// stale, or waiting for the quota reset).
    ///
    /// # Errors
    /// `BatchInFlight` when another batch has not finished yet.
    pub async fn continue_batch(&self) -> Result<ImportProgress> {
        let _batch = BatchGuard::acquire(&self.batch_in_flight)?;

        let snapshot = {
            let _lock = self.lock.lock().await;
            self.store.load().await?
        };
        if snapshot.status != ImportStatus::Running {
            return Ok(snapshot);
        }
        if snapshot.is_stale() {
            tracing::warn!("Import record is stale; reset it to start over");
            emit(
                self.callback(),
                ImportEvent::Warning {
                    message: "Import record is stale; reset required".to_string(),
                },
            );
            return Ok(snapshot);
        }

        let result = process_batch(
            self.api.as_ref(),
            snapshot.clone(),
            &self.options,
            self.callback(),
        )
        .await;
        if result == snapshot {
            return Ok(snapshot);
        }

        let _lock = self.lock.lock().await;
        let current = self.store.load().await?;
        match merge_batch_result(&current, result) {
            Some(merged) => {
                self.store.save(&merged).await?;
                Ok(merged)
            }
            None => {
                tracing::info!("Import was reset while a batch ran; discarding batch result");
                Ok(current)
            }
        }
    }

    /// Pause a running job. Other states are returned unchanged.
    pub async fn pause(&self) -> Result<ImportProgress> {
        self.transition(ImportStatus::Running, ImportStatus::Paused)
            .await
    }

    /// Resume a paused job. Other states are returned unchanged.
    pub async fn resume(&self) -> Result<ImportProgress> {
        self.transition(ImportStatus::Paused, ImportStatus::Running)
            .await
    }

    async fn transition(&self, from: ImportStatus, to: ImportStatus) -> Result<ImportProgress> {
        let _lock = self.lock.lock().await;
        let mut progress = self.store.load().await?;
        if progress.status != from {
            return Ok(progress);
        }

        progress.status = to;
        progress.updated_at = Some(Utc::now());
        self.store.save(&progress).await?;

        tracing::info!(%from, %to, "Import status changed");
        emit(self.callback(), ImportEvent::StatusChanged { from, to });
        Ok(progress)
    }

    /// Drop the job, whatever its state, and return the idle record.
    pub async fn reset(&self) -> Result<ImportProgress> {
        let _lock = self.lock.lock().await;
        let previous = self.store.load().await?;
        let idle = ImportProgress::idle();
        self.store.save(&idle).await?;

        if previous.status != ImportStatus::Idle {
            tracing::info!(from = %previous.status, "Import reset");
            emit(
                self.callback(),
                ImportEvent::StatusChanged {
                    from: previous.status,
                    to: ImportStatus::Idle,
                },
            );
        }
        Ok(idle)
    }

    pub async fn get_progress(&self) -> Result<ImportProgress> {
        let _lock = self.lock.lock().await;
        Ok(self.store.load().await?)
    }

    /// Create unpublished people for the selected handles from the fetched profiles.
    ///
    /// Per-handle problems land in the report; only store or directory
    /// failures that prevent the whole commit are returned as errors.
    pub async fn commit_selected(
        &self,
        handles: &[String],
        options: CommitOptions,
    ) -> Result<CommitReport> {
        let progress = self.get_progress().await?;
        let report = commit::commit_selected(
            self.api.as_ref(),
            &progress,
            handles,
            &options,
            &self.collaborators,
            self.callback(),
        )
        .await?;

        tracing::info!(
            imported = report.imported.len(),
            skipped = report.skipped,
            errors = report.errors.len(),
            "Commit finished"
        );
        Ok(report)
    }
}
