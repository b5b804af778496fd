//! The persisted import record and its state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::MAX_LOGGED_ERRORS;
use crate::github::{BasicUser, FullUser, RateLimitSnapshot, Relation, same_login};

/// Lifecycle state of the import job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

impl ImportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportStatus::Idle => "idle",
            ImportStatus::Running => "running",
            ImportStatus::Paused => "paused",
            ImportStatus::Completed => "completed",
            ImportStatus::Error => "error",
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ImportStatus::Idle),
            "running" => Ok(ImportStatus::Running),
            "paused" => Ok(ImportStatus::Paused),
            "completed" => Ok(ImportStatus::Completed),
            "error" => Ok(ImportStatus::Error),
            other => Err(format!("unknown import status: {other}")),
        }
    }
}

/// Which connections of the seed user to import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Following,
    Followers,
    Both,
}

impl ImportMode {
    /// Relations to list, in listing order.
    pub fn relations(self) -> &'static [Relation] {
        match self {
            ImportMode::Following => &[Relation::Following],
            ImportMode::Followers => &[Relation::Followers],
            ImportMode::Both => &[Relation::Following, Relation::Followers],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::Following => "following",
            ImportMode::Followers => "followers",
            ImportMode::Both => "both",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "following" => Ok(ImportMode::Following),
            "followers" => Ok(ImportMode::Followers),
            "both" => Ok(ImportMode::Both),
            other => Err(format!("unknown import mode: {other}")),
        }
    }
}

/// A profile that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileError {
    pub login: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// State of the single GitHub connections import.
///
/// `fetched_profiles` counts both resolved profiles and skipped handles, so
/// the job completes even when some profiles are permanently unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportProgress {
    /// Identity of the current run; changes on every `start`.
    pub job_id: Option<Uuid>,
    pub status: ImportStatus,
    pub source_username: Option<String>,
    pub mode: ImportMode,
    pub total_users: usize,
    /// Deduplicated handles found by the listing phase.
    pub handles: Vec<BasicUser>,
    /// Whether the listing phase has finished.
    pub listed: bool,
    pub profiles: Vec<FullUser>,
    /// Handles that failed permanently.
    pub skipped: Vec<String>,
    pub fetched_profiles: usize,
    pub error_count: usize,
    /// Most recent per-user failures, capped at [`MAX_LOGGED_ERRORS`].
    pub errors: Vec<ProfileError>,
    pub last_error: Option<String>,
    pub rate_limit_remaining: Option<usize>,
    pub rate_limit_reset: Option<DateTime<Utc>>,
    pub waiting_for_rate_limit: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ImportProgress {
    /// The record with no job.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A freshly started run for `username`.
    pub fn started(username: &str, mode: ImportMode, now: DateTime<Utc>) -> Self {
        Self {
            job_id: Some(Uuid::new_v4()),
            status: ImportStatus::Running,
            source_username: Some(username.to_string()),
            mode,
            started_at: Some(now),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Running or paused.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ImportStatus::Running | ImportStatus::Paused)
    }

    /// Active but with its seed user lost: only `reset` can recover it.
    pub fn is_stale(&self) -> bool {
        self.is_active() && self.source_username.is_none()
    }

    /// Every discovered handle has been resolved or skipped.
    pub fn is_done(&self) -> bool {
        self.listed && self.total_users > 0 && self.fetched_profiles >= self.total_users
    }

    pub fn has_profile(&self, login: &str) -> bool {
        self.profiles.iter().any(|p| same_login(&p.login, login))
    }

    pub fn is_skipped(&self, login: &str) -> bool {
        self.skipped.iter().any(|s| same_login(s, login))
    }

    pub fn find_profile(&self, login: &str) -> Option<&FullUser> {
        self.profiles.iter().find(|p| same_login(&p.login, login))
    }

    /// Next `limit` handles that are neither resolved nor skipped, in listing order.
    pub fn pending_handles(&self, limit: usize) -> Vec<BasicUser> {
        self.handles
            .iter()
            .filter(|h| !self.has_profile(&h.login) && !self.is_skipped(&h.login))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Percentage of handles processed, `0.0` before listing.
    pub fn percent_complete(&self) -> f64 {
        if self.total_users == 0 {
            0.0
        } else {
            (self.fetched_profiles as f64 / self.total_users as f64) * 100.0
        }
    }

    /// Remember the quota observed on the latest response.
    pub fn record_snapshot(&mut self, snapshot: &RateLimitSnapshot) {
        self.rate_limit_remaining = Some(snapshot.remaining);
        self.rate_limit_reset = Some(snapshot.reset_at);
    }

    /// Append a resolved profile. Returns `false` for a handle already present.
    pub fn record_profile(&mut self, profile: FullUser) -> bool {
        if self.has_profile(&profile.login) {
            return false;
        }
        self.profiles.push(profile);
        self.fetched_profiles += 1;
        true
    }

    /// Count a permanent per-user failure and skip the handle.
    pub fn record_failure(&mut self, login: &str, message: String, at: DateTime<Utc>) {
        self.error_count += 1;
        self.errors.push(ProfileError {
            login: login.to_string(),
            message,
            at,
        });
        if self.errors.len() > MAX_LOGGED_ERRORS {
            let excess = self.errors.len() - MAX_LOGGED_ERRORS;
            self.errors.drain(..excess);
        }
        if !self.is_skipped(login) {
            self.skipped.push(login.to_string());
            self.fetched_profiles += 1;
        }
    }

    /// Move to `error` with a fatal message.
    pub fn fail(&mut self, message: String) {
        self.status = ImportStatus::Error;
        self.waiting_for_rate_limit = false;
        self.last_error = Some(message);
    }
}
