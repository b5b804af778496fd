//! One step of the import: list connections, or resolve the next slice of profiles.

use std::collections::HashSet;

use chrono::Utc;

use super::events::{ImportEvent, ProgressCallback, emit};
use super::progress::{ImportProgress, ImportStatus};
use super::types::ImportOptions;
use crate::github::{BasicUser, GitHubApi, GitHubError, same_login, short_error_message};
use crate::retry::with_retry;

/// Advance `progress` by one batch and return the new record.
///
/// Records that are not running, stale, or still waiting for the quota reset
/// come back unchanged. The first batch of a run lists the seed user's
/// connections; every later batch resolves up to `options.batch_size`
/// profiles. Per-user failures are recorded and skipped; only a listing
/// failure moves the job to `error`.
pub async fn process_batch<A>(
    api: &A,
    mut progress: ImportProgress,
    options: &ImportOptions,
    on_progress: Option<&ProgressCallback>,
) -> ImportProgress
where
    A: GitHubApi + ?Sized,
{
    if progress.status != ImportStatus::Running || progress.is_stale() {
        return progress;
    }

    let now = Utc::now();
    if progress.waiting_for_rate_limit
        && let Some(reset) = progress.rate_limit_reset
        && now < reset
    {
        return progress;
    }

    // The quota window has rolled over; the old snapshot no longer applies.
    if progress.rate_limit_reset.is_some_and(|reset| reset <= now) {
        progress.rate_limit_remaining = None;
    }
    progress.waiting_for_rate_limit = false;

    if progress.listed {
        fetch_profiles(api, &mut progress, options, on_progress).await;
    } else {
        list_handles(api, &mut progress, options, on_progress).await;
    }

    progress.updated_at = Some(Utc::now());
    progress
}

async fn list_handles<A>(
    api: &A,
    progress: &mut ImportProgress,
    options: &ImportOptions,
    on_progress: Option<&ProgressCallback>,
) where
    A: GitHubApi + ?Sized,
{
    let Some(username) = progress.source_username.clone() else {
        return;
    };

    let mut seen = HashSet::new();
    let mut handles: Vec<BasicUser> = Vec::new();

    for &relation in progress.mode.relations() {
        emit(
            on_progress,
            ImportEvent::ListingConnections {
                username: username.clone(),
                relation,
            },
        );

        let context = format!("{username}/{relation}");
        let result = with_retry(
            || api.list_connections(&username, relation, on_progress),
            |e: &GitHubError| e.is_transient(),
            |e: &GitHubError| short_error_message(e),
            &context,
            &options.retry,
            on_progress,
        )
        .await;

        match result {
            Ok(response) => {
                if let Some(snapshot) = &response.rate_limit {
                    progress.record_snapshot(snapshot);
                }
                for user in response.data {
                    if seen.insert(user.login.to_ascii_lowercase()) {
                        handles.push(user);
                    }
                }
            }
            Err(GitHubError::RateLimited { reset_at }) => {
                tracing::warn!(%context, %reset_at, "Rate limited while listing connections");
                progress.waiting_for_rate_limit = true;
                progress.rate_limit_remaining = Some(0);
                progress.rate_limit_reset = Some(reset_at);
                emit(
                    on_progress,
                    ImportEvent::RateLimitWait {
                        remaining: 0,
                        reset_at: Some(reset_at),
                    },
                );
                return;
            }
            Err(e) => {
                let message = format!("Failed to list {context}: {}", short_error_message(&e));
                tracing::error!("{}", message);
                progress.fail(message.clone());
                emit(on_progress, ImportEvent::JobFailed { message });
                return;
            }
        }
    }

    if handles.is_empty() {
        let message = format!("{username} has no {} to import", progress.mode);
        tracing::warn!("{}", message);
        progress.fail(message.clone());
        emit(on_progress, ImportEvent::JobFailed { message });
        return;
    }

    progress.total_users = handles.len();
    progress.handles = handles;
    progress.listed = true;
    progress.last_error = None;

    tracing::info!(
        username = %username,
        mode = %progress.mode,
        total = progress.total_users,
        "Listed connections"
    );
    emit(
        on_progress,
        ImportEvent::ListingComplete {
            username,
            total: progress.total_users,
        },
    );
}

async fn fetch_profiles<A>(
    api: &A,
    progress: &mut ImportProgress,
    options: &ImportOptions,
    on_progress: Option<&ProgressCallback>,
) where
    A: GitHubApi + ?Sized,
{
    let batch = progress.pending_handles(options.batch_size);
    let mut processed = 0usize;

    for handle in batch {
        if let Some(remaining) = progress.rate_limit_remaining
            && remaining <= options.rate_limit_threshold
        {
            tracing::info!(
                remaining,
                reset_at = ?progress.rate_limit_reset,
                "Quota nearly exhausted, pausing batch"
            );
            progress.waiting_for_rate_limit = true;
            emit(
                on_progress,
                ImportEvent::RateLimitWait {
                    remaining,
                    reset_at: progress.rate_limit_reset,
                },
            );
            break;
        }

        match api.get_profile(&handle.login).await {
            Ok(response) => {
                if let Some(snapshot) = &response.rate_limit {
                    progress.record_snapshot(snapshot);
                }
                let mut profile = response.data;
                // Keep the listed handle so `handles` and `profiles` stay in step.
                if !same_login(&profile.login, &handle.login) {
                    tracing::debug!(listed = %handle.login, returned = %profile.login, "Profile login differs from listing");
                    profile.login = handle.login.clone();
                }
                if progress.record_profile(profile) {
                    emit(
                        on_progress,
                        ImportEvent::FetchedProfile {
                            login: handle.login.clone(),
                            fetched: progress.fetched_profiles,
                            total: progress.total_users,
                        },
                    );
                }
                processed += 1;
            }
            Err(GitHubError::RateLimited { reset_at }) => {
                tracing::warn!(login = %handle.login, %reset_at, "Rate limited while fetching profile");
                progress.waiting_for_rate_limit = true;
                progress.rate_limit_remaining = Some(0);
                progress.rate_limit_reset = Some(reset_at);
                emit(
                    on_progress,
                    ImportEvent::RateLimitWait {
                        remaining: 0,
                        reset_at: Some(reset_at),
                    },
                );
                break;
            }
            Err(e) => {
                let message = short_error_message(&e);
                tracing::warn!(login = %handle.login, error = %message, "Skipping profile");
                progress.record_failure(&handle.login, message.clone(), Utc::now());
                emit(
                    on_progress,
                    ImportEvent::ProfileError {
                        login: handle.login.clone(),
                        message,
                    },
                );
                processed += 1;
            }
        }
    }

    emit(
        on_progress,
        ImportEvent::BatchComplete {
            processed,
            fetched: progress.fetched_profiles,
            total: progress.total_users,
        },
    );

    if progress.is_done() {
        progress.status = ImportStatus::Completed;
        progress.waiting_for_rate_limit = false;
        tracing::info!(
            total = progress.total_users,
            profiles = progress.profiles.len(),
            skipped = progress.skipped.len(),
            "Import completed"
        );
        emit(
            on_progress,
            ImportEvent::JobCompleted {
                total: progress.total_users,
                profiles: progress.profiles.len(),
                skipped: progress.skipped.len(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{ApiResponse, FullUser, RateLimitSnapshot, Relation};
    use crate::import::ImportMode;
    use crate::retry::RetryConfig;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted GitHub fake: connections per relation, per-login profile results.
    #[derive(Default)]
    struct FakeApi {
        following: Vec<&'static str>,
        followers: Vec<&'static str>,
        list_error: Mutex<Vec<GitHubError>>,
        failures: HashMap<&'static str, fn() -> GitHubError>,
        /// Remaining quota reported on each successful profile call.
        remaining: Mutex<Vec<usize>>,
        reset_at: Option<DateTime<Utc>>,
        profile_calls: Mutex<Vec<String>>,
    }

    fn basic(login: &str) -> BasicUser {
        BasicUser {
            login: login.into(),
            name: None,
            html_url: format!("https://github.com/{login}"),
            avatar_url: format!("https://avatars.test/{login}"),
        }
    }

    fn full(login: &str) -> FullUser {
        FullUser {
            login: login.into(),
            name: Some(login.to_uppercase()),
            html_url: format!("https://github.com/{login}"),
            avatar_url: format!("https://avatars.test/{login}"),
            bio: None,
            company: None,
            blog: None,
            location: None,
            public_repos: 1,
            followers: 0,
            following: 0,
        }
    }

    #[async_trait]
    impl GitHubApi for FakeApi {
        async fn list_connections(
            &self,
            _username: &str,
            relation: Relation,
            _on_progress: Option<&ProgressCallback>,
        ) -> Result<ApiResponse<Vec<BasicUser>>, GitHubError> {
            if let Some(err) = self.list_error.lock().unwrap().pop() {
                return Err(err);
            }
            let logins = match relation {
                Relation::Following => &self.following,
                Relation::Followers => &self.followers,
            };
            Ok(ApiResponse {
                data: logins.iter().map(|l| basic(l)).collect(),
                rate_limit: None,
            })
        }

        async fn get_profile(&self, username: &str) -> Result<ApiResponse<FullUser>, GitHubError> {
            self.profile_calls.lock().unwrap().push(username.to_string());
            if let Some(make_err) = self.failures.get(username) {
                return Err(make_err());
            }
            let remaining = {
                let mut remaining = self.remaining.lock().unwrap();
                if remaining.is_empty() {
                    None
                } else {
                    Some(remaining.remove(0))
                }
            };
            Ok(ApiResponse {
                data: full(username),
                rate_limit: remaining.map(|remaining| RateLimitSnapshot {
                    limit: 60,
                    remaining,
                    reset_at: self.reset_at.unwrap_or_else(|| Utc::now() + Duration::hours(1)),
                }),
            })
        }

        async fn fetch_avatar_bytes(&self, _url: &str) -> Option<Vec<u8>> {
            None
        }
    }

    fn options() -> ImportOptions {
        ImportOptions::default().with_retry(RetryConfig::disabled())
    }

    fn running(mode: ImportMode) -> ImportProgress {
        ImportProgress::started("alice", mode, Utc::now())
    }

    #[tokio::test]
    async fn non_running_records_are_unchanged() {
        let api = FakeApi::default();
        for status in [
            ImportStatus::Idle,
            ImportStatus::Paused,
            ImportStatus::Completed,
            ImportStatus::Error,
        ] {
            let mut progress = running(ImportMode::Following);
            progress.status = status;
            let out = process_batch(&api, progress.clone(), &options(), None).await;
            assert_eq!(out, progress);
        }
    }

    #[tokio::test]
    async fn stale_record_is_unchanged() {
        let api = FakeApi::default();
        let mut progress = running(ImportMode::Following);
        progress.source_username = None;
        let out = process_batch(&api, progress.clone(), &options(), None).await;
        assert_eq!(out, progress);
    }

    #[tokio::test]
    async fn first_batch_only_lists() {
        let api = FakeApi {
            following: vec!["bob", "carol", "dave"],
            ..FakeApi::default()
        };

        let out = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        assert_eq!(out.status, ImportStatus::Running);
        assert!(out.listed);
        assert_eq!(out.total_users, 3);
        assert!(out.profiles.is_empty());
        assert_eq!(out.fetched_profiles, 0);
        assert!(api.profile_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn both_mode_dedups_across_relations() {
        let api = FakeApi {
            following: vec!["bob", "carol"],
            followers: vec!["Carol", "dave"],
            ..FakeApi::default()
        };

        let out = process_batch(&api, running(ImportMode::Both), &options(), None).await;
        let logins: Vec<_> = out.handles.iter().map(|h| h.login.as_str()).collect();
        assert_eq!(logins, vec!["bob", "carol", "dave"]);
        assert_eq!(out.total_users, 3);
    }

    #[tokio::test]
    async fn empty_listing_is_an_error() {
        let api = FakeApi::default();
        let out = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        assert_eq!(out.status, ImportStatus::Error);
        assert!(out.last_error.unwrap().contains("alice"));
        assert_eq!(out.total_users, 0);
    }

    #[tokio::test]
    async fn listing_not_found_fails_job() {
        let api = FakeApi {
            following: vec!["bob"],
            list_error: Mutex::new(vec![GitHubError::not_found("user alice")]),
            ..FakeApi::default()
        };
        let out = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        assert_eq!(out.status, ImportStatus::Error);
        assert!(out.last_error.unwrap().starts_with("Failed to list alice/following"));
    }

    #[tokio::test]
    async fn listing_rate_limit_waits_without_failing() {
        let reset_at = Utc::now() + Duration::minutes(30);
        let api = FakeApi {
            following: vec!["bob"],
            list_error: Mutex::new(vec![GitHubError::RateLimited { reset_at }]),
            ..FakeApi::default()
        };
        let out = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        assert_eq!(out.status, ImportStatus::Running);
        assert!(out.waiting_for_rate_limit);
        assert!(!out.listed);
        assert_eq!(out.rate_limit_reset, Some(reset_at));
        assert_eq!(out.rate_limit_remaining, Some(0));
    }

    #[tokio::test]
    async fn transient_listing_failure_is_retried() {
        let api = FakeApi {
            following: vec!["bob"],
            list_error: Mutex::new(vec![GitHubError::network("connection reset")]),
            ..FakeApi::default()
        };
        let retrying = ImportOptions::default().with_retry(
            RetryConfig::new(
                std::time::Duration::from_millis(1),
                std::time::Duration::from_millis(1),
                2,
            )
            .with_jitter(false),
        );
        let out = process_batch(&api, running(ImportMode::Following), &retrying, None).await;
        assert!(out.listed);
        assert_eq!(out.total_users, 1);
    }

    #[tokio::test]
    async fn batches_resolve_profiles_until_completed() {
        let api = FakeApi {
            following: vec!["u1", "u2", "u3", "u4", "u5", "u6", "u7"],
            ..FakeApi::default()
        };

        let mut progress = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        progress = process_batch(&api, progress, &options(), None).await;
        assert_eq!(progress.fetched_profiles, 5);
        assert_eq!(progress.status, ImportStatus::Running);

        progress = process_batch(&api, progress, &options(), None).await;
        assert_eq!(progress.fetched_profiles, 7);
        assert_eq!(progress.status, ImportStatus::Completed);

        let again = process_batch(&api, progress.clone(), &options(), None).await;
        assert_eq!(again, progress);
    }

    #[tokio::test]
    async fn per_user_failures_are_counted_and_skipped() {
        let mut failures: HashMap<&'static str, fn() -> GitHubError> = HashMap::new();
        failures.insert("carol", || GitHubError::not_found("user carol"));
        let api = FakeApi {
            following: vec!["bob", "carol", "dave"],
            failures,
            ..FakeApi::default()
        };

        let mut progress = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        progress = process_batch(&api, progress, &options(), None).await;

        assert_eq!(progress.status, ImportStatus::Completed);
        assert_eq!(progress.error_count, 1);
        assert_eq!(progress.errors[0].login, "carol");
        assert_eq!(progress.skipped, vec!["carol".to_string()]);
        let logins: Vec<_> = progress.profiles.iter().map(|p| p.login.as_str()).collect();
        assert_eq!(logins, vec!["bob", "dave"]);
        assert_eq!(progress.fetched_profiles, 3);
    }

    #[tokio::test]
    async fn stops_early_when_quota_reaches_threshold() {
        let api = FakeApi {
            following: vec!["u1", "u2", "u3", "u4", "u5"],
            remaining: Mutex::new(vec![7, 5, 4]),
            ..FakeApi::default()
        };

        let mut progress = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        progress = process_batch(&api, progress, &options(), None).await;

        // 7 > 5 lets the second call through; 5 <= 5 stops before the third.
        assert_eq!(progress.fetched_profiles, 2);
        assert!(progress.waiting_for_rate_limit);
        assert_eq!(progress.rate_limit_remaining, Some(5));
        assert_eq!(api.profile_calls.lock().unwrap().len(), 2);

        // Before the reset nothing happens.
        let again = process_batch(&api, progress.clone(), &options(), None).await;
        assert_eq!(again, progress);
    }

    #[tokio::test]
    async fn waiting_clears_once_reset_has_passed() {
        let api = FakeApi {
            following: vec!["u1", "u2"],
            ..FakeApi::default()
        };

        let mut progress = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        progress.waiting_for_rate_limit = true;
        progress.rate_limit_remaining = Some(0);
        progress.rate_limit_reset = Some(Utc::now() - Duration::seconds(1));

        let out = process_batch(&api, progress, &options(), None).await;
        assert!(!out.waiting_for_rate_limit);
        assert_eq!(out.fetched_profiles, 2);
        assert_eq!(out.status, ImportStatus::Completed);
    }

    #[tokio::test]
    async fn rate_limited_profile_is_not_counted() {
        let mut failures: HashMap<&'static str, fn() -> GitHubError> = HashMap::new();
        failures.insert("u2", || GitHubError::RateLimited {
            reset_at: Utc::now() + Duration::hours(1),
        });
        let api = FakeApi {
            following: vec!["u1", "u2", "u3"],
            failures,
            ..FakeApi::default()
        };

        let mut progress = process_batch(&api, running(ImportMode::Following), &options(), None).await;
        progress = process_batch(&api, progress, &options(), None).await;

        assert_eq!(progress.fetched_profiles, 1);
        assert_eq!(progress.error_count, 0);
        assert!(progress.waiting_for_rate_limit);
        assert_eq!(progress.rate_limit_remaining, Some(0));
        assert_eq!(progress.status, ImportStatus::Running);
    }
}
