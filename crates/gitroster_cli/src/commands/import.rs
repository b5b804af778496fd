use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use console::style;
use gitroster::commit::{Collaborators, CommitOptions, CommitReport};
use gitroster::directory::{FsImageStore, SqlDirectory};
use gitroster::github::GitHubClient;
use gitroster::import::{
    DbProgressStore, ImportController, ImportError, ImportProgress, ImportStatus,
};
use gitroster::rate_limit::RateLimitedApi;
use sea_orm::DatabaseConnection;

use crate::ImportAction;
use crate::commands::status::print_status;
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown;

/// Extra wait after a quota reset so the first request lands in the new window.
const RESET_MARGIN: Duration = Duration::from_secs(1);

const STALE_MESSAGE: &str =
    "the stored import has lost its source user; reset required (gitroster import reset)";

pub(crate) async fn handle_import(
    action: ImportAction,
    config: &Config,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let reporter = Arc::new(ProgressReporter::new());
    let controller = build_controller(config, db, &reporter)?;

    let result = run_action(action, config, &controller).await;
    reporter.finish();
    result
}

fn build_controller(
    config: &Config,
    db: DatabaseConnection,
    reporter: &Arc<ProgressReporter>,
) -> Result<ImportController, Box<dyn std::error::Error>> {
    let token = config.github_token();
    if token.is_none() {
        tracing::warn!("No GitHub token configured; anonymous requests have a small quota");
    }

    let mut client = GitHubClient::new(token.as_deref(), config.github_timeout())?;
    if let Some(api_url) = &config.github.api_url {
        client = client.with_api_url(api_url);
    }
    let api = RateLimitedApi::github(client, config.github.requests_per_second);

    let directory = Arc::new(SqlDirectory::new(db.clone()));
    let images = Arc::new(FsImageStore::new(config.images_dir()));

    Ok(ImportController::new(
        Arc::new(api),
        Arc::new(DbProgressStore::new(db)),
        Collaborators::new(directory.clone(), directory, images),
    )
    .with_options(config.import_options())
    .with_progress_callback(reporter.as_callback()))
}

async fn run_action(
    action: ImportAction,
    config: &Config,
    controller: &ImportController,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ImportAction::Start { username, mode } => {
            let progress = controller.start(&username, mode.into()).await?;
            print_summary(&progress);
        }
        ImportAction::Continue { auto } => {
            let progress = run_batches(controller, auto, config.poll_interval()).await?;
            print_summary(&progress);
        }
        ImportAction::Pause => {
            let progress = controller.pause().await?;
            print_summary(&progress);
        }
        ImportAction::Resume => {
            let progress = controller.resume().await?;
            print_summary(&progress);
        }
        ImportAction::Reset => {
            controller.reset().await?;
            println!("Import reset.");
        }
        ImportAction::Status { output, profiles } => {
            let progress = controller.get_progress().await?;
            print_status(&progress, output, profiles)?;
        }
        ImportAction::Commit {
            handles,
            all,
            download_avatars,
        } => {
            let handles = if all {
                controller
                    .get_progress()
                    .await?
                    .profiles
                    .iter()
                    .map(|p| p.login.clone())
                    .collect()
            } else {
                handles
            };
            if handles.is_empty() {
                println!("Nothing to commit.");
                return Ok(());
            }

            let options = CommitOptions {
                download_avatars: download_avatars.unwrap_or(config.import.download_avatars),
            };
            let report = controller.commit_selected(&handles, options).await?;
            print_report(&report);
        }
    }
    Ok(())
}

/// Run one batch, or keep running batches until the job stops when `auto` is set.
///
/// The auto loop sleeps `poll` between batches and until the quota reset when
/// rate limited. It ends on pause, completion, error or Ctrl+C.
async fn run_batches(
    controller: &ImportController,
    auto: bool,
    poll: Duration,
) -> Result<ImportProgress, Box<dyn std::error::Error>> {
    loop {
        let progress = match controller.continue_batch().await {
            Ok(progress) => progress,
            Err(ImportError::BatchInFlight) if auto => {
                if !shutdown::sleep_unless_shutdown(poll).await {
                    return Ok(controller.get_progress().await?);
                }
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if progress.is_stale() {
            return Err(STALE_MESSAGE.into());
        }
        if !auto || progress.status != ImportStatus::Running {
            return Ok(progress);
        }

        let wait = next_wait(&progress, poll, Utc::now());
        if progress.waiting_for_rate_limit {
            tracing::info!(wait_secs = wait.as_secs(), "Waiting for the rate limit to reset");
        }
        if !shutdown::sleep_unless_shutdown(wait).await {
            return Ok(progress);
        }
    }
}

/// How long the auto loop sleeps before the next batch.
pub(crate) fn next_wait(progress: &ImportProgress, poll: Duration, now: DateTime<Utc>) -> Duration {
    if progress.waiting_for_rate_limit
        && let Some(reset) = progress.rate_limit_reset
    {
        let until_reset = (reset - now).to_std().unwrap_or(Duration::ZERO);
        return (until_reset + RESET_MARGIN).max(poll);
    }
    poll
}

fn print_summary(progress: &ImportProgress) {
    let status = match progress.status {
        ImportStatus::Completed => style(progress.status.to_string()).green().bold(),
        ImportStatus::Error => style(progress.status.to_string()).red().bold(),
        ImportStatus::Paused => style(progress.status.to_string()).yellow().bold(),
        _ => style(progress.status.to_string()).cyan().bold(),
    };
    let source = progress.source_username.as_deref().unwrap_or("-");

    println!(
        "{status} {source} ({}): {}/{} processed, {} profiles, {} errors",
        progress.mode,
        progress.fetched_profiles,
        progress.total_users,
        progress.profiles.len(),
        progress.error_count
    );
    if progress.waiting_for_rate_limit
        && let Some(reset) = progress.rate_limit_reset
    {
        println!(
            "  rate limited until {}",
            reset.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(error) = &progress.last_error {
        println!("  {}", style(error).red());
    }
}

fn print_report(report: &CommitReport) {
    println!(
        "{} {} created, {} already present, {} errors",
        style("commit").bold(),
        report.imported.len(),
        report.skipped,
        report.errors.len()
    );
    for login in &report.imported {
        println!("  {} {login}", style("+").green());
    }
    for error in &report.errors {
        println!("  {}", style(error).red());
    }
}
