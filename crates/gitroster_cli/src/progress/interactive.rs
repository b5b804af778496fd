use std::sync::Mutex;

use chrono::Utc;
use console::style;
use gitroster::import::ImportEvent;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

#[derive(Default)]
struct ProgressState {
    /// Spinner for the listing phase.
    list_bar: Option<ProgressBar>,
    /// Bar over all handles for the profile phase.
    profile_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn println(&self, line: impl AsRef<str>) {
        // Falls back to plain stderr when the draw target is hidden.
        if self.multi.println(line.as_ref()).is_err() {
            eprintln!("{}", line.as_ref());
        }
    }

    fn profile_bar(&self, state: &mut ProgressState, total: usize) -> ProgressBar {
        let pb = state.profile_bar.get_or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb.set_prefix("profiles");
            pb
        });
        pb.set_length(total as u64);
        pb.clone()
    }

    pub fn handle(&self, event: ImportEvent) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            ImportEvent::JobStarted { username, mode } => {
                self.println(format!(
                    "{} importing {} of {}",
                    style("started").green().bold(),
                    mode,
                    style(&username).cyan()
                ));
            }

            ImportEvent::ListingConnections { username, relation } => {
                let bar = state.list_bar.get_or_insert_with(|| {
                    let bar = self.multi.add(ProgressBar::new_spinner());
                    bar.set_style(Self::spinner_style());
                    bar.enable_steady_tick(std::time::Duration::from_millis(100));
                    bar
                });
                bar.set_prefix(format!("{username}/{relation}"));
                bar.set_message("listing...");
            }

            ImportEvent::ListedPage {
                page, total_so_far, ..
            } => {
                if let Some(bar) = &state.list_bar {
                    bar.set_message(format!("page {page}, {total_so_far} so far"));
                }
            }

            ImportEvent::ListingComplete { username, total } => {
                if let Some(bar) = state.list_bar.take() {
                    bar.finish_with_message(format!("{total} unique connections"));
                } else {
                    self.println(format!("{username}: {total} unique connections"));
                }
                self.profile_bar(&mut state, total);
            }

            ImportEvent::ListingRetry {
                context,
                attempt,
                retry_after_ms,
                message,
            } => {
                let line = format!(
                    "{} {context} failed ({message}), retry {attempt} in {retry_after_ms}ms",
                    style("retry").yellow()
                );
                match &state.list_bar {
                    Some(bar) => bar.set_message(line),
                    None => self.println(line),
                }
            }

            ImportEvent::FetchedProfile {
                login,
                fetched,
                total,
            } => {
                let pb = self.profile_bar(&mut state, total);
                pb.set_position(fetched as u64);
                pb.set_message(login);
            }

            ImportEvent::ProfileError { login, message } => {
                self.println(format!(
                    "{} {} ({})",
                    style("skipped").yellow(),
                    login,
                    style(message).dim()
                ));
            }

            ImportEvent::RateLimitWait {
                remaining,
                reset_at,
            } => {
                let until = match reset_at {
                    Some(reset) => {
                        let secs = (reset - Utc::now()).num_seconds().max(0);
                        format!("resets in {secs}s")
                    }
                    None => "reset time unknown".to_string(),
                };
                let line = format!(
                    "{} {remaining} requests left, {until}",
                    style("rate limited").yellow().bold()
                );
                match &state.profile_bar {
                    Some(pb) => pb.set_message(line),
                    None => self.println(line),
                }
            }

            ImportEvent::BatchComplete { fetched, total, .. } => {
                if total > 0 {
                    let pb = self.profile_bar(&mut state, total);
                    pb.set_position(fetched as u64);
                }
            }

            ImportEvent::JobCompleted {
                total,
                profiles,
                skipped,
            } => {
                if let Some(pb) = state.profile_bar.take() {
                    pb.set_position(total as u64);
                    pb.finish_with_message("done");
                }
                self.println(format!(
                    "{} {profiles} profiles fetched, {skipped} skipped",
                    style("completed").green().bold()
                ));
            }

            ImportEvent::JobFailed { message } => {
                if let Some(bar) = state.list_bar.take() {
                    bar.abandon();
                }
                self.println(format!("{} {}", style("failed").red().bold(), message));
            }

            ImportEvent::StatusChanged { from, to } => {
                self.println(format!("{} {from} -> {to}", style("status").cyan()));
            }

            ImportEvent::Committed {
                login,
                name,
                company,
            } => {
                let company = company
                    .map(|c| format!(" at {c}"))
                    .unwrap_or_default();
                self.println(format!(
                    "{} {name} ({login}){company}",
                    style("created").green()
                ));
            }

            ImportEvent::CommitSkipped { login, reason } => {
                self.println(format!("{} {login}: {reason}", style("exists").dim()));
            }

            ImportEvent::CommitError { login, message } => {
                self.println(format!("{} {login}: {message}", style("error").red()));
            }

            ImportEvent::Warning { message } => {
                self.println(format!("{} {message}", style("warning").yellow()));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref bar) = state.list_bar
            && !bar.is_finished()
        {
            bar.finish();
        }
        if let Some(ref pb) = state.profile_bar
            && !pb.is_finished()
        {
            pb.abandon();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
