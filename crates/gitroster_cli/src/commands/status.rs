use chrono::{DateTime, Utc};
use clap::ValueEnum;
use gitroster::import::ImportProgress;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format for `import status`.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display the full progress record as JSON
    Json,
}

#[derive(Debug, Clone, Tabled)]
pub(crate) struct StatusRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl StatusRow {
    fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct ProfileRow {
    #[tabled(rename = "Login")]
    pub login: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Company")]
    pub company: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Followers")]
    pub followers: u32,
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn status_rows(progress: &ImportProgress) -> Vec<StatusRow> {
    let mut rows = vec![
        StatusRow::new("Status", progress.status.to_string()),
        StatusRow::new(
            "Source",
            progress
                .source_username
                .clone()
                .unwrap_or_else(|| "-".to_string()),
        ),
        StatusRow::new("Mode", progress.mode.to_string()),
        StatusRow::new(
            "Progress",
            format!(
                "{}/{} ({:.1}%)",
                progress.fetched_profiles,
                progress.total_users,
                progress.percent_complete()
            ),
        ),
        StatusRow::new("Profiles", progress.profiles.len().to_string()),
        StatusRow::new("Errors", progress.error_count.to_string()),
    ];

    if let Some(remaining) = progress.rate_limit_remaining {
        rows.push(StatusRow::new("Quota left", remaining.to_string()));
    }
    if progress.waiting_for_rate_limit {
        rows.push(StatusRow::new(
            "Waiting until",
            format_time(progress.rate_limit_reset),
        ));
    }
    if let Some(error) = &progress.last_error {
        rows.push(StatusRow::new("Last error", error.clone()));
    }
    if progress.is_stale() {
        rows.push(StatusRow::new(
            "Note",
            "record is unusable, reset required (gitroster import reset)",
        ));
    }
    rows.push(StatusRow::new("Started", format_time(progress.started_at)));
    rows.push(StatusRow::new("Updated", format_time(progress.updated_at)));
    rows
}

pub(crate) fn profile_rows(progress: &ImportProgress) -> Vec<ProfileRow> {
    progress
        .profiles
        .iter()
        .map(|p| ProfileRow {
            login: p.login.clone(),
            name: p.name.clone().unwrap_or_default(),
            company: p.company.clone().unwrap_or_default(),
            location: p.location.clone().unwrap_or_default(),
            followers: p.followers,
        })
        .collect()
}

pub(crate) fn print_status(
    progress: &ImportProgress,
    output: OutputFormat,
    show_profiles: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Table => {
            let mut table = Table::new(status_rows(progress));
            table.with(Style::rounded());
            println!("{table}");

            if show_profiles && !progress.profiles.is_empty() {
                let mut table = Table::new(profile_rows(progress));
                table.with(Style::rounded());
                println!("{table}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(progress)?);
        }
    }
    Ok(())
}
