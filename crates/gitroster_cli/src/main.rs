//! gitroster CLI - drive GitHub connection imports into the directory.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::Term;
use gitroster::import::ImportMode;
use tracing_subscriber::EnvFilter;

use crate::commands::status::OutputFormat;

#[derive(Parser)]
#[command(name = "gitroster")]
#[command(version)]
#[command(about = "Import GitHub connections into a community directory")]
#[command(
    long_about = "gitroster crawls the accounts a GitHub user follows (or is followed by), \
resolves their full profiles in small rate-limit-aware batches and commits a chosen \
subset as unpublished people. Progress is stored in the database, so an import can be \
paused, resumed, reset and continued across runs."
)]
#[command(after_long_help = r#"EXAMPLES
    Start importing everyone octocat follows:
        $ gitroster import start octocat

    Run batches until done, sleeping through rate limits:
        $ gitroster import continue --auto

    Review the fetched profiles:
        $ gitroster import status --profiles

    Commit two of them:
        $ gitroster import commit alice bob

CONFIGURATION
    gitroster reads configuration from:
      1. ~/.config/gitroster/config.toml (or $XDG_CONFIG_HOME/gitroster/config.toml)
      2. ./gitroster.toml
      3. Environment variables (GITROSTER_* prefix, e.g. GITROSTER_IMPORT__BATCH_SIZE)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITROSTER_DATABASE_URL    Database connection string (default: ~/.local/state/gitroster/gitroster.db)
    GITROSTER_GITHUB_TOKEN    GitHub personal access token
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the connections import
    Import {
        #[command(subcommand)]
        action: ImportAction,
    },
    /// Run database migrations
    #[cfg(feature = "migrate")]
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Which connections of the seed user to import.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ModeArg {
    /// Accounts the user follows
    #[default]
    Following,
    /// Accounts following the user
    Followers,
    /// Both, deduplicated
    Both,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Following => ImportMode::Following,
            ModeArg::Followers => ImportMode::Followers,
            ModeArg::Both => ImportMode::Both,
        }
    }
}

#[derive(Subcommand)]
enum ImportAction {
    /// Start a new import for a GitHub user
    Start {
        /// Seed GitHub username (a leading @ is ignored)
        username: String,

        /// Which connections to import
        #[arg(short, long, value_enum, default_value_t = ModeArg::Following)]
        mode: ModeArg,
    },
    /// Run the next batch (list connections first, then resolve profiles)
    Continue {
        /// Keep running batches until the import stops, waiting out rate limits
        #[arg(short, long)]
        auto: bool,
    },
    /// Pause a running import
    Pause,
    /// Resume a paused import
    Resume,
    /// Discard the import, whatever its state
    Reset,
    /// Show import progress
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,

        /// List the fetched profiles (table output only)
        #[arg(short, long)]
        profiles: bool,
    },
    /// Create unpublished people from fetched profiles
    Commit {
        /// GitHub logins to commit
        #[arg(required_unless_present = "all")]
        handles: Vec<String>,

        /// Commit every fetched profile
        #[arg(long, conflicts_with = "handles")]
        all: bool,

        /// Download avatars (default from config)
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        download_avatars: Option<bool>,
    },
}

#[cfg(feature = "migrate")]
#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    shutdown::setup_shutdown_handler();

    // Structured logs only when stdout is not a terminal; TTYs get progress bars.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("gitroster=info,gitroster_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set GITROSTER_DATABASE_URL")?;
    ensure_sqlite_parent_dir(&database_url)?;

    match cli.command {
        Commands::Import { action } => {
            #[cfg(feature = "migrate")]
            let db = gitroster::connect_and_migrate(&database_url).await?;
            #[cfg(not(feature = "migrate"))]
            let db = gitroster::connect(&database_url).await?;

            commands::import::handle_import(action, &config, db).await?;
        }
        #[cfg(feature = "migrate")]
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}

/// Create the directory holding a SQLite database file.
fn ensure_sqlite_parent_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_mode() {
        let cli = Cli::try_parse_from(["gitroster", "import", "start", "@octocat", "-m", "both"])
            .unwrap();
        match cli.command {
            Commands::Import {
                action: ImportAction::Start { username, mode },
            } => {
                assert_eq!(username, "@octocat");
                assert_eq!(ImportMode::from(mode), ImportMode::Both);
            }
            _ => panic!("expected import start"),
        }
    }

    #[test]
    fn commit_requires_handles_or_all() {
        assert!(Cli::try_parse_from(["gitroster", "import", "commit"]).is_err());
        assert!(Cli::try_parse_from(["gitroster", "import", "commit", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["gitroster", "import", "commit", "bob", "--all"]).is_err());
    }

    #[test]
    fn download_avatars_flag_forms() {
        let parse = |args: &[&str]| match Cli::try_parse_from(args).unwrap().command {
            Commands::Import {
                action: ImportAction::Commit {
                    download_avatars, ..
                },
            } => download_avatars,
            _ => panic!("expected import commit"),
        };

        assert_eq!(parse(&["gitroster", "import", "commit", "bob"]), None);
        assert_eq!(
            parse(&["gitroster", "import", "commit", "bob", "--download-avatars"]),
            Some(true)
        );
        assert_eq!(
            parse(&[
                "gitroster",
                "import",
                "commit",
                "bob",
                "--download-avatars=false"
            ]),
            Some(false)
        );
    }

    #[test]
    fn sqlite_parent_dir_is_created() {
        let dir = std::env::temp_dir().join(format!("gitroster-db-test-{}", std::process::id()));
        let url = format!("sqlite://{}/nested/roster.db?mode=rwc", dir.display());

        ensure_sqlite_parent_dir(&url).unwrap();
        assert!(dir.join("nested").is_dir());

        std::fs::remove_dir_all(&dir).unwrap();
        ensure_sqlite_parent_dir("postgres://localhost/roster").unwrap();
    }
}
