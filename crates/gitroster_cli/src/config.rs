//! Configuration file support for gitroster.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`GITROSTER_` prefix, `__` between section and key,
//!    e.g. `GITROSTER_IMPORT__BATCH_SIZE`); `GITROSTER_DATABASE_URL` and
//!    `GITROSTER_GITHUB_TOKEN` are also accepted as shorthands
//! 3. Config file (./gitroster.toml, then ~/.config/gitroster/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/gitroster/gitroster.db?mode=rwc"  # optional, this is the default
//!
//! [github]
//! token = "ghp_..."  # or use GITROSTER_GITHUB_TOKEN
//! api_url = "https://api.github.com"
//! timeout_secs = 30
//! requests_per_second = 10
//!
//! [import]
//! batch_size = 5
//! rate_limit_threshold = 5
//! poll_interval_secs = 2
//! download_avatars = true
//!
//! [images]
//! dir = "/srv/directory/images"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use gitroster::import::{DEFAULT_BATCH_SIZE, DEFAULT_RATE_LIMIT_THRESHOLD, ImportOptions};
use gitroster::rate_limit::GITHUB_DEFAULT_RPS;
use serde::Deserialize;

const APP_NAME: &str = "gitroster";
const ENV_PREFIX: &str = "GITROSTER";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub import: ImportConfig,
    pub images: ImagesConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL (`sqlite://` or `postgres://`).
    /// Defaults to `sqlite://<state dir>/gitroster.db?mode=rwc`.
    pub url: Option<String>,
}

/// GitHub API access.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Personal access token. Anonymous access works with a much smaller quota.
    pub token: Option<String>,
    /// API base URL, for GitHub Enterprise.
    pub api_url: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Proactive request pacing.
    pub requests_per_second: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: None,
            timeout_secs: 30,
            requests_per_second: GITHUB_DEFAULT_RPS,
        }
    }
}

/// Import job defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Profiles resolved per batch.
    pub batch_size: usize,
    /// Stop a batch when this few requests remain in the quota window.
    pub rate_limit_threshold: usize,
    /// Pause between batches in `import continue --auto`.
    pub poll_interval_secs: u64,
    /// Download avatars when committing.
    pub download_avatars: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            rate_limit_threshold: DEFAULT_RATE_LIMIT_THRESHOLD,
            poll_interval_secs: 2,
            download_avatars: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Where avatars are stored. Defaults to `<data dir>/images`.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from files and the environment.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. XDG config file (~/.config/gitroster/config.toml)
    /// 2. Local config file (./gitroster.toml)
    /// 3. `GITROSTER_` environment variables
    ///
    /// A broken configuration is logged and replaced by the defaults.
    pub fn load() -> Self {
        match Self::settings().and_then(|settings| settings.try_deserialize::<Config>()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    fn settings() -> Result<ConfigBuilder, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("gitroster.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./gitroster.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder
            .add_source(Self::environment())
            .set_override_option(
                "database.url",
                std::env::var(format!("{ENV_PREFIX}_DATABASE_URL")).ok(),
            )?
            .set_override_option(
                "github.token",
                std::env::var(format!("{ENV_PREFIX}_GITHUB_TOKEN")).ok(),
            )?;

        builder.build()
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// The database URL, falling back to the default state directory.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("gitroster.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// The GitHub token, ignoring blank values.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    pub fn github_timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.import.poll_interval_secs)
    }

    /// Library options for the import controller.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions::default()
            .with_batch_size(self.import.batch_size)
            .with_rate_limit_threshold(self.import.rate_limit_threshold)
    }

    /// Avatar directory, falling back to `<data dir>/images`.
    pub fn images_dir(&self) -> PathBuf {
        self.images
            .dir
            .clone()
            .or_else(|| Self::default_data_dir().map(|dir| dir.join("images")))
            .unwrap_or_else(|| PathBuf::from("images"))
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn default_data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// The default state directory.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/gitroster` or `~/.local/state/gitroster`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
