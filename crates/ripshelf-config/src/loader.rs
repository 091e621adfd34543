use std::path::PathBuf;
use std::time::Duration;

use ripshelf_domain::DriveId;
use tracing::debug;

use crate::error::ConfigError;

/// Runtime configuration, sourced from the environment.
///
/// All lookups go through an injectable function so tests never touch the
/// process environment. Empty string values are treated as unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Parent of `staging/`, `encoding/`, `logs/` and `data/`.
    pub workspace_root: PathBuf,
    /// Library destination for movies. Required for serving.
    pub movies_root: Option<PathBuf>,
    /// Library destination for tv seasons.
    pub tv_root: Option<PathBuf>,
    /// Drives to poll, in configuration order.
    pub drives: Vec<DriveId>,
    /// Disc probe cadence.
    pub poll_interval: Duration,
    /// Identification confidence at or above which a job skips review.
    pub auto_approve_threshold: f64,
    /// Catalog API token. None disables the catalog entirely.
    pub tmdb_token: Option<String>,
    /// Notifier credentials. Either missing disables notifications.
    pub pushover_user: Option<String>,
    pub pushover_token: Option<String>,
    /// Control-surface bind address.
    pub bind: String,
}

const DEFAULT_POLL_SECS: u64 = 15;
const DEFAULT_THRESHOLD: f64 = 0.85;
const DEFAULT_BIND: &str = "127.0.0.1:7979";

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through `lookup`. `HOME` is consulted only when
    /// `RIPSHELF_WORKSPACE` is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let workspace_root = match get("RIPSHELF_WORKSPACE") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = get("HOME").ok_or_else(|| ConfigError::MissingVar("HOME".into()))?;
                PathBuf::from(home).join("DVDWorkspace")
            }
        };

        let drives: Vec<DriveId> = get("RIPSHELF_DRIVES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(DriveId::new)
                    .collect()
            })
            .unwrap_or_default();

        let poll_interval = match get("RIPSHELF_POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "RIPSHELF_POLL_INTERVAL_SECS".into(),
                    message: format!("'{}' is not a whole number of seconds", raw),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        var: "RIPSHELF_POLL_INTERVAL_SECS".into(),
                        message: "interval must be at least 1 second".into(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_POLL_SECS),
        };

        let auto_approve_threshold = match get("RIPSHELF_AUTO_APPROVE_THRESHOLD") {
            Some(raw) => {
                let t: f64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "RIPSHELF_AUTO_APPROVE_THRESHOLD".into(),
                    message: format!("'{}' is not a number", raw),
                })?;
                if !(0.0..=1.0).contains(&t) {
                    return Err(ConfigError::InvalidValue {
                        var: "RIPSHELF_AUTO_APPROVE_THRESHOLD".into(),
                        message: format!("{} outside 0.0..=1.0", t),
                    });
                }
                t
            }
            None => DEFAULT_THRESHOLD,
        };

        let config = Self {
            workspace_root,
            movies_root: get("RIPSHELF_MOVIES_ROOT").map(PathBuf::from),
            tv_root: get("RIPSHELF_TV_ROOT").map(PathBuf::from),
            drives,
            poll_interval,
            auto_approve_threshold,
            tmdb_token: get("RIPSHELF_TMDB_TOKEN"),
            pushover_user: get("RIPSHELF_PUSHOVER_USER"),
            pushover_token: get("RIPSHELF_PUSHOVER_TOKEN"),
            bind: get("RIPSHELF_BIND").unwrap_or_else(|| DEFAULT_BIND.into()),
        };
        debug!(
            workspace = %config.workspace_root.display(),
            drives = config.drives.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Serving needs somewhere to file movies and something to watch.
    pub fn validate_for_serving(&self) -> Result<(), ConfigError> {
        if self.movies_root.is_none() {
            return Err(ConfigError::MissingVar("RIPSHELF_MOVIES_ROOT".into()));
        }
        if self.drives.is_empty() {
            return Err(ConfigError::MissingVar("RIPSHELF_DRIVES".into()));
        }
        Ok(())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.workspace_root.join("staging")
    }

    pub fn encoding_dir(&self) -> PathBuf {
        self.workspace_root.join("encoding")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.workspace_root.join("logs")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.workspace_root.join("data")
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join("ripshelf.redb")
    }

    /// Both notifier keys present.
    pub fn notifications_enabled(&self) -> bool {
        self.pushover_user.is_some() && self.pushover_token.is_some()
    }
}
