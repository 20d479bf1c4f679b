//! Bootstrap configuration loading
//!
//! Configuration file resolution order:
//! 1. Explicit path (command-line argument)
//! 2. `RADIO_BACKEND_CONFIG` environment variable
//! 3. `~/.config/radio-backend/config.toml`
//! 4. `/etc/radio-backend/config.toml`
//! 5. Compiled defaults
//!
//! A missing file only falls back to defaults when it was not named explicitly.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "RADIO_BACKEND_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite station store
    pub database_path: PathBuf,

    /// Parent of every station's config/playlists/media directories
    pub stations_root: PathBuf,

    /// Containerised deployment: engine binds on all interfaces and logs to stdout
    pub inside_docker: bool,

    /// Host where the engine's control socket listens
    pub telnet_host: String,

    pub connect_timeout_secs: u64,

    /// Upper bound on a whole control session (write + read until close)
    pub command_timeout_secs: u64,

    /// How the engine calls back into this service
    pub callback: CallbackConfig,

    /// Played when the scheduler has nothing to offer
    pub error_sound_path: PathBuf,

    pub liquidsoap_binaries: Vec<PathBuf>,
    pub icecast_binaries: Vec<PathBuf>,
    pub shoutcast_binaries: Vec<PathBuf>,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CallbackConfig {
    /// Engine runs `<cli_path> internal <endpoint> <station_id> ...`
    Shell { cli_path: String },
    /// Engine POSTs to `<base_url>/api/internal/<station_id>/<endpoint>` with curl
    Http { base_url: String },
}

impl Default for CallbackConfig {
    fn default() -> Self {
        CallbackConfig::Shell {
            cli_path: "/usr/local/bin/radio-backend".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("radio-backend"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/radio-backend"));

        let mut liquidsoap_binaries = Vec::new();
        if let Some(home) = dirs::home_dir() {
            liquidsoap_binaries.push(home.join(".opam/system/bin/liquidsoap"));
        }
        liquidsoap_binaries.push(PathBuf::from("/usr/local/bin/liquidsoap"));
        liquidsoap_binaries.push(PathBuf::from("/usr/bin/liquidsoap"));

        Self {
            database_path: data_dir.join("stations.db"),
            stations_root: data_dir.join("stations"),
            inside_docker: false,
            telnet_host: "localhost".to_string(),
            connect_timeout_secs: 20,
            command_timeout_secs: 30,
            callback: CallbackConfig::default(),
            error_sound_path: PathBuf::from("/usr/local/share/radio-backend/error.mp3"),
            liquidsoap_binaries,
            icecast_binaries: vec![
                PathBuf::from("/usr/local/bin/icecast"),
                PathBuf::from("/usr/bin/icecast2"),
                PathBuf::from("/usr/bin/icecast"),
            ],
            shoutcast_binaries: vec![PathBuf::from("/usr/local/bin/sc_serv")],
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Resolve and load the configuration file, falling back to compiled defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            info!("Loading configuration from {} ({})", path.display(), CONFIG_ENV_VAR);
            return Self::from_file(&path);
        }

        for candidate in default_config_paths() {
            if candidate.exists() {
                info!("Loading configuration from {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }

        warn!("No configuration file found, using compiled defaults");
        Ok(Self::default())
    }
}

/// Platform config file locations, user before system
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("radio-backend").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/radio-backend/config.toml"));
    }
    paths
}
