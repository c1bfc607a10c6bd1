use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::session::Attendance;

/// Points at an alternative config file. When set, the file must exist.
pub const CONFIG_ENV_VAR: &str = "PKAUTH_CONFIG";

/// Read when `PKAUTH_CONFIG` is unset and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pkauth/config.toml";

pub const DEFAULT_SOCKET_PATH: &str = "/run/pkauth/authority.sock";

pub const DEFAULT_HELPER_PROGRAM: &str = "/usr/libexec/pkauth-helper";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Socket of the authority bridge.
    pub socket_path: PathBuf,

    /// Deadline for non-interactive round trips (catalog and checks).
    pub timeout_ms: u64,

    /// Deadline for anything that waits on a human: the agent dialog and the
    /// local helper.
    pub interactive_timeout_ms: u64,

    pub attendance: Attendance,

    pub helper: HelperConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelperConfig {
    pub program: PathBuf,
    /// Placed before the action id and pid.
    pub args: Vec<String>,
    /// How long the helper may take to exit after `SIGTERM`.
    pub grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout_ms: 25_000,
            interactive_timeout_ms: 300_000,
            attendance: Attendance::default(),
            helper: HelperConfig::default(),
        }
    }
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_HELPER_PROGRAM),
            args: Vec::new(),
            grace_ms: 2_000,
        }
    }
}

impl Config {
    /// Loads the file named by `PKAUTH_CONFIG`, else [`DEFAULT_CONFIG_PATH`]
    /// if present, else returns the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let from_env = std::env::var(CONFIG_ENV_VAR)
            .ok()
            .filter(|val| !val.is_empty());
        match config_path(from_env.as_deref(), Path::new(DEFAULT_CONFIG_PATH)) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interactive_timeout(&self) -> Duration {
        Duration::from_millis(self.interactive_timeout_ms)
    }
}

impl HelperConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

fn config_path(from_env: Option<&str>, default_path: &Path) -> Option<PathBuf> {
    match from_env {
        Some(val) => Some(PathBuf::from(val)),
        None => default_path.exists().then(|| default_path.to_path_buf()),
    }
}
