//! Infrastructure configuration - where state lives and how loudly we log.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem paths for mashup state and data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for runtime state.
    /// Default: ~/.local/share/mashup
    #[serde(default = "PathsConfig::default_state_dir")]
    pub state_dir: PathBuf,

    /// SQLite database holding the banned-combo table.
    /// Default: <state_dir>/banned.db
    #[serde(default)]
    pub banned_db: Option<PathBuf>,

    /// Catalog file (TOML). The compiled-in catalog is used when unset.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl PathsConfig {
    fn default_state_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".local/share/mashup"))
            .unwrap_or_else(|| PathBuf::from(".local/share/mashup"))
    }

    /// Resolved banned-combo database path.
    pub fn banned_db_path(&self) -> PathBuf {
        self.banned_db
            .clone()
            .unwrap_or_else(|| self.state_dir.join("banned.db"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: Self::default_state_dir(),
            banned_db: None,
            catalog: None,
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or filter directive (trace, debug, info, mashup=debug, ...).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banned_db_defaults_under_state_dir() {
        let paths = PathsConfig {
            state_dir: PathBuf::from("/var/lib/mashup"),
            banned_db: None,
            catalog: None,
        };
        assert_eq!(paths.banned_db_path(), PathBuf::from("/var/lib/mashup/banned.db"));
    }

    #[test]
    fn explicit_banned_db_wins() {
        let paths = PathsConfig {
            state_dir: PathBuf::from("/var/lib/mashup"),
            banned_db: Some(PathBuf::from("/srv/bans.db")),
            catalog: None,
        };
        assert_eq!(paths.banned_db_path(), PathBuf::from("/srv/bans.db"));
    }
}
