//! Configuration loading for the mashup engine.
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`PathsConfig`, `TelemetryConfig`): where the banned
//!   combo database and catalog live, and the log filter.
//!
//! - **Engine** (`ToleranceConfig`, `GenerationConfig`): default tolerance
//!   windows handed to the key resolver and tempo matcher, plus the
//!   generation budget. Per-song overrides live in the catalog, not here.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mashconf::MashConfig;
//!
//! let config = MashConfig::load().expect("Failed to load config");
//!
//! println!("Banned db: {}", config.paths.banned_db_path().display());
//! println!("Attempts: {}", config.generation.max_attempts);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/mashup/config.toml` (system)
//! 2. `~/.config/mashup/config.toml` (user)
//! 3. `./mashup.toml` (local override)
//! 4. Environment variables (`MASHUP_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! state_dir = "~/.local/share/mashup"
//! catalog = "~/mashup/catalog.toml"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [tolerance]
//! semitones = [2, 2]
//! bpm = [7.44, 10.76]
//!
//! [generation]
//! target_count = 5
//! max_attempts = 1000
//! indeterminate = "compatible"
//! ```

pub mod engine;
pub mod infra;
pub mod loader;

pub use engine::{GenerationConfig, IndeterminatePolicy, ToleranceConfig, ToleranceWindow};
pub use infra::{PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete mashup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MashConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub tolerance: ToleranceConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

impl MashConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/mashup/config.toml`
    /// 3. `~/.config/mashup/config.toml`
    /// 4. `./mashup.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./mashup.toml` override. System and user configs still load first.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = MashConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_from_file(&path, &mut config)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Built by hand so optional paths render as comments instead of vanishing
        let mut output = String::new();

        output.push_str("# Mashup Configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "state_dir = \"{}\"\n",
            self.paths.state_dir.display()
        ));
        match &self.paths.banned_db {
            Some(path) => output.push_str(&format!("banned_db = \"{}\"\n", path.display())),
            None => output.push_str(&format!(
                "# banned_db = \"{}\"\n",
                self.paths.banned_db_path().display()
            )),
        }
        match &self.paths.catalog {
            Some(path) => output.push_str(&format!("catalog = \"{}\"\n", path.display())),
            None => output.push_str("# catalog = \"<builtin>\"\n"),
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output.push_str("\n[tolerance]\n");
        output.push_str(&format!(
            "semitones = [{}, {}]\n",
            self.tolerance.semitones.down, self.tolerance.semitones.up
        ));
        output.push_str(&format!(
            "bpm = [{}, {}]\n",
            self.tolerance.bpm.down, self.tolerance.bpm.up
        ));

        output.push_str("\n[generation]\n");
        output.push_str(&format!("target_count = {}\n", self.generation.target_count));
        output.push_str(&format!("max_attempts = {}\n", self.generation.max_attempts));
        output.push_str(&format!(
            "indeterminate = \"{}\"\n",
            self.generation.indeterminate
        ));
        output.push_str(&format!(
            "ignore_key_rules = {}\n",
            self.generation.ignore_key_rules
        ));
        output.push_str(&format!(
            "ignore_bpm_rules = {}\n",
            self.generation.ignore_bpm_rules
        ));

        output
    }
}
