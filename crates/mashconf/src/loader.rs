//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, IndeterminatePolicy, MashConfig, ToleranceWindow};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations, optionally with a CLI
/// override path. Only returns files that exist.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/mashup/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("mashup/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("mashup.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a TOML file on top of `config`.
pub fn load_from_file(path: &Path, config: &mut MashConfig) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(&contents, path, config)
}

/// Apply the keys present in a TOML document to `config`.
///
/// Keys missing from the document keep whatever value `config` already had,
/// so successive files layer over each other.
pub fn apply_toml(contents: &str, path: &Path, config: &mut MashConfig) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("state_dir").and_then(|v| v.as_str()) {
            config.paths.state_dir = expand_path(v);
        }
        if let Some(v) = paths.get("banned_db").and_then(|v| v.as_str()) {
            config.paths.banned_db = Some(expand_path(v));
        }
        if let Some(v) = paths.get("catalog").and_then(|v| v.as_str()) {
            config.paths.catalog = Some(expand_path(v));
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    if let Some(tolerance) = table.get("tolerance").and_then(|v| v.as_table()) {
        if let Some(v) = tolerance.get("semitones") {
            config.tolerance.semitones =
                parse_window(v).map_err(|m| parse_error(format!("tolerance.semitones: {}", m)))?;
        }
        if let Some(v) = tolerance.get("bpm") {
            config.tolerance.bpm =
                parse_window(v).map_err(|m| parse_error(format!("tolerance.bpm: {}", m)))?;
        }
    }

    if let Some(generation) = table.get("generation").and_then(|v| v.as_table()) {
        if let Some(v) = generation.get("target_count").and_then(|v| v.as_integer()) {
            config.generation.target_count = non_negative(v, "generation.target_count")
                .map_err(parse_error)?;
        }
        if let Some(v) = generation.get("max_attempts").and_then(|v| v.as_integer()) {
            config.generation.max_attempts = non_negative(v, "generation.max_attempts")
                .map_err(parse_error)?;
        }
        if let Some(v) = generation.get("indeterminate").and_then(|v| v.as_str()) {
            config.generation.indeterminate = v.parse().map_err(parse_error)?;
        }
        if let Some(v) = generation.get("ignore_key_rules").and_then(|v| v.as_bool()) {
            config.generation.ignore_key_rules = v;
        }
        if let Some(v) = generation.get("ignore_bpm_rules").and_then(|v| v.as_bool()) {
            config.generation.ignore_bpm_rules = v;
        }
    }

    Ok(())
}

fn as_number(value: &toml::Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

/// Parse a `[down, up]` pair of non-negative numbers.
fn parse_window(value: &toml::Value) -> Result<ToleranceWindow, String> {
    let items = value
        .as_array()
        .ok_or_else(|| "expected a [down, up] array".to_string())?;
    if items.len() != 2 {
        return Err(format!("expected 2 values, got {}", items.len()));
    }
    let down = as_number(&items[0]).ok_or_else(|| "down must be a number".to_string())?;
    let up = as_number(&items[1]).ok_or_else(|| "up must be a number".to_string())?;
    if down < 0.0 || up < 0.0 {
        return Err("window bounds must not be negative".to_string());
    }
    Ok(ToleranceWindow::new(down, up))
}

fn non_negative(value: i64, key: &str) -> Result<usize, String> {
    usize::try_from(value).map_err(|_| format!("{} must not be negative", key))
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut MashConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |name| env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides_from<F>(config: &mut MashConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("MASHUP_STATE_DIR") {
        config.paths.state_dir = expand_path(&v);
        sources.env_overrides.push("MASHUP_STATE_DIR".to_string());
    }
    if let Some(v) = lookup("MASHUP_BANNED_DB") {
        config.paths.banned_db = Some(expand_path(&v));
        sources.env_overrides.push("MASHUP_BANNED_DB".to_string());
    }
    if let Some(v) = lookup("MASHUP_CATALOG") {
        config.paths.catalog = Some(expand_path(&v));
        sources.env_overrides.push("MASHUP_CATALOG".to_string());
    }

    if let Some(v) = lookup("MASHUP_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("MASHUP_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    if let Some(v) = lookup("MASHUP_TARGET_COUNT") {
        if let Ok(count) = v.parse() {
            config.generation.target_count = count;
            sources.env_overrides.push("MASHUP_TARGET_COUNT".to_string());
        }
    }
    if let Some(v) = lookup("MASHUP_MAX_ATTEMPTS") {
        if let Ok(attempts) = v.parse() {
            config.generation.max_attempts = attempts;
            sources.env_overrides.push("MASHUP_MAX_ATTEMPTS".to_string());
        }
    }
    if let Some(v) = lookup("MASHUP_INDETERMINATE") {
        if let Ok(policy) = v.parse::<IndeterminatePolicy>() {
            config.generation.indeterminate = policy;
            sources.env_overrides.push("MASHUP_INDETERMINATE".to_string());
        }
    }
    if let Some(v) = lookup("MASHUP_IGNORE_KEY_RULES") {
        if let Ok(flag) = v.parse() {
            config.generation.ignore_key_rules = flag;
            sources.env_overrides.push("MASHUP_IGNORE_KEY_RULES".to_string());
        }
    }
    if let Some(v) = lookup("MASHUP_IGNORE_BPM_RULES") {
        if let Ok(flag) = v.parse() {
            config.generation.ignore_bpm_rules = flag;
            sources.env_overrides.push("MASHUP_IGNORE_BPM_RULES".to_string());
        }
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let expanded = expand_path("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[paths]
state_dir = "/custom/state"
"#;
        let mut config = MashConfig::default();
        apply_toml(toml, Path::new("test.toml"), &mut config).unwrap();
        assert_eq!(config.paths.state_dir, PathBuf::from("/custom/state"));
        assert_eq!(config.paths.banned_db_path(), PathBuf::from("/custom/state/banned.db"));
        // Other values should be defaults
        assert_eq!(config.generation.max_attempts, 1000);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[paths]
state_dir = "/data/mashup"
banned_db = "/data/bans.db"
catalog = "/data/catalog.toml"

[telemetry]
log_level = "debug"

[tolerance]
semitones = [3, 2.5]
bpm = [5, 12]

[generation]
target_count = 1
max_attempts = 400
indeterminate = "reject"
ignore_bpm_rules = true
"#;
        let mut config = MashConfig::default();
        apply_toml(toml, Path::new("test.toml"), &mut config).unwrap();

        assert_eq!(config.paths.banned_db_path(), PathBuf::from("/data/bans.db"));
        assert_eq!(config.paths.catalog, Some(PathBuf::from("/data/catalog.toml")));
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.tolerance.semitones, ToleranceWindow::new(3.0, 2.5));
        assert_eq!(config.tolerance.bpm, ToleranceWindow::new(5.0, 12.0));
        assert_eq!(config.generation.target_count, 1);
        assert_eq!(config.generation.max_attempts, 400);
        assert_eq!(config.generation.indeterminate, IndeterminatePolicy::Reject);
        assert!(!config.generation.ignore_key_rules);
        assert!(config.generation.ignore_bpm_rules);
    }

    #[test]
    fn test_later_file_layers_over_earlier() {
        let mut config = MashConfig::default();
        apply_toml("[generation]\nmax_attempts = 10\n", Path::new("a.toml"), &mut config).unwrap();
        apply_toml("[generation]\ntarget_count = 2\n", Path::new("b.toml"), &mut config).unwrap();
        assert_eq!(config.generation.max_attempts, 10);
        assert_eq!(config.generation.target_count, 2);
    }

    #[test]
    fn test_malformed_window_is_parse_error() {
        let mut config = MashConfig::default();
        let err = apply_toml("[tolerance]\nbpm = [1]\n", Path::new("bad.toml"), &mut config)
            .unwrap_err();
        assert!(err.to_string().contains("tolerance.bpm"));

        let err = apply_toml("[tolerance]\nsemitones = [-1, 2]\n", Path::new("bad.toml"), &mut config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let mut config = MashConfig::default();
        let result = apply_toml(
            "[generation]\nindeterminate = \"sometimes\"\n",
            Path::new("bad.toml"),
            &mut config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MASHUP_MAX_ATTEMPTS", "50"),
            ("MASHUP_INDETERMINATE", "reject"),
            ("MASHUP_IGNORE_KEY_RULES", "true"),
            ("MASHUP_TARGET_COUNT", "not-a-number"),
        ]);
        let mut config = MashConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |name| {
            vars.get(name).map(|v| v.to_string())
        });

        assert_eq!(config.generation.max_attempts, 50);
        assert_eq!(config.generation.indeterminate, IndeterminatePolicy::Reject);
        assert!(config.generation.ignore_key_rules);
        // Unparseable values are skipped, not recorded
        assert_eq!(config.generation.target_count, 5);
        assert!(!sources.env_overrides.contains(&"MASHUP_TARGET_COUNT".to_string()));
        assert_eq!(sources.env_overrides.len(), 3);
    }
}
