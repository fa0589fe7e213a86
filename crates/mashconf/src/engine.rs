//! Engine configuration - tolerance defaults and generation budgets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An asymmetric window around zero: a delta is accepted when it lies in
/// `[-down, +up]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceWindow {
    pub down: f64,
    pub up: f64,
}

impl ToleranceWindow {
    pub const fn new(down: f64, up: f64) -> Self {
        Self { down, up }
    }

    pub fn contains(&self, delta: f64) -> bool {
        -self.down <= delta && delta <= self.up
    }
}

/// Default tolerance windows, applied when a song has no override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Key-shift search window in semitones, owned by the source song.
    /// Default: [2, 2]
    #[serde(default = "ToleranceConfig::default_semitones")]
    pub semitones: ToleranceWindow,

    /// Tempo window in BPM, owned by the target song.
    /// Default: [7.44, 10.76]
    #[serde(default = "ToleranceConfig::default_bpm")]
    pub bpm: ToleranceWindow,
}

impl ToleranceConfig {
    fn default_semitones() -> ToleranceWindow {
        ToleranceWindow::new(2.0, 2.0)
    }

    fn default_bpm() -> ToleranceWindow {
        ToleranceWindow::new(7.44, 10.76)
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            semitones: Self::default_semitones(),
            bpm: Self::default_bpm(),
        }
    }
}

/// What the generator does when a key relationship cannot be determined
/// because one or both keys are unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminatePolicy {
    /// Accept the pair with a shift of zero.
    #[default]
    Compatible,
    /// Reject the pair like any other key mismatch.
    Reject,
}

impl fmt::Display for IndeterminatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndeterminatePolicy::Compatible => write!(f, "compatible"),
            IndeterminatePolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for IndeterminatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compatible" | "accept" => Ok(IndeterminatePolicy::Compatible),
            "reject" => Ok(IndeterminatePolicy::Reject),
            other => Err(format!("unknown indeterminate policy '{}'", other)),
        }
    }
}

/// Pair generation budget and rule switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Pairs requested per batch when the caller does not say.
    /// Default: 5
    #[serde(default = "GenerationConfig::default_target_count")]
    pub target_count: usize,

    /// Draws allowed for a whole batch, shared across all accepted pairs.
    /// Default: 1000
    #[serde(default = "GenerationConfig::default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default)]
    pub indeterminate: IndeterminatePolicy,

    /// Skip the key relationship check entirely (shift reported as 0).
    #[serde(default)]
    pub ignore_key_rules: bool,

    /// Skip the tempo check entirely.
    #[serde(default)]
    pub ignore_bpm_rules: bool,
}

impl GenerationConfig {
    fn default_target_count() -> usize {
        5
    }

    fn default_max_attempts() -> usize {
        1000
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            target_count: Self::default_target_count(),
            max_attempts: Self::default_max_attempts(),
            indeterminate: IndeterminatePolicy::default(),
            ignore_key_rules: false,
            ignore_bpm_rules: false,
        }
    }
}
