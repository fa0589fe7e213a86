//! Tempo compatibility with half-time and double-time equivalence.

use mashconf::{ToleranceConfig, ToleranceWindow};
use serde::{Deserialize, Serialize};

/// Which reading of song A's tempo lined up with song B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoMatch {
    Same,
    HalfTime,
    DoubleTime,
}

impl TempoMatch {
    /// Reference multipliers applied to song A's tempo, in evaluation order.
    const CANDIDATES: [(TempoMatch, f64); 3] = [
        (TempoMatch::Same, 1.0),
        (TempoMatch::HalfTime, 0.5),
        (TempoMatch::DoubleTime, 2.0),
    ];
}

/// Checks tempo pairs against a tolerance window owned by song B.
#[derive(Debug, Clone, Copy)]
pub struct TempoMatcher {
    default_window: ToleranceWindow,
}

impl TempoMatcher {
    pub fn new(tolerance: &ToleranceConfig) -> Self {
        Self {
            default_window: tolerance.bpm,
        }
    }

    /// First reference tempo of A (itself, half, double) whose distance to B
    /// fits the window. `window` is song B's override, if any.
    pub fn tempo_match(&self, a: f64, b: f64, window: Option<ToleranceWindow>) -> Option<TempoMatch> {
        let window = window.unwrap_or(self.default_window);
        TempoMatch::CANDIDATES
            .iter()
            .find(|(_, factor)| window.contains(a * factor - b))
            .map(|(kind, _)| *kind)
    }

    pub fn bpm_ok(&self, a: f64, b: f64, window: Option<ToleranceWindow>) -> bool {
        self.tempo_match(a, b, window).is_some()
    }
}
