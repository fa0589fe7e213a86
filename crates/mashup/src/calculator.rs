//! Standalone semitone distance between two keys, plus key-name completion.

use std::fmt;

use crate::fuzzy;
use crate::key::{all_key_names, parse_key, wrap_semitones, Key};

/// Completion results are capped at this many names.
pub const KEY_SUGGESTION_LIMIT: usize = 25;

#[derive(Debug, Clone, PartialEq)]
pub enum SemitoneCalculation {
    BothUnknown { from: String, to: String },
    UnknownKey { raw: String },
    NoShift { from: Key, to: Key },
    /// Pitch `from` by `semitones` to land on `to`.
    Shift { from: Key, to: Key, semitones: f64 },
}

impl SemitoneCalculation {
    /// The signed shift, if both keys were understood.
    pub fn semitones(&self) -> Option<f64> {
        match self {
            SemitoneCalculation::NoShift { .. } => Some(0.0),
            SemitoneCalculation::Shift { semitones, .. } => Some(*semitones),
            _ => None,
        }
    }
}

impl fmt::Display for SemitoneCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemitoneCalculation::BothUnknown { from, to } => {
                write!(f, "Neither '{}' nor '{}' is a key I know.", from, to)
            }
            SemitoneCalculation::UnknownKey { raw } => write!(f, "'{}' is not a key I know.", raw),
            SemitoneCalculation::NoShift { from, to } => {
                write!(f, "No pitching needed for {} and {}.", from, to)
            }
            SemitoneCalculation::Shift {
                from,
                to,
                semitones,
            } => {
                if semitones.abs() == 6.0 {
                    write!(f, "You need to pitch {} ±6 semitones to get to {}.", from, to)
                } else {
                    let unit = if semitones.abs() == 1.0 {
                        "semitone"
                    } else {
                        "semitones"
                    };
                    write!(
                        f,
                        "You need to pitch {} {:+} {} to get to {}.",
                        from, semitones, unit, to
                    )
                }
            }
        }
    }
}

/// How far to pitch `from` to reach `to`, measured between key signatures so
/// relative keys need no pitching.
pub fn calculate_semitones(from: &str, to: &str) -> SemitoneCalculation {
    let from_key = parse_key(from);
    let to_key = parse_key(to);

    let (from_key, to_key) = match (from_key.known(), to_key.known()) {
        (None, None) => {
            return SemitoneCalculation::BothUnknown {
                from: from.trim().to_string(),
                to: to.trim().to_string(),
            }
        }
        (None, Some(_)) => {
            return SemitoneCalculation::UnknownKey {
                raw: from.trim().to_string(),
            }
        }
        (Some(_), None) => {
            return SemitoneCalculation::UnknownKey {
                raw: to.trim().to_string(),
            }
        }
        (Some(a), Some(b)) => (*a, *b),
    };

    let semitones = wrap_semitones(to_key.signature_pitch() - from_key.signature_pitch());
    if semitones == 0.0 {
        SemitoneCalculation::NoShift {
            from: from_key,
            to: to_key,
        }
    } else {
        SemitoneCalculation::Shift {
            from: from_key,
            to: to_key,
            semitones,
        }
    }
}

/// Canonical key names matching `partial`: an exact parse first, then
/// prefix matches, then substring matches, then near misses such as
/// `"C Dorain"`.
pub fn suggest_keys(partial: &str) -> Vec<String> {
    let names = all_key_names();
    let candidates: Vec<&str> = names.iter().map(String::as_str).collect();

    let mut suggestions: Vec<String> = Vec::new();
    if let Some(key) = parse_key(partial).known() {
        suggestions.push(key.canonical_name());
    }

    for name in fuzzy::rank(partial, &candidates, KEY_SUGGESTION_LIMIT) {
        if suggestions.len() >= KEY_SUGGESTION_LIMIT {
            break;
        }
        if !suggestions.iter().any(|s| s == name) {
            suggestions.push(name.to_string());
        }
    }

    suggestions
}
