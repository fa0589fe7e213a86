//! Plain-text rendering of suggestion batches.

use std::fmt;

use crate::generator::AcceptedPair;

/// Rendered batches longer than this many characters are cut.
pub const RENDER_LIMIT: usize = 1900;

const TRUNCATION_MARKER: &str = "\n...(truncated)...";

impl fmt::Display for AcceptedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} BPM, {}) x {} ({} BPM, {}) → ",
            self.source,
            self.source_bpm,
            display_key(&self.source_key),
            self.target,
            self.target_bpm,
            display_key(&self.target_key),
        )?;

        let amount = self.shift.abs();
        let unit = if amount == 1.0 { "semitone" } else { "semitones" };
        let direction = if self.shift > 0.0 {
            "up"
        } else if self.shift < 0.0 {
            "down"
        } else {
            "none"
        };
        write!(f, "{} {} {}", amount, unit, direction)
    }
}

fn display_key(key: &str) -> &str {
    if key.is_empty() {
        "?"
    } else {
        key
    }
}

/// One line per pair, cut at [`RENDER_LIMIT`] characters.
pub fn render_pairs(pairs: &[AcceptedPair]) -> String {
    if pairs.is_empty() {
        return "No compatible pairs found.".to_string();
    }

    let output = pairs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    match output.char_indices().nth(RENDER_LIMIT) {
        Some((cut, _)) => format!("{}{}", &output[..cut], TRUNCATION_MARKER),
        None => output,
    }
}
