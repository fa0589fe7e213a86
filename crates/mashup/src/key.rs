//! Key strings: parsing, canonical spelling, and the fixed key tables.
//!
//! Catalog keys are free text such as `"F#m"`, `"B Lydian"` or
//! `"A#m+0.5"`. Parsing never fails hard: the markers `?` and `/` and the
//! empty string mean "no information", and anything else that does not parse
//! is reported as malformed so the caller can log it and carry on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical root spelling per pitch class: flats for the five black keys.
pub const ROOT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Strings that mean "key not known" rather than "key not parseable".
const UNKNOWN_MARKERS: [&str; 3] = ["", "?", "/"];

/// Keys that share one signature, one group per major tonic in chromatic order.
pub const RELATIVE_KEY_GROUPS: [[&str; 7]; 12] = [
    ["C Major", "A Minor", "E Phrygian", "D Dorian", "G Mixolydian", "B Locrian", "F Lydian"],
    ["Db Major", "Bb Minor", "F Phrygian", "Eb Dorian", "Ab Mixolydian", "C Locrian", "Gb Lydian"],
    ["D Major", "B Minor", "Gb Phrygian", "E Dorian", "A Mixolydian", "Db Locrian", "G Lydian"],
    ["Eb Major", "C Minor", "G Phrygian", "F Dorian", "Bb Mixolydian", "D Locrian", "Ab Lydian"],
    ["E Major", "Db Minor", "Ab Phrygian", "Gb Dorian", "B Mixolydian", "Eb Locrian", "A Lydian"],
    ["F Major", "D Minor", "A Phrygian", "G Dorian", "C Mixolydian", "E Locrian", "Bb Lydian"],
    ["Gb Major", "Eb Minor", "Bb Phrygian", "Ab Dorian", "Db Mixolydian", "F Locrian", "B Lydian"],
    ["G Major", "E Minor", "B Phrygian", "A Dorian", "D Mixolydian", "Gb Locrian", "C Lydian"],
    ["Ab Major", "F Minor", "C Phrygian", "Bb Dorian", "Eb Mixolydian", "G Locrian", "Db Lydian"],
    ["A Major", "Gb Minor", "Db Phrygian", "B Dorian", "E Mixolydian", "Ab Locrian", "D Lydian"],
    ["Bb Major", "G Minor", "D Phrygian", "C Dorian", "F Mixolydian", "A Locrian", "Eb Lydian"],
    ["B Major", "Ab Minor", "Eb Phrygian", "Db Dorian", "Gb Mixolydian", "Bb Locrian", "E Lydian"],
];

/// The seven diatonic modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Ionian
    Major,
    /// Aeolian
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Major,
        Mode::Minor,
        Mode::Dorian,
        Mode::Phrygian,
        Mode::Lydian,
        Mode::Mixolydian,
        Mode::Locrian,
    ];

    /// Semitone intervals from the tonic to each scale degree.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Mode::Major => [0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
            Mode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Mode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Mode::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Mode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Mode::Locrian => [0, 1, 3, 5, 6, 8, 10],
        }
    }

    /// Where this mode's tonic sits inside its relative major scale
    /// (C Major → D Dorian is 2, → A Minor is 9).
    pub fn degree_in_major(self) -> u8 {
        match self {
            Mode::Major => 0,
            Mode::Dorian => 2,
            Mode::Phrygian => 4,
            Mode::Lydian => 5,
            Mode::Mixolydian => 7,
            Mode::Minor => 9,
            Mode::Locrian => 11,
        }
    }

    /// The Major or Minor scale a mode with the same root is derived from.
    /// Major and Minor are their own parents.
    pub fn parent(self) -> Mode {
        match self {
            Mode::Major | Mode::Lydian | Mode::Mixolydian => Mode::Major,
            Mode::Minor | Mode::Dorian | Mode::Phrygian | Mode::Locrian => Mode::Minor,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Major => "Major",
            Mode::Minor => "Minor",
            Mode::Dorian => "Dorian",
            Mode::Phrygian => "Phrygian",
            Mode::Lydian => "Lydian",
            Mode::Mixolydian => "Mixolydian",
            Mode::Locrian => "Locrian",
        }
    }

    /// Parse a mode word, case-insensitively. Ionian and Aeolian fold into
    /// Major and Minor.
    pub fn from_word(word: &str) -> Option<Mode> {
        match word.to_ascii_lowercase().as_str() {
            "major" | "maj" | "ionian" => Some(Mode::Major),
            "minor" | "min" | "m" | "aeolian" => Some(Mode::Minor),
            "dorian" => Some(Mode::Dorian),
            "phrygian" => Some(Mode::Phrygian),
            "lydian" => Some(Mode::Lydian),
            "mixolydian" => Some(Mode::Mixolydian),
            "locrian" => Some(Mode::Locrian),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully specified key. Serializes as its canonical text (`"Bb Minor+0.5"`)
/// and deserializes by parsing, so the root is always a pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    root: u8,
    mode: Mode,
    micro_offset: f64,
}

impl Key {
    pub fn new(root: u8, mode: Mode) -> Self {
        Self::with_offset(root, mode, 0.0)
    }

    pub fn with_offset(root: u8, mode: Mode, micro_offset: f64) -> Self {
        Key {
            root: root % 12,
            mode,
            micro_offset,
        }
    }

    /// Pitch class 0–11 (C=0).
    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Fractional detune in semitones, usually 0 or ±0.5.
    pub fn micro_offset(&self) -> f64 {
        self.micro_offset
    }

    /// Root plus micro offset, in semitones above C.
    pub fn tonic(&self) -> f64 {
        self.root as f64 + self.micro_offset
    }

    /// The seven scale pitches mod 12, ascending.
    pub fn note_set(&self) -> [f64; 7] {
        let tonic = self.tonic();
        let mut notes = self
            .mode
            .intervals()
            .map(|interval| (tonic + interval as f64).rem_euclid(12.0));
        notes.sort_by(|a, b| a.total_cmp(b));
        notes
    }

    /// Index of this key's signature in chromatic order (C Major = 0,
    /// Db Major = 1, ...). Relative keys share a position, and within a single
    /// mode the position is the root's distance from that mode's reference key.
    pub fn signature_position(&self) -> u8 {
        (self.root + 12 - self.mode.degree_in_major()) % 12
    }

    /// Signature position carrying the micro offset.
    pub fn signature_pitch(&self) -> f64 {
        self.signature_position() as f64 + self.micro_offset
    }

    pub fn root_name(&self) -> &'static str {
        ROOT_NAMES[self.root as usize]
    }

    /// Canonical "Root Mode" spelling without the micro offset.
    pub fn canonical_name(&self) -> String {
        format!("{} {}", self.root_name(), self.mode)
    }

    /// Index into [`RELATIVE_KEY_GROUPS`].
    pub fn relative_group(&self) -> Option<usize> {
        let name = self.canonical_name();
        RELATIVE_KEY_GROUPS
            .iter()
            .position(|group| group.contains(&name.as_str()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root_name(), self.mode)?;
        if self.micro_offset != 0.0 {
            write!(f, "{:+}", self.micro_offset)?;
        }
        Ok(())
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        match parse_key(&text) {
            KeyParse::Known(key) => Ok(key),
            KeyParse::Unknown | KeyParse::Malformed => Err(format!("'{}' is not a key", text)),
        }
    }
}

/// Outcome of parsing a catalog key string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyParse {
    Known(Key),
    /// An explicit "no information" marker.
    Unknown,
    /// Text that could not be read as a key; treated like `Unknown`.
    Malformed,
}

impl KeyParse {
    pub fn known(&self) -> Option<&Key> {
        match self {
            KeyParse::Known(key) => Some(key),
            KeyParse::Unknown | KeyParse::Malformed => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, KeyParse::Malformed)
    }
}

/// Parse a key string such as `"C#m"`, `"Eb Dorian"` or `"A#m+0.5"`.
pub fn parse_key(raw: &str) -> KeyParse {
    let trimmed = raw.trim();
    if UNKNOWN_MARKERS.contains(&trimmed) {
        return KeyParse::Unknown;
    }

    match parse_known(trimmed) {
        Some(key) => KeyParse::Known(key),
        None => KeyParse::Malformed,
    }
}

fn parse_known(text: &str) -> Option<Key> {
    let (body, micro_offset) = split_micro_offset(text)?;

    let mut words = body.split_whitespace();
    let root_token = words.next()?;
    let mode_word = words.next();
    if words.next().is_some() {
        return None;
    }

    let (root, suffix) = parse_root(root_token)?;
    let mode = match (suffix, mode_word) {
        ("", None) | ("maj", None) => Mode::Major,
        ("m", None) | ("min", None) => Mode::Minor,
        ("", Some(word)) => Mode::from_word(word)?,
        _ => return None,
    };

    Some(Key::with_offset(root, mode, micro_offset))
}

/// Split a trailing `+x` / `-x` detune off the key text.
fn split_micro_offset(text: &str) -> Option<(&str, f64)> {
    match text.rfind(|c| c == '+' || c == '-') {
        Some(pos) if pos > 0 => {
            let (body, offset) = text.split_at(pos);
            let value: f64 = offset.trim().parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            Some((body.trim_end(), value))
        }
        Some(_) => None,
        None => Some((text, 0.0)),
    }
}

/// Read a root letter and optional accidental, returning the pitch class and
/// whatever follows.
fn parse_root(token: &str) -> Option<(u8, &str)> {
    let mut chars = token.chars();
    let natural: i8 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, suffix) = if let Some(r) = rest.strip_prefix(|c| c == '#' || c == '♯') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix(|c| c == 'b' || c == '♭') {
        (-1, r)
    } else {
        (0, rest)
    };

    Some(((natural + accidental).rem_euclid(12) as u8, suffix))
}

/// Rewrite a key string to its canonical spelling.
///
/// Parseable keys come back as `"Root Mode"` with flats for black keys and
/// the micro offset re-attached (`"A#m+0.5"` → `"Bb Minor+0.5"`). Anything
/// else is returned trimmed but otherwise untouched, so the function is
/// idempotent over all input.
pub fn normalize(raw: &str) -> String {
    match parse_key(raw) {
        KeyParse::Known(key) => key.to_string(),
        KeyParse::Unknown | KeyParse::Malformed => raw.trim().to_string(),
    }
}

/// Wrap a semitone difference into `(-6, 6]`.
pub fn wrap_semitones(diff: f64) -> f64 {
    let wrapped = diff.rem_euclid(12.0);
    if wrapped > 6.0 {
        wrapped - 12.0
    } else {
        wrapped
    }
}

/// Every canonical key name, mode by mode, each in chromatic signature order.
pub fn all_key_names() -> Vec<String> {
    Mode::ALL
        .iter()
        .flat_map(|&mode| {
            (0..12u8).map(move |position| {
                Key::new((position + mode.degree_in_major()) % 12, mode).canonical_name()
            })
        })
        .collect()
}
