//! Song catalogs and per-song tolerance overrides.
//!
//! A catalog file is TOML:
//!
//! ```toml
//! [[sources]]
//! title = "Creo - Atmosphere"
//! bpm = 128
//! key = "F#m"
//! semitone_window = [3, 3]
//!
//! [[targets]]
//! title = "Imagine Dragons - Bones"
//! bpm = 114
//! key = "A#m"
//! bpm_window = [8, 12]
//!
//! [[banned]]
//! source = "Creo - Atmosphere"
//! target = "Imagine Dragons - Bones"
//! ```
//!
//! Sources own the semitone window (they are song A when resolving keys),
//! targets own the bpm window (they are song B when matching tempo).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use mashconf::ToleranceWindow;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::fuzzy;
use crate::key::{parse_key, KeyParse};
use crate::store::BannedCombo;

/// Autocomplete results are capped at this many titles.
pub const SUGGESTION_LIMIT: usize = 25;

const BUILTIN_CATALOG: &str = include_str!("../data/builtin.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Song '{title}' has a non-positive bpm ({bpm})")]
    InvalidBpm { title: String, bpm: f64 },

    #[error("Song '{title}' appears twice in the {catalog} catalog")]
    DuplicateTitle { catalog: String, title: String },

    #[error("Song '{title}' has an invalid tolerance window [{down}, {up}]")]
    InvalidWindow { title: String, down: f64, up: f64 },
}

/// One catalog entry. The raw key text is kept for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub title: String,
    pub bpm: f64,
    pub key_text: String,
    pub key: KeyParse,
}

impl Song {
    pub fn new(title: impl Into<String>, bpm: f64, key_text: impl Into<String>) -> Self {
        let key_text = key_text.into();
        let key = parse_key(&key_text);
        Self {
            title: title.into(),
            bpm,
            key_text,
            key,
        }
    }
}

/// An ordered list of songs with unique titles.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    name: String,
    songs: Vec<Song>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, songs: Vec<Song>) -> Result<Self, CatalogError> {
        let name = name.into();
        let mut index = HashMap::with_capacity(songs.len());

        for (position, song) in songs.iter().enumerate() {
            if !(song.bpm > 0.0 && song.bpm.is_finite()) {
                return Err(CatalogError::InvalidBpm {
                    title: song.title.clone(),
                    bpm: song.bpm,
                });
            }
            if index.insert(song.title.clone(), position).is_some() {
                return Err(CatalogError::DuplicateTitle {
                    catalog: name.clone(),
                    title: song.title.clone(),
                });
            }
            if song.key.is_malformed() {
                warn!(
                    catalog = %name,
                    title = %song.title,
                    key = %song.key_text,
                    "Unparseable key, treating as unknown"
                );
            }
        }

        Ok(Self { name, songs, index })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, title: &str) -> Option<&Song> {
        self.index.get(title).map(|&i| &self.songs[i])
    }

    pub fn contains(&self, title: &str) -> bool {
        self.index.contains_key(title)
    }

    /// Titles matching `partial`, case-insensitively: prefix and substring
    /// matches in catalog order, then close misspellings.
    pub fn suggest(&self, partial: &str) -> Vec<&str> {
        let titles: Vec<&str> = self.songs.iter().map(|song| song.title.as_str()).collect();
        fuzzy::rank(partial, &titles, SUGGESTION_LIMIT)
    }
}

/// Both catalogs plus everything keyed by title that travels with them.
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    pub sources: Catalog,
    pub targets: Catalog,
    /// Source title → semitone search window.
    pub semitone_overrides: HashMap<String, ToleranceWindow>,
    /// Target title → bpm window.
    pub bpm_overrides: HashMap<String, ToleranceWindow>,
    /// Bans a fresh store is seeded with.
    pub default_bans: BTreeSet<BannedCombo>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sources: Vec<SongEntry>,
    #[serde(default)]
    targets: Vec<SongEntry>,
    #[serde(default)]
    banned: Vec<BannedCombo>,
}

#[derive(Debug, Deserialize)]
struct SongEntry {
    title: String,
    bpm: f64,
    #[serde(default)]
    key: String,
    #[serde(default)]
    semitone_window: Option<(f64, f64)>,
    #[serde(default)]
    bpm_window: Option<(f64, f64)>,
}

impl CatalogSet {
    /// Build a set from two catalogs with no overrides or default bans.
    pub fn new(sources: Catalog, targets: Catalog) -> Self {
        Self {
            sources,
            targets,
            ..Self::default()
        }
    }

    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load from `path` if given, otherwise the builtin catalog.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents)?;

        let mut semitone_overrides = HashMap::new();
        let mut sources = Vec::with_capacity(file.sources.len());
        for entry in file.sources {
            if let Some(window) = entry.semitone_window {
                semitone_overrides.insert(entry.title.clone(), to_window(&entry.title, window)?);
            }
            if entry.bpm_window.is_some() {
                warn!(title = %entry.title, "bpm_window on a source song is ignored");
            }
            sources.push(Song::new(entry.title, entry.bpm, entry.key));
        }

        let mut bpm_overrides = HashMap::new();
        let mut targets = Vec::with_capacity(file.targets.len());
        for entry in file.targets {
            if let Some(window) = entry.bpm_window {
                bpm_overrides.insert(entry.title.clone(), to_window(&entry.title, window)?);
            }
            if entry.semitone_window.is_some() {
                warn!(title = %entry.title, "semitone_window on a target song is ignored");
            }
            targets.push(Song::new(entry.title, entry.bpm, entry.key));
        }

        let sources = Catalog::new("sources", sources)?;
        let targets = Catalog::new("targets", targets)?;

        let mut default_bans = BTreeSet::new();
        for combo in file.banned {
            if !sources.contains(&combo.source) || !targets.contains(&combo.target) {
                warn!(
                    source = %combo.source,
                    target = %combo.target,
                    "Default ban does not name a source and a target, skipping"
                );
                continue;
            }
            default_bans.insert(combo);
        }

        Ok(Self {
            sources,
            targets,
            semitone_overrides,
            bpm_overrides,
            default_bans,
        })
    }

    pub fn semitone_window(&self, source_title: &str) -> Option<ToleranceWindow> {
        self.semitone_overrides.get(source_title).copied()
    }

    pub fn bpm_window(&self, target_title: &str) -> Option<ToleranceWindow> {
        self.bpm_overrides.get(target_title).copied()
    }

    /// Every (source, target) pair, for building exhaustive ban sets.
    pub fn all_combos(&self) -> HashSet<BannedCombo> {
        self.sources
            .songs()
            .iter()
            .flat_map(|a| {
                self.targets
                    .songs()
                    .iter()
                    .map(move |b| BannedCombo::new(&a.title, &b.title))
            })
            .collect()
    }
}

fn to_window(title: &str, (down, up): (f64, f64)) -> Result<ToleranceWindow, CatalogError> {
    if down < 0.0 || up < 0.0 || !down.is_finite() || !up.is_finite() {
        return Err(CatalogError::InvalidWindow {
            title: title.to_string(),
            down,
            up,
        });
    }
    Ok(ToleranceWindow::new(down, up))
}
