//! Rejection sampling over the two catalogs.

use std::collections::HashSet;
use std::fmt;

use mashconf::{GenerationConfig, IndeterminatePolicy, ToleranceConfig};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogSet, Song};
use crate::key::normalize;
use crate::relation::{RelationshipResolver, Verdict};
use crate::store::{BannedCombo, BannedComboStore, StoreError};
use crate::tempo::TempoMatcher;

/// A suggested mashup. `shift` is the transposition to apply to the target
/// song, in semitones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedPair {
    pub source: String,
    pub source_bpm: f64,
    pub source_key: String,
    pub target: String,
    pub target_bpm: f64,
    pub target_key: String,
    pub shift: f64,
}

impl AcceptedPair {
    pub fn combo(&self) -> BannedCombo {
        BannedCombo::new(&self.source, &self.target)
    }
}

/// Why a drawn candidate was thrown away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    Banned,
    Duplicate,
    KeyIncompatible { shift: f64 },
    KeyIndeterminate,
    Tempo,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Banned => write!(f, "banned combo"),
            Rejection::Duplicate => write!(f, "already suggested"),
            Rejection::KeyIncompatible { shift } => {
                write!(f, "keys unrelated ({:+} semitones apart)", shift)
            }
            Rejection::KeyIndeterminate => write!(f, "key unknown"),
            Rejection::Tempo => write!(f, "tempo out of range"),
        }
    }
}

pub struct PairGenerator {
    resolver: RelationshipResolver,
    tempo: TempoMatcher,
    config: GenerationConfig,
}

impl PairGenerator {
    pub fn new(tolerance: &ToleranceConfig, config: GenerationConfig) -> Self {
        Self::with_parts(
            RelationshipResolver::new(tolerance),
            TempoMatcher::new(tolerance),
            config,
        )
    }

    pub fn with_parts(
        resolver: RelationshipResolver,
        tempo: TempoMatcher,
        config: GenerationConfig,
    ) -> Self {
        Self {
            resolver,
            tempo,
            config,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Draw up to `target_count` compatible pairs using at most
    /// `max_attempts` draws for the whole batch.
    ///
    /// The banned set is fetched once, before any sampling. If that fetch
    /// fails nothing is generated and the error is returned. Running out of
    /// attempts is not an error: the result may be short or empty.
    pub async fn generate<R: Rng + ?Sized>(
        &self,
        catalogs: &CatalogSet,
        store: &dyn BannedComboStore,
        target_count: usize,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<Vec<AcceptedPair>, StoreError> {
        let banned = store.fetch_all().await?;
        Ok(self.sample(catalogs, &banned, target_count, max_attempts, rng))
    }

    /// The synchronous sampling loop over a banned-set snapshot.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        catalogs: &CatalogSet,
        banned: &HashSet<BannedCombo>,
        target_count: usize,
        max_attempts: usize,
        rng: &mut R,
    ) -> Vec<AcceptedPair> {
        let sources = catalogs.sources.songs();
        let targets = catalogs.targets.songs();

        let mut accepted = Vec::new();
        if sources.is_empty() || targets.is_empty() {
            debug!("Empty catalog, nothing to sample");
            return accepted;
        }

        let mut seen = HashSet::new();
        let mut remaining = max_attempts;

        while accepted.len() < target_count && remaining > 0 {
            remaining -= 1;

            let a = &sources[rng.gen_range(0..sources.len())];
            let b = &targets[rng.gen_range(0..targets.len())];
            let combo = BannedCombo::new(&a.title, &b.title);

            let verdict = if banned.contains(&combo) {
                Err(Rejection::Banned)
            } else if seen.contains(&combo) {
                Err(Rejection::Duplicate)
            } else {
                self.judge(catalogs, a, b)
            };

            match verdict {
                Ok(pair) => {
                    debug!(source = %a.title, target = %b.title, shift = pair.shift, "Accepted pair");
                    seen.insert(combo);
                    accepted.push(pair);
                }
                Err(rejection) => {
                    debug!(source = %a.title, target = %b.title, reason = %rejection, "Rejected pair");
                }
            }
        }

        info!(
            accepted = accepted.len(),
            requested = target_count,
            attempts = max_attempts - remaining,
            banned = banned.len(),
            "Generated mashup suggestions"
        );

        accepted
    }

    /// Judge one candidate on key and tempo alone, ignoring bans.
    pub fn judge(&self, catalogs: &CatalogSet, a: &Song, b: &Song) -> Result<AcceptedPair, Rejection> {
        let shift = if self.config.ignore_key_rules {
            0.0
        } else {
            let window = catalogs.semitone_window(&a.title);
            match self.resolver.resolve(&a.key, &b.key, window) {
                Verdict::Compatible { shift, .. } => shift,
                Verdict::Incompatible { shift } => {
                    return Err(Rejection::KeyIncompatible { shift });
                }
                Verdict::Indeterminate => match self.config.indeterminate {
                    IndeterminatePolicy::Compatible => 0.0,
                    IndeterminatePolicy::Reject => return Err(Rejection::KeyIndeterminate),
                },
            }
        };

        if !self.config.ignore_bpm_rules
            && !self.tempo.bpm_ok(a.bpm, b.bpm, catalogs.bpm_window(&b.title))
        {
            return Err(Rejection::Tempo);
        }

        Ok(AcceptedPair {
            source: a.title.clone(),
            source_bpm: a.bpm,
            source_key: normalize(&a.key_text),
            target: b.title.clone(),
            target_bpm: b.bpm,
            target_key: normalize(&b.key_text),
            shift,
        })
    }
}
