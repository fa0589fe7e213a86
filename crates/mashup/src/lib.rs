//! Mashup compatibility engine.
//!
//! Given a catalog of source songs and a catalog of target songs, decides
//! whether a (source, target) pair can be mixed and by how many semitones
//! the target must move, then samples the catalogs for a batch of mixable
//! pairs that avoids every banned combo.
//!
//! - [`key`] parses key text into a root, mode and micro offset.
//! - [`relation`] runs the ordered relationship rules over two keys.
//! - [`tempo`] checks tempos with half and double time allowed.
//! - [`generator`] draws candidate pairs under a shared attempt budget.
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use mashup::MashupEngine;
//!
//! let config = mashconf::MashConfig::load()?;
//! let engine = MashupEngine::open(&config)?;
//!
//! let mut rng = rand::thread_rng();
//! for pair in engine.suggest(&mut rng).await? {
//!     println!("{}", pair);
//! }
//! # Ok(())
//! # }
//! ```

pub mod calculator;
pub mod catalog;
mod fuzzy;
pub mod generator;
pub mod key;
pub mod relation;
pub mod render;
pub mod store;
pub mod tempo;

pub use calculator::{calculate_semitones, suggest_keys, SemitoneCalculation};
pub use catalog::{Catalog, CatalogError, CatalogSet, Song};
pub use generator::{AcceptedPair, PairGenerator, Rejection};
pub use key::{normalize, parse_key, Key, KeyParse, Mode};
pub use relation::{Relationship, RelationshipResolver, RelationshipRule, Verdict};
pub use render::render_pairs;
pub use store::{BannedCombo, BannedComboStore, MemoryBannedStore, SqliteBannedStore, StoreError};
pub use tempo::{TempoMatch, TempoMatcher};

use std::sync::Arc;

use mashconf::{GenerationConfig, MashConfig, ToleranceConfig};
use rand::Rng;
use thiserror::Error;
use tracing::info;

/// Errors opening an engine from configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from ban administration.
#[derive(Debug, Error)]
pub enum BanError {
    #[error("'{0}' is not in the source catalog")]
    UnknownSource(String),

    #[error("'{0}' is not in the target catalog")]
    UnknownTarget(String),

    #[error("{0} is already banned")]
    AlreadyBanned(BannedCombo),

    #[error("{0} is not banned")]
    NotBanned(BannedCombo),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Catalogs, the banned-combo store and the pair generator in one place.
pub struct MashupEngine {
    catalogs: CatalogSet,
    store: Arc<dyn BannedComboStore>,
    generator: PairGenerator,
}

impl MashupEngine {
    pub fn new(
        catalogs: CatalogSet,
        store: Arc<dyn BannedComboStore>,
        tolerance: &ToleranceConfig,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            catalogs,
            store,
            generator: PairGenerator::new(tolerance, generation),
        }
    }

    /// Load the configured catalog (or the builtin one) and open the
    /// SQLite banned-combo store.
    pub fn open(config: &MashConfig) -> Result<Self, EngineError> {
        let catalogs = CatalogSet::load_or_builtin(config.paths.catalog.as_deref())?;
        let db_path = config.paths.banned_db_path();
        let store = SqliteBannedStore::open(&db_path)?;

        info!(
            sources = catalogs.sources.len(),
            targets = catalogs.targets.len(),
            db = %db_path.display(),
            "Mashup engine ready"
        );

        Ok(Self::new(
            catalogs,
            Arc::new(store),
            &config.tolerance,
            config.generation,
        ))
    }

    pub fn catalogs(&self) -> &CatalogSet {
        &self.catalogs
    }

    /// A batch sized by the configured target count and attempt budget.
    pub async fn suggest<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<AcceptedPair>, StoreError> {
        let config = self.generator.config();
        self.suggest_with(config.target_count, config.max_attempts, rng)
            .await
    }

    pub async fn suggest_with<R: Rng + ?Sized>(
        &self,
        target_count: usize,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<Vec<AcceptedPair>, StoreError> {
        self.generator
            .generate(&self.catalogs, self.store.as_ref(), target_count, max_attempts, rng)
            .await
    }

    /// Ban a (source, target) combo. Both titles must exist in their catalogs.
    pub async fn ban(&self, source: &str, target: &str) -> Result<BannedCombo, BanError> {
        let combo = self.validated_combo(source, target)?;
        if !self.store.add(&combo).await? {
            return Err(BanError::AlreadyBanned(combo));
        }
        info!(source, target, "Banned combo");
        Ok(combo)
    }

    pub async fn unban(&self, source: &str, target: &str) -> Result<BannedCombo, BanError> {
        let combo = BannedCombo::new(source, target);
        if !self.store.remove(&combo).await? {
            return Err(BanError::NotBanned(combo));
        }
        info!(source, target, "Unbanned combo");
        Ok(combo)
    }

    /// Every banned combo, sorted by source then target.
    pub async fn banned(&self) -> Result<Vec<BannedCombo>, StoreError> {
        let mut combos: Vec<_> = self.store.fetch_all().await?.into_iter().collect();
        combos.sort();
        Ok(combos)
    }

    /// Insert the catalog's default bans that are not already present.
    /// Returns how many were added.
    pub async fn seed_default_bans(&self) -> Result<usize, StoreError> {
        let mut added = 0;
        for combo in &self.catalogs.default_bans {
            if self.store.add(combo).await? {
                added += 1;
            }
        }
        info!(
            added,
            defaults = self.catalogs.default_bans.len(),
            "Seeded default bans"
        );
        Ok(added)
    }

    fn validated_combo(&self, source: &str, target: &str) -> Result<BannedCombo, BanError> {
        if !self.catalogs.sources.contains(source) {
            return Err(BanError::UnknownSource(source.to_string()));
        }
        if !self.catalogs.targets.contains(target) {
            return Err(BanError::UnknownTarget(target.to_string()));
        }
        Ok(BannedCombo::new(source, target))
    }
}
