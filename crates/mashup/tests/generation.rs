//! Integration tests for batch generation.
//!
//! These tests verify:
//! - Accepted pairs respect the banned snapshot and never repeat
//! - Batches stop at the target count or the attempt budget
//! - A failing store aborts the batch instead of sampling blind

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use mashconf::{GenerationConfig, ToleranceConfig};
use mashup::{
    BannedCombo, BannedComboStore, Catalog, CatalogSet, MemoryBannedStore, PairGenerator, Song,
    StoreError,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn single_pair_catalogs() -> Result<CatalogSet> {
    Ok(CatalogSet::new(
        Catalog::new("sources", vec![Song::new("SongX", 128.0, "C Major")])?,
        Catalog::new("targets", vec![Song::new("SongY", 64.0, "A Minor")])?,
    ))
}

fn default_generator() -> PairGenerator {
    PairGenerator::new(&ToleranceConfig::default(), GenerationConfig::default())
}

/// Store whose reads always fail.
struct UnreachableStore;

#[async_trait]
impl BannedComboStore for UnreachableStore {
    async fn fetch_all(&self) -> Result<HashSet<BannedCombo>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn add(&self, _combo: &BannedCombo) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn remove(&self, _combo: &BannedCombo) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_relative_key_at_half_time_is_suggested() -> Result<()> {
    let catalogs = single_pair_catalogs()?;
    let store = MemoryBannedStore::new();
    let mut rng = StdRng::seed_from_u64(42);

    let pairs = default_generator()
        .generate(&catalogs, &store, 1, 1000, &mut rng)
        .await?;

    assert_eq!(pairs.len(), 1);
    let pair = &pairs[0];
    assert_eq!(pair.source, "SongX");
    assert_eq!(pair.source_bpm, 128.0);
    assert_eq!(pair.source_key, "C Major");
    assert_eq!(pair.target, "SongY");
    assert_eq!(pair.target_bpm, 64.0);
    assert_eq!(pair.target_key, "A Minor");
    assert_eq!(pair.shift, 0.0);

    Ok(())
}

#[tokio::test]
async fn test_banned_pair_is_never_suggested() -> Result<()> {
    let catalogs = single_pair_catalogs()?;
    let store = MemoryBannedStore::with_combos([BannedCombo::new("SongX", "SongY")]);
    let mut rng = StdRng::seed_from_u64(42);

    let pairs = default_generator()
        .generate(&catalogs, &store, 1, 5000, &mut rng)
        .await?;

    assert!(pairs.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reversed_ban_does_not_block_pair() -> Result<()> {
    let catalogs = single_pair_catalogs()?;
    let store = MemoryBannedStore::with_combos([BannedCombo::new("SongY", "SongX")]);
    let mut rng = StdRng::seed_from_u64(3);

    let pairs = default_generator()
        .generate(&catalogs, &store, 1, 100, &mut rng)
        .await?;

    assert_eq!(pairs.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_full_cartesian_ban_yields_empty_batch() -> Result<()> {
    let catalogs = CatalogSet::builtin()?;
    let store = MemoryBannedStore::with_combos(catalogs.all_combos());
    let mut rng = StdRng::seed_from_u64(9);

    let pairs = default_generator()
        .generate(&catalogs, &store, 5, 1000, &mut rng)
        .await?;

    assert!(pairs.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_store_failure_aborts_batch() -> Result<()> {
    let catalogs = single_pair_catalogs()?;
    let mut rng = StdRng::seed_from_u64(1);

    let result = default_generator()
        .generate(&catalogs, &UnreachableStore, 1, 1000, &mut rng)
        .await;

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    Ok(())
}

#[tokio::test]
async fn test_batch_is_bounded_unique_and_respects_bans() -> Result<()> {
    let catalogs = CatalogSet::builtin()?;
    let banned: HashSet<BannedCombo> = catalogs.default_bans.iter().cloned().collect();
    let store = MemoryBannedStore::with_combos(banned.clone());

    // Lift both rules so most draws are acceptable and duplicates get drawn
    let generator = PairGenerator::new(
        &ToleranceConfig::default(),
        GenerationConfig {
            ignore_key_rules: true,
            ignore_bpm_rules: true,
            ..GenerationConfig::default()
        },
    );

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let target_count = 1 + (seed as usize % 12);
        let pairs = generator
            .generate(&catalogs, &store, target_count, 500, &mut rng)
            .await?;

        assert_eq!(pairs.len(), target_count, "seed {}", seed);

        let combos: HashSet<BannedCombo> = pairs.iter().map(|p| p.combo()).collect();
        assert_eq!(combos.len(), pairs.len(), "duplicate pair for seed {}", seed);
        assert!(combos.is_disjoint(&banned), "banned pair for seed {}", seed);
    }

    Ok(())
}

#[tokio::test]
async fn test_attempt_budget_is_shared_across_batch() -> Result<()> {
    // 1x1 catalog: the first draw is accepted, every later draw is a duplicate
    let catalogs = single_pair_catalogs()?;
    let store = MemoryBannedStore::new();
    let mut rng = StdRng::seed_from_u64(5);

    let pairs = default_generator()
        .generate(&catalogs, &store, 10, 50, &mut rng)
        .await?;

    assert_eq!(pairs.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_default_constraints_only_accept_judged_pairs() -> Result<()> {
    let catalogs = CatalogSet::builtin()?;
    let store = MemoryBannedStore::new();
    let generator = default_generator();

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let pairs = generator
            .generate(&catalogs, &store, 5, 1000, &mut rng)
            .await?;
        assert!(pairs.len() <= 5);

        for pair in pairs {
            let a = catalogs.sources.get(&pair.source).expect("source title");
            let b = catalogs.targets.get(&pair.target).expect("target title");
            let judged = generator.judge(&catalogs, a, b);
            assert_eq!(judged.as_ref().ok(), Some(&pair));
        }
    }

    Ok(())
}
