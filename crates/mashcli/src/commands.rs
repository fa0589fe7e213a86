//! CLI command implementations

use anyhow::{Context, Result};
use mashconf::{ConfigSources, MashConfig};
use mashup::{calculate_semitones, render_pairs, suggest_keys, CatalogSet, MashupEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn open_engine(config: &MashConfig) -> Result<MashupEngine> {
    MashupEngine::open(config).context("Failed to open mashup engine")
}

/// Draw one batch and print it
pub async fn generate(
    config: &MashConfig,
    count: Option<usize>,
    attempts: Option<usize>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let engine = open_engine(config)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let target_count = count.unwrap_or(config.generation.target_count);
    let max_attempts = attempts.unwrap_or(config.generation.max_attempts);

    let pairs = engine
        .suggest_with(target_count, max_attempts, &mut rng)
        .await
        .context("Could not read banned combos, try again")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pairs)?);
    } else {
        println!("{}", render_pairs(&pairs));
    }

    Ok(())
}

pub async fn ban_add(config: &MashConfig, source: &str, target: &str) -> Result<()> {
    let combo = open_engine(config)?.ban(source, target).await?;
    println!("Banned {}", combo);
    Ok(())
}

pub async fn ban_remove(config: &MashConfig, source: &str, target: &str) -> Result<()> {
    let combo = open_engine(config)?.unban(source, target).await?;
    println!("Unbanned {}", combo);
    Ok(())
}

pub async fn ban_list(config: &MashConfig) -> Result<()> {
    let banned = open_engine(config)?.banned().await?;
    if banned.is_empty() {
        println!("No banned combos.");
    }
    for combo in banned {
        println!("{}", combo);
    }
    Ok(())
}

pub async fn ban_seed(config: &MashConfig) -> Result<()> {
    let engine = open_engine(config)?;
    let added = engine.seed_default_bans().await?;
    println!(
        "Added {} of {} default bans",
        added,
        engine.catalogs().default_bans.len()
    );
    Ok(())
}

pub fn semitones(from: &str, to: &str) {
    println!("{}", calculate_semitones(from, to));
}

pub fn keys(partial: &str) {
    for name in suggest_keys(partial) {
        println!("{}", name);
    }
}

/// Print matching titles with their tempo and key, or the whole catalog
pub fn songs(config: &MashConfig, targets: bool, partial: Option<&str>) -> Result<()> {
    let catalogs = CatalogSet::load_or_builtin(config.paths.catalog.as_deref())
        .context("Failed to load catalog")?;
    let catalog = if targets {
        &catalogs.targets
    } else {
        &catalogs.sources
    };

    let titles: Vec<&str> = match partial {
        Some(partial) => catalog.suggest(partial),
        None => catalog.songs().iter().map(|s| s.title.as_str()).collect(),
    };
    if titles.is_empty() {
        println!("No {} match '{}'.", catalog.name(), partial.unwrap_or_default());
    }

    for title in titles {
        if let Some(song) = catalog.get(title) {
            let key = if song.key_text.trim().is_empty() {
                "?"
            } else {
                song.key_text.as_str()
            };
            println!("{} ({} BPM, {})", song.title, song.bpm, key);
        }
    }
    Ok(())
}

pub fn show_config(config: &MashConfig, sources: &ConfigSources) {
    if sources.files.is_empty() {
        println!("# No config files found, using defaults");
    }
    for path in &sources.files {
        println!("# Loaded: {}", path.display());
    }
    for var in &sources.env_overrides {
        println!("# Override: {}", var);
    }
    println!();
    print!("{}", config.to_toml());
}
