//! mashup - suggest and administer song mashups
//!
//! Subcommands:
//! - `mashup gen` - Draw a batch of compatible (source, target) pairs
//! - `mashup ban add|remove|list|seed` - Manage banned combos
//! - `mashup semitones <from> <to>` - Distance between two keys
//! - `mashup keys <partial>` - Complete a key name
//! - `mashup songs <sources|targets> [partial]` - Browse the catalogs
//! - `mashup config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mashconf::MashConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mashup")]
#[command(about = "Mashup compatibility engine: key relationships, tempo windows, pair suggestions")]
#[command(version)]
struct Cli {
    /// Config file, loaded after the system and user configs
    #[arg(short, long, global = true, env = "MASHUP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate mashup suggestions
    Gen {
        /// Pairs to request (default from config)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Draw budget for the whole batch (default from config)
        #[arg(short, long)]
        attempts: Option<usize>,

        /// Seed for reproducible batches
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print pairs as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage banned combos
    Ban {
        #[command(subcommand)]
        action: BanAction,
    },

    /// Semitones needed to pitch one key to another
    Semitones {
        /// Key of the song being pitched
        from: String,

        /// Key to land on
        to: String,
    },

    /// Complete a key name
    Keys {
        /// Partial key text (e.g. "f#", "dor")
        #[arg(default_value = "")]
        partial: String,
    },

    /// List or search catalog titles
    Songs {
        /// Which catalog
        #[arg(value_enum)]
        catalog: CatalogKind,

        /// Case-insensitive title fragment
        partial: Option<String>,
    },

    /// Show the effective configuration and where it came from
    Config,
}

#[derive(Subcommand)]
enum BanAction {
    /// Ban a (source, target) combo
    Add { source: String, target: String },

    /// Lift a ban
    Remove { source: String, target: String },

    /// List every banned combo
    List,

    /// Insert the catalog's default bans
    Seed,
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogKind {
    Sources,
    Targets,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = MashConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.telemetry.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Gen {
            count,
            attempts,
            seed,
            json,
        } => {
            commands::generate(&config, count, attempts, seed, json).await?;
        }
        Commands::Ban { action } => match action {
            BanAction::Add { source, target } => {
                commands::ban_add(&config, &source, &target).await?;
            }
            BanAction::Remove { source, target } => {
                commands::ban_remove(&config, &source, &target).await?;
            }
            BanAction::List => {
                commands::ban_list(&config).await?;
            }
            BanAction::Seed => {
                commands::ban_seed(&config).await?;
            }
        },
        Commands::Semitones { from, to } => {
            commands::semitones(&from, &to);
        }
        Commands::Keys { partial } => {
            commands::keys(&partial);
        }
        Commands::Songs { catalog, partial } => {
            let targets = matches!(catalog, CatalogKind::Targets);
            commands::songs(&config, targets, partial.as_deref())?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources);
        }
    }

    Ok(())
}
