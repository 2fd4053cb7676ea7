//! questctl
//!
//! Loads the content packs named in a framework config and prints quest,
//! statistics and offer reports against the persisted stats.
//!
//! Usage:
//!   questctl --config quests.toml quests
//!   questctl --config quests.toml stats 1 summary
//!   questctl --config quests.toml offers 1 --date 2024-03-04T08:00:00Z

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use quest_framework::stats::JsonFileStatsStore;
use quest_framework::{commands, ContentPack, FrameworkConfig, QuestFramework};

#[derive(Parser, Debug)]
#[command(name = "questctl", about = "Inspect managed quests, offers and quest statistics")]
struct Args {
    /// Framework config file
    #[arg(short, long, value_name = "FILE", default_value = "quests.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every quest under management
    Quests,
    /// Show quest statistics of a player
    Stats {
        player: String,
        /// accepted, completed, removed, summary, or a quest name
        choice: Option<String>,
    },
    /// List the offers on the board for a player
    Offers {
        player: String,
        /// Evaluate at this time instead of now
        #[arg(long)]
        date: Option<DateTime<Utc>>,
    },
}

fn load_pack(path: &Path) -> Result<ContentPack> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading content pack {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing content pack {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = FrameworkConfig::load_from_file(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_filter.parse()?),
        )
        .init();

    let mut framework = QuestFramework::new(config.clone());

    for path in &config.content {
        match load_pack(path) {
            Ok(pack) => {
                if let Err(e) = framework.load_content(&pack) {
                    error!("Failed to register content pack {:?}: {}", path, e);
                }
            }
            Err(e) => error!("{:#}", e),
        }
    }
    info!("{} quest templates registered", framework.store().len());

    let stats_store = JsonFileStatsStore::new(&config.stats_dir);

    match args.command {
        Command::Quests => {
            print!("{}", commands::list_quests(&framework));
        }
        Command::Stats { player, choice } => {
            framework.load_stats(&stats_store, &player)?;
            print!("{}", commands::quest_stats(&framework, &player, choice.as_deref()));
        }
        Command::Offers { player, date } => {
            let as_of = date.unwrap_or_else(Utc::now);
            let offers = framework.compute_offers(&player, as_of)?;
            println!("{} quest offers for player {}:", offers.len(), player);
            for offer in offers {
                println!(
                    "{}\t{}\t(offered by {})",
                    offer.full_name(),
                    offer.schedule.as_str(),
                    offer.owner_id
                );
            }
        }
    }

    Ok(())
}
