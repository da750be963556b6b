//! `npcz`: run ticks, generate, review and publish from the command line.
//!
//! ```bash
//! npcz --config npcz.toml tick --batch 10
//! npcz --timeline outside.json tick --json
//! npcz generate npc001
//! npcz review 1a2b3c4d approve --note "fine"
//! npcz publish
//! npcz queue
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use npcz_core::{NpczConfig, PersonaId, QueueStatus};
use npcz_llm::{OllamaGenerator, OllamaSettings};
use npcz_runtime::{DryRunPublisher, Engine, ExternalPost, StaticTimeline};
use tracing::info;

#[derive(Parser)]
#[command(name = "npcz", version, about = "Autonomous persona simulation")]
struct Cli {
    /// Configuration file; built-in defaults are used when it does not exist
    #[arg(short, long, default_value = "npcz.toml")]
    config: PathBuf,

    /// Enqueue everything as DRY_RUN regardless of configuration
    #[arg(long)]
    dry_run: bool,

    /// JSON file with outside-account posts for the external-reaction pass
    #[arg(long)]
    timeline: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one tick over the next slice of the roster
    Tick {
        /// Batch size (defaults to tick.batch_size)
        #[arg(short, long)]
        batch: Option<usize>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate one post for a resident now
    Generate {
        /// Resident id, e.g. npc001
        persona: String,
    },

    /// Approve or reject a pending entry
    Review {
        /// Queue entry id
        entry: String,

        /// approve | reject
        decision: String,

        /// Review note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Publish every approved entry
    Publish,

    /// Show queue counts per status
    Queue,
}

fn load_config(path: &Path) -> anyhow::Result<NpczConfig> {
    if path.exists() {
        NpczConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
    } else {
        Ok(NpczConfig::default())
    }
}

fn load_timeline(path: &Path) -> anyhow::Result<StaticTimeline> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let posts: Vec<ExternalPost> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(StaticTimeline::new(posts))
}

fn init_tracing(default_level: &str, json: bool) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if cli.dry_run {
        config.general.dry_run = true;
    }
    init_tracing(&config.general.log_level, config.general.log_json);

    let llm = &config.llm;
    let generator = Arc::new(OllamaGenerator::new(OllamaSettings {
        base_url: llm.base_url.clone(),
        model: llm.model.clone(),
        temperature: llm.temperature,
        timeout_ms: llm.request_timeout_ms,
        ..OllamaSettings::default()
    }));
    let mut engine = Engine::open(config, generator, Arc::new(DryRunPublisher::new()))
        .context("opening storage root")?;
    if let Some(path) = &cli.timeline {
        engine = engine.with_timeline(Arc::new(load_timeline(path)?));
    }

    match cli.command {
        Command::Tick { batch, json } => {
            let batch = batch.unwrap_or(engine.config().tick.batch_size);
            let summary = engine.tick(batch).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
        Command::Generate { persona } => {
            let id: PersonaId = persona.parse().with_context(|| format!("bad resident id {persona}"))?;
            let entry = engine.generate_for(id).await?;
            println!("{} [{}] {}", entry.id, entry.status, entry.content);
        }
        Command::Review { entry, decision, note } => {
            let entry = engine.review(&entry, &decision, note)?;
            println!("{} -> {}", entry.id, entry.status);
        }
        Command::Publish => {
            let published = engine.publish_approved().await?;
            info!(published, "Publish run finished");
            println!("published {published}");
        }
        Command::Queue => {
            let summary = engine.queue().summary();
            for status in QueueStatus::ALL {
                println!("{status:>8}  {}", summary.get(&status).copied().unwrap_or(0));
            }
        }
    }
    Ok(())
}
