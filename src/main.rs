use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use prettytable::{Cell, Row as PrettyRow, Table};
use std::path::PathBuf;
use tracing::info;

use threadtally::environment::{available_workers, PipelineConfig, DEFAULT_DATA_DIR};
use threadtally::logging::configure_logging;
use threadtally::pipeline::{write_summary_json, Pipeline, RunSummary};
use threadtally::TARGET_PIPELINE;

#[derive(Parser)]
#[command(author, version, about = "Rank audio products by how threads talk about them", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Settings {
    /// Root of the processed/ and reference/ table directories
    #[arg(long, global = true, env = "THREADTALLY_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Alias reference table (defaults to <data-dir>/reference/model_aliases.csv)
    #[arg(long, global = true, env = "THREADTALLY_ALIASES")]
    aliases: Option<PathBuf>,

    /// Worker threads for extraction (defaults to available cores)
    #[arg(long, global = true, env = "THREADTALLY_WORKERS")]
    workers: Option<usize>,

    /// Extra brand spellings appended to the built-in catalog
    #[arg(long, global = true, env = "THREADTALLY_EXTRA_BRANDS", value_delimiter = ';')]
    extra_brands: Vec<String>,

    /// Also write the run summary as JSON
    #[arg(long, global = true)]
    summary_json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract mentions and candidate tokens from the documents table
    Extract,

    /// Aggregate the mentions table into per-identity votes
    Score,

    /// Merge one or more votes tables into the ranked table
    Rank {
        /// Votes tables to merge (defaults to <data-dir>/processed/votes.csv)
        votes: Vec<PathBuf>,

        /// Also write the full ranking as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Extract, score and rank in one pass
    Run {
        /// Also write the full ranking as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

impl Settings {
    fn config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::new(&self.data_dir)
            .with_workers(self.workers.unwrap_or_else(available_workers))?
            .with_extra_brands(
                self.extra_brands
                    .iter()
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect(),
            );
        if let Some(aliases) = &self.aliases {
            config = config.with_aliases(aliases);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    configure_logging();

    let cli = Cli::parse();
    let config = cli.settings.config()?;
    let pipeline = Pipeline::from_config(&config).context("Failed to set up pipeline")?;

    let summary = match &cli.command {
        Commands::Extract => pipeline.run_extract(&config)?,
        Commands::Score => pipeline.run_score(&config)?,
        Commands::Rank { votes, json } => {
            pipeline.run_rank(&with_json(config.clone(), json), votes)?
        }
        Commands::Run { json } => pipeline.run_all(&with_json(config.clone(), json))?,
    };

    info!(
        target: TARGET_PIPELINE,
        "{} finished: {} documents, {} mentions, {} identities (aliasing {})",
        summary.stage,
        summary.documents,
        summary.mentions,
        summary.identities,
        if summary.aliasing_available { "on" } else { "off" }
    );
    print_leaderboard(&summary);

    if let Some(path) = &cli.settings.summary_json {
        write_summary_json(path, &summary)?;
        info!(target: TARGET_PIPELINE, "Wrote run summary to {}", path.display());
    }

    Ok(())
}

fn with_json(config: PipelineConfig, json: &Option<PathBuf>) -> PipelineConfig {
    match json {
        Some(path) => config.with_ranked_json(path),
        None => config,
    }
}

fn print_leaderboard(summary: &RunSummary) {
    if summary.leaderboard.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("Rank"),
        Cell::new("Model"),
        Cell::new("Score"),
        Cell::new("Votes"),
        Cell::new("Threads"),
        Cell::new("Mentions"),
        Cell::new("Avg Doc Score"),
    ]));

    for entity in &summary.leaderboard {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&entity.rank.to_string()),
            Cell::new(&entity.canonical_model),
            Cell::new(&format!("{:.2}", entity.score)),
            Cell::new(&format!("{:.2}", entity.vote_score)),
            Cell::new(&entity.unique_threads.to_string()),
            Cell::new(&entity.mentions.to_string()),
            Cell::new(&format!("{:.1}", entity.avg_doc_score)),
        ]));
    }

    table.printstd();
}
