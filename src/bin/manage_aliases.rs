use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row as PrettyRow, Table};
use std::path::PathBuf;
use tracing::info;

use threadtally::entity::aliases::{AliasLoad, AliasTable};
use threadtally::entity::canonical::Canonicalizer;
use threadtally::entity::normalizer::{canonical_key, normalize_display};
use threadtally::environment::PipelineConfig;
use threadtally::table::read_candidates;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Alias reference table (defaults to the configured one)
    #[arg(short, long, global = true)]
    aliases: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the alias table and report whether it is usable
    Check,

    /// Show display name, key and alias resolution for a raw spelling
    Normalize {
        /// Raw "BRAND model" text
        raw: String,
    },

    /// Test if two spellings resolve to the same identity
    Test {
        /// First spelling
        name1: String,

        /// Second spelling
        name2: String,
    },

    /// List the most frequent unresolved tokens from a candidate report
    Candidates {
        /// Candidate report (defaults to processed/model_candidates.csv)
        file: Option<PathBuf>,

        /// Number of tokens to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    threadtally::logging::configure_logging();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("Invalid THREADTALLY_* configuration")?;
    let alias_path = cli.aliases.clone().unwrap_or_else(|| config.aliases_csv());

    match cli.command {
        Commands::Check => {
            info!("Checking alias table {}", alias_path.display());
            let (table, outcome) = AliasTable::load(&alias_path);
            println!("{}: {}", alias_path.display(), outcome);
            match outcome {
                AliasLoad::Loaded(_) => println!("  - {} distinct alias keys", table.len()),
                AliasLoad::Missing | AliasLoad::Malformed(_) => {
                    println!("  - pipeline runs will continue without aliasing")
                }
            }
        }

        Commands::Normalize { raw } => {
            let (table, _) = AliasTable::load(&alias_path);
            let canonicalizer = Canonicalizer::new(table);
            let identity = canonicalizer.normalize(&raw);

            println!("Normalizing '{}':", raw);
            println!("  - Display: '{}'", normalize_display(&raw));
            println!("  - Key: '{}'", canonical_key(&raw));
            match canonicalizer.alias_for(&normalize_display(&raw)) {
                Some(record) => println!(
                    "  - Alias hit: '{}' ({})",
                    record.display_name, record.canonical_key
                ),
                None => println!("  - No alias entry"),
            }
            println!("  - Identity: '{}' ({})", identity.display, identity.key);
        }

        Commands::Test { name1, name2 } => {
            let (table, _) = AliasTable::load(&alias_path);
            let canonicalizer = Canonicalizer::new(table);
            let first = canonicalizer.normalize(&name1);
            let second = canonicalizer.normalize(&name2);

            println!("Testing if '{}' matches '{}':", name1, name2);
            println!(
                "  - Same identity: {}",
                !first.key.is_empty() && first.key == second.key
            );
            println!("  - '{}' -> '{}' ({})", name1, first.display, first.key);
            println!("  - '{}' -> '{}' ({})", name2, second.display, second.key);
        }

        Commands::Candidates { file, limit } => {
            let path = file.unwrap_or_else(|| config.candidates_csv());
            let candidates = read_candidates(&path)
                .with_context(|| format!("Failed to read candidate report {}", path.display()))?;

            let (table, _) = AliasTable::load(&alias_path);
            let canonicalizer = Canonicalizer::new(table);

            let mut output = Table::new();
            output.add_row(PrettyRow::new(vec![
                Cell::new("Token"),
                Cell::new("Count"),
                Cell::new("Aliased"),
                Cell::new("Example"),
            ]));
            for candidate in candidates.iter().take(limit) {
                let example = candidate.examples.first().map(String::as_str).unwrap_or("");
                output.add_row(PrettyRow::new(vec![
                    Cell::new(&candidate.token),
                    Cell::new(&candidate.count.to_string()),
                    Cell::new(if canonicalizer.has_alias(&candidate.token) {
                        "yes"
                    } else {
                        "no"
                    }),
                    Cell::new(&example.chars().take(80).collect::<String>()),
                ]));
            }
            output.printstd();
            println!(
                "Showing {} of {} tokens",
                candidates.len().min(limit),
                candidates.len()
            );
        }
    }

    Ok(())
}
