//! Phase orchestration
//!
//! A run walks fixed synchronous phases: load aliases, extract (context
//! barrier inside), aggregate, rank. Each stage can also run on its own
//! against the tables of a previous stage, which is how the CLI exposes it.

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::entity::aliases::{AliasLoad, AliasTable};
use crate::entity::canonical::Canonicalizer;
use crate::entity::catalog::BrandCatalog;
use crate::entity::extraction::{extract_mentions, ExtractionOutput};
use crate::entity::types::{Document, Mention};
use crate::environment::PipelineConfig;
use crate::error::TallyError;
use crate::ranking::aggregate::{aggregate_mentions, VoteAggregate};
use crate::ranking::rank::{rank_aggregates, renormalize, RankedEntity};
use crate::table;
use crate::TARGET_PIPELINE;

/// Rows kept in the summary leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

/// What a stage did, for logs, the CLI and `--summary-json`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub stage: String,
    pub generated_at: String,
    pub workers: usize,
    pub aliasing_available: bool,
    pub alias_outcome: String,
    pub documents: usize,
    pub skipped_documents: usize,
    pub threads_with_brands: usize,
    pub mentions: usize,
    pub candidate_tokens: usize,
    pub identities: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leaderboard: Vec<RankedEntity>,
}

/// Everything one in-memory run produces
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub extraction: ExtractionOutput,
    pub aggregates: Vec<VoteAggregate>,
    pub ranked: Vec<RankedEntity>,
}

pub struct Pipeline {
    catalog: BrandCatalog,
    canonicalizer: Canonicalizer,
    alias_load: AliasLoad,
    pool: ThreadPool,
    workers: usize,
}

impl Pipeline {
    pub fn new(
        catalog: BrandCatalog,
        canonicalizer: Canonicalizer,
        alias_load: AliasLoad,
        workers: usize,
    ) -> Result<Self, TallyError> {
        if workers == 0 {
            return Err(TallyError::InvalidWorkerCount(workers));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tally-worker-{}", i))
            .build()?;

        Ok(Self {
            catalog,
            canonicalizer,
            alias_load,
            pool,
            workers,
        })
    }

    /// Catalog plus extra brands, alias table from the configured path.
    /// A missing or malformed alias table is logged and tolerated.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, TallyError> {
        let catalog = if config.extra_brands.is_empty() {
            BrandCatalog::default()
        } else {
            BrandCatalog::with_extra_brands(&config.extra_brands)?
        };
        let (aliases, alias_load) = AliasTable::load(config.aliases_csv());
        if !alias_load.is_available() {
            warn!(
                target: TARGET_PIPELINE,
                "Running without aliasing ({})", alias_load
            );
        }
        Self::new(catalog, Canonicalizer::new(aliases), alias_load, config.workers)
    }

    pub fn aliasing_available(&self) -> bool {
        self.alias_load.is_available()
    }

    pub fn extract(&self, docs: &[Document]) -> ExtractionOutput {
        self.pool
            .install(|| extract_mentions(docs, &self.catalog, &self.canonicalizer))
    }

    pub fn score(&self, mentions: &[Mention]) -> Vec<VoteAggregate> {
        aggregate_mentions(mentions)
    }

    /// Re-normalize against the alias table, merge, score and order
    pub fn rank(&self, aggregates: Vec<VoteAggregate>) -> Vec<RankedEntity> {
        rank_aggregates(renormalize(aggregates, &self.canonicalizer))
    }

    pub fn process(&self, docs: &[Document]) -> PipelineOutput {
        let extraction = self.extract(docs);
        let aggregates = self.score(&extraction.mentions);
        let ranked = self.rank(aggregates.clone());
        PipelineOutput {
            extraction,
            aggregates,
            ranked,
        }
    }

    fn summary(&self, stage: &str) -> RunSummary {
        RunSummary {
            stage: stage.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            workers: self.workers,
            aliasing_available: self.alias_load.is_available(),
            alias_outcome: self.alias_load.to_string(),
            ..Default::default()
        }
    }

    /// Documents table in; mentions and candidate tables out
    pub fn run_extract(&self, config: &PipelineConfig) -> Result<RunSummary> {
        let docs_path = config.docs_csv();
        let docs = table::read_documents(&docs_path)
            .with_context(|| format!("Failed to load documents from {}", docs_path.display()))?;
        let extraction = self.extract(&docs);

        let mut summary = self.summary("extract");
        self.write_extraction(config, &extraction, &mut summary)?;
        Ok(summary)
    }

    /// Mentions table in; votes table out
    pub fn run_score(&self, config: &PipelineConfig) -> Result<RunSummary> {
        let mentions_path = config.mentions_csv();
        let mentions = table::read_mentions(&mentions_path)
            .with_context(|| format!("Failed to load mentions from {}", mentions_path.display()))?;
        let aggregates = self.score(&mentions);

        let mut summary = self.summary("score");
        summary.mentions = mentions.len();
        self.write_votes(config, &aggregates, &mut summary)?;
        Ok(summary)
    }

    /// One or more votes tables in; ranked table out. With no explicit
    /// inputs the configured votes table is used.
    pub fn run_rank(&self, config: &PipelineConfig, votes: &[PathBuf]) -> Result<RunSummary> {
        let inputs = if votes.is_empty() {
            vec![config.votes_csv()]
        } else {
            votes.to_vec()
        };

        let mut aggregates = Vec::new();
        for path in &inputs {
            let part = table::read_votes(path)
                .with_context(|| format!("Failed to load votes from {}", path.display()))?;
            aggregates.extend(part);
        }
        let mentions = aggregates.iter().map(|a| a.mentions).sum();
        let ranked = self.rank(aggregates);

        let mut summary = self.summary("rank");
        summary.mentions = mentions;
        self.write_ranked(config, ranked, &mut summary)?;
        Ok(summary)
    }

    /// Every stage in one go, writing each intermediate table
    pub fn run_all(&self, config: &PipelineConfig) -> Result<RunSummary> {
        let docs_path = config.docs_csv();
        let docs = table::read_documents(&docs_path)
            .with_context(|| format!("Failed to load documents from {}", docs_path.display()))?;
        let output = self.process(&docs);

        let mut summary = self.summary("run");
        self.write_extraction(config, &output.extraction, &mut summary)?;
        self.write_votes(config, &output.aggregates, &mut summary)?;
        self.write_ranked(config, output.ranked, &mut summary)?;
        Ok(summary)
    }

    fn write_extraction(
        &self,
        config: &PipelineConfig,
        extraction: &ExtractionOutput,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mentions_path = config.mentions_csv();
        table::write_mentions(&mentions_path, &extraction.mentions)
            .with_context(|| format!("Failed to write {}", mentions_path.display()))?;
        let candidates_path = config.candidates_csv();
        table::write_candidates(&candidates_path, &extraction.candidates)
            .with_context(|| format!("Failed to write {}", candidates_path.display()))?;

        if extraction.mentions.is_empty() {
            info!(
                target: TARGET_PIPELINE,
                "No mentions found; review {} for alias candidates",
                candidates_path.display()
            );
        }

        summary.documents = extraction.documents;
        summary.skipped_documents = extraction.skipped;
        summary.threads_with_brands = extraction.threads_with_brands;
        summary.mentions = extraction.mentions.len();
        summary.candidate_tokens = extraction.candidates.len();
        summary.outputs.push(mentions_path);
        summary.outputs.push(candidates_path);
        Ok(())
    }

    fn write_votes(
        &self,
        config: &PipelineConfig,
        aggregates: &[VoteAggregate],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let votes_path = config.votes_csv();
        table::write_votes(&votes_path, aggregates)
            .with_context(|| format!("Failed to write {}", votes_path.display()))?;
        summary.identities = aggregates.len();
        summary.outputs.push(votes_path);
        Ok(())
    }

    fn write_ranked(
        &self,
        config: &PipelineConfig,
        ranked: Vec<RankedEntity>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let ranked_path = config.ranked_csv();
        table::write_ranked(&ranked_path, &ranked)
            .with_context(|| format!("Failed to write {}", ranked_path.display()))?;
        if let Some(json_path) = &config.ranked_json {
            table::write_ranked_json(json_path, &ranked)
                .with_context(|| format!("Failed to write {}", json_path.display()))?;
            summary.outputs.push(json_path.clone());
        }
        info!(
            target: TARGET_PIPELINE,
            "Ranked {} identities into {}",
            ranked.len(),
            ranked_path.display()
        );
        summary.identities = ranked.len();
        summary.outputs.push(ranked_path);
        summary.leaderboard = ranked.into_iter().take(LEADERBOARD_SIZE).collect();
        Ok(())
    }
}

/// Write a summary as pretty JSON
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
