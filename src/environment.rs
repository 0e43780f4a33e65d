use std::env;
use std::path::PathBuf;
use std::thread;

use crate::error::TallyError;

pub const DEFAULT_DATA_DIR: &str = "data";

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// Empty segments are dropped, so an unset variable yields an empty vector.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>`
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    split_list(&env::var(var).unwrap_or_default(), delimiter)
}

fn split_list(raw: &str, delimiter: char) -> Vec<String> {
    raw.split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Number of usable cores, at least 1
pub fn available_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Where a run reads and writes its tables, plus worker settings.
///
/// Table layout under `data_dir`:
/// - `processed/reddit_docs.csv` (input)
/// - `processed/mentions.csv`, `processed/model_candidates.csv`
/// - `processed/votes.csv`, `processed/ranked_models.csv`
/// - `reference/model_aliases.csv` (unless overridden)
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub aliases_path: Option<PathBuf>,
    pub workers: usize,
    pub extra_brands: Vec<String>,
    /// Optional JSON copy of the ranked table
    pub ranked_json: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            aliases_path: None,
            workers: available_workers(),
            extra_brands: Vec::new(),
            ranked_json: None,
        }
    }
}

impl PipelineConfig {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Build from `THREADTALLY_*` variables, with defaults for anything unset
    pub fn from_env() -> Result<Self, TallyError> {
        let mut config = match env::var("THREADTALLY_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => Self::new(dir.trim()),
            _ => Self::default(),
        };
        if let Ok(path) = env::var("THREADTALLY_ALIASES") {
            if !path.trim().is_empty() {
                config.aliases_path = Some(PathBuf::from(path.trim()));
            }
        }
        if let Ok(raw) = env::var("THREADTALLY_WORKERS") {
            // An unparseable value is reported the same way as zero
            let workers = raw.trim().parse::<usize>().unwrap_or(0);
            config = config.with_workers(workers)?;
        }
        config.extra_brands = get_env_var_as_vec("THREADTALLY_EXTRA_BRANDS", ';');
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Result<Self, TallyError> {
        if workers == 0 {
            return Err(TallyError::InvalidWorkerCount(workers));
        }
        self.workers = workers;
        Ok(self)
    }

    pub fn with_aliases<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.aliases_path = Some(path.into());
        self
    }

    pub fn with_extra_brands(mut self, brands: Vec<String>) -> Self {
        self.extra_brands = brands;
        self
    }

    pub fn with_ranked_json<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ranked_json = Some(path.into());
        self
    }

    fn processed(&self, file: &str) -> PathBuf {
        self.data_dir.join("processed").join(file)
    }

    pub fn aliases_csv(&self) -> PathBuf {
        self.aliases_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("reference").join("model_aliases.csv"))
    }

    pub fn docs_csv(&self) -> PathBuf {
        self.processed("reddit_docs.csv")
    }

    pub fn mentions_csv(&self) -> PathBuf {
        self.processed("mentions.csv")
    }

    pub fn candidates_csv(&self) -> PathBuf {
        self.processed("model_candidates.csv")
    }

    pub fn votes_csv(&self) -> PathBuf {
        self.processed("votes.csv")
    }

    pub fn ranked_csv(&self) -> PathBuf {
        self.processed("ranked_models.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("Vandersteen; Magnepan ;", ';'), vec!["Vandersteen", "Magnepan"]);
        assert!(split_list("", ';').is_empty());
    }

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::new("/tmp/tally");
        assert_eq!(
            config.docs_csv(),
            PathBuf::from("/tmp/tally/processed/reddit_docs.csv")
        );
        assert_eq!(
            config.aliases_csv(),
            PathBuf::from("/tmp/tally/reference/model_aliases.csv")
        );
        let config = config.with_aliases("/elsewhere/aliases.csv");
        assert_eq!(config.aliases_csv(), PathBuf::from("/elsewhere/aliases.csv"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            PipelineConfig::default().with_workers(0),
            Err(TallyError::InvalidWorkerCount(0))
        ));
        assert_eq!(PipelineConfig::default().with_workers(3).unwrap().workers, 3);
        assert!(available_workers() >= 1);
    }
}
