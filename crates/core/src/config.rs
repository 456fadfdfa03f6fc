use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Every tunable of the retrieval engine. Loaded from a JSON file or built
/// from `Default`; unknown knobs in the file are rejected, missing ones fall
/// back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Source document used when `build` is called without an explicit path.
    pub pdf_path: PathBuf,
    /// Directory holding the persisted artifact bundle.
    pub index_dir: PathBuf,
    /// Dimensionality of the embedding space.
    pub embedding_dimensions: usize,
    /// Texts embedded per batch. Throughput knob only.
    pub embedding_batch_size: usize,
    /// Default number of hits returned by a search.
    pub top_k: usize,
    /// Default nearest-neighbor pool fetched before keyword filtering.
    pub pool_k: usize,
    /// Minimum trimmed length of a heading-derived chunk body.
    pub min_chunk_chars: usize,
    /// Heading titles longer than this are treated as false positives.
    pub max_title_chars: usize,
    /// Keywords retained per chunk after pruning.
    pub per_chunk_keywords: usize,
    /// Frequency-ranked candidates considered before pruning.
    pub keyword_candidate_pool: usize,
    /// A token present in at least max(floor, ratio * chunk_count) chunks is
    /// suppressed corpus-wide.
    pub df_suppression_floor: usize,
    pub df_suppression_ratio: f64,
    /// Caller-supplied stopwords merged into the bundled lists.
    pub extra_stopwords: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::from("data/pdfs/document.pdf"),
            index_dir: PathBuf::from("data/index"),
            embedding_dimensions: 128,
            embedding_batch_size: 32,
            top_k: 5,
            pool_k: 25,
            min_chunk_chars: 20,
            max_title_chars: 90,
            per_chunk_keywords: 12,
            keyword_candidate_pool: 30,
            df_suppression_floor: 3,
            df_suppression_ratio: 0.5,
            extra_stopwords: Vec::new(),
        }
    }
}

impl RetrievalConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Chunks containing a token at least this often are treated as corpus
    /// noise (a repeated running title, for instance).
    pub fn df_suppression_threshold(&self, chunk_count: usize) -> usize {
        let scaled = (self.df_suppression_ratio * chunk_count as f64).floor() as usize;
        self.df_suppression_floor.max(scaled)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<RetrievalConfig, ConfigError> {
    match path {
        Some(path) => RetrievalConfig::from_file(path),
        None => Ok(RetrievalConfig::default()),
    }
}
