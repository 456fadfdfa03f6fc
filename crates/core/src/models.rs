use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel title for page text that carries no detected section heading.
pub const FULL_PAGE_TITLE: &str = "FULL_PAGE";

/// One physical page of extracted text. Only pages with non-empty text are
/// ever materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub text: String,
    pub source_file: String,
}

/// The retrievable unit: one document section (or merged heading-less run)
/// with stable identity and provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub section_id: Option<String>,
    pub section_title: String,
    pub text: String,
    pub page_start: u32,
    pub page_end: u32,
    pub source_file: String,
    /// Populated by keyword indexing; empty until then.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Chunk {
    pub fn is_full_page(&self) -> bool {
        self.section_id.is_none() && self.section_title == FULL_PAGE_TITLE
    }

    /// Text handed to the embedder and the keyword ranker: the title carries
    /// signal the body may lack.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.section_title, self.text)
    }
}

/// A ranked hit: inner product of two unit vectors, in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub score: f32,
    pub chunk: Chunk,
}

/// Outcome of a hybrid search. An empty keyword intersection is a valid,
/// reportable state rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SearchOutcome {
    Ranked(Vec<ScoredChunk>),
    EmptyFilter { keywords: Vec<String> },
}

impl SearchOutcome {
    pub fn hits(&self) -> &[ScoredChunk] {
        match self {
            SearchOutcome::Ranked(hits) => hits,
            SearchOutcome::EmptyFilter { .. } => &[],
        }
    }
}

/// Counters accumulated while a document is ingested. Partial failures are
/// reported here instead of aborting the build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStats {
    pub total_pages: usize,
    pub empty_pages: usize,
    pub failed_pages: usize,
    pub rejected_titles: usize,
    pub dropped_fragments: usize,
    pub merged_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub source_file: String,
    pub chunk_count: usize,
    pub keyword_count: usize,
    pub stats: BuildStats,
    pub persisted: bool,
    pub built_at: DateTime<Utc>,
}

/// Extractive context for a question: the leading paragraph of each hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextAnswer {
    pub question: String,
    pub contexts: Vec<ContextExcerpt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextExcerpt {
    pub score: f32,
    pub chunk_id: String,
    pub section_title: String,
    pub page_start: u32,
    pub page_end: u32,
    pub excerpt: String,
}
