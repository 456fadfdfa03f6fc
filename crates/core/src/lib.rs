pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod heading;
pub mod keywords;
pub mod models;
pub mod pipeline;
pub mod retriever;
pub mod store;
pub mod vector;

pub use chunking::{stable_chunk_id, Chunker, ChunkingOutcome};
pub use config::{load_config, RetrievalConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{BuildError, ConfigError, IngestError, SearchError, StoreError};
pub use extractor::{ExtractionReport, LopdfExtractor, PageExtractor};
pub use heading::{normalize_for_headings, HeadingDetector, HeadingMatch, HeadingScan};
pub use keywords::{InvertedIndex, KeywordIndexer};
pub use models::{
    BuildReport, BuildStats, Chunk, ContextAnswer, ContextExcerpt, Page, ScoredChunk,
    SearchOutcome, FULL_PAGE_TITLE,
};
pub use pipeline::RetrievalPipeline;
pub use retriever::HybridRetriever;
pub use store::{load_artifacts, save_artifacts};
pub use vector::{FlatIpIndex, NO_MATCH};
