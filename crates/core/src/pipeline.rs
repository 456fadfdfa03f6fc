use crate::chunking::Chunker;
use crate::config::RetrievalConfig;
use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::error::{BuildError, IngestError, SearchError};
use crate::extractor::{LopdfExtractor, PageExtractor};
use crate::keywords::{InvertedIndex, KeywordIndexer};
use crate::models::{
    BuildReport, Chunk, ContextAnswer, ContextExcerpt, SearchOutcome,
};
use crate::retriever::HybridRetriever;
use crate::store;
use crate::vector::FlatIpIndex;
use chrono::Utc;
use std::path::Path;
use tracing::info;

const EXCERPT_MAX_CHARS: usize = 800;

/// The retrieval service. Owns its collaborators (injected at construction,
/// no hidden globals) and the currently published artifact bundle.
///
/// `search`/`get_chunk` borrow immutably, so any number of concurrent
/// readers may share a built pipeline; republishing via `build`/`load`
/// requires exclusive access, which keeps the bundle swap atomic.
pub struct RetrievalPipeline<X, E> {
    config: RetrievalConfig,
    extractor: X,
    embedder: E,
    chunker: Chunker,
    keywords: KeywordIndexer,
    index: Option<FlatIpIndex>,
    chunks: Vec<Chunk>,
    inverted: InvertedIndex,
}

impl RetrievalPipeline<LopdfExtractor, CharacterNgramEmbedder> {
    /// Pipeline with the in-repo collaborators: lopdf extraction and the
    /// hashed-trigram embedder.
    pub fn with_defaults(config: RetrievalConfig) -> Result<Self, IngestError> {
        let extractor = LopdfExtractor::new()?;
        let embedder = CharacterNgramEmbedder::new(config.embedding_dimensions);
        Self::new(config, extractor, embedder)
    }
}

impl<X, E> RetrievalPipeline<X, E>
where
    X: PageExtractor,
    E: Embedder,
{
    pub fn new(config: RetrievalConfig, extractor: X, embedder: E) -> Result<Self, IngestError> {
        let chunker = Chunker::new(config.max_title_chars, config.min_chunk_chars)?;
        let keywords = KeywordIndexer::from_config(&config)?;
        Ok(Self {
            config,
            extractor,
            embedder,
            chunker,
            keywords,
            index: None,
            chunks: Vec::new(),
            inverted: InvertedIndex::new(),
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Full corpus build: extract, chunk, keyword-index, embed, index, and
    /// optionally persist. Publishes the new bundle only on success.
    pub fn build(
        &mut self,
        pdf_path: Option<&Path>,
        persist: bool,
    ) -> Result<BuildReport, BuildError> {
        let path = pdf_path.unwrap_or(self.config.pdf_path.as_path()).to_path_buf();
        let extraction = self.extractor.extract(&path)?;

        let outcome = self.chunker.chunk_pages(&extraction.pages);
        let mut chunks = outcome.chunks;
        let inverted = self.keywords.build_index(&mut chunks);

        let texts: Vec<String> = chunks.iter().map(Chunk::embedding_text).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.embedding_batch_size.max(1)) {
            vectors.extend(self.embedder.embed(batch));
        }

        let mut index = FlatIpIndex::new(self.embedder.dimensions());
        index.add(&vectors).map_err(BuildError::Ingest)?;

        if persist {
            store::save_artifacts(&self.config.index_dir, &index, &chunks, &inverted)?;
        }

        let mut stats = outcome.stats;
        stats.total_pages = extraction.total_pages;
        stats.empty_pages = extraction.empty_pages;
        stats.failed_pages = extraction.failed_pages.len();

        let source_file = chunks
            .first()
            .map(|chunk| chunk.source_file.clone())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let report = BuildReport {
            source_file,
            chunk_count: chunks.len(),
            keyword_count: inverted.len(),
            stats,
            persisted: persist,
            built_at: Utc::now(),
        };

        info!(
            chunks = report.chunk_count,
            keywords = report.keyword_count,
            persisted = persist,
            "build complete"
        );

        self.index = Some(index);
        self.chunks = chunks;
        self.inverted = inverted;
        Ok(report)
    }

    /// Replace the published bundle with the persisted one.
    pub fn load(&mut self) -> Result<(), BuildError> {
        let (index, chunks, inverted) = store::load_artifacts(&self.config.index_dir)?;
        self.index = Some(index);
        self.chunks = chunks;
        self.inverted = inverted;
        Ok(())
    }

    pub fn ready(&self) -> bool {
        self.index.is_some() && !self.chunks.is_empty()
    }

    /// Hybrid search: dense pool, keyword post-filter, first `top_k`
    /// survivors in similarity order.
    pub fn search(
        &self,
        query: &str,
        keywords: &[String],
        top_k: Option<usize>,
        pool_k: Option<usize>,
    ) -> Result<SearchOutcome, SearchError> {
        if !self.ready() {
            return Err(SearchError::NotReady);
        }
        let Some(index) = &self.index else {
            return Err(SearchError::NotReady);
        };
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let top_k = top_k.unwrap_or(self.config.top_k);
        let pool_k = pool_k.unwrap_or(self.config.pool_k);

        let query_vector = self.embedder.embed_query(query);
        let retriever = HybridRetriever::new(index, &self.chunks, &self.inverted);
        Ok(retriever.search(&query_vector, keywords, top_k, pool_k))
    }

    pub fn get_chunk(&self, chunk_id: &str) -> Result<Option<&Chunk>, SearchError> {
        if !self.ready() {
            return Err(SearchError::NotReady);
        }
        Ok(self.chunks.iter().find(|chunk| chunk.chunk_id == chunk_id))
    }

    /// Extractive context for a question: the leading paragraph of each hit,
    /// with provenance, for a caller that assembles answers elsewhere.
    pub fn answer_context(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<ContextAnswer, SearchError> {
        let outcome = self.search(question, &[], Some(top_k), None)?;

        let contexts = outcome
            .hits()
            .iter()
            .map(|hit| {
                let excerpt: String = hit
                    .chunk
                    .text
                    .split("\n\n")
                    .next()
                    .unwrap_or("")
                    .trim()
                    .chars()
                    .take(EXCERPT_MAX_CHARS)
                    .collect();
                ContextExcerpt {
                    score: hit.score,
                    chunk_id: hit.chunk.chunk_id.clone(),
                    section_title: hit.chunk.section_title.clone(),
                    page_start: hit.chunk.page_start,
                    page_end: hit.chunk.page_end,
                    excerpt,
                }
            })
            .collect();

        Ok(ContextAnswer {
            question: question.to_string(),
            contexts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractionReport;
    use crate::models::Page;
    use tempfile::tempdir;

    /// Substitute extraction collaborator feeding fixed pages in.
    struct StaticExtractor {
        pages: Vec<Page>,
    }

    impl PageExtractor for StaticExtractor {
        fn extract(&self, _path: &Path) -> Result<ExtractionReport, IngestError> {
            Ok(ExtractionReport {
                pages: self.pages.clone(),
                total_pages: self.pages.len(),
                empty_pages: 0,
                failed_pages: Vec::new(),
            })
        }
    }

    fn page(number: u32, text: &str) -> Page {
        Page {
            page_number: number,
            text: text.to_string(),
            source_file: "x.pdf".to_string(),
        }
    }

    fn pipeline_with(
        pages: Vec<Page>,
        config: RetrievalConfig,
    ) -> RetrievalPipeline<StaticExtractor, CharacterNgramEmbedder> {
        let embedder = CharacterNgramEmbedder::new(config.embedding_dimensions);
        RetrievalPipeline::new(config, StaticExtractor { pages }, embedder)
            .expect("pipeline builds")
    }

    fn two_section_pages() -> Vec<Page> {
        vec![page(
            1,
            "1 PURPOSE\nThe purpose covers quality system integrity.\n\n\
             2 SCOPE\nThe scope covers decommissioning documentation archive.",
        )]
    }

    #[test]
    fn queries_before_build_are_not_ready() {
        let pipeline = pipeline_with(two_section_pages(), RetrievalConfig::default());

        assert!(!pipeline.ready());
        assert!(matches!(
            pipeline.search("anything", &[], None, None),
            Err(SearchError::NotReady)
        ));
        assert!(matches!(
            pipeline.get_chunk("abc"),
            Err(SearchError::NotReady)
        ));
    }

    #[test]
    fn build_publishes_and_search_ranks() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipeline = pipeline_with(two_section_pages(), RetrievalConfig::default());
        let report = pipeline.build(Some(Path::new("x.pdf")), false)?;

        assert!(pipeline.ready());
        assert_eq!(report.chunk_count, 2);
        assert!(!report.persisted);

        let outcome = pipeline.search("quality system integrity", &[], Some(2), None)?;
        let hits = outcome.hits();
        assert!(!hits.is_empty());
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(hits[0].chunk.section_title.contains("PURPOSE"));
        Ok(())
    }

    #[test]
    fn keyword_filter_restricts_hits() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipeline = pipeline_with(two_section_pages(), RetrievalConfig::default());
        pipeline.build(Some(Path::new("x.pdf")), false)?;

        let outcome =
            pipeline.search("anything at all", &["decommissioning".to_string()], None, None)?;
        let hits = outcome.hits();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].chunk.section_title.contains("SCOPE"));
        Ok(())
    }

    #[test]
    fn unknown_keyword_reports_empty_filter() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipeline = pipeline_with(two_section_pages(), RetrievalConfig::default());
        pipeline.build(Some(Path::new("x.pdf")), false)?;

        let outcome = pipeline.search("anything", &["zzznope".to_string()], None, None)?;
        assert!(matches!(outcome, SearchOutcome::EmptyFilter { .. }));
        Ok(())
    }

    #[test]
    fn empty_query_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipeline = pipeline_with(two_section_pages(), RetrievalConfig::default());
        pipeline.build(Some(Path::new("x.pdf")), false)?;

        assert!(matches!(
            pipeline.search("   ", &[], None, None),
            Err(SearchError::EmptyQuery)
        ));
        Ok(())
    }

    #[test]
    fn persisted_bundle_loads_into_fresh_pipeline() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = RetrievalConfig {
            index_dir: dir.path().to_path_buf(),
            ..RetrievalConfig::default()
        };

        let mut builder = pipeline_with(two_section_pages(), config.clone());
        builder.build(Some(Path::new("x.pdf")), true)?;

        let mut reader = pipeline_with(Vec::new(), config);
        reader.load()?;
        assert!(reader.ready());

        let outcome = reader.search("decommissioning documentation", &[], Some(1), None)?;
        assert_eq!(outcome.hits().len(), 1);
        Ok(())
    }

    #[test]
    fn load_without_artifacts_fails() {
        let dir = tempdir().expect("tempdir");
        let config = RetrievalConfig {
            index_dir: dir.path().join("empty"),
            ..RetrievalConfig::default()
        };
        let mut pipeline = pipeline_with(Vec::new(), config);
        assert!(pipeline.load().is_err());
    }

    #[test]
    fn get_chunk_finds_by_id() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipeline = pipeline_with(two_section_pages(), RetrievalConfig::default());
        pipeline.build(Some(Path::new("x.pdf")), false)?;

        let outcome = pipeline.search("purpose", &[], Some(1), None)?;
        let id = outcome.hits()[0].chunk.chunk_id.clone();

        assert!(pipeline.get_chunk(&id)?.is_some());
        assert!(pipeline.get_chunk("000000000000")?.is_none());
        Ok(())
    }

    #[test]
    fn answer_context_excerpts_first_paragraph() -> Result<(), Box<dyn std::error::Error>> {
        let mut pipeline = pipeline_with(two_section_pages(), RetrievalConfig::default());
        pipeline.build(Some(Path::new("x.pdf")), false)?;

        let answer = pipeline.answer_context("quality system", 1)?;
        assert_eq!(answer.question, "quality system");
        assert_eq!(answer.contexts.len(), 1);
        assert!(answer.contexts[0].excerpt.starts_with("1 PURPOSE"));
        assert!(answer.contexts[0].excerpt.len() <= 800);
        Ok(())
    }

    #[test]
    fn batch_size_does_not_change_results() -> Result<(), Box<dyn std::error::Error>> {
        let mut small_batches = pipeline_with(
            two_section_pages(),
            RetrievalConfig {
                embedding_batch_size: 1,
                ..RetrievalConfig::default()
            },
        );
        let mut one_batch = pipeline_with(
            two_section_pages(),
            RetrievalConfig {
                embedding_batch_size: 64,
                ..RetrievalConfig::default()
            },
        );
        small_batches.build(Some(Path::new("x.pdf")), false)?;
        one_batch.build(Some(Path::new("x.pdf")), false)?;

        let left = small_batches.search("quality system", &[], Some(2), None)?;
        let right = one_batch.search("quality system", &[], Some(2), None)?;
        let left_ids: Vec<_> = left.hits().iter().map(|hit| &hit.chunk.chunk_id).collect();
        let right_ids: Vec<_> = right.hits().iter().map(|hit| &hit.chunk.chunk_id).collect();
        assert_eq!(left_ids, right_ids);
        Ok(())
    }
}
