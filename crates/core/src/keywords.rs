use crate::config::RetrievalConfig;
use crate::error::IngestError;
use crate::models::Chunk;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::info;

/// Keyword -> sorted chunk ids for which the keyword is among the chunk's
/// retained top salient terms. Not literal full-text containment.
pub type InvertedIndex = BTreeMap<String, Vec<String>>;

/// Alphanumeric tokens of length >= 3, internal hyphens/underscores allowed.
const TOKEN_PATTERN: &str = r"[A-Za-zÅÄÖåäö0-9][A-Za-zÅÄÖåäö0-9_-]{2,}";

/// Bundled stopword lists. Fixed at build time so two runs over the same
/// corpus always agree; `extra_stopwords` in the config is the only
/// extension point.
const EN_STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "all", "also", "and", "any", "are", "because", "been",
    "before", "being", "below", "between", "both", "but", "can", "could", "did", "does", "down",
    "during", "each", "few", "for", "from", "further", "had", "has", "have", "having", "her",
    "here", "hers", "him", "his", "how", "into", "its", "just", "more", "most", "nor", "not",
    "now", "off", "once", "only", "other", "our", "out", "over", "own", "same", "she", "should",
    "some", "such", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "those", "through", "too", "under", "until", "very", "was", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
];

const SV_STOPWORDS: &[&str] = &[
    "alla", "allt", "att", "bara", "bland", "blev", "bli", "blivit", "dem", "den", "denna",
    "deras", "dess", "det", "detta", "dig", "din", "dina", "ditt", "där", "då", "efter", "eller",
    "ens", "era", "ett", "från", "för", "hade", "han", "hans", "har", "hennes", "hon", "honom",
    "hur", "här", "icke", "inom", "inte", "jag", "kan", "kunde", "man", "med", "mellan", "men",
    "mig", "min", "mina", "mitt", "mot", "mycket", "ned", "någon", "något", "några", "när",
    "och", "oss", "samma", "sedan", "sig", "sin", "sina", "sitt", "själv", "ska", "skall",
    "skulle", "som", "till", "under", "upp", "utan", "vad", "var", "vara", "varför", "varit",
    "varje", "vem", "vid", "vilken", "över",
];

/// Procedural boilerplate that dominates industrial documentation without
/// discriminating between sections.
const DOMAIN_STOPWORDS: &[&str] = &[
    "shall", "must", "may", "also", "ensure", "process", "procedure", "document", "requirement",
];

pub struct KeywordIndexer {
    token_re: Regex,
    stopwords: HashSet<String>,
    per_chunk_keywords: usize,
    candidate_pool: usize,
    df_floor: usize,
    df_ratio: f64,
}

impl KeywordIndexer {
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, IngestError> {
        let mut stopwords: HashSet<String> = EN_STOPWORDS
            .iter()
            .chain(SV_STOPWORDS)
            .chain(DOMAIN_STOPWORDS)
            .map(|word| word.to_string())
            .collect();
        stopwords.extend(
            config
                .extra_stopwords
                .iter()
                .map(|word| word.to_lowercase()),
        );

        Ok(Self {
            token_re: Regex::new(TOKEN_PATTERN)?,
            stopwords,
            per_chunk_keywords: config.per_chunk_keywords,
            candidate_pool: config.keyword_candidate_pool,
            df_floor: config.df_suppression_floor,
            df_ratio: config.df_suppression_ratio,
        })
    }

    fn tokens(&self, text: &str) -> Vec<String> {
        self.token_re
            .find_iter(text)
            .map(|token| token.as_str().to_lowercase())
            .filter(|token| !self.stopwords.contains(token))
            .filter(|token| !token.chars().all(|ch| ch.is_ascii_digit()))
            .collect()
    }

    /// Most frequent surviving tokens, ties broken by first occurrence.
    pub fn extract_keywords(&self, text: &str, top_k: usize) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for token in self.tokens(text) {
            if !counts.contains_key(&token) {
                order.push(token.clone());
            }
            *counts.entry(token).or_insert(0) += 1;
        }

        // Stable sort keeps first-encountered order within equal counts.
        order.sort_by_key(|token| std::cmp::Reverse(counts[token]));
        order.truncate(top_k);
        order
    }

    /// Attach top keywords to every chunk and emit the inverted index.
    /// Tokens spread across too many chunks are corpus noise (a repeated
    /// running title, a document number) and are suppressed globally.
    pub fn build_index(&self, chunks: &mut [Chunk]) -> InvertedIndex {
        info!(chunks = chunks.len(), "building keyword inverted index");

        let mut df: HashMap<String, usize> = HashMap::new();
        for chunk in chunks.iter() {
            let distinct: HashSet<String> = self.tokens(&chunk.text).into_iter().collect();
            for token in distinct {
                *df.entry(token).or_insert(0) += 1;
            }
        }

        let threshold = self
            .df_floor
            .max((self.df_ratio * chunks.len() as f64).floor() as usize);
        let suppressed: HashSet<String> = df
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .map(|(token, _)| token)
            .collect();

        let mut inverted: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for chunk in chunks.iter_mut() {
            let candidates = self.extract_keywords(&chunk.embedding_text(), self.candidate_pool);
            chunk.keywords = candidates
                .into_iter()
                .filter(|keyword| !suppressed.contains(keyword))
                .take(self.per_chunk_keywords)
                .collect();

            for keyword in &chunk.keywords {
                inverted
                    .entry(keyword.clone())
                    .or_default()
                    .insert(chunk.chunk_id.clone());
            }
        }

        info!(keywords = inverted.len(), "keyword index ready");
        inverted
            .into_iter()
            .map(|(keyword, ids)| (keyword, ids.into_iter().collect()))
            .collect()
    }
}
