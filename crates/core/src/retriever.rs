use crate::keywords::InvertedIndex;
use crate::models::{Chunk, ScoredChunk, SearchOutcome};
use crate::vector::FlatIpIndex;
use std::collections::HashSet;
use tracing::warn;

/// Hybrid search over an immutable bundle: a dense nearest-neighbor pool
/// post-filtered by keyword candidate sets. Filtering after pooling keeps
/// results similarity-ranked and bounds cost by `pool_k` instead of corpus
/// size; a relevant chunk ranked beyond the pool is never recovered by the
/// filter. That trade is intentional.
pub struct HybridRetriever<'a> {
    index: &'a FlatIpIndex,
    chunks: &'a [Chunk],
    inverted: &'a InvertedIndex,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(index: &'a FlatIpIndex, chunks: &'a [Chunk], inverted: &'a InvertedIndex) -> Self {
        Self {
            index,
            chunks,
            inverted,
        }
    }

    pub fn search(
        &self,
        query_vector: &[f32],
        keywords: &[String],
        top_k: usize,
        pool_k: usize,
    ) -> SearchOutcome {
        let pool_k = pool_k.max(top_k);

        let filter = match self.candidate_filter(keywords) {
            FilterSet::Unfiltered => None,
            FilterSet::Candidates(ids) => Some(ids),
            FilterSet::Empty => {
                warn!(keywords = ?keywords, "no chunks contain all keywords");
                return SearchOutcome::EmptyFilter {
                    keywords: keywords.to_vec(),
                };
            }
        };

        let (scores, ids) = self.index.search(query_vector, pool_k);

        let mut hits = Vec::new();
        for (score, id) in scores.into_iter().zip(ids) {
            if id < 0 || id as usize >= self.chunks.len() {
                continue;
            }
            let chunk = &self.chunks[id as usize];
            if let Some(allowed) = &filter {
                if !allowed.contains(&chunk.chunk_id) {
                    continue;
                }
            }
            hits.push(ScoredChunk {
                score,
                chunk: chunk.clone(),
            });
            if hits.len() >= top_k {
                break;
            }
        }

        SearchOutcome::Ranked(hits)
    }

    /// Intersection across all supplied keywords; an absent keyword
    /// contributes an empty set and empties the whole intersection.
    fn candidate_filter(&self, keywords: &[String]) -> FilterSet {
        if keywords.is_empty() {
            return FilterSet::Unfiltered;
        }

        let mut intersection: Option<HashSet<&str>> = None;
        for keyword in keywords {
            let lowered = keyword.to_lowercase();
            let ids: HashSet<&str> = self
                .inverted
                .get(&lowered)
                .map(|ids| ids.iter().map(String::as_str).collect())
                .unwrap_or_default();

            intersection = Some(match intersection {
                None => ids,
                Some(current) => current.intersection(&ids).copied().collect(),
            });
        }

        match intersection {
            Some(ids) if ids.is_empty() => FilterSet::Empty,
            Some(ids) => {
                FilterSet::Candidates(ids.into_iter().map(|id| id.to_string()).collect())
            }
            None => FilterSet::Unfiltered,
        }
    }
}

enum FilterSet {
    Unfiltered,
    Candidates(HashSet<String>),
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::InvertedIndex;
    use crate::models::Chunk;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            section_id: Some("1".to_string()),
            section_title: format!("1. SECTION {id}"),
            text: format!("body of {id}"),
            page_start: 1,
            page_end: 1,
            source_file: "x.pdf".to_string(),
            keywords: Vec::new(),
        }
    }

    fn fixture() -> (FlatIpIndex, Vec<Chunk>, InvertedIndex) {
        let mut index = FlatIpIndex::new(4);
        let basis: Vec<Vec<f32>> = (0..4)
            .map(|axis| {
                let mut vector = vec![0.0f32; 4];
                vector[axis] = 1.0;
                vector
            })
            .collect();
        index.add(&basis).expect("dimensions match");

        let chunks = vec![chunk("a"), chunk("b"), chunk("c"), chunk("d")];

        let mut inverted = InvertedIndex::new();
        inverted.insert("pump".to_string(), vec!["a".to_string(), "c".to_string()]);
        inverted.insert("valve".to_string(), vec!["c".to_string(), "d".to_string()]);

        (index, chunks, inverted)
    }

    #[test]
    fn unfiltered_search_returns_descending_scores() {
        let (index, chunks, inverted) = fixture();
        let retriever = HybridRetriever::new(&index, &chunks, &inverted);

        let outcome = retriever.search(&[0.9, 0.6, 0.3, 0.1], &[], 3, 4);
        let hits = outcome.hits();
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(hits[0].chunk.chunk_id, "a");
    }

    #[test]
    fn keyword_filter_keeps_only_intersection_members() {
        let (index, chunks, inverted) = fixture();
        let retriever = HybridRetriever::new(&index, &chunks, &inverted);

        let outcome = retriever.search(
            &[0.9, 0.6, 0.3, 0.1],
            &["pump".to_string(), "valve".to_string()],
            4,
            4,
        );
        let hits = outcome.hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, "c");
    }

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        let (index, chunks, inverted) = fixture();
        let retriever = HybridRetriever::new(&index, &chunks, &inverted);

        let outcome = retriever.search(&[1.0, 0.0, 0.0, 0.0], &["PUMP".to_string()], 4, 4);
        assert_eq!(outcome.hits().len(), 2);
    }

    #[test]
    fn disjoint_keywords_report_empty_filter() {
        let (index, chunks, inverted) = fixture();
        let retriever = HybridRetriever::new(&index, &chunks, &inverted);

        let outcome = retriever.search(
            &[1.0, 0.0, 0.0, 0.0],
            &["pump".to_string(), "unknown".to_string()],
            4,
            4,
        );
        match outcome {
            SearchOutcome::EmptyFilter { keywords } => assert_eq!(keywords.len(), 2),
            SearchOutcome::Ranked(_) => panic!("expected empty filter outcome"),
        }
    }

    #[test]
    fn pool_is_clamped_to_top_k() {
        let (index, chunks, inverted) = fixture();
        let retriever = HybridRetriever::new(&index, &chunks, &inverted);

        // pool_k below top_k must still fetch enough candidates.
        let outcome = retriever.search(&[0.9, 0.6, 0.3, 0.1], &[], 3, 1);
        assert_eq!(outcome.hits().len(), 3);
    }

    #[test]
    fn sentinel_pool_slots_are_skipped() {
        let (index, chunks, inverted) = fixture();
        let retriever = HybridRetriever::new(&index, &chunks, &inverted);

        // Pool larger than the corpus: the padded slots must not surface.
        let outcome = retriever.search(&[1.0, 0.0, 0.0, 0.0], &[], 10, 10);
        assert_eq!(outcome.hits().len(), 4);
    }
}
