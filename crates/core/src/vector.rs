use crate::error::IngestError;
use serde::{Deserialize, Serialize};

/// Position returned for pool slots with no matching vector.
pub const NO_MATCH: i64 = -1;

/// Exact flat inner-product index over unit vectors. Inner product equals
/// cosine similarity here because every stored and query vector is
/// unit-normalized, so scores lie in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIpIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIpIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append vectors in order; the stored position is the retrieval id.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IngestError> {
        for vector in vectors {
            if vector.len() != self.dimensions {
                return Err(IngestError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: vector.len(),
                });
            }
            self.vectors.push(vector.clone());
        }
        Ok(())
    }

    /// Top-k by inner product, descending. Equal scores resolve to the lower
    /// position for reproducible output. Both arrays are padded to `k` with
    /// sentinels when the index holds fewer vectors.
    pub fn search(&self, query: &[f32], k: usize) -> (Vec<f32>, Vec<i64>) {
        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (inner_product(query, vector), position))
            .collect();

        scored.sort_by(|left, right| {
            right
                .0
                .total_cmp(&left.0)
                .then(left.1.cmp(&right.1))
        });
        scored.truncate(k);

        let mut scores: Vec<f32> = scored.iter().map(|(score, _)| *score).collect();
        let mut ids: Vec<i64> = scored.iter().map(|(_, position)| *position as i64).collect();
        scores.resize(k, f32::NEG_INFINITY);
        ids.resize(k, NO_MATCH);
        (scores, ids)
    }
}

fn inner_product(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| a * b)
        .sum()
}
