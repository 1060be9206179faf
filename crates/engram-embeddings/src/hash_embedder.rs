//! Deterministic local embedder.
//!
//! Maps token blake3 hashes into a fixed-dimension bag-of-features vector,
//! L2-normalized. Not semantically meaningful, but stable and cheap:
//! identical texts always embed identically and token overlap produces
//! cosine similarity, which is what the offline path and the tests need.

use engram_core::constants::EMBEDDING_DIM;
use engram_core::errors::EngramResult;
use engram_core::traits::IEmbeddingProvider;

pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: EMBEDDING_DIM,
        }
    }

    /// Non-standard dimensionality for tests.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl IEmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> EngramResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            // Two buckets per token keep short texts from collapsing onto
            // a single axis.
            for chunk in bytes.chunks(8).take(2) {
                let mut idx_bytes = [0u8; 8];
                idx_bytes.copy_from_slice(chunk);
                let idx = (u64::from_le_bytes(idx_bytes) % self.dimensions as u64) as usize;
                let sign = if chunk[0] & 1 == 0 { 1.0 } else { -1.0 };
                vector[idx] += sign;
            }
        }

        // L2 normalize so cosine behaves.
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash-embedder"
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
