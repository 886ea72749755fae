//! Embedding provider abstraction.
//!
//! The core never computes real embeddings itself; it consumes them through
//! the [`Embedder`] trait. The bundled [`HashEmbedder`] generates
//! deterministic hash-based pseudo-embeddings so tests and local runs need no
//! model download. Identical text always yields an identical vector, which the
//! content-hash cache keys rely on.

use crate::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default embedding dimensions (all-MiniLM-L6-v2 shape).
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Trait for embedding providers.
pub trait Embedder: Send + Sync {
    /// The dimensionality of produced vectors.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// Must be deterministic: identical text yields identical vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Deterministic hash-based embedder.
///
/// Generates normalized pseudo-embeddings from content hashing. Hash-based
/// vectors do NOT capture semantic similarity: "database storage" and
/// "PostgreSQL database" will not be close. Identical text, however, always
/// maps to the same unit vector, so exact-duplicate behavior is exercised
/// faithfully in tests.
pub struct HashEmbedder {
    /// Embedding dimensions.
    dimensions: usize,
}

impl HashEmbedder {
    /// Default embedding dimensions.
    pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

    /// Creates an embedder with default dimensions.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dimensions: Self::DEFAULT_DIMENSIONS,
        }
    }

    /// Creates an embedder with custom dimensions.
    #[must_use]
    pub const fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Generates a deterministic pseudo-embedding from text.
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    fn pseudo_embed(&self, text: &str) -> Vec<f32> {
        // Bound computation on very long inputs
        const MAX_WORDS: usize = 1000;
        let mut embedding = vec![0.0f32; self.dimensions];

        for (i, word) in text.split_whitespace().take(MAX_WORDS).enumerate() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let hash = hasher.finish();
            Self::distribute_hash(&mut embedding, hash, i, self.dimensions);
        }

        Self::normalize_embedding(&mut embedding);
        embedding
    }

    /// Distributes a hash value across embedding dimensions.
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    fn distribute_hash(embedding: &mut [f32], hash: u64, word_idx: usize, dimensions: usize) {
        for j in 0..8 {
            let idx = ((hash >> (j * 8)) as usize + word_idx) % dimensions;
            let value = ((hash >> (j * 4)) & 0xFF) as f32 / 255.0 - 0.5;
            embedding[idx] += value;
        }
    }

    /// Normalizes an embedding vector in-place.
    fn normalize_embedding(embedding: &mut [f32]) {
        let norm_sq: f32 = embedding.iter().map(|x| x * x).sum();
        if norm_sq <= 0.0 {
            return;
        }
        let inv_norm = norm_sq.sqrt().recip();
        for v in embedding.iter_mut() {
            *v *= inv_norm;
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.pseudo_embed(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed("translate this to french").unwrap();
        let b = embedder.embed("translate this to french").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimensions() {
        let embedder = HashEmbedder::with_dimensions(64);
        let v = embedder.embed("hello world").unwrap();
        assert_eq!(v.len(), 64);
        assert_eq!(embedder.dimensions(), 64);
    }

    #[test]
    fn test_normalized() {
        let embedder = HashEmbedder::new();
        let v = embedder.embed("some text to embed for the norm check").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new();
        let v = embedder.embed("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_different_text_differs() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed("translate to french").unwrap();
        let b = embedder.embed("summarize this article").unwrap();
        assert_ne!(a, b);
    }
}
