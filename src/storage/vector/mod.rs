//! In-memory vector search backend.
//!
//! Brute-force O(n) cosine search over an in-memory point map, in the shape a
//! remote ANN service (Qdrant, pgvector, usearch) would present: upsert with a
//! typed payload, search with a limit and score floor, descending order.
//! Suitable for tests and small corpora; a remote implementation of
//! [`VectorSearchBackend`] replaces it in production without touching the
//! engines.

use crate::storage::acquire_lock;
use crate::storage::traits::{ScoredPoint, VectorPayload, VectorPoint, VectorSearchBackend};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// A stored point: vector plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: VectorPayload,
}

/// On-disk index format.
#[derive(Debug, Serialize, Deserialize)]
struct IndexData {
    dimensions: usize,
    points: HashMap<String, StoredPoint>,
}

/// Brute-force in-memory vector backend.
pub struct InMemoryVectorBackend {
    /// Path to the index file; empty for purely in-memory use.
    index_path: PathBuf,
    /// Embedding dimensions.
    dimensions: usize,
    /// Point storage keyed by prompt id.
    points: Mutex<HashMap<String, StoredPoint>>,
}

impl InMemoryVectorBackend {
    /// Default embedding dimensions.
    pub const DEFAULT_DIMENSIONS: usize = crate::embedding::DEFAULT_DIMENSIONS;

    /// Creates a backend with file persistence.
    #[must_use]
    pub fn new(index_path: impl Into<PathBuf>, dimensions: usize) -> Self {
        Self {
            index_path: index_path.into(),
            dimensions,
            points: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an in-memory backend (no file persistence).
    #[must_use]
    pub fn in_memory(dimensions: usize) -> Self {
        Self::new(PathBuf::new(), dimensions)
    }

    /// Loads the index from disk, if the index file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// stored dimensions do not match.
    pub fn load(&self) -> Result<()> {
        if self.index_path.as_os_str().is_empty() || !self.index_path.exists() {
            return Ok(());
        }

        let content =
            fs::read_to_string(&self.index_path).map_err(|e| Error::OperationFailed {
                operation: "load_vector_index".to_string(),
                cause: e.to_string(),
            })?;

        let data: IndexData =
            serde_json::from_str(&content).map_err(|e| Error::OperationFailed {
                operation: "parse_vector_index".to_string(),
                cause: e.to_string(),
            })?;

        if data.dimensions != self.dimensions {
            return Err(Error::InvalidInput(format!(
                "index dimensions mismatch: expected {}, got {}",
                self.dimensions, data.dimensions
            )));
        }

        *acquire_lock(&self.points) = data.points;
        Ok(())
    }

    /// Saves the index to disk, if a path was configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        if self.index_path.as_os_str().is_empty() {
            return Ok(());
        }

        let data = IndexData {
            dimensions: self.dimensions,
            points: acquire_lock(&self.points).clone(),
        };

        let content = serde_json::to_string(&data).map_err(|e| Error::OperationFailed {
            operation: "serialize_vector_index".to_string(),
            cause: e.to_string(),
        })?;

        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_index_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        fs::write(&self.index_path, content).map_err(|e| Error::OperationFailed {
            operation: "write_vector_index".to_string(),
            cause: e.to_string(),
        })
    }

    /// Computes cosine similarity between two vectors, normalized to `[0, 1]`.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        // Cosine similarity ranges from -1 to 1, normalize to 0 to 1
        f32::midpoint(dot_product / (norm_a * norm_b), 1.0)
    }

    /// Validates embedding dimensions.
    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(Error::InvalidInput(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }
        Ok(())
    }
}

impl VectorSearchBackend for InMemoryVectorBackend {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn upsert(&self, point: &VectorPoint) -> Result<()> {
        self.validate_embedding(&point.vector)?;
        acquire_lock(&self.points).insert(
            point.id.as_str().to_string(),
            StoredPoint {
                vector: point.vector.clone(),
                payload: point.payload.clone(),
            },
        );
        Ok(())
    }

    fn search(
        &self,
        query: &[f32],
        limit: usize,
        score_floor: Option<f32>,
    ) -> Result<Vec<ScoredPoint>> {
        self.validate_embedding(query)?;

        let points = acquire_lock(&self.points);
        let mut hits: Vec<ScoredPoint> = points
            .iter()
            .map(|(id, stored)| ScoredPoint {
                id: crate::models::PromptId::new(id.clone()),
                score: Self::cosine_similarity(query, &stored.vector),
                payload: stored.payload.clone(),
            })
            .filter(|hit| score_floor.is_none_or(|floor| hit.score >= floor))
            .collect();
        drop(points);

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    fn remove(&self, id: &crate::models::PromptId) -> Result<bool> {
        Ok(acquire_lock(&self.points).remove(id.as_str()).is_some())
    }

    fn count(&self) -> Result<usize> {
        Ok(acquire_lock(&self.points).len())
    }
}
