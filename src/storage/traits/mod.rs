//! Storage trait seams.

mod cache;
mod record;
mod vector;

pub use cache::{SimilarityCache, similarity_cache_key};
pub use record::RecordStore;
pub use vector::{ScoredPoint, VectorPayload, VectorPoint, VectorSearchBackend};
