//! Storage layer: record store, vector search, and similarity cache.
//!
//! All external collaborators sit behind `Send + Sync` traits so engines can
//! be constructed with interface-typed dependencies and shared across
//! concurrent ingestion tasks via `Arc`.

pub mod cache;
pub mod sqlite;
pub mod traits;
pub mod vector;

pub use cache::InMemorySimilarityCache;
pub use sqlite::SqliteRecordStore;
pub use traits::{
    RecordStore, ScoredPoint, SimilarityCache, VectorPayload, VectorPoint, VectorSearchBackend,
};
pub use vector::InMemoryVectorBackend;

use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};

/// Computes the SHA-256 fingerprint of prompt content, hex-encoded.
///
/// Used as the cluster seed fingerprint, where a UNIQUE constraint collapses
/// concurrent cluster creations for byte-identical content.
#[must_use]
pub fn content_fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Acquires a mutex lock with poison recovery.
///
/// If the mutex is poisoned by a panic in a previous critical section, the
/// inner value is recovered and a warning is logged. This prevents one
/// panicked operation from cascading into every later storage call.
pub(crate) fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("storage mutex was poisoned, recovering");
            metrics::counter!("storage_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}
