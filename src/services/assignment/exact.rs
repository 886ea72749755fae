//! Exact-duplicate fast path.

use crate::models::{Cluster, PromptId};
use crate::storage::traits::RecordStore;
use crate::{Error, Result};
use std::sync::Arc;

/// Checker for byte-identical content already assigned to a cluster.
pub(super) struct ExactMatchChecker {
    store: Arc<dyn RecordStore>,
}

impl ExactMatchChecker {
    pub(super) fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Returns the cluster of a *different* already-assigned prompt with
    /// byte-identical content, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the matched prompt's recorded cluster
    /// row is gone, which is a data-invariant violation (the assignment row
    /// should have cascaded away with the cluster).
    pub(super) fn check(&self, content: &str, exclude: &PromptId) -> Result<Option<Cluster>> {
        let Some(cluster_id) = self.store.find_exact_content(content, exclude)? else {
            return Ok(None);
        };

        let cluster = self
            .store
            .get_cluster(&cluster_id)?
            .ok_or_else(|| Error::NotFound {
                entity: "cluster",
                id: cluster_id.as_str().to_string(),
            })?;

        Ok(Some(cluster))
    }
}
