//! Guarded manifest deletion.

use std::sync::Arc;

use oci_purge_core::PurgeError;

use crate::oci::Registry;

/// Result of a deletion attempt.
#[derive(Debug)]
pub enum DeletionOutcome {
    /// Removed, or would have been under dry-run.
    Deleted,
    Failed(PurgeError),
}

impl DeletionOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeletionOutcome::Deleted)
    }
}

/// Deletes manifests by digest, or only logs the intent under dry-run.
pub struct DeletionExecutor {
    registry: Arc<dyn Registry>,
    dry_run: bool,
}

impl DeletionExecutor {
    pub fn new(registry: Arc<dyn Registry>, dry_run: bool) -> Self {
        Self { registry, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Delete `repository@digest`.
    ///
    /// Under dry-run the registry is never contacted and the outcome is
    /// always [`DeletionOutcome::Deleted`].
    pub async fn delete(&self, repository: &str, digest: &str) -> DeletionOutcome {
        if self.dry_run {
            tracing::info!(
                repository = %repository,
                digest = %digest,
                dry_run = true,
                "Would delete artifact"
            );
            return DeletionOutcome::Deleted;
        }

        match self.registry.delete_manifest(repository, digest).await {
            Ok(()) => {
                tracing::info!(repository = %repository, digest = %digest, "Deleted artifact");
                DeletionOutcome::Deleted
            }
            Err(e) => DeletionOutcome::Failed(e),
        }
    }
}
