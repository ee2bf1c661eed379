//! Cleanup run orchestration.
//!
//! Enumerates the catalog once, then processes matching repositories on a
//! bounded pool of tasks (one permit per repository, `batch_size` permits).
//! Tags inside a repository are handled one after another. A failure in
//! one repository or tag is logged and counted, never propagated; only a
//! catalog failure ends the run early.

use std::sync::Arc;

use chrono::Utc;
use oci_purge_core::error::Result;
use oci_purge_core::{PurgeConfig, RetentionPolicy, RunReport, SummaryAccumulator};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::deletion::{DeletionExecutor, DeletionOutcome};
use crate::oci::{DateResolver, Registry};

/// What happened to a single tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    /// Newer than the cutoff
    Retained,
    /// Expired and deleted (or would be, under dry-run)
    Deleted,
    /// No creation date could be determined
    SkippedNoDate,
    /// Digest lookup or deletion failed
    Failed,
}

/// Runs one cleanup pass against a registry.
pub struct Orchestrator {
    config: Arc<PurgeConfig>,
    registry: Arc<dyn Registry>,
    resolver: Arc<DateResolver>,
    deleter: Arc<DeletionExecutor>,
}

impl Orchestrator {
    pub fn new(config: Arc<PurgeConfig>, registry: Arc<dyn Registry>) -> Self {
        let resolver = Arc::new(DateResolver::new(
            registry.clone(),
            config.manifest_list_strategy.clone(),
        ));
        let deleter = Arc::new(DeletionExecutor::new(registry.clone(), config.dry_run));
        Self {
            config,
            registry,
            resolver,
            deleter,
        }
    }

    /// Run with a cutoff computed from the current time.
    pub async fn cleanup(&self) -> Result<RunReport> {
        self.cleanup_with_policy(RetentionPolicy::starting_now(self.config.retention_days))
            .await
    }

    /// Run with an explicit retention policy.
    ///
    /// The policy's cutoff is shared by every tag evaluated in this run.
    pub async fn cleanup_with_policy(&self, policy: RetentionPolicy) -> Result<RunReport> {
        let started_at = Utc::now();

        tracing::info!(
            registry = %self.config.registry_host(),
            cutoff = %policy.cutoff_rfc3339(),
            retention_days = policy.retention_days(),
            dry_run = self.config.dry_run,
            batch_size = self.config.batch_size,
            artifact_filter = %self.config.artifact_filter.describe(),
            tag_filter = %self.config.tag_filter.describe(),
            "Starting registry cleanup"
        );

        let repositories = self.registry.list_repositories().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list repositories");
            e
        })?;

        let summary = Arc::new(SummaryAccumulator::new());
        let semaphore = Arc::new(Semaphore::new(self.config.batch_size));
        let mut workers = JoinSet::new();

        for repository in repositories {
            if !self.config.artifact_filter.matches(&repository) {
                tracing::debug!(repository = %repository, "Repository filtered out");
                continue;
            }

            let worker = RepositoryWorker {
                config: self.config.clone(),
                registry: self.registry.clone(),
                resolver: self.resolver.clone(),
                deleter: self.deleter.clone(),
                summary: summary.clone(),
                policy,
            };
            let semaphore = semaphore.clone();

            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                worker.process_repository(&repository).await;
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Repository worker aborted");
                summary.record_error();
            }
        }

        let report = RunReport {
            registry: self.config.registry_url.clone(),
            dry_run: self.config.dry_run,
            retention_days: policy.retention_days(),
            cutoff: policy.cutoff_rfc3339(),
            started_at,
            finished_at: Utc::now(),
            summary: summary.snapshot(),
        };

        tracing::info!(
            repositories = report.summary.repositories_processed,
            scanned = report.summary.artifacts_scanned,
            deleted = report.summary.deleted,
            skipped_no_date = report.summary.skipped_no_date,
            errors = report.summary.errors,
            "Registry cleanup finished"
        );

        Ok(report)
    }
}

/// Per-repository task state; everything shared is behind an `Arc`.
struct RepositoryWorker {
    config: Arc<PurgeConfig>,
    registry: Arc<dyn Registry>,
    resolver: Arc<DateResolver>,
    deleter: Arc<DeletionExecutor>,
    summary: Arc<SummaryAccumulator>,
    policy: RetentionPolicy,
}

impl RepositoryWorker {
    async fn process_repository(&self, repository: &str) {
        self.summary.record_repository();

        let tags = match self.registry.list_tags(repository).await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::error!(repository = %repository, error = %e, "Failed to list tags");
                self.summary.record_error();
                return;
            }
        };

        tracing::debug!(repository = %repository, tags = tags.len(), "Processing repository");

        for tag in &tags {
            if !self.config.tag_filter.matches(tag) {
                tracing::trace!(repository = %repository, tag = %tag, "Tag filtered out");
                continue;
            }

            self.summary.record_scanned();
            match self.process_tag(repository, tag).await {
                TagOutcome::Retained => {}
                TagOutcome::Deleted => self.summary.record_deleted(),
                TagOutcome::SkippedNoDate => self.summary.record_skipped_no_date(),
                TagOutcome::Failed => self.summary.record_error(),
            }
        }
    }

    async fn process_tag(&self, repository: &str, tag: &str) -> TagOutcome {
        let resolved = match self.resolver.resolve_creation_date(repository, tag).await {
            Ok(resolved) => resolved,
            Err(e) => {
                let message = if e.is_date_resolution_failure() {
                    "Could not determine creation date, skipping"
                } else {
                    "Failed to fetch manifest for date resolution, skipping"
                };
                tracing::warn!(
                    repository = %repository,
                    tag = %tag,
                    error = %e,
                    "{}",
                    message
                );
                return TagOutcome::SkippedNoDate;
            }
        };

        if !self.policy.is_expired(&resolved.created) {
            tracing::debug!(
                repository = %repository,
                tag = %tag,
                created = %resolved.created,
                source = %resolved.source,
                "Retained"
            );
            return TagOutcome::Retained;
        }

        tracing::debug!(
            repository = %repository,
            tag = %tag,
            created = %resolved.created,
            source = %resolved.source,
            "Expired"
        );

        let digest = match self.registry.get_manifest_digest(repository, tag).await {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!(
                    repository = %repository,
                    tag = %tag,
                    error = %e,
                    "Failed to resolve digest of expired tag"
                );
                return TagOutcome::Failed;
            }
        };

        match self.deleter.delete(repository, &digest).await {
            DeletionOutcome::Deleted => TagOutcome::Deleted,
            DeletionOutcome::Failed(e) => {
                tracing::error!(
                    repository = %repository,
                    tag = %tag,
                    digest = %digest,
                    error = %e,
                    "Failed to delete artifact"
                );
                TagOutcome::Failed
            }
        }
    }
}
