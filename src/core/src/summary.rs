//! Per-run accounting.
//!
//! Repository workers share one [`SummaryAccumulator`]; counters only ever
//! increase. [`RunSummary`] is the immutable snapshot reported at the end.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Final counters of one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub repositories_processed: u64,
    pub artifacts_scanned: u64,
    pub deleted: u64,
    pub skipped_no_date: u64,
    pub errors: u64,
}

impl RunSummary {
    /// Artifacts that were scanned and left in place.
    pub fn retained(&self) -> u64 {
        self.artifacts_scanned
            .saturating_sub(self.deleted + self.skipped_no_date + self.errors)
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Thread-safe counters updated by concurrent repository workers.
#[derive(Debug, Default)]
pub struct SummaryAccumulator {
    repositories_processed: AtomicU64,
    artifacts_scanned: AtomicU64,
    deleted: AtomicU64,
    skipped_no_date: AtomicU64,
    errors: AtomicU64,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_repository(&self) {
        self.repositories_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scanned(&self) {
        self.artifacts_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_no_date(&self) {
        self.skipped_no_date.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of the current counter values.
    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            repositories_processed: self.repositories_processed.load(Ordering::Relaxed),
            artifacts_scanned: self.artifacts_scanned.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            skipped_no_date: self.skipped_no_date.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Summary plus the run parameters it was produced under.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub registry: String,
    pub dry_run: bool,
    pub retention_days: u32,
    pub cutoff: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub summary: RunSummary,
}
