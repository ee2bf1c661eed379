//! Retention cutoff computation and expiry checks.
//!
//! The cutoff is computed once per run and shared by every evaluation in
//! that run, so a long scan never drifts.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::{PurgeError, Result};

/// Retention window resolved to a fixed cutoff instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    retention_days: u32,
    cutoff: DateTime<Utc>,
}

impl RetentionPolicy {
    /// Compute the cutoff `now - retention_days`.
    pub fn new(retention_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            retention_days,
            cutoff: now - Duration::days(i64::from(retention_days)),
        }
    }

    /// Compute the cutoff relative to the current wall clock.
    pub fn starting_now(retention_days: u32) -> Self {
        Self::new(retention_days, Utc::now())
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Cutoff formatted as an RFC 3339 instant (`2024-01-01T00:00:00Z`).
    pub fn cutoff_rfc3339(&self) -> String {
        format_instant(&self.cutoff)
    }

    /// True iff the artifact was created strictly before the cutoff.
    pub fn is_expired(&self, created: &DateTime<Utc>) -> bool {
        *created < self.cutoff
    }
}

/// Parse an RFC 3339 instant, normalising it to UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PurgeError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Format an instant as RFC 3339 with second precision and a `Z` suffix.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compute the cutoff for `retention_days` before `now`, as RFC 3339.
pub fn compute_cutoff(retention_days: u32, now: DateTime<Utc>) -> String {
    RetentionPolicy::new(retention_days, now).cutoff_rfc3339()
}

/// Compare two RFC 3339 instants.
///
/// Returns `Ok(true)` iff `image_timestamp < cutoff`. A value that does not
/// parse is reported as [`PurgeError::InvalidTimestamp`], never as expired
/// or retained.
pub fn is_expired(image_timestamp: &str, cutoff: &str) -> Result<bool> {
    let created = parse_timestamp(image_timestamp)?;
    let cutoff = parse_timestamp(cutoff)?;
    Ok(created < cutoff)
}
