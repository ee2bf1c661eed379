//! Run summary rendering.

use comfy_table::{ContentArrangement, Table};
use oci_purge_core::RunReport;

use crate::commands::OutputFormat;

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Format a duration in seconds as "1m 05s" / "42s".
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m {:02}s", minutes, seconds % 60);
    }
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Render the final report as a table or JSON.
pub fn render_report(report: &RunReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Table => Ok(render_table(report)),
    }
}

fn render_table(report: &RunReport) -> String {
    let summary = &report.summary;
    let elapsed = report
        .finished_at
        .signed_duration_since(report.started_at)
        .num_seconds();
    let deleted_label = if report.dry_run {
        "WOULD DELETE"
    } else {
        "DELETED"
    };

    let mut table = new_table(&["RUN", "RESULT"]);
    table.add_row(vec!["REGISTRY".to_string(), report.registry.clone()]);
    table.add_row(vec![
        "MODE".to_string(),
        if report.dry_run { "dry-run" } else { "live" }.to_string(),
    ]);
    table.add_row(vec![
        "CUTOFF".to_string(),
        format!("{} ({} days)", report.cutoff, report.retention_days),
    ]);
    table.add_row(vec![
        "REPOSITORIES".to_string(),
        summary.repositories_processed.to_string(),
    ]);
    table.add_row(vec!["SCANNED".to_string(), summary.artifacts_scanned.to_string()]);
    table.add_row(vec![deleted_label.to_string(), summary.deleted.to_string()]);
    table.add_row(vec!["RETAINED".to_string(), summary.retained().to_string()]);
    table.add_row(vec![
        "SKIPPED (NO DATE)".to_string(),
        summary.skipped_no_date.to_string(),
    ]);
    table.add_row(vec!["ERRORS".to_string(), summary.errors.to_string()]);
    table.add_row(vec!["ELAPSED".to_string(), format_elapsed(elapsed)]);

    table.to_string()
}
