// crates/server/src/jobs/report.rs
//! Plain-text error report for a job's failed objects.

use std::fmt::Write;

use super::types::{JobRecord, ObjectStatus};

const RULE: &str = "-- ========================================";

/// Render failed objects as an SQL script of comments plus the source and
/// translated SQL, suitable for fixing by hand. `None` when nothing failed.
pub fn error_report(record: &JobRecord) -> Option<String> {
    let failed: Vec<_> = record
        .object_results
        .iter()
        .filter(|r| r.status == ObjectStatus::Error)
        .collect();
    if failed.is_empty() {
        return None;
    }

    let mut out = String::new();
    let stamp = record
        .end_time
        .unwrap_or(record.start_time)
        .format("%Y%m%d_%H%M%S");
    // Writing to a String cannot fail.
    let _ = writeln!(out, "-- Migration Error Log - {stamp}");
    let _ = writeln!(out, "-- Job: {}", record.job_id);
    let _ = writeln!(out, "-- Source Type: {}", record.source_type);
    let _ = writeln!(
        out,
        "-- Target: {}.{}\n",
        record.target_catalog, record.target_schema
    );

    for result in failed {
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "-- Object: {} ({})", result.object_name, result.object_type);
        let _ = writeln!(
            out,
            "-- Error: {}",
            result.error.as_deref().unwrap_or("unknown error").replace('\n', " ")
        );
        let _ = writeln!(out, "{RULE}\n");
        let _ = writeln!(
            out,
            "-- SOURCE SQL:\n{}\n",
            result.source_sql.as_deref().unwrap_or("-- (not available)")
        );
        let _ = writeln!(
            out,
            "-- TARGET SQL:\n{}\n",
            result
                .translated_sql
                .as_deref()
                .unwrap_or("-- (translation failed)")
        );
    }
    Some(out)
}
