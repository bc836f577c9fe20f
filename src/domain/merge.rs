// src/domain/merge.rs

use std::collections::HashSet;

use tracing::info;

use crate::domain::appointment::{AppointmentRecord, AppointmentStatus};
use crate::domain::rows::parse_export;
use crate::domain::window::DateRange;
use crate::scraper::RawExportPayload;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub rows_seen: usize,
    pub duplicates_removed: usize,
    pub rows_skipped: usize,
    pub filtered_out: usize,
}

/// Deduplicated records in first-seen order.
#[derive(Debug, Default)]
pub struct ExportResult {
    pub records: Vec<AppointmentRecord>,
    pub stats: MergeStats,
}

#[cfg(test)]
impl ExportResult {
    pub fn ids(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.id).collect()
    }
}

/// Post-filter used when the export endpoint is not trusted to filter.
#[derive(Debug, Clone)]
pub struct ClientFilter {
    pub date_range: Option<DateRange>,
    pub statuses: Vec<AppointmentStatus>,
}

impl ClientFilter {
    fn keeps(&self, rec: &AppointmentRecord) -> bool {
        // An undated booking cannot fall inside a range.
        if let Some(range) = &self.date_range {
            if !rec.date.is_some_and(|date| range.contains(date)) {
                return false;
            }
        }
        match rec.known_status() {
            Some(status) => self.statuses.contains(&status),
            // Unrecognised status text only passes an unrestricted filter.
            None => AppointmentStatus::ALL.iter().all(|s| self.statuses.contains(s)),
        }
    }
}

/// Combine payloads into one record set keyed by `id`.
///
/// The first copy of an id wins: payloads are taken in the order given, rows
/// in file order, and any later row with an already-seen id is dropped even if
/// its fields differ. The set of surviving ids does not depend on payload
/// order; which copy survives does.
pub fn merge(payloads: &[RawExportPayload], filter: Option<&ClientFilter>) -> ExportResult {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut result = ExportResult::default();

    for payload in payloads {
        let parsed = parse_export(&payload.body);
        info!(
            "Window {}: {} rows, {} skipped",
            payload.window.label, parsed.rows_seen, parsed.rows_skipped
        );
        result.stats.rows_seen += parsed.rows_seen;
        result.stats.rows_skipped += parsed.rows_skipped;

        for rec in parsed.records {
            if !seen.insert(rec.id) {
                result.stats.duplicates_removed += 1;
                continue;
            }
            if filter.is_some_and(|f| !f.keeps(&rec)) {
                result.stats.filtered_out += 1;
                continue;
            }
            result.records.push(rec);
        }
    }

    let s = result.stats;
    info!(
        "Merged {} records ({} rows seen, {} duplicates removed, {} skipped, {} filtered out)",
        result.records.len(),
        s.rows_seen,
        s.duplicates_removed,
        s.rows_skipped,
        s.filtered_out
    );
    result
}
