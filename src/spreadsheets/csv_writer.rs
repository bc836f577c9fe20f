// src/spreadsheets/csv_writer.rs
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[cfg(test)]
use crate::domain::rows::parse_export;
use crate::domain::{AppointmentRecord, CustomField, ExportResult};
use crate::errors::ScrapeError;
use crate::spreadsheets::csv::write_row;

/// Bump when columns are added, removed, reordered or reformatted.
///
/// v2: one column per configured custom field, by label, between
/// "Online meeting" and "Custom fields".
pub const HEADER_VERSION: u32 = 2;

/// Fixed leading columns. Dates are `%Y-%m-%d`, times `%H:%M`; an
/// unscheduled booking has both cells empty.
pub const LEADING_COLUMNS: [&str; 16] = [
    "ID",
    "Appointment date",
    "Appointment time",
    "Staff",
    "Customer name",
    "Customer phone",
    "Customer email",
    "Service",
    "Duration",
    "Status",
    "Payment",
    "Notes",
    "Created",
    "Customer address",
    "Customer birthday",
    "Online meeting",
];

/// Last column: the plugin's own custom-fields cell plus every extra column
/// no configured field claimed, as `Name: value` pairs.
pub const CUSTOM_FIELDS_COLUMN: &str = "Custom fields";

/// Output header for a given custom-field layout.
pub fn header_for(custom: &[CustomField]) -> Vec<String> {
    LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(custom.iter().map(|f| f.label.clone()))
        .chain(std::iter::once(CUSTOM_FIELDS_COLUMN.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub bytes: u64,
    pub rows: usize,
    pub header_version: u32,
}

fn to_row(rec: &AppointmentRecord, custom: &[CustomField]) -> Vec<String> {
    let mut row = vec![
        rec.id.to_string(),
        rec.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        rec.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
        rec.staff.clone(),
        rec.customer_name.clone(),
        rec.customer_phone.clone(),
        rec.customer_email.clone(),
        rec.service.clone(),
        rec.duration.clone(),
        rec.status.clone(),
        rec.payment.clone(),
        rec.notes.clone(),
        rec.created.clone(),
        rec.customer_address.clone(),
        rec.customer_birthday.clone(),
        rec.online_meeting.clone(),
    ];

    // Each extra column goes to at most one configured field.
    let mut claimed = vec![false; rec.extra.len()];
    for field in custom {
        let hit = rec
            .extra
            .iter()
            .enumerate()
            .find(|(i, (header, _))| !claimed[*i] && field.matches(header));
        match hit {
            Some((i, (_, value))) => {
                claimed[i] = true;
                row.push(value.clone());
            }
            None => row.push(String::new()),
        }
    }

    let mut rest: Vec<String> = Vec::new();
    if !rec.custom_fields.trim().is_empty() {
        rest.push(rec.custom_fields.clone());
    }
    for (i, (header, value)) in rec.extra.iter().enumerate() {
        if !claimed[i] {
            rest.push(format!("{header}: {}", value.trim()));
        }
    }
    row.push(rest.join("; "));
    row
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export.csv".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

fn write_err(path: &Path, e: std::io::Error) -> ScrapeError {
    ScrapeError::Write(format!("{}: {e}", path.display()))
}

/// Replace `path` with the serialized records. Readers see either the old
/// file or the complete new one: rows go to a sibling temp file which is
/// synced and then renamed over the target.
pub fn write_atomic(
    result: &ExportResult,
    custom: &[CustomField],
    path: &Path,
) -> Result<WriteOutcome, ScrapeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }

    let tmp = temp_path_for(path);
    if let Err(e) = write_file(result, custom, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(path, e));
    }

    let meta = fs::metadata(path).map_err(|e| write_err(path, e))?;
    info!("Saved {} appointments to {}", result.records.len(), path.display());
    info!("File size: {} bytes", meta.len());
    if let Ok(modified) = meta.modified() {
        let modified: DateTime<Local> = modified.into();
        info!("Last modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(WriteOutcome {
        path: path.to_path_buf(),
        bytes: meta.len(),
        rows: result.records.len(),
        header_version: HEADER_VERSION,
    })
}

fn write_file(result: &ExportResult, custom: &[CustomField], tmp: &Path) -> Result<(), ScrapeError> {
    let file = File::create(tmp).map_err(|e| write_err(tmp, e))?;
    let mut w = BufWriter::new(file);

    write_row(&mut w, &header_for(custom)).map_err(|e| write_err(tmp, e))?;
    for rec in &result.records {
        write_row(&mut w, &to_row(rec, custom)).map_err(|e| write_err(tmp, e))?;
    }
    w.flush().map_err(|e| write_err(tmp, e))?;

    let file = w.into_inner().map_err(|e| write_err(tmp, e.into_error()))?;
    file.sync_all().map_err(|e| write_err(tmp, e))
}

/// Parse a file produced by `write_atomic` back into records.
#[cfg(test)]
pub fn read_back(path: &Path) -> Result<Vec<AppointmentRecord>, ScrapeError> {
    let text = fs::read_to_string(path).map_err(|e| write_err(path, e))?;
    Ok(parse_export(&text).records)
}
