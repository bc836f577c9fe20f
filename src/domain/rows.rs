// src/domain/rows.rs
//
// Export CSV -> AppointmentRecord. Column headers are matched by name, not
// position, since the plugin only emits the columns that were switched on.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::domain::appointment::{normalize_status, AppointmentRecord};
use crate::spreadsheets::csv::parse_rows;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Date,
    Time,
    Staff,
    CustomerName,
    CustomerPhone,
    CustomerEmail,
    Service,
    Duration,
    Status,
    Payment,
    Notes,
    Created,
    CustomerAddress,
    CustomerBirthday,
    OnlineMeeting,
    CustomFields,
}

const ALIASES: &[(Column, &[&str])] = &[
    (Column::Id, &["id", "appointment id"]),
    (Column::Date, &["appointment date", "start date", "date", "start"]),
    (Column::Time, &["appointment time", "time", "start time"]),
    (Column::Staff, &["staff", "staff member", "staff name", "provider"]),
    (Column::CustomerName, &["customer name", "customer full name", "customer", "full name"]),
    (Column::CustomerPhone, &["customer phone", "phone"]),
    (Column::CustomerEmail, &["customer email", "email"]),
    (Column::Service, &["service", "service title", "service name"]),
    (Column::Duration, &["duration", "service duration"]),
    (Column::Status, &["status"]),
    (Column::Payment, &["payment"]),
    (Column::Notes, &["notes", "note"]),
    (Column::Created, &["created", "created date", "created at"]),
    (Column::CustomerAddress, &["customer address", "address"]),
    (Column::CustomerBirthday, &["customer birthday", "birthday"]),
    (Column::OnlineMeeting, &["online meeting"]),
    (Column::CustomFields, &["custom fields"]),
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%B %d, %Y %I:%M %p",
    "%m/%d/%Y %I:%M %p",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%d/%m/%Y", "%d.%m.%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p"];

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn lookup(header: &str) -> Option<Column> {
    let key = normalize_header(header);
    ALIASES
        .iter()
        .find(|(_, names)| names.contains(&key.as_str()))
        .map(|(col, _)| *col)
}

/// Appointment start as it appears in the export: a full datetime, or a bare date.
pub fn parse_start(raw: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some((dt.date(), Some(dt.time())));
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|date| (date, None))
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// Records parsed out of one payload, in row order.
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub records: Vec<AppointmentRecord>,
    pub rows_seen: usize,
    pub rows_skipped: usize,
}

fn has_id_and_date(columns: &[Option<Column>]) -> bool {
    columns.contains(&Some(Column::Id)) && columns.contains(&Some(Column::Date))
}

/// Whether the body starts with a header row naming both an ID and a date
/// column. Anything else is not an appointments export.
pub fn has_required_columns(body: &str) -> bool {
    parse_rows(body)
        .first()
        .map(|header| {
            let columns: Vec<Option<Column>> = header.iter().map(|h| lookup(h)).collect();
            has_id_and_date(&columns)
        })
        .unwrap_or(false)
}

/// Parse an export body. The first row is the header; every data row either
/// becomes a record or is counted as skipped.
pub fn parse_export(body: &str) -> ParsedRows {
    let mut rows = parse_rows(body).into_iter();
    let Some(header) = rows.next() else {
        return ParsedRows::default();
    };

    let columns: Vec<Option<Column>> = header.iter().map(|h| lookup(h)).collect();
    if !has_id_and_date(&columns) {
        warn!("Export header lacks an ID or date column: {:?}", header);
    }

    let mut parsed = ParsedRows::default();
    for (line, row) in rows.enumerate() {
        parsed.rows_seen += 1;
        match map_row(&header, &columns, &row) {
            Ok(record) => parsed.records.push(record),
            Err(reason) => {
                parsed.rows_skipped += 1;
                debug!("Skipping export row {}: {reason}", line + 1);
            }
        }
    }
    parsed
}

// Raw cell text. Free-text fields keep their whitespace; callers trim the
// ones they parse.
fn cell_for<'a>(columns: &[Option<Column>], row: &'a [String], col: Column) -> &'a str {
    columns
        .iter()
        .position(|c| *c == Some(col))
        .and_then(|i| row.get(i))
        .map(|s| s.as_str())
        .unwrap_or("")
}

fn map_row(
    header: &[String],
    columns: &[Option<Column>],
    row: &[String],
) -> Result<AppointmentRecord, String> {
    let cell = |col: Column| cell_for(columns, row, col);

    let id_raw = cell(Column::Id).trim();
    if id_raw.is_empty() {
        return Err("missing id".into());
    }
    let id: u64 = id_raw
        .parse()
        .map_err(|_| format!("id '{id_raw}' is not a number"))?;

    // An empty date is an unscheduled booking; a date that is present must parse.
    let date_raw = cell(Column::Date).trim();
    let (date, mut time) = if date_raw.is_empty() {
        (None, None)
    } else {
        let (date, time) =
            parse_start(date_raw).ok_or_else(|| format!("unreadable date '{date_raw}'"))?;
        (Some(date), time)
    };
    if let Some(t) = parse_time(cell(Column::Time)) {
        time = Some(t);
    }

    let mut rec = AppointmentRecord::new(id, date);
    rec.time = time;
    rec.staff = cell(Column::Staff).to_string();
    rec.customer_name = cell(Column::CustomerName).to_string();
    rec.customer_phone = cell(Column::CustomerPhone).to_string();
    rec.customer_email = cell(Column::CustomerEmail).to_string();
    rec.service = cell(Column::Service).to_string();
    rec.duration = cell(Column::Duration).to_string();
    rec.status = normalize_status(cell(Column::Status));
    rec.payment = cell(Column::Payment).to_string();
    rec.notes = cell(Column::Notes).to_string();
    rec.created = cell(Column::Created).to_string();
    rec.customer_address = cell(Column::CustomerAddress).to_string();
    rec.customer_birthday = cell(Column::CustomerBirthday).to_string();
    rec.online_meeting = cell(Column::OnlineMeeting).to_string();
    rec.custom_fields = cell(Column::CustomFields).to_string();

    for (i, col) in columns.iter().enumerate() {
        if col.is_some() {
            continue;
        }
        let value = row.get(i).map(|s| s.as_str()).unwrap_or("");
        if !value.trim().is_empty() {
            rec.extra.push((header[i].trim().to_string(), value.to_string()));
        }
    }

    Ok(rec)
}
