// src/scraper/export.rs
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::rows::has_required_columns;
use crate::domain::{AppointmentStatus, CustomField, FilterMode};
use crate::errors::ScrapeError;
use crate::scraper::http::{HttpResponse, Session};
use crate::scraper::models::{CsrfToken, DateFilter, ExportWindow, RawExportPayload};
use crate::scraper::retry::RetryPolicy;
use crate::settings::Settings;

pub const EXPORT_ACTION: &str = "bookly_pro_export_appointments";

const EXCERPT_CHARS: usize = 200;

// Columns switched on in the export form, in the plugin's own key names.
const EXPORT_COLUMNS: &[&str] = &[
    "id",
    "start_date",
    "staff_name",
    "customer_full_name",
    "customer_phone",
    "customer_email",
    "service_title",
    "service_duration",
    "status",
    "payment",
    "notes",
    "created_date",
    "customer_address",
    "customer_birthday",
    "online_meeting",
];

/// Export windows needed to cover the configured range and statuses.
///
/// With a server-side filter and a date range, the range is fetched in two
/// halves. Otherwise two broad requests are made: every dated appointment,
/// then the undated ones the plugin leaves out of "any".
pub fn plan_windows(settings: &Settings) -> Vec<ExportWindow> {
    match (settings.filter_mode, settings.date_range) {
        (FilterMode::Server, Some(range)) => range
            .split_halves()
            .into_iter()
            .map(|half| ExportWindow {
                label: format!("{}_{}", half.start(), half.end()),
                date: DateFilter::Range(half),
                statuses: settings.statuses.clone(),
            })
            .collect(),
        (mode, _) => {
            let statuses = match mode {
                FilterMode::Server => settings.statuses.clone(),
                FilterMode::Client => AppointmentStatus::ALL.to_vec(),
            };
            vec![
                ExportWindow {
                    label: "any".to_string(),
                    date: DateFilter::Any,
                    statuses: statuses.clone(),
                },
                ExportWindow {
                    label: "unscheduled".to_string(),
                    date: DateFilter::Unscheduled,
                    statuses,
                },
            ]
        }
    }
}

/// Form body for one export request.
pub fn export_form(
    window: &ExportWindow,
    token: &CsrfToken,
    custom_fields: &[CustomField],
) -> Vec<(String, String)> {
    let mut form = vec![
        ("action".to_string(), EXPORT_ACTION.to_string()),
        ("delimiter".to_string(), ",".to_string()),
    ];
    form.extend(
        EXPORT_COLUMNS
            .iter()
            .map(|col| col.to_string())
            .chain(custom_fields.iter().map(CustomField::export_key))
            .map(|col| (format!("exp[{col}]"), "on".to_string())),
    );
    form.push(("filter".to_string(), window.filter_json()));
    if let Some(value) = token.value() {
        form.push(("csrf_token".to_string(), value.to_string()));
    }
    form
}

/// Issues export requests for one session. Holds no state between calls.
pub struct ExportFetcher<'a> {
    session: &'a Session,
    token: &'a CsrfToken,
    retry: &'a RetryPolicy,
    timeout: Duration,
    debug_dir: &'a Path,
    custom_fields: &'a [CustomField],
}

impl<'a> ExportFetcher<'a> {
    pub fn new(
        session: &'a Session,
        token: &'a CsrfToken,
        retry: &'a RetryPolicy,
        timeout: Duration,
        debug_dir: &'a Path,
        custom_fields: &'a [CustomField],
    ) -> Self {
        Self {
            session,
            token,
            retry,
            timeout,
            debug_dir,
            custom_fields,
        }
    }

    /// Fetch every window in order; the first window that exhausts its
    /// retries aborts the rest.
    pub fn fetch_all(&self, windows: &[ExportWindow]) -> Result<Vec<RawExportPayload>, ScrapeError> {
        info!("Exporting appointments in {} request(s)", windows.len());
        windows.iter().map(|w| self.fetch(w)).collect()
    }

    pub fn fetch(&self, window: &ExportWindow) -> Result<RawExportPayload, ScrapeError> {
        let what = format!("export ({})", window.label);
        self.retry.run(&what, |attempt| self.fetch_once(window, attempt))
    }

    fn fetch_once(&self, window: &ExportWindow, attempt: u32) -> Result<RawExportPayload, ScrapeError> {
        info!("Requesting export window {} (attempt {attempt})", window.label);
        let form = export_form(window, self.token, self.custom_fields);
        let resp = self
            .session
            .post_form(&self.session.ajax_url(), &form, self.timeout)?;

        if let Err(e) = check_export_response(&resp) {
            if let Some(path) = write_debug_artifact(self.debug_dir, &window.label, attempt, &resp) {
                warn!("Saved failing export response to {}", path.display());
            }
            return Err(e);
        }

        info!("Export window {} returned {} bytes", window.label, resp.body.len());
        Ok(RawExportPayload {
            window: window.clone(),
            body: resp.body,
        })
    }
}

/// Anything other than a CSV body headed by ID and date columns is a failed
/// export. A header-only CSV is a valid empty export.
pub fn check_export_response(resp: &HttpResponse) -> Result<(), ScrapeError> {
    let body = resp.body.trim_start_matches('\u{feff}').trim();
    let fail = |why: &str| ScrapeError::Fetch {
        status: resp.status,
        excerpt: excerpt(why, body),
    };

    if !resp.is_success() {
        return Err(fail(""));
    }
    if body.is_empty() {
        return Err(fail("empty body"));
    }
    // admin-ajax answers "0" for an unknown action and "-1" for a bad nonce.
    if body == "0" || body == "-1" {
        return Err(fail("admin-ajax rejected the request"));
    }
    let head = body.get(..body.len().min(64)).unwrap_or(body).to_ascii_lowercase();
    if head.starts_with("<!doctype") || head.starts_with("<html") {
        return Err(fail("HTML page instead of CSV"));
    }
    if body.starts_with('{') || body.starts_with('[') {
        return Err(fail("JSON reply instead of CSV"));
    }
    if !has_required_columns(body) {
        return Err(fail("no ID or date column in the header"));
    }
    Ok(())
}

fn excerpt(why: &str, body: &str) -> String {
    let text: String = body
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(EXCERPT_CHARS)
        .collect();
    match (why.is_empty(), text.is_empty()) {
        (true, _) => text,
        (false, true) => why.to_string(),
        (false, false) => format!("{why}: {text}"),
    }
}

/// Best effort; a snapshot that cannot be written only costs diagnostics.
fn write_debug_artifact(
    dir: &Path,
    label: &str,
    attempt: u32,
    resp: &HttpResponse,
) -> Option<PathBuf> {
    let safe: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let path = dir.join(format!("export_debug_{safe}_attempt{attempt}.html"));

    let snapshot = format!(
        "<!-- HTTP {} {} -->\n{}",
        resp.status, resp.final_url, resp.body
    );
    let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, snapshot));
    match written {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Could not write debug snapshot {}: {e}", path.display());
            None
        }
    }
}
