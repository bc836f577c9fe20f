// src/settings.rs
//
// Config file + environment -> one immutable Settings value.
// Precedence: environment, then file, then built-in defaults.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::domain::{AppointmentStatus, CustomField, DateRange, FilterMode};
use crate::errors::ScrapeError;

pub const DEFAULT_CONFIG_FILE: &str = "scraper_config.json";
pub const DEFAULT_OUTPUT: &str = "Appointments.csv";

const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Raw contents of the JSON config file. Every key is optional here;
/// required ones are checked after merging with the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub statuses: Option<Vec<String>>,
    pub filter_mode: Option<String>,
    pub output_path: Option<String>,
    pub debug_dir: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub custom_fields: Option<Vec<CustomFieldEntry>>,
}

/// `{"id": 23664, "label": "Role"}`
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldEntry {
    pub id: u64,
    pub label: String,
}

#[derive(Clone, PartialEq)]
pub struct Settings {
    /// Site root without trailing slash, e.g. `https://example.com`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub date_range: Option<DateRange>,
    pub statuses: Vec<AppointmentStatus>,
    pub filter_mode: FilterMode,
    pub output_path: PathBuf,
    pub debug_dir: PathBuf,
    pub login_timeout: Duration,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    /// Booking custom fields requested from the export, in output column order.
    pub custom_fields: Vec<CustomField>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("date_range", &self.date_range)
            .field("statuses", &self.statuses)
            .field("filter_mode", &self.filter_mode)
            .field("output_path", &self.output_path)
            .field("debug_dir", &self.debug_dir)
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("custom_fields", &self.custom_fields)
            .finish()
    }
}

/// Read the JSON config file. A missing file is fine unless the caller named
/// it explicitly.
pub fn load_config_file(path: &Path, explicit: bool) -> Result<Option<ConfigFile>, ScrapeError> {
    if !path.exists() {
        if explicit {
            return Err(ScrapeError::Configuration(format!(
                "config file {} not found",
                path.display()
            )));
        }
        info!("Config file {} not found, using environment only", path.display());
        return Ok(None);
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        ScrapeError::Configuration(format!("could not read {}: {e}", path.display()))
    })?;
    let file: ConfigFile = serde_json::from_str(&text).map_err(|e| {
        ScrapeError::Configuration(format!("{} is not valid config JSON: {e}", path.display()))
    })?;

    info!("Loaded config from {}", path.display());
    Ok(Some(file))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Environment value if set and non-empty, else the file value.
fn pick(env: &HashMap<String, String>, key: &str, file: Option<&String>) -> Option<String> {
    non_empty(env.get(key)).or_else(|| non_empty(file))
}

fn required(value: Option<String>, name: &str, env_key: &str) -> Result<String, ScrapeError> {
    value.ok_or_else(|| {
        ScrapeError::Configuration(format!(
            "missing {name}: set it in {DEFAULT_CONFIG_FILE} or via {env_key}"
        ))
    })
}

fn parse_base_url(raw: &str) -> Result<String, ScrapeError> {
    let url = Url::parse(raw)
        .map_err(|e| ScrapeError::Configuration(format!("base_url '{raw}' is invalid: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ScrapeError::Configuration(format!(
            "base_url '{raw}' must be an http(s) URL with a host"
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_date(raw: &str, name: &str) -> Result<NaiveDate, ScrapeError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ScrapeError::Configuration(format!("{name} '{raw}' is not a YYYY-MM-DD date"))
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, ScrapeError> {
    raw.parse()
        .map_err(|_| ScrapeError::Configuration(format!("{name} '{raw}' is not a number")))
}

fn resolve_custom_fields(
    env: &HashMap<String, String>,
    file: &ConfigFile,
) -> Result<Vec<CustomField>, ScrapeError> {
    let fields: Vec<CustomField> = match non_empty(env.get("WP_CUSTOM_FIELDS")) {
        Some(list) => list
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(|item| item.parse::<CustomField>().map_err(ScrapeError::Configuration))
            .collect::<Result<_, _>>()?,
        None => match &file.custom_fields {
            Some(entries) => {
                let mut fields = Vec::new();
                for entry in entries {
                    if entry.label.trim().is_empty() {
                        return Err(ScrapeError::Configuration(format!(
                            "custom field {} has no label",
                            entry.id
                        )));
                    }
                    fields.push(CustomField::new(entry.id, &entry.label));
                }
                fields
            }
            None => CustomField::defaults(),
        },
    };

    let mut unique: Vec<CustomField> = Vec::new();
    for field in fields {
        if !unique.iter().any(|f| f.id == field.id) {
            unique.push(field);
        }
    }
    Ok(unique)
}

/// Merge the config file and environment into validated settings. Pure: the
/// same inputs always give the same result.
pub fn resolve(
    file: Option<&ConfigFile>,
    env: &HashMap<String, String>,
) -> Result<Settings, ScrapeError> {
    let empty = ConfigFile::default();
    let file = file.unwrap_or(&empty);

    let base_url = required(
        pick(env, "WP_BASE_URL", file.base_url.as_ref()),
        "base_url",
        "WP_BASE_URL",
    )?;
    let base_url = parse_base_url(&base_url)?;
    let username = required(
        pick(env, "WP_USERNAME", file.username.as_ref()),
        "username",
        "WP_USERNAME",
    )?;
    let password = required(
        pick(env, "WP_PASSWORD", file.password.as_ref()),
        "password",
        "WP_PASSWORD",
    )?;

    let start = pick(env, "WP_START_DATE", file.start_date.as_ref());
    let end = pick(env, "WP_END_DATE", file.end_date.as_ref());
    let date_range = match (start, end) {
        (None, None) => None,
        (Some(s), Some(e)) => {
            let range = DateRange::new(parse_date(&s, "start_date")?, parse_date(&e, "end_date")?)
                .map_err(ScrapeError::Configuration)?;
            Some(range)
        }
        _ => {
            return Err(ScrapeError::Configuration(
                "start_date and end_date must be given together".into(),
            ))
        }
    };

    let status_names: Option<Vec<String>> = match non_empty(env.get("WP_STATUSES")) {
        Some(list) => Some(list.split(',').map(|s| s.trim().to_string()).collect()),
        None => file.statuses.clone(),
    };
    let statuses = match status_names {
        Some(names) => {
            let mut parsed = Vec::new();
            for name in names.iter().filter(|n| !n.trim().is_empty()) {
                let status: AppointmentStatus =
                    name.parse().map_err(ScrapeError::Configuration)?;
                if !parsed.contains(&status) {
                    parsed.push(status);
                }
            }
            if parsed.is_empty() {
                return Err(ScrapeError::Configuration("statuses list is empty".into()));
            }
            parsed
        }
        None => AppointmentStatus::ALL.to_vec(),
    };

    let filter_mode = match pick(env, "WP_FILTER_MODE", file.filter_mode.as_ref()) {
        Some(mode) => mode.parse().map_err(ScrapeError::Configuration)?,
        None => FilterMode::default(),
    };

    let output_path = pick(env, "WP_OUTPUT_PATH", file.output_path.as_ref())
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let debug_dir =
        pick(env, "WP_DEBUG_DIR", file.debug_dir.as_ref()).unwrap_or_else(|| ".".to_string());

    let request_timeout_secs = match non_empty(env.get("WP_REQUEST_TIMEOUT_SECS")) {
        Some(raw) => parse_number(&raw, "request_timeout_secs")?,
        None => file.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
    };
    let max_attempts: u32 = match non_empty(env.get("WP_MAX_ATTEMPTS")) {
        Some(raw) => parse_number(&raw, "max_attempts")?,
        None => file.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
    };
    if max_attempts == 0 {
        return Err(ScrapeError::Configuration("max_attempts must be at least 1".into()));
    }
    if request_timeout_secs == 0 {
        return Err(ScrapeError::Configuration(
            "request_timeout_secs must be at least 1".into(),
        ));
    }
    let custom_fields = resolve_custom_fields(env, file)?;

    Ok(Settings {
        base_url,
        username,
        password,
        date_range,
        statuses,
        filter_mode,
        output_path: PathBuf::from(output_path),
        debug_dir: PathBuf::from(debug_dir),
        login_timeout: Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS),
        request_timeout: Duration::from_secs(request_timeout_secs),
        max_attempts,
        custom_fields,
    })
}
