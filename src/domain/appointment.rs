// src/domain/appointment.rs

use chrono::{NaiveDate, NaiveTime};
use std::fmt;
use std::str::FromStr;

/// Booking states the plugin knows about. Anything else is kept as raw text
/// on the record but cannot be used as a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Cancelled,
    Rejected,
    Done,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rejected,
        AppointmentStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Done => "done",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    /// Accepts the filter keys as well as the labels the export writes
    /// ("Approved", "Canceled", "Completed", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "approved" => Ok(AppointmentStatus::Approved),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "rejected" => Ok(AppointmentStatus::Rejected),
            "done" | "completed" => Ok(AppointmentStatus::Done),
            other => Err(format!("unknown appointment status '{other}'")),
        }
    }
}

/// A booking custom field switched on in the export and written to its own
/// output column. `label` is both the output header and the text matched
/// against the export's column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomField {
    pub id: u64,
    pub label: String,
}

impl CustomField {
    pub fn new(id: u64, label: &str) -> Self {
        Self {
            id,
            label: label.trim().to_string(),
        }
    }

    /// The fields the festival site collects: dance role and country.
    pub fn defaults() -> Vec<CustomField> {
        vec![CustomField::new(23664, "Role"), CustomField::new(19734, "Country")]
    }

    /// Export form key for this field.
    pub fn export_key(&self) -> String {
        format!("custom_fields_{}", self.id)
    }

    /// Case-insensitive containment, so "Role" picks up "Dance role".
    pub fn matches(&self, header: &str) -> bool {
        let label = self.label.to_lowercase();
        !label.is_empty() && header.trim().to_lowercase().contains(&label)
    }
}

impl FromStr for CustomField {
    type Err = String;

    /// `23664:Role`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, label) = s
            .split_once(':')
            .ok_or_else(|| format!("custom field '{}' is not in id:Label form", s.trim()))?;
        let id: u64 = id
            .trim()
            .parse()
            .map_err(|_| format!("custom field id '{}' is not a number", id.trim()))?;
        if label.trim().is_empty() {
            return Err(format!("custom field {id} has no label"));
        }
        Ok(CustomField::new(id, label))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentRecord {
    pub id: u64,
    // Empty for bookings that were never scheduled.
    pub date: Option<NaiveDate>,
    // Date-only exports have no start time.
    pub time: Option<NaiveTime>,
    pub staff: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub service: String,
    pub duration: String,
    pub status: String,
    pub payment: String,
    pub notes: String,
    pub created: String,
    pub customer_address: String,
    pub customer_birthday: String,
    pub online_meeting: String,
    /// The plugin's own "Custom fields" cell.
    pub custom_fields: String,
    /// Columns with no fixed meaning, as (header, value) in export order.
    pub extra: Vec<(String, String)>,
}

impl AppointmentRecord {
    pub fn new(id: u64, date: Option<NaiveDate>) -> Self {
        Self {
            id,
            date,
            time: None,
            staff: String::new(),
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_email: String::new(),
            service: String::new(),
            duration: String::new(),
            status: String::new(),
            payment: String::new(),
            notes: String::new(),
            created: String::new(),
            customer_address: String::new(),
            customer_birthday: String::new(),
            online_meeting: String::new(),
            custom_fields: String::new(),
            extra: Vec::new(),
        }
    }

    /// Parsed status, if the raw text is one the plugin defines.
    pub fn known_status(&self) -> Option<AppointmentStatus> {
        self.status.parse().ok()
    }

}

/// Canonical spelling for a status cell: lowercase key when recognised,
/// trimmed raw text otherwise.
pub fn normalize_status(raw: &str) -> String {
    match raw.parse::<AppointmentStatus>() {
        Ok(status) => status.as_str().to_string(),
        Err(_) => raw.trim().to_string(),
    }
}
