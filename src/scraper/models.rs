use serde_json::json;

use crate::domain::{AppointmentStatus, DateRange};

/// Value of the export filter's `date` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    /// Every dated appointment.
    Any,
    /// Appointments without a start date; the plugin omits these from `Any`.
    Unscheduled,
    Range(DateRange),
}

impl DateFilter {
    pub fn to_filter_value(&self) -> String {
        match self {
            DateFilter::Any => "any".to_string(),
            DateFilter::Unscheduled => "null".to_string(),
            DateFilter::Range(range) => range.to_filter_value(),
        }
    }
}

/// Filter parameters for one export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportWindow {
    pub label: String,
    pub date: DateFilter,
    pub statuses: Vec<AppointmentStatus>,
}

impl ExportWindow {
    /// JSON document sent as the `filter` form field.
    pub fn filter_json(&self) -> String {
        let statuses: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
        json!({
            "id": "",
            "date": self.date.to_filter_value(),
            "created_date": "any",
            "staff": null,
            "customer": null,
            "service": null,
            "status": statuses,
        })
        .to_string()
    }
}

/// Response body of one export request, tagged with the window that produced it.
#[derive(Debug, Clone)]
pub struct RawExportPayload {
    pub window: ExportWindow,
    pub body: String,
}

/// Anti-forgery value scraped from the admin page. Absent when the page
/// carries none; the export is then sent without it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CsrfToken(Option<String>);

impl CsrfToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub fn absent() -> Self {
        Self(None)
    }

    pub fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Leading characters only, for logs.
    pub fn preview(&self) -> String {
        match &self.0 {
            Some(v) => v.chars().take(20).collect(),
            None => "<none>".to_string(),
        }
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CsrfToken({}…)", self.preview())
    }
}
