// src/domain/window.rs

use chrono::{Duration, NaiveDate};
use std::str::FromStr;

/// Inclusive calendar window. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("date range start {start} is after end {end}"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Two adjacent, non-overlapping halves covering the whole range.
    /// A single-day range is not split.
    pub fn split_halves(&self) -> Vec<DateRange> {
        let days = (self.end - self.start).num_days();
        if days == 0 {
            return vec![*self];
        }
        let mid = self.start + Duration::days(days / 2);
        vec![
            DateRange { start: self.start, end: mid },
            DateRange { start: mid + Duration::days(1), end: self.end },
        ]
    }

    /// Format the plugin's date filter expects.
    pub fn to_filter_value(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Where the date/status filter is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// The export endpoint filters; windows are split over the date range.
    #[default]
    Server,
    /// Fetch everything and drop out-of-window records while merging.
    Client,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(FilterMode::Server),
            "client" => Ok(FilterMode::Client),
            other => Err(format!("unknown filter mode '{other}' (expected server|client)")),
        }
    }
}
