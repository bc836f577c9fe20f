pub mod appointment;
pub mod merge;
pub mod rows;
pub mod window;

pub use appointment::{AppointmentRecord, AppointmentStatus, CustomField};
pub use merge::{merge, ExportResult, MergeStats};
pub use window::{DateRange, FilterMode};
