pub mod csv;
pub mod csv_writer;

pub use csv_writer::{write_atomic, WriteOutcome};
