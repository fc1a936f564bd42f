//! Lab report text parsing.
//!
//! Turns OCR text into `LabTest` records. Everything here is best-effort: a
//! line that cannot be interpreted is dropped and a range that cannot be
//! evaluated is reported as undetermined. Nothing in this module returns an
//! error.

pub mod parser;
pub mod range;
pub mod units;

pub use parser::parse_report;
pub use range::{evaluate_range, is_out_of_range, RangeVerdict};
pub use units::split_value_unit;
