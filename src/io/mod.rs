//! File exports and re-imports.
//!
//! Two portable artifacts per run:
//! - the samples CSV (one row per valid point, consumable by spreadsheets)
//! - the summary JSON (every aggregate, `null` where undefined)

pub mod export;
pub mod summary;
