//! Reporting utilities: formatted terminal output and layer styling.

pub mod format;

pub use format::*;
