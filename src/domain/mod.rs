//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration (`City`, `SourceMode`, `RunConfig`, `Region`)
//! - joined sample observations (`SamplePoint`, `Attributes`)
//! - risk outputs (`RiskRecord`, `Quadrant`)
//! - portable summary schema (`SummaryFile`)

pub mod types;

pub use types::*;
