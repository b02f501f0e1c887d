//! Command-line parsing for the pluvial-risk analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the pipeline/statistics code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{City, SourceMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pluvial",
    version,
    about = "Compound pluvial-risk trends: extreme-rainfall intensification vs vegetation loss"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full analysis, print diagnostics/statistics, and optionally plot/export.
    Run(RunArgs),
    /// Print the statistics sections from a previously exported summary JSON.
    Report(ReportArgs),
    /// Re-render the quadrant scatter from a previously exported samples CSV.
    Plot(PlotArgs),
}

/// Options for a full analysis run.
///
/// Every parameter is explicit and defaulted, and the whole set is echoed in
/// the run output, so any result can be reproduced from its report.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Study city anchoring the region of interest.
    #[arg(short = 'c', long, value_enum, default_value_t = City::KualaLumpur)]
    pub city: City,

    /// Override the region-center longitude (degrees; requires --lat).
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,

    /// Override the region-center latitude (degrees; requires --lon).
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,

    /// Buffer radius around the center (meters).
    #[arg(long, default_value_t = 20_000.0)]
    pub buffer_m: f64,

    /// First year of the trend window.
    #[arg(long, default_value_t = 2000)]
    pub start_year: i32,

    /// Last year of the trend window (inclusive).
    #[arg(long, default_value_t = 2020)]
    pub end_year: i32,

    /// Target grid resolution for harmonization (meters).
    #[arg(long, default_value_t = 500.0)]
    pub resolution_m: f64,

    /// Number of random sample points.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub samples: usize,

    /// Random seed for the point sample and the synthetic scene.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Smoothing neighborhood side length in cells (odd; 1 disables).
    #[arg(long, default_value_t = 3)]
    pub smoothing: usize,

    /// Percentile defining the annual extreme-rainfall composite.
    #[arg(long, default_value_t = 95.0)]
    pub rain_percentile: f64,

    /// Where scene data comes from.
    #[arg(long, value_enum, default_value_t = SourceMode::Auto)]
    pub source: SourceMode,

    /// Render the quadrant scatter in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Also render each harmonized layer as an ASCII heatmap.
    #[arg(long)]
    pub layers: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the valid-point table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the aggregate summary to JSON.
    #[arg(long = "export-summary")]
    pub export_summary: Option<PathBuf>,

    /// Write a markdown run bundle under debug/.
    #[arg(long)]
    pub debug_bundle: bool,
}

/// Options for re-printing a saved summary.
#[derive(Debug, Parser)]
pub struct ReportArgs {
    /// Summary JSON produced by `pluvial run --export-summary`.
    #[arg(long, value_name = "JSON")]
    pub summary: PathBuf,
}

/// Options for plotting a saved samples table.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Samples CSV produced by `pluvial run --export`.
    #[arg(long, value_name = "CSV")]
    pub samples: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
