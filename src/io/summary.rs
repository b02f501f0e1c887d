//! Read/write summary JSON files.
//!
//! Summary JSON is the "portable" representation of a finished run:
//! - the full parameter echo (reproducibility)
//! - sampling diagnostics and every aggregate statistic
//!
//! The schema is defined by `domain::SummaryFile`. Undefined statistics are
//! `null` in the file, and stay `None` after a round trip.

use std::fs::File;
use std::path::Path;

use crate::app::pipeline::RunOutput;
use crate::domain::{QuadrantCount, RunConfig, RunParams, SummaryFile};
use crate::error::AppError;

/// Assemble the portable summary from a finished run.
pub fn build_summary_file(config: &RunConfig, output: &RunOutput) -> SummaryFile {
    let summary = &output.summary;
    SummaryFile {
        tool: "pluvial".to_string(),
        params: RunParams {
            region_label: config.region_label(),
            center_lon: output.region.center_lon,
            center_lat: output.region.center_lat,
            buffer_m: output.region.buffer_m,
            start_year: config.start_year,
            end_year: config.end_year,
            resolution_m: config.resolution_m,
            sample_count: config.sample_count,
            seed: config.seed,
            smoothing: config.smoothing,
            rain_percentile: config.rain_percentile,
            source: config.source,
        },
        area_km2: output.area_km2,
        effective_rain_pixels: output.effective_rain_pixels,
        raw_count: summary.raw_count,
        valid_count: summary.valid_count,
        quadrant_counts: summary
            .quadrant_counts
            .iter()
            .map(|(q, n)| QuadrantCount {
                quadrant: q.label().to_string(),
                count: *n,
            })
            .collect(),
        corr_ndvi_rain: summary.corr_ndvi_rain,
        corr_built_rain: summary.corr_built_rain,
        pop_weighted_rain_mean: summary.pop_weighted_rain_mean,
        pop_weighted_ndvi_mean: summary.pop_weighted_ndvi_mean,
        percent_aligned: summary.percent_aligned,
        total_population: summary.total_population,
        aligned_population: summary.aligned_population,
        percent_population_exposed: summary.percent_population_exposed,
        cumulative_risk: summary.cumulative_risk,
        mean_risk_aligned: summary.mean_risk_aligned,
        zero_risk_count: summary.zero_risk_count,
        nonzero_risk_count: summary.nonzero_risk_count,
        rain_stats: summary.rain_stats,
        ndvi_stats: summary.ndvi_stats,
        pop_stats: summary.pop_stats,
        built_stats: summary.built_stats,
        risk_histogram: summary.risk_histogram.clone(),
    }
}

/// Write a summary JSON file.
pub fn write_summary_json(path: &Path, summary: &SummaryFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Read a summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<SummaryFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display()))
    })?;
    let summary: SummaryFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_analysis;
    use crate::data::synthetic::tiny_config;

    #[test]
    fn summary_json_round_trips_including_nulls() {
        let config = tiny_config();
        let output = run_analysis(&config).unwrap();
        let summary = build_summary_file(&config, &output);

        let path =
            std::env::temp_dir().join(format!("pluvial-{}-summary.json", std::process::id()));
        write_summary_json(&path, &summary).unwrap();
        let loaded = read_summary_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.tool, "pluvial");
        assert_eq!(loaded.params.seed, config.seed);
        assert_eq!(loaded.raw_count, summary.raw_count);
        assert_eq!(loaded.valid_count, summary.valid_count);
        assert_eq!(loaded.percent_aligned, summary.percent_aligned);
        assert_eq!(loaded.corr_ndvi_rain, summary.corr_ndvi_rain);
        assert_eq!(loaded.quadrant_counts.len(), 4);

        // The saved file renders without the original run in memory.
        let text = crate::report::format_saved_summary(&loaded);
        assert!(text.contains("Kuala Lumpur"));
        assert!(text.contains("CROSS-CITY"));
    }
}
