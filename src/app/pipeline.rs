//! Shared analysis pipeline used by every front-end command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! scene acquisition -> per-cell trends -> grid harmonization -> point
//! sampling/joins -> risk scoring -> aggregate statistics
//!
//! The CLI commands then focus on presentation (printing vs exports).

use crate::data::{RemoteSource, Scene, generate_scene};
use crate::domain::{Region, RiskRecord, RunConfig, SourceMode};
use crate::error::AppError;
use crate::raster::resample::conform;
use crate::raster::{GridGeometry, Raster};
use crate::risk;
use crate::risk::stats::{Summary, summarize};
use crate::sample::{JoinDiagnostics, join_attributes, scatter_points};
use crate::trend;

/// The four rasters on the common analysis grid.
#[derive(Debug, Clone)]
pub struct Harmonized {
    pub rain_trend: Raster,
    pub ndvi_trend: Raster,
    pub population: Raster,
    pub builtup_change: Raster,
}

/// All computed outputs of a single `pluvial run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub region: Region,
    pub harmonized: Harmonized,
    pub records: Vec<RiskRecord>,
    pub diagnostics: JoinDiagnostics,
    pub summary: Summary,

    pub area_km2: f64,
    pub rain_native_m: f64,
    /// Independent native rainfall pixels covering the region; a small count
    /// means the rainfall trends capture regional rather than intra-urban
    /// gradients.
    pub effective_rain_pixels: f64,
}

/// Execute the full analysis and return the computed outputs.
pub fn run_analysis(config: &RunConfig) -> Result<RunOutput, AppError> {
    config.validate()?;
    let region = config.region();

    let scene = match config.source {
        SourceMode::Synthetic => generate_scene(config, &region)?,
        SourceMode::Remote => RemoteSource::from_env()?.fetch_scene(config, &region)?,
        SourceMode::Auto => {
            if RemoteSource::is_configured() {
                RemoteSource::from_env()?.fetch_scene(config, &region)?
            } else {
                generate_scene(config, &region)?
            }
        }
    };

    run_analysis_with_scene(config, scene)
}

/// Execute the pipeline on a pre-acquired scene.
///
/// Useful for refits on the same data and for tests that inject scenes.
pub fn run_analysis_with_scene(config: &RunConfig, scene: Scene) -> Result<RunOutput, AppError> {
    config.validate()?;

    let Scene {
        region,
        rain,
        ndvi,
        population,
        built_early,
        built_late,
        built_span_years,
        rain_native_m,
    } = scene;

    if ndvi.is_empty() {
        return Err(AppError::new(
            3,
            "No vegetation observations in the requested date range.",
        ));
    }

    // Per-cell trends at each variable's native grid.
    let rain_composites = trend::annual_percentile(
        &rain,
        config.start_year,
        config.end_year,
        config.rain_percentile,
    )?;
    let rain_trend = trend::trend_raster(&rain_composites, "rain_trend")?;

    let ndvi_series: Vec<trend::TimedRaster> = ndvi
        .into_iter()
        .map(|s| (trend::fractional_year(s.date), s.grid))
        .collect();
    let ndvi_trend = trend::trend_raster(&ndvi_series, "ndvi_trend")?;

    let built_rate = trend::two_epoch_rate(
        &built_early,
        &built_late,
        built_span_years,
        "builtup_change",
    )?;

    // Harmonize everything onto the target grid, then smooth.
    let target = GridGeometry::covering(&region, config.resolution_m)?;
    let harmonized = Harmonized {
        rain_trend: conform(&rain_trend, &target, config.smoothing)?
            .with_display_range(-0.1, 0.1),
        ndvi_trend: conform(&ndvi_trend, &target, config.smoothing)?
            .with_display_range(-0.001, 0.001),
        population: conform(&population, &target, config.smoothing)?
            .with_display_range(0.0, 1_000.0),
        builtup_change: conform(&built_rate, &target, config.smoothing)?
            .with_display_range(0.0, 5.0),
    };

    // Sample, join, score, aggregate.
    let positions = scatter_points(&region, config.sample_count, config.seed);
    let joined = join_attributes(
        &positions,
        &harmonized.rain_trend,
        &harmonized.ndvi_trend,
        &harmonized.population,
        &harmonized.builtup_change,
    );
    let diagnostics = joined.diagnostics;
    let records = risk::derive_records(joined.points);
    let summary = summarize(&records, diagnostics);

    let area_km2 = region.area_km2();
    let rain_pixel_km2 = (rain_native_m / 1_000.0).powi(2);
    let effective_rain_pixels = area_km2 / rain_pixel_km2;

    Ok(RunOutput {
        region,
        harmonized,
        records,
        diagnostics,
        summary,
        area_km2,
        rain_native_m,
        effective_rain_pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::tiny_config;
    use crate::domain::Quadrant;

    #[test]
    fn pipeline_runs_end_to_end_on_the_synthetic_scene() {
        let config = tiny_config();
        let output = run_analysis(&config).unwrap();

        assert_eq!(output.diagnostics.raw_count, config.sample_count);
        assert!(output.diagnostics.valid_count > 0);
        assert!(output.diagnostics.valid_count <= output.diagnostics.raw_count);
        assert_eq!(output.summary.valid_count, output.records.len());

        // Quadrant labels partition the valid set.
        let total: usize = output.summary.quadrant_counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, output.summary.valid_count);

        // All harmonized layers share one grid.
        let g = output.harmonized.rain_trend.geometry();
        assert!(g.conforms_to(output.harmonized.ndvi_trend.geometry()));
        assert!(g.conforms_to(output.harmonized.population.geometry()));
        assert!(g.conforms_to(output.harmonized.builtup_change.geometry()));
        assert!((g.cell_size_m() - config.resolution_m).abs() < 1.0);

        assert!(output.effective_rain_pixels > 0.0);
    }

    #[test]
    fn pipeline_output_is_deterministic() {
        let config = tiny_config();
        let a = run_analysis(&config).unwrap();
        let b = run_analysis(&config).unwrap();
        assert_eq!(a.diagnostics, b.diagnostics);
        assert_eq!(a.records, b.records);
        assert_eq!(a.summary.percent_aligned, b.summary.percent_aligned);
        assert_eq!(a.summary.cumulative_risk, b.summary.cumulative_risk);
    }

    #[test]
    fn derived_fields_agree_with_quadrants() {
        let output = run_analysis(&tiny_config()).unwrap();
        for r in &output.records {
            match r.quadrant {
                Quadrant::HighRiskAligned => {
                    assert!(r.hazard > 0.0 && r.vulnerability > 0.0);
                }
                Quadrant::RainIncreaseOnly => {
                    assert!(r.hazard > 0.0 && r.vulnerability == 0.0);
                }
                Quadrant::VegLossOnly => {
                    assert!(r.hazard == 0.0 && r.vulnerability > 0.0);
                }
                Quadrant::LowChange => {
                    assert!(r.hazard == 0.0 && r.vulnerability == 0.0);
                }
            }
        }
    }

    #[test]
    fn config_errors_fail_before_any_computation() {
        let mut config = tiny_config();
        config.end_year = config.start_year - 1;
        let err = run_analysis(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
