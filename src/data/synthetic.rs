//! Deterministic synthetic scene generation.
//!
//! Offline stand-in for the remote catalog: plausible native-resolution
//! fields with planted spatial structure, fully determined by the run seed
//! and region. Used when no endpoint is configured and throughout the tests.
//!
//! Planted structure (all relative to the region center):
//! - rainfall intensifies toward the north, flat-to-declining in the south
//! - vegetation declines near the center (urban core), holds at the fringe
//! - population and built-up surface decay radially; built-up grows in a
//!   ring between the epochs
//!
//! Vegetation composites are emitted the way the real archive stores them:
//! scaled integers plus a quality flag, pushed through the same
//! mask-and-scale path the remote loader uses.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::{
    BUILT_SPAN_YEARS, RAIN_NATIVE_M, Scene, masked_scaled_cells,
};
use crate::domain::{Region, RunConfig};
use crate::error::AppError;
use crate::raster::{GridGeometry, Raster, TimeSlice};

const NDVI_NATIVE_M: f64 = 250.0;
const STATIC_NATIVE_M: f64 = 100.0;
const NDVI_SCALE: f64 = 1e-4;
const NDVI_NODATA: f64 = -3_000.0;
const NDVI_COMPOSITE_DAYS: i64 = 16;
/// Fraction of vegetation observations flagged unreliable.
const NDVI_BAD_QA_RATE: f64 = 0.1;

/// Generate the full synthetic scene for a run.
pub fn generate_scene(config: &RunConfig, region: &Region) -> Result<Scene, AppError> {
    let mut rng = StdRng::seed_from_u64(scene_seed(config, region));
    let noise = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let rain = rain_series(config, region, &mut rng, &noise)?;
    let ndvi = ndvi_series(config, region, &mut rng, &noise)?;

    let static_geom = GridGeometry::covering(region, STATIC_NATIVE_M)?;
    let population = population_raster(region, &static_geom, &mut rng)?;
    let (built_early, built_late) = built_rasters(region, &static_geom)?;

    Ok(Scene {
        region: *region,
        rain,
        ndvi,
        population,
        built_early,
        built_late,
        built_span_years: BUILT_SPAN_YEARS,
        rain_native_m: RAIN_NATIVE_M,
    })
}

/// Mix the run seed with the scene-defining parameters, so any change to the
/// region or date range yields an independent but reproducible scene.
fn scene_seed(config: &RunConfig, region: &Region) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.start_year.hash(&mut hasher);
    config.end_year.hash(&mut hasher);
    region.center_lon.to_bits().hash(&mut hasher);
    region.center_lat.to_bits().hash(&mut hasher);
    region.buffer_m.to_bits().hash(&mut hasher);
    hasher.finish()
}

/// Fraction of the buffer radius between a cell center and the region center.
fn dist_frac(region: &Region, geom: &GridGeometry, row: usize, col: usize) -> f64 {
    let (lon, lat) = geom.cell_center(row, col);
    region.distance_from_center_m(lon, lat) / region.buffer_m
}

/// Northward position of a cell in [-1, 1] across the region extent.
fn north_frac(region: &Region, geom: &GridGeometry, row: usize, _col: usize) -> f64 {
    let (_, lat) = geom.cell_center(row, 0);
    ((lat - region.center_lat) * crate::domain::METERS_PER_DEGREE / region.buffer_m)
        .clamp(-1.0, 1.0)
}

fn rain_series(
    config: &RunConfig,
    region: &Region,
    rng: &mut StdRng,
    noise: &Normal<f64>,
) -> Result<Vec<TimeSlice>, AppError> {
    let geom = GridGeometry::covering(region, RAIN_NATIVE_M)?;
    let cells = geom.len();

    // Per-cell daily baseline (mm) and yearly intensification rate.
    let mut base = Vec::with_capacity(cells);
    let mut yearly_gain = Vec::with_capacity(cells);
    for i in 0..cells {
        let (row, col) = (i / geom.width, i % geom.width);
        base.push(6.0 + 3.0 * (1.0 - dist_frac(region, &geom, row, col)).max(0.0));
        // +1.5%/yr of extreme intensity in the far north, fading to a slight
        // decline in the far south.
        yearly_gain.push(0.015 * north_frac(region, &geom, row, col) + 0.003);
    }

    let mut slices = Vec::new();
    for year in config.start_year..=config.end_year {
        let mut date = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AppError::new(2, format!("Invalid start_year {year}.")))?;
        while date.year() == year {
            let season =
                1.0 + 0.6 * (std::f64::consts::TAU * (date.ordinal() as f64 / 365.0 - 0.25)).sin();
            let elapsed = (year - config.start_year) as f64;
            let values: Vec<Option<f64>> = (0..cells)
                .map(|i| {
                    let z: f64 = noise.sample(rng);
                    let intensity = (1.0 + yearly_gain[i] * elapsed).max(0.05);
                    // Log-normal daily totals keep values positive and give
                    // the annual upper tail the planted drift.
                    Some(base[i] * season * intensity * (0.8 * z - 0.32).exp())
                })
                .collect();
            slices.push(TimeSlice {
                date,
                grid: Raster::from_cells("rain", geom.clone(), values)?,
            });
            date = date + Duration::days(1);
        }
    }
    Ok(slices)
}

fn ndvi_series(
    config: &RunConfig,
    region: &Region,
    rng: &mut StdRng,
    noise: &Normal<f64>,
) -> Result<Vec<TimeSlice>, AppError> {
    let geom = GridGeometry::covering(region, NDVI_NATIVE_M)?;
    let cells = geom.len();

    let mut base = Vec::with_capacity(cells);
    let mut yearly_delta = Vec::with_capacity(cells);
    for i in 0..cells {
        let (row, col) = (i / geom.width, i % geom.width);
        let d = dist_frac(region, &geom, row, col).min(1.5);
        base.push(0.30 + 0.35 * d.min(1.0));
        // Greenness loss concentrated near the core; mild gain at the fringe.
        yearly_delta.push(-0.0045 * (1.0 - d).max(0.0) + 0.0008 * (d - 0.8).max(0.0));
    }

    let start_date = NaiveDate::from_ymd_opt(config.start_year, 1, 1)
        .ok_or_else(|| AppError::new(2, format!("Invalid start_year {}.", config.start_year)))?;
    let end_date = NaiveDate::from_ymd_opt(config.end_year, 12, 31)
        .ok_or_else(|| AppError::new(2, format!("Invalid end_year {}.", config.end_year)))?;

    let mut slices = Vec::new();
    let mut date = start_date;
    while date <= end_date {
        let elapsed_years = (date - start_date).num_days() as f64 / 365.25;
        let mut raw = Vec::with_capacity(cells);
        let mut qa = Vec::with_capacity(cells);
        for i in 0..cells {
            let z: f64 = noise.sample(rng);
            let v = (base[i] + yearly_delta[i] * elapsed_years + 0.02 * z).clamp(-0.2, 1.0);
            raw.push((v / NDVI_SCALE).round());
            qa.push(if rng.r#gen::<f64>() < NDVI_BAD_QA_RATE { 2 } else { 0 });
        }
        // Same mask-and-scale path the remote loader takes.
        let cells_masked = masked_scaled_cells(&raw, Some(&qa), NDVI_SCALE, Some(NDVI_NODATA));
        slices.push(TimeSlice {
            date,
            grid: Raster::from_cells("ndvi", geom.clone(), cells_masked)?,
        });
        date = date + Duration::days(NDVI_COMPOSITE_DAYS);
    }
    Ok(slices)
}

fn population_raster(
    region: &Region,
    geom: &GridGeometry,
    rng: &mut StdRng,
) -> Result<Raster, AppError> {
    let cells: Vec<Option<f64>> = (0..geom.len())
        .map(|i| {
            let (row, col) = (i / geom.width, i % geom.width);
            let d = dist_frac(region, geom, row, col);
            let density = 650.0 * (-(d * d) / 0.18).exp() - 2.0;
            let jitter = 0.6 + 0.8 * rng.r#gen::<f64>();
            Some((density * jitter).max(0.0))
        })
        .collect();
    Raster::from_cells("population_count", geom.clone(), cells)
}

fn built_rasters(
    region: &Region,
    geom: &GridGeometry,
) -> Result<(Raster, Raster), AppError> {
    // m² of built surface per cell; a 100 m cell tops out at 10,000 m².
    let cell_area = STATIC_NATIVE_M * STATIC_NATIVE_M;
    let mut early = Vec::with_capacity(geom.len());
    let mut late = Vec::with_capacity(geom.len());
    for i in 0..geom.len() {
        let (row, col) = (i / geom.width, i % geom.width);
        let d = dist_frac(region, geom, row, col);
        let core = 0.85 * (-(d * d) / 0.08).exp();
        let ring = 0.55 * (-((d - 0.45) * (d - 0.45)) / 0.02).exp();
        early.push(Some((core * cell_area).min(cell_area)));
        late.push(Some(((core + ring) * cell_area).min(cell_area)));
    }
    Ok((
        Raster::from_cells("built_surface", geom.clone(), early)?,
        Raster::from_cells("built_surface", geom.clone(), late)?,
    ))
}

/// Small, fast configuration shared by tests across the crate.
#[cfg(test)]
pub(crate) fn tiny_config() -> RunConfig {
    use crate::domain::{City, SourceMode};

    RunConfig {
        city: City::KualaLumpur,
        center_override: None,
        buffer_m: 1_500.0,
        start_year: 2000,
        end_year: 2002,
        resolution_m: 500.0,
        sample_count: 40,
        seed: 42,
        smoothing: 3,
        rain_percentile: 95.0,
        source: SourceMode::Synthetic,
        plot: false,
        show_layers: false,
        plot_width: 60,
        plot_height: 20,
        export_samples: None,
        export_summary: None,
        debug_bundle: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_is_deterministic_for_a_seed() {
        let config = tiny_config();
        let region = config.region();
        let a = generate_scene(&config, &region).unwrap();
        let b = generate_scene(&config, &region).unwrap();
        assert_eq!(a.rain.len(), b.rain.len());
        assert_eq!(a.ndvi.len(), b.ndvi.len());
        assert_eq!(a.rain[100].grid, b.rain[100].grid);
        assert_eq!(a.ndvi[10].grid, b.ndvi[10].grid);
        assert_eq!(a.population, b.population);
    }

    #[test]
    fn a_different_seed_changes_the_scene() {
        let config = tiny_config();
        let region = config.region();
        let mut other = tiny_config();
        other.seed = 43;
        let a = generate_scene(&config, &region).unwrap();
        let b = generate_scene(&other, &region).unwrap();
        assert_ne!(a.rain[100].grid, b.rain[100].grid);
    }

    #[test]
    fn scene_shapes_match_the_date_range() {
        let config = tiny_config();
        let region = config.region();
        let scene = generate_scene(&config, &region).unwrap();
        // 2000-2002 inclusive: 366 + 365 + 365 daily rain slices.
        assert_eq!(scene.rain.len(), 1096);
        // 16-day cadence over the same span.
        let expected_ndvi = (1096 + NDVI_COMPOSITE_DAYS as usize - 1) / NDVI_COMPOSITE_DAYS as usize;
        assert_eq!(scene.ndvi.len(), expected_ndvi);
        assert_eq!(scene.built_span_years, BUILT_SPAN_YEARS);
    }

    #[test]
    fn quality_masking_leaves_gaps_in_vegetation() {
        let config = tiny_config();
        let region = config.region();
        let scene = generate_scene(&config, &region).unwrap();
        let slice = &scene.ndvi[0];
        let total = slice.grid.geometry().len();
        let valid = slice.grid.valid_count();
        assert!(valid > 0);
        assert!(valid < total, "expected some flagged cells, got {valid}/{total}");
    }

    #[test]
    fn population_is_non_negative_and_peaks_inward() {
        let config = tiny_config();
        let region = config.region();
        let scene = generate_scene(&config, &region).unwrap();
        let geom = scene.population.geometry().clone();
        let mut min = f64::INFINITY;
        for (_, _, v) in scene.population.cells() {
            let v = v.unwrap();
            min = min.min(v);
        }
        assert!(min >= 0.0);
        let center = scene
            .population
            .value_at(region.center_lon, region.center_lat)
            .unwrap();
        let corner = scene.population.get(0, 0).unwrap();
        assert!(center > corner, "center {center} corner {corner}");
        assert!(geom.cell_size_m() < 150.0);
    }
}
