//! Scene acquisition: the time-series loader and its two backends.
//!
//! The loader owns the narrow read-only contract with the external gridded
//! data store: it pulls raw observations for a region and date range, applies
//! per-observation quality masking and unit scaling, and hands the pipeline a
//! `Scene` of clean rasters. Nothing downstream sees a flagged or unscaled
//! value.
//!
//! Backends:
//! - `remote`: HTTP catalog client (endpoint from the environment)
//! - `synthetic`: deterministic seeded scene for offline runs and tests

use crate::domain::Region;
use crate::raster::{Raster, TimeSlice};

pub mod remote;
pub mod synthetic;

pub use remote::RemoteSource;
pub use synthetic::generate_scene;

/// Daily precipitation variable (mm), native ~5.5 km grid.
pub const RAIN_VARIABLE: &str = "chirps_daily";
/// Vegetation-index 16-day composites, native 250 m grid, integer-scaled.
pub const NDVI_VARIABLE: &str = "modis_ndvi";
/// Native ground-sample distance of the rainfall grid, meters.
pub const RAIN_NATIVE_M: f64 = 5_500.0;

pub const POP_DATASET: &str = "ghs_pop_2020";
pub const POP_BAND: &str = "population_count";
pub const BUILT_EARLY_DATASET: &str = "ghs_built_2000";
pub const BUILT_LATE_DATASET: &str = "ghs_built_2020";
pub const BUILT_BAND: &str = "built_surface";
/// Years between the two built-up epochs.
pub const BUILT_SPAN_YEARS: f64 = 20.0;

/// Everything the pipeline needs from the data store for one run, already
/// quality-masked and unit-scaled.
#[derive(Debug, Clone)]
pub struct Scene {
    pub region: Region,
    /// Daily precipitation observations.
    pub rain: Vec<TimeSlice>,
    /// Vegetation-index composites.
    pub ndvi: Vec<TimeSlice>,
    pub population: Raster,
    pub built_early: Raster,
    pub built_late: Raster,
    pub built_span_years: f64,
    /// Native rainfall cell size, for the spatial-resolution diagnostics.
    pub rain_native_m: f64,
}

/// Apply per-observation quality masking and unit scaling.
///
/// A cell is no-data when its value is non-finite, equals the source's
/// no-data sentinel, or carries a quality flag other than 0 (reliable).
/// Scaling happens after masking, so sentinels are never scaled into
/// plausible-looking values.
pub(crate) fn masked_scaled_cells(
    values: &[f64],
    qa: Option<&[i64]>,
    scale: f64,
    nodata: Option<f64>,
) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &raw)| {
            if !raw.is_finite() {
                return None;
            }
            if let Some(sentinel) = nodata {
                if raw == sentinel {
                    return None;
                }
            }
            if let Some(flags) = qa {
                match flags.get(i) {
                    Some(0) => {}
                    _ => return None,
                }
            }
            Some(raw * scale)
        })
        .collect()
}
