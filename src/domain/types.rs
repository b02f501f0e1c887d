//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the analysis
//! - exported to JSON/CSV
//! - reloaded later for plotting or cross-city comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Mean Earth radius in meters, used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Study-city catalog.
///
/// Coordinates are the city-center points the analysis is anchored on; the
/// region of interest is the center buffered by `RunConfig::buffer_m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum City {
    Islamabad,
    Colombo,
    Mumbai,
    KualaLumpur,
    Hangzhou,
    Jakarta,
    Hyderabad,
}

impl City {
    pub const ALL: [City; 7] = [
        City::Islamabad,
        City::Colombo,
        City::Mumbai,
        City::KualaLumpur,
        City::Hangzhou,
        City::Jakarta,
        City::Hyderabad,
    ];

    /// City-center coordinates as (longitude, latitude) in degrees.
    pub fn center(self) -> (f64, f64) {
        match self {
            City::Islamabad => (73.0479, 33.6844),
            City::Colombo => (79.8612, 6.9271),
            City::Mumbai => (72.8777, 19.0760),
            City::KualaLumpur => (101.6869, 3.1319),
            City::Hangzhou => (120.1551, 30.2741),
            City::Jakarta => (106.8456, -6.2088),
            City::Hyderabad => (78.4867, 17.3850),
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            City::Islamabad => "Islamabad",
            City::Colombo => "Colombo",
            City::Mumbai => "Mumbai",
            City::KualaLumpur => "Kuala Lumpur",
            City::Hangzhou => "Hangzhou",
            City::Jakarta => "Jakarta",
            City::Hyderabad => "Hyderabad",
        }
    }
}

/// Where scene data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Use the remote catalog when `EO_API_URL` is set, else the synthetic scene.
    Auto,
    /// Always generate the deterministic synthetic scene.
    Synthetic,
    /// Always query the remote catalog (requires `EO_API_URL`).
    Remote,
}

/// Circular area of interest: a center point plus a buffer radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center_lon: f64,
    pub center_lat: f64,
    pub buffer_m: f64,
}

impl Region {
    pub fn new(center_lon: f64, center_lat: f64, buffer_m: f64) -> Self {
        Self {
            center_lon,
            center_lat,
            buffer_m,
        }
    }

    /// Great-circle distance from the region center, in meters.
    pub fn distance_from_center_m(&self, lon: f64, lat: f64) -> f64 {
        haversine_m(self.center_lon, self.center_lat, lon, lat)
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.distance_from_center_m(lon, lat) <= self.buffer_m
    }

    /// Area of the circular region in square kilometers.
    pub fn area_km2(&self) -> f64 {
        std::f64::consts::PI * self.buffer_m * self.buffer_m / 1.0e6
    }

    /// Meters per degree of longitude at the region's latitude.
    pub fn meters_per_lon_degree(&self) -> f64 {
        METERS_PER_DEGREE * self.center_lat.to_radians().cos()
    }

    /// Bounding box (west, south, east, north) in degrees.
    pub fn bbox_deg(&self) -> (f64, f64, f64, f64) {
        let dlat = self.buffer_m / METERS_PER_DEGREE;
        let dlon = self.buffer_m / self.meters_per_lon_degree();
        (
            self.center_lon - dlon,
            self.center_lat - dlat,
            self.center_lon + dlon,
            self.center_lat + dlat,
        )
    }
}

/// Haversine great-circle distance in meters.
pub fn haversine_m(lon_a: f64, lat_a: f64, lon_b: f64, lat_b: f64) -> f64 {
    let dlat = (lat_b - lat_a).to_radians();
    let dlon = (lon_b - lon_a).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat_a.to_radians().cos() * lat_b.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Alignment quadrant for a sample point, from the signs of its rainfall and
/// vegetation trends.
///
/// The four variants partition the valid-point set: every valid point gets
/// exactly one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Rainfall intensifying and vegetation declining.
    HighRiskAligned,
    /// Rainfall intensifying, vegetation stable or greening.
    RainIncreaseOnly,
    /// Vegetation declining, rainfall stable or decreasing.
    VegLossOnly,
    /// Neither signal present.
    LowChange,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::HighRiskAligned,
        Quadrant::RainIncreaseOnly,
        Quadrant::VegLossOnly,
        Quadrant::LowChange,
    ];

    /// Stable label used in exports and reports.
    pub fn label(self) -> &'static str {
        match self {
            Quadrant::HighRiskAligned => "High_Risk_Aligned",
            Quadrant::RainIncreaseOnly => "Rain_Increase_Only",
            Quadrant::VegLossOnly => "Veg_Loss_Only",
            Quadrant::LowChange => "Low_Change",
        }
    }

    pub fn from_label(label: &str) -> Option<Quadrant> {
        Quadrant::ALL.into_iter().find(|q| q.label() == label)
    }
}

/// The fixed attribute schema every valid sample point carries.
///
/// All four values come from the harmonized rasters; a point missing any of
/// them is dropped by the joiner before this struct is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Extreme-rainfall trend at the point (mm per year).
    pub rain_trend: f64,
    /// Vegetation-index trend at the point (index units per year).
    pub ndvi_trend: f64,
    /// Population count in the containing cell.
    pub pop: f64,
    /// Built-up surface change rate (m² per year).
    pub builtup_change: f64,
}

/// A sampled location with its joined attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub attrs: Attributes,
}

/// A sample point extended with derived risk fields.
///
/// The derived fields are pure functions of `point.attrs` and are recomputed
/// deterministically wherever the point travels (exports included).
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRecord {
    pub point: SamplePoint,
    pub hazard: f64,
    pub vulnerability: f64,
    pub risk_score: f64,
    pub quadrant: Quadrant,
}

/// Distribution summary for one joined attribute over the valid points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation; absent when fewer than two points exist.
    pub sd: Option<f64>,
}

/// Histogram of the non-zero risk scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub city: City,
    /// Optional explicit center (longitude, latitude) overriding the city catalog.
    pub center_override: Option<(f64, f64)>,
    pub buffer_m: f64,
    pub start_year: i32,
    pub end_year: i32,
    /// Target ground-sample distance of the harmonized grid, in meters.
    pub resolution_m: f64,
    pub sample_count: usize,
    pub seed: u64,
    /// Side length of the square smoothing neighborhood (odd; 1 disables).
    pub smoothing: usize,
    /// Percentile used for the annual extreme-rainfall composite.
    pub rain_percentile: f64,
    pub source: SourceMode,

    pub plot: bool,
    pub show_layers: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_samples: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
    pub debug_bundle: bool,
}

impl RunConfig {
    /// Fail fast on configuration errors, before any data is touched.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.end_year < self.start_year {
            return Err(AppError::new(
                2,
                format!(
                    "Invalid year range: end_year {} is before start_year {}.",
                    self.end_year, self.start_year
                ),
            ));
        }
        if self.sample_count == 0 {
            return Err(AppError::new(2, "sample_count must be > 0."));
        }
        if !(self.resolution_m.is_finite() && self.resolution_m > 0.0) {
            return Err(AppError::new(2, "resolution_m must be a positive number."));
        }
        if !(self.buffer_m.is_finite() && self.buffer_m > 0.0) {
            return Err(AppError::new(2, "buffer_m must be a positive number."));
        }
        if self.smoothing == 0 || self.smoothing % 2 == 0 {
            return Err(AppError::new(
                2,
                format!("smoothing must be an odd window size, got {}.", self.smoothing),
            ));
        }
        if !(self.rain_percentile.is_finite()
            && self.rain_percentile > 0.0
            && self.rain_percentile <= 100.0)
        {
            return Err(AppError::new(
                2,
                "rain_percentile must be in (0, 100].",
            ));
        }
        if let Some((lon, lat)) = self.center_override {
            if !(lon.is_finite() && (-180.0..=180.0).contains(&lon)) {
                return Err(AppError::new(2, format!("Invalid center longitude {lon}.")));
            }
            if !(lat.is_finite() && (-90.0..=90.0).contains(&lat)) {
                return Err(AppError::new(2, format!("Invalid center latitude {lat}.")));
            }
        }
        Ok(())
    }

    /// Resolve the region of interest from the city catalog or the override.
    pub fn region(&self) -> Region {
        let (lon, lat) = self.center_override.unwrap_or_else(|| self.city.center());
        Region::new(lon, lat, self.buffer_m)
    }

    /// Label used in reports: the city name, or the override coordinates.
    pub fn region_label(&self) -> String {
        match self.center_override {
            None => self.city.display_name().to_string(),
            Some((lon, lat)) => format!("custom ({lon:.4}, {lat:.4})"),
        }
    }
}

/// Run-parameter echo stored in the summary export so every run is
/// reproducible from its output alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    pub region_label: String,
    pub center_lon: f64,
    pub center_lat: f64,
    pub buffer_m: f64,
    pub start_year: i32,
    pub end_year: i32,
    pub resolution_m: f64,
    pub sample_count: usize,
    pub seed: u64,
    pub smoothing: usize,
    pub rain_percentile: f64,
    pub source: SourceMode,
}

/// Per-quadrant point count in the summary export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadrantCount {
    pub quadrant: String,
    pub count: usize,
}

/// A saved analysis summary (JSON).
///
/// Degenerate statistics are serialized as `null`, never as a stand-in zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryFile {
    pub tool: String,
    pub params: RunParams,

    pub area_km2: f64,
    /// Approximate count of independent native rainfall pixels in the region.
    pub effective_rain_pixels: f64,

    pub raw_count: usize,
    pub valid_count: usize,

    pub quadrant_counts: Vec<QuadrantCount>,
    pub corr_ndvi_rain: Option<f64>,
    pub corr_built_rain: Option<f64>,
    pub pop_weighted_rain_mean: Option<f64>,
    pub pop_weighted_ndvi_mean: Option<f64>,
    pub percent_aligned: Option<f64>,
    pub total_population: f64,
    pub aligned_population: f64,
    pub percent_population_exposed: Option<f64>,
    pub cumulative_risk: Option<f64>,
    pub mean_risk_aligned: Option<f64>,
    pub zero_risk_count: usize,
    pub nonzero_risk_count: usize,

    pub rain_stats: Option<FieldStats>,
    pub ndvi_stats: Option<FieldStats>,
    pub pop_stats: Option<FieldStats>,
    pub built_stats: Option<FieldStats>,
    pub risk_histogram: Option<Histogram>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RunConfig {
        RunConfig {
            city: City::KualaLumpur,
            center_override: None,
            buffer_m: 20_000.0,
            start_year: 2000,
            end_year: 2020,
            resolution_m: 500.0,
            sample_count: 500,
            seed: 42,
            smoothing: 3,
            rain_percentile: 95.0,
            source: SourceMode::Synthetic,
            plot: false,
            show_layers: false,
            plot_width: 100,
            plot_height: 25,
            export_samples: None,
            export_summary: None,
            debug_bundle: false,
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_reversed_years() {
        let mut config = base_config();
        config.start_year = 2020;
        config.end_year = 2000;
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("end_year"));
    }

    #[test]
    fn validate_rejects_zero_samples_and_even_smoothing() {
        let mut config = base_config();
        config.sample_count = 0;
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);

        let mut config = base_config();
        config.smoothing = 4;
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);
    }

    #[test]
    fn region_uses_override_when_present() {
        let mut config = base_config();
        config.center_override = Some((100.0, 5.0));
        let region = config.region();
        assert_eq!(region.center_lon, 100.0);
        assert_eq!(region.center_lat, 5.0);
    }

    #[test]
    fn quadrant_labels_round_trip() {
        for q in Quadrant::ALL {
            assert_eq!(Quadrant::from_label(q.label()), Some(q));
        }
        assert_eq!(Quadrant::from_label("nope"), None);
    }

    #[test]
    fn region_contains_center_and_area_is_circular() {
        let region = Region::new(101.6869, 3.1319, 20_000.0);
        assert!(region.contains(101.6869, 3.1319));
        // 20 km radius -> pi * 20^2 km^2.
        assert!((region.area_km2() - std::f64::consts::PI * 400.0).abs() < 1e-9);
        // A point ~30 km east is outside.
        let lon_far = 101.6869 + 30_000.0 / region.meters_per_lon_degree();
        assert!(!region.contains(lon_far, 3.1319));
    }
}
