//! HTTP client for the external gridded-data catalog.
//!
//! The catalog exposes two read-only queries:
//!
//! - `/v1/series`: (variable, region, date range) -> ordered grid payloads,
//!   one per observation timestamp, with optional quality flags
//! - `/v1/static`: (dataset, band, region) -> a single grid payload
//!
//! The endpoint and optional key come from `EO_API_URL` / `EO_API_KEY`
//! (`.env` supported). Source failures are fatal for the run and surface as
//! exit code 4; retries, if any, belong to the catalog side.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::data::{
    BUILT_BAND, BUILT_EARLY_DATASET, BUILT_LATE_DATASET, BUILT_SPAN_YEARS, NDVI_VARIABLE,
    POP_BAND, POP_DATASET, RAIN_NATIVE_M, RAIN_VARIABLE, Scene, masked_scaled_cells,
};
use crate::domain::{Region, RunConfig};
use crate::error::AppError;
use crate::raster::{GridGeometry, Raster, TimeSlice};

const SERIES_PATH: &str = "/v1/series";
const STATIC_PATH: &str = "/v1/static";

pub struct RemoteSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteSource {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("EO_API_URL")
            .map_err(|_| AppError::new(2, "Missing EO_API_URL in environment (.env)."))?;
        let api_key = std::env::var("EO_API_KEY").ok();
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
        })
    }

    /// Whether the environment is configured for remote access.
    pub fn is_configured() -> bool {
        dotenvy::dotenv().ok();
        std::env::var("EO_API_URL").is_ok()
    }

    /// Fetch everything one run needs from the catalog.
    pub fn fetch_scene(&self, config: &RunConfig, region: &Region) -> Result<Scene, AppError> {
        let start = NaiveDate::from_ymd_opt(config.start_year, 1, 1)
            .ok_or_else(|| AppError::new(2, format!("Invalid start_year {}.", config.start_year)))?;
        let end = NaiveDate::from_ymd_opt(config.end_year, 12, 31)
            .ok_or_else(|| AppError::new(2, format!("Invalid end_year {}.", config.end_year)))?;

        let rain = self.fetch_series(RAIN_VARIABLE, region, start, end)?;
        if rain.is_empty() {
            return Err(AppError::new(
                4,
                format!("No observations returned for variable {RAIN_VARIABLE}."),
            ));
        }
        let ndvi = self.fetch_series(NDVI_VARIABLE, region, start, end)?;
        if ndvi.is_empty() {
            return Err(AppError::new(
                4,
                format!("No observations returned for variable {NDVI_VARIABLE}."),
            ));
        }

        let population = self.fetch_static(POP_DATASET, POP_BAND, region)?;
        let built_early = self.fetch_static(BUILT_EARLY_DATASET, BUILT_BAND, region)?;
        let built_late = self.fetch_static(BUILT_LATE_DATASET, BUILT_BAND, region)?;

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

    fn fetch_series(
        &self,
        variable: &str,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeSlice>, AppError> {
        let url = format!("{}{SERIES_PATH}", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("variable", variable.to_string()),
            ("lon", region.center_lon.to_string()),
            ("lat", region.center_lat.to_string()),
            ("radius_m", region.buffer_m.to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        let resp = self
            .client
            .get(url)
            .query(&params)
            .send()
            .map_err(|e| AppError::new(4, format!("Catalog request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!(
                    "Catalog request for {variable} failed with status {}.",
                    resp.status()
                ),
            ));
        }

        let body: SeriesResponse = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse catalog response: {e}")))?;

        let mut slices = Vec::with_capacity(body.slices.len());
        for payload in body.slices {
            slices.push(payload.into_time_slice(variable)?);
        }
        slices.sort_by_key(|s| s.date);
        Ok(slices)
    }

    fn fetch_static(
        &self,
        dataset: &str,
        band: &str,
        region: &Region,
    ) -> Result<Raster, AppError> {
        let url = format!("{}{STATIC_PATH}", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("dataset", dataset.to_string()),
            ("band", band.to_string()),
            ("lon", region.center_lon.to_string()),
            ("lat", region.center_lat.to_string()),
            ("radius_m", region.buffer_m.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        let resp = self
            .client
            .get(url)
            .query(&params)
            .send()
            .map_err(|e| AppError::new(4, format!("Catalog request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!(
                    "Catalog request for {dataset}/{band} failed with status {}.",
                    resp.status()
                ),
            ));
        }

        let payload: GridPayload = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse catalog response: {e}")))?;

        payload.into_raster(band)
    }
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    slices: Vec<GridPayload>,
}

/// One grid observation on the wire.
#[derive(Debug, Deserialize)]
struct GridPayload {
    date: Option<String>,
    west: f64,
    north: f64,
    cell_deg_x: f64,
    cell_deg_y: f64,
    width: usize,
    height: usize,
    crs: Option<String>,
    /// Multiplier from stored integers to physical units (default 1).
    scale: Option<f64>,
    /// Stored no-data sentinel, if the dataset uses one.
    nodata: Option<f64>,
    values: Vec<f64>,
    /// Per-cell quality flags; 0 = reliable.
    qa: Option<Vec<i64>>,
}

impl GridPayload {
    fn geometry(&self) -> GridGeometry {
        GridGeometry {
            crs: self.crs.clone().unwrap_or_else(|| "EPSG:4326".to_string()),
            west: self.west,
            north: self.north,
            cell_deg_x: self.cell_deg_x,
            cell_deg_y: self.cell_deg_y,
            width: self.width,
            height: self.height,
        }
    }

    fn into_raster(self, band: &str) -> Result<Raster, AppError> {
        let geometry = self.geometry();
        let cells = masked_scaled_cells(
            &self.values,
            self.qa.as_deref(),
            self.scale.unwrap_or(1.0),
            self.nodata,
        );
        Raster::from_cells(band, geometry, cells)
    }

    fn into_time_slice(self, band: &str) -> Result<TimeSlice, AppError> {
        let raw_date = self
            .date
            .clone()
            .ok_or_else(|| AppError::new(4, format!("Missing observation date for {band}.")))?;
        let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
            .map_err(|e| AppError::new(4, format!("Invalid observation date '{raw_date}': {e}")))?;
        let grid = self.into_raster(band)?;
        Ok(TimeSlice { date, grid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(values: Vec<f64>) -> GridPayload {
        GridPayload {
            date: Some("2005-03-06".to_string()),
            west: 101.0,
            north: 4.0,
            cell_deg_x: 0.01,
            cell_deg_y: 0.01,
            width: 2,
            height: 1,
            crs: None,
            scale: Some(1e-4),
            nodata: Some(-3_000.0),
            values,
            qa: Some(vec![0, 2]),
        }
    }

    #[test]
    fn payload_masks_scales_and_dates() {
        let slice = payload(vec![8_000.0, 9_000.0]).into_time_slice("ndvi").unwrap();
        assert_eq!(
            slice.date,
            NaiveDate::from_ymd_opt(2005, 3, 6).unwrap()
        );
        assert!((slice.grid.get(0, 0).unwrap() - 0.8).abs() < 1e-12);
        // Flagged cell is no-data despite a plausible stored value.
        assert_eq!(slice.grid.get(0, 1), None);
    }

    #[test]
    fn payload_without_date_is_rejected_for_series() {
        let mut p = payload(vec![1.0, 2.0]);
        p.date = None;
        let err = p.into_time_slice("ndvi").unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn payload_with_wrong_cell_count_is_rejected() {
        let err = payload(vec![1.0]).into_raster("ndvi").unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
