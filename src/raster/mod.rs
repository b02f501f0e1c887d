//! Gridded raster type and grid geometry.
//!
//! A `Raster` is a single named band on a regular lon/lat grid. Cells are
//! stored row-major with row 0 at the northern edge. No-data is held as an
//! internal sentinel and never leaks: every accessor returns `Option<f64>`,
//! so a missing cell cannot be confused with a zero measurement.
//!
//! Rasters are immutable once produced: reprojection and smoothing build
//! new rasters rather than mutating in place.

use chrono::NaiveDate;

use crate::domain::{METERS_PER_DEGREE, Region};
use crate::error::AppError;

pub mod resample;

/// Internal no-data sentinel. Kept private to this module tree.
pub(crate) const NO_DATA: f64 = f64::NAN;

/// Geometry of a regular geographic grid: projection, origin, cell size, shape.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    /// Projection identifier (the pipeline works in "EPSG:4326").
    pub crs: String,
    /// Western edge of column 0, degrees.
    pub west: f64,
    /// Northern edge of row 0, degrees.
    pub north: f64,
    /// Cell width in degrees of longitude (positive).
    pub cell_deg_x: f64,
    /// Cell height in degrees of latitude (positive; rows advance southward).
    pub cell_deg_y: f64,
    pub width: usize,
    pub height: usize,
}

impl GridGeometry {
    /// Grid covering a region's bounding box at a ground-sample distance in
    /// meters. Cell sizes are anisotropic in degrees so that cells are
    /// square on the ground at the region's latitude.
    pub fn covering(region: &Region, cell_m: f64) -> Result<Self, AppError> {
        if !(cell_m.is_finite() && cell_m > 0.0) {
            return Err(AppError::new(2, "Grid cell size must be a positive number."));
        }
        let (west, south, east, north) = region.bbox_deg();
        let cell_deg_y = cell_m / METERS_PER_DEGREE;
        let cell_deg_x = cell_m / region.meters_per_lon_degree();
        let width = ((east - west) / cell_deg_x).ceil().max(1.0) as usize;
        let height = ((north - south) / cell_deg_y).ceil().max(1.0) as usize;
        Ok(Self {
            crs: "EPSG:4326".to_string(),
            west,
            north,
            cell_deg_x,
            cell_deg_y,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell containing the coordinate, or `None` outside the grid.
    pub fn cell_index(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if !(lon.is_finite() && lat.is_finite()) {
            return None;
        }
        let col = (lon - self.west) / self.cell_deg_x;
        let row = (self.north - lat) / self.cell_deg_y;
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row < self.height && col < self.width {
            Some((row, col))
        } else {
            None
        }
    }

    /// Center coordinate of a cell as (lon, lat).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.west + (col as f64 + 0.5) * self.cell_deg_x,
            self.north - (row as f64 + 0.5) * self.cell_deg_y,
        )
    }

    /// Longitude extent of a column as (west edge, east edge).
    pub fn col_bounds(&self, col: usize) -> (f64, f64) {
        let x0 = self.west + col as f64 * self.cell_deg_x;
        (x0, x0 + self.cell_deg_x)
    }

    /// Latitude extent of a row as (south edge, north edge).
    pub fn row_bounds(&self, row: usize) -> (f64, f64) {
        let y1 = self.north - row as f64 * self.cell_deg_y;
        (y1 - self.cell_deg_y, y1)
    }

    /// Approximate ground size of one cell in meters (north-south axis).
    pub fn cell_size_m(&self) -> f64 {
        self.cell_deg_y * METERS_PER_DEGREE
    }

    /// Whether two geometries describe the same grid (within floating tolerance).
    pub fn conforms_to(&self, other: &GridGeometry) -> bool {
        const EPS: f64 = 1e-9;
        self.crs == other.crs
            && self.width == other.width
            && self.height == other.height
            && (self.west - other.west).abs() < EPS
            && (self.north - other.north).abs() < EPS
            && (self.cell_deg_x - other.cell_deg_x).abs() < EPS
            && (self.cell_deg_y - other.cell_deg_y).abs() < EPS
    }
}

/// One named band of gridded values.
#[derive(Debug, Clone)]
pub struct Raster {
    band: String,
    geometry: GridGeometry,
    /// Nominal value range for display sinks only; never used in computation.
    display_range: Option<(f64, f64)>,
    data: Vec<f64>,
}

/// Bitwise cell comparison, so no-data cells compare equal to each other.
impl PartialEq for Raster {
    fn eq(&self, other: &Self) -> bool {
        self.band == other.band
            && self.geometry == other.geometry
            && self.display_range == other.display_range
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Raster {
    /// Build from row-major values where `None` marks no-data.
    pub fn from_cells(
        band: impl Into<String>,
        geometry: GridGeometry,
        cells: Vec<Option<f64>>,
    ) -> Result<Self, AppError> {
        if cells.len() != geometry.len() {
            return Err(AppError::new(
                4,
                format!(
                    "Raster data length {} does not match grid {}x{}.",
                    cells.len(),
                    geometry.width,
                    geometry.height
                ),
            ));
        }
        let data = cells
            .into_iter()
            .map(|c| match c {
                Some(v) if v.is_finite() => v,
                _ => NO_DATA,
            })
            .collect();
        Ok(Self {
            band: band.into(),
            geometry,
            display_range: None,
            data,
        })
    }

    /// Build a raster with every cell set to no-data.
    pub fn filled_no_data(band: impl Into<String>, geometry: GridGeometry) -> Self {
        let data = vec![NO_DATA; geometry.len()];
        Self {
            band: band.into(),
            geometry,
            display_range: None,
            data,
        }
    }

    pub fn with_display_range(mut self, min: f64, max: f64) -> Self {
        self.display_range = Some((min, max));
        self
    }

    pub fn band(&self) -> &str {
        &self.band
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn display_range(&self) -> Option<(f64, f64)> {
        self.display_range
    }

    /// Cell value at (row, col); `None` for no-data or out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.geometry.height || col >= self.geometry.width {
            return None;
        }
        let v = self.data[row * self.geometry.width + col];
        if v.is_nan() { None } else { Some(v) }
    }

    /// Value of the cell containing the coordinate.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f64> {
        let (row, col) = self.geometry.cell_index(lon, lat)?;
        self.get(row, col)
    }

    /// Number of cells carrying a value.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Row-major iterator over `(row, col, Option<value>)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Option<f64>)> + '_ {
        let width = self.geometry.width;
        self.data.iter().enumerate().map(move |(i, v)| {
            let value = if v.is_nan() { None } else { Some(*v) };
            (i / width, i % width, value)
        })
    }
}

/// A raster observation at a point in time, as produced by the loader.
///
/// Quality masking and unit scaling have already been applied: masked cells
/// are no-data by the time a slice reaches the trend estimator.
#[derive(Debug, Clone)]
pub struct TimeSlice {
    pub date: NaiveDate,
    pub grid: Raster,
}

#[cfg(test)]
pub(crate) fn test_geometry(width: usize, height: usize) -> GridGeometry {
    GridGeometry {
        crs: "EPSG:4326".to_string(),
        west: 101.0,
        north: 4.0,
        cell_deg_x: 0.01,
        cell_deg_y: 0.01,
        width,
        height,
    }
}
