//! Per-cell trend estimation.
//!
//! Each cell of a gridded time series gets an independent ordinary
//! least-squares fit of value against time in fractional years. The fits are
//! embarrassingly parallel, so rows are fanned out across the rayon pool and
//! reassembled in row-major order; output is identical for any worker count.
//!
//! Insufficient data is a value, not an error: cells with fewer than two
//! valid observations (or no time variance) come back as no-data.

use chrono::Datelike;
use chrono::NaiveDate;
use rayon::prelude::*;

use crate::error::AppError;
use crate::math::linear_trend;
use crate::raster::{GridGeometry, Raster, TimeSlice};

/// Continuous time coordinate: year plus day-of-year fraction, so composites
/// from different years regress jointly in a single fit.
pub fn fractional_year(date: NaiveDate) -> f64 {
    date.year() as f64 + (date.ordinal() - 1) as f64 / 365.0
}

/// One composited observation of a variable: a time coordinate plus the grid
/// of values at that time.
pub type TimedRaster = (f64, Raster);

/// Collapse sub-annual slices into one composite per calendar year, taking
/// the given percentile of each cell's valid observations.
///
/// The composite's time coordinate is the year itself. Cells with no valid
/// observation in a year are no-data for that year.
pub fn annual_percentile(
    slices: &[TimeSlice],
    start_year: i32,
    end_year: i32,
    pct: f64,
) -> Result<Vec<TimedRaster>, AppError> {
    if slices.is_empty() {
        return Err(AppError::new(
            3,
            "No rainfall observations in the requested date range.",
        ));
    }
    let geometry = common_geometry(slices.iter().map(|s| s.grid.geometry()))?;

    let mut composites = Vec::with_capacity((end_year - start_year + 1).max(0) as usize);
    for year in start_year..=end_year {
        let in_year: Vec<&TimeSlice> =
            slices.iter().filter(|s| s.date.year() == year).collect();

        let cells: Vec<Option<f64>> = (0..geometry.len())
            .map(|i| {
                let (row, col) = (i / geometry.width, i % geometry.width);
                let mut values: Vec<f64> = in_year
                    .iter()
                    .filter_map(|s| s.grid.get(row, col))
                    .collect();
                percentile_mut(&mut values, pct)
            })
            .collect();

        let band = format!("{}_p{:.0}", year, pct);
        composites.push((
            year as f64,
            Raster::from_cells(band, geometry.clone(), cells)?,
        ));
    }
    Ok(composites)
}

/// Fit a slope per cell over a time-ordered series of conforming rasters.
pub fn trend_raster(series: &[TimedRaster], band: &str) -> Result<Raster, AppError> {
    if series.is_empty() {
        return Err(AppError::new(3, format!("No observations to fit for '{band}'.")));
    }
    let geometry = common_geometry(series.iter().map(|(_, g)| g.geometry()))?;

    let rows: Vec<Vec<Option<f64>>> = (0..geometry.height)
        .into_par_iter()
        .map(|row| {
            let mut times = Vec::with_capacity(series.len());
            let mut values = Vec::with_capacity(series.len());
            (0..geometry.width)
                .map(|col| {
                    times.clear();
                    values.clear();
                    for (t, grid) in series {
                        if let Some(v) = grid.get(row, col) {
                            times.push(*t);
                            values.push(v);
                        }
                    }
                    linear_trend(&times, &values).map(|fit| fit.slope)
                })
                .collect()
        })
        .collect();

    let cells: Vec<Option<f64>> = rows.into_iter().flatten().collect();
    Raster::from_cells(band, geometry, cells)
}

/// Per-cell change rate between two epochs: `(late - early) / span_years`.
pub fn two_epoch_rate(
    early: &Raster,
    late: &Raster,
    span_years: f64,
    band: &str,
) -> Result<Raster, AppError> {
    if !(span_years.is_finite() && span_years > 0.0) {
        return Err(AppError::new(4, "Epoch span must be a positive number of years."));
    }
    if !early.geometry().conforms_to(late.geometry()) {
        return Err(AppError::new(
            4,
            format!("Epoch rasters for '{band}' are on different grids."),
        ));
    }

    let geometry = early.geometry().clone();
    let cells: Vec<Option<f64>> = (0..geometry.len())
        .map(|i| {
            let (row, col) = (i / geometry.width, i % geometry.width);
            match (early.get(row, col), late.get(row, col)) {
                (Some(a), Some(b)) => Some((b - a) / span_years),
                _ => None,
            }
        })
        .collect();
    Raster::from_cells(band, geometry, cells)
}

fn common_geometry<'a>(
    mut geometries: impl Iterator<Item = &'a GridGeometry>,
) -> Result<GridGeometry, AppError> {
    let first = geometries
        .next()
        .ok_or_else(|| AppError::new(3, "Empty raster series."))?;
    for g in geometries {
        if !first.conforms_to(g) {
            return Err(AppError::new(
                4,
                "Time-series slices are on mismatched grids.",
            ));
        }
    }
    Ok(first.clone())
}

/// Percentile with linear interpolation between order statistics.
/// Sorts in place; `None` on empty input.
fn percentile_mut(values: &mut [f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(values[lo]);
    }
    let frac = rank - lo as f64;
    Some(values[lo] * (1.0 - frac) + values[hi] * frac)
}
