//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - quadrant scatter: `#` aligned, `r` rain-only, `v` veg-loss, `.` low-change,
//!   with zero axes drawn as `|`, `-`, `+`
//! - layer heatmap: a character ramp standing in for the sink's color ramp

use crate::domain::{Quadrant, RiskRecord};
use crate::raster::Raster;

/// Character ramp for heatmaps, darkest last; no-data renders as a blank.
const HEAT_RAMP: &[u8] = b".:-=+*#%@";

/// Render the ndvi-trend vs rain-trend scatter with quadrant glyphs.
pub fn render_quadrant_scatter(records: &[RiskRecord], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let xs: Vec<f64> = records.iter().map(|r| r.point.attrs.ndvi_trend).collect();
    let ys: Vec<f64> = records.iter().map(|r| r.point.attrs.rain_trend).collect();

    let (x_min, x_max) = pad_range(value_range(&xs).unwrap_or((-0.001, 0.001)), 0.05);
    let (y_min, y_max) = pad_range(value_range(&ys).unwrap_or((-0.1, 0.1)), 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Zero axes first, so points can overlay them.
    let zero_col = in_range(0.0, x_min, x_max).then(|| map_x(0.0, x_min, x_max, width));
    let zero_row = in_range(0.0, y_min, y_max).then(|| map_y(0.0, y_min, y_max, height));
    if let Some(row) = zero_row {
        for c in &mut grid[row] {
            *c = '-';
        }
    }
    if let Some(col) = zero_col {
        for row in grid.iter_mut() {
            row[col] = '|';
        }
    }
    if let (Some(row), Some(col)) = (zero_row, zero_col) {
        grid[row][col] = '+';
    }

    // Low-severity glyphs first so aligned points stay visible on overlap.
    let mut ordered: Vec<&RiskRecord> = records.iter().collect();
    ordered.sort_by_key(|r| severity(r.quadrant));
    for r in ordered {
        let x = map_x(r.point.attrs.ndvi_trend, x_min, x_max, width);
        let y = map_y(r.point.attrs.rain_trend, y_min, y_max, height);
        grid[y][x] = glyph(r.quadrant);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Scatter: ndvi_trend=[{x_min:.4}, {x_max:.4}] | rain_trend=[{y_min:.3}, {y_max:.3}]\n"
    ));
    out.push_str("# aligned  r rain-only  v veg-loss  . low-change\n");
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// Render one harmonized layer as a heatmap over the character ramp.
///
/// Cells are picked by position for display only; the analysis itself never
/// samples rasters this way.
pub fn render_layer_heatmap(
    name: &str,
    raster: &Raster,
    min: f64,
    max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(2);
    let height = height.max(2);
    let geom = raster.geometry();
    let span = if max > min { max - min } else { 1.0 };

    let mut out = String::new();
    out.push_str(&format!("Layer: {name} | range=[{min}, {max}]\n"));
    for row in 0..height {
        let src_row = row * geom.height / height;
        for col in 0..width {
            let src_col = col * geom.width / width;
            let ch = match raster.get(src_row, src_col) {
                None => ' ',
                Some(v) => {
                    let u = ((v - min) / span).clamp(0.0, 1.0);
                    let idx = (u * (HEAT_RAMP.len() - 1) as f64).round() as usize;
                    HEAT_RAMP[idx] as char
                }
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

fn glyph(quadrant: Quadrant) -> char {
    match quadrant {
        Quadrant::HighRiskAligned => '#',
        Quadrant::RainIncreaseOnly => 'r',
        Quadrant::VegLossOnly => 'v',
        Quadrant::LowChange => '.',
    }
}

fn severity(quadrant: Quadrant) -> u8 {
    match quadrant {
        Quadrant::LowChange => 0,
        Quadrant::VegLossOnly => 1,
        Quadrant::RainIncreaseOnly => 2,
        Quadrant::HighRiskAligned => 3,
    }
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range((min, max): (f64, f64), frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn in_range(v: f64, min: f64, max: f64) -> bool {
    v >= min && v <= max
}

fn map_x(v: f64, min: f64, max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(v: f64, min: f64, max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    // v = max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}
