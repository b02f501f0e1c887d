//! Grid harmonization: areal resampling and local-mean smoothing.
//!
//! Heterogeneous native grids (coarse rainfall, fine vegetation, population)
//! are brought onto one target grid so point extraction is unambiguous.
//!
//! Rules:
//! - resampling uses area-weighted means over overlapping source cells,
//!   never nearest-neighbor, so coarsening does not alias
//! - a raster already on the target grid passes through value-identical
//! - smoothing is a square local mean applied after reprojection; edge
//!   cells use only in-bounds neighbors, no-data neighbors are skipped

use crate::error::AppError;

use super::{GridGeometry, NO_DATA, Raster};

/// Resample a raster onto a target grid with an area-weighted mean.
///
/// Target cells with no valid source coverage become no-data.
pub fn resample_mean(src: &Raster, target: &GridGeometry) -> Raster {
    if src.geometry().conforms_to(target) {
        return src.clone();
    }

    let sg = src.geometry();
    let mut out = Vec::with_capacity(target.len());

    for row in 0..target.height {
        let (y0, y1) = target.row_bounds(row);
        let src_rows = overlapping_range(sg.north - y1, sg.north - y0, sg.cell_deg_y, sg.height);
        for col in 0..target.width {
            let (x0, x1) = target.col_bounds(col);
            let src_cols = overlapping_range(x0 - sg.west, x1 - sg.west, sg.cell_deg_x, sg.width);

            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            if let (Some((r0, r1)), Some((c0, c1))) = (src_rows, src_cols) {
                for sr in r0..=r1 {
                    let (sy0, sy1) = sg.row_bounds(sr);
                    let wy = overlap_len(y0, y1, sy0, sy1);
                    if wy <= 0.0 {
                        continue;
                    }
                    for sc in c0..=c1 {
                        let Some(v) = src.get(sr, sc) else { continue };
                        let (sx0, sx1) = sg.col_bounds(sc);
                        let wx = overlap_len(x0, x1, sx0, sx1);
                        if wx <= 0.0 {
                            continue;
                        }
                        let w = wx * wy;
                        weighted_sum += w * v;
                        weight_total += w;
                    }
                }
            }

            out.push(if weight_total > 1e-12 {
                weighted_sum / weight_total
            } else {
                NO_DATA
            });
        }
    }

    let mut result = Raster::filled_no_data(src.band().to_string(), target.clone());
    result.data = out;
    if let Some((lo, hi)) = src.display_range() {
        result = result.with_display_range(lo, hi);
    }
    result
}

/// Square local-mean filter of odd side length `window`; `window == 1` is a
/// pass-through. No-data cells stay no-data.
pub fn focal_mean(src: &Raster, window: usize) -> Result<Raster, AppError> {
    if window == 0 || window % 2 == 0 {
        return Err(AppError::new(
            2,
            format!("smoothing must be an odd window size, got {window}."),
        ));
    }
    if window == 1 {
        return Ok(src.clone());
    }

    let geom = src.geometry();
    let half = (window / 2) as isize;
    let mut out = Vec::with_capacity(geom.len());

    for row in 0..geom.height {
        for col in 0..geom.width {
            if src.get(row, col).is_none() {
                out.push(NO_DATA);
                continue;
            }
            let mut sum = 0.0;
            let mut n = 0usize;
            for dr in -half..=half {
                for dc in -half..=half {
                    let r = row as isize + dr;
                    let c = col as isize + dc;
                    if r < 0 || c < 0 {
                        continue;
                    }
                    if let Some(v) = src.get(r as usize, c as usize) {
                        sum += v;
                        n += 1;
                    }
                }
            }
            out.push(if n > 0 { sum / n as f64 } else { NO_DATA });
        }
    }

    let mut result = Raster::filled_no_data(src.band().to_string(), geom.clone());
    result.data = out;
    if let Some((lo, hi)) = src.display_range() {
        result = result.with_display_range(lo, hi);
    }
    Ok(result)
}

/// Harmonize one raster: resample to the target grid, then smooth.
pub fn conform(src: &Raster, target: &GridGeometry, smoothing: usize) -> Result<Raster, AppError> {
    focal_mean(&resample_mean(src, target), smoothing)
}

/// Index range of source cells whose [i*cell, (i+1)*cell) interval overlaps
/// [lo, hi), clamped to [0, count). `lo`/`hi` are offsets from the grid origin.
fn overlapping_range(lo: f64, hi: f64, cell: f64, count: usize) -> Option<(usize, usize)> {
    if count == 0 || hi <= 0.0 {
        return None;
    }
    let first = (lo / cell).floor().max(0.0) as usize;
    if first >= count {
        return None;
    }
    let last_excl = (hi / cell).ceil() as usize;
    let last = last_excl.min(count).saturating_sub(1);
    if last < first { None } else { Some((first, last)) }
}

fn overlap_len(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::test_geometry;

    fn raster_from(values: &[f64], width: usize, height: usize) -> Raster {
        let cells = values.iter().map(|v| Some(*v)).collect();
        Raster::from_cells("t", test_geometry(width, height), cells).unwrap()
    }

    #[test]
    fn resample_is_idempotent_on_conforming_grid() {
        let src = raster_from(&[1.0, 2.0, 3.0, 4.0], 2, 2);
        let out = resample_mean(&src, src.geometry());
        for row in 0..2 {
            for col in 0..2 {
                assert_eq!(out.get(row, col), src.get(row, col));
            }
        }
    }

    #[test]
    fn coarsening_averages_covered_cells() {
        // 4x4 source at 0.01 deg; 2x2 target at 0.02 deg over the same extent.
        let values: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let src = raster_from(&values, 4, 4);
        let target = GridGeometry {
            cell_deg_x: 0.02,
            cell_deg_y: 0.02,
            width: 2,
            height: 2,
            ..test_geometry(4, 4)
        };
        let out = resample_mean(&src, &target);
        // Top-left target cell covers source cells {0, 1, 4, 5}.
        assert!((out.get(0, 0).unwrap() - 2.5).abs() < 1e-9);
        // Bottom-right covers {10, 11, 14, 15}.
        assert!((out.get(1, 1).unwrap() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn refining_reproduces_the_containing_cell() {
        // 2x2 source at 0.02 deg refined to 4x4 at 0.01 deg: each fine cell
        // sits wholly inside one coarse cell, so the mean is that cell.
        let coarse_geom = GridGeometry {
            cell_deg_x: 0.02,
            cell_deg_y: 0.02,
            width: 2,
            height: 2,
            ..test_geometry(4, 4)
        };
        let src =
            Raster::from_cells("t", coarse_geom, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)])
                .unwrap();
        let out = resample_mean(&src, &test_geometry(4, 4));
        assert_eq!(out.get(0, 0), Some(1.0));
        assert_eq!(out.get(0, 3), Some(2.0));
        assert_eq!(out.get(3, 0), Some(3.0));
        assert_eq!(out.get(3, 3), Some(4.0));
    }

    #[test]
    fn resample_propagates_no_data_where_uncovered() {
        let src = Raster::from_cells(
            "t",
            test_geometry(2, 2),
            vec![None, None, None, None],
        )
        .unwrap();
        let target = GridGeometry {
            cell_deg_x: 0.02,
            cell_deg_y: 0.02,
            width: 1,
            height: 1,
            ..test_geometry(2, 2)
        };
        let out = resample_mean(&src, &target);
        assert_eq!(out.get(0, 0), None);
    }

    #[test]
    fn coarsening_skips_no_data_source_cells() {
        let src = Raster::from_cells(
            "t",
            test_geometry(2, 2),
            vec![Some(10.0), None, None, Some(20.0)],
        )
        .unwrap();
        let target = GridGeometry {
            cell_deg_x: 0.02,
            cell_deg_y: 0.02,
            width: 1,
            height: 1,
            ..test_geometry(2, 2)
        };
        let out = resample_mean(&src, &target);
        assert!((out.get(0, 0).unwrap() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn focal_mean_averages_in_bounds_neighbors() {
        let values: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let src = raster_from(&values, 3, 3);
        let out = focal_mean(&src, 3).unwrap();
        // Center cell sees all nine neighbors.
        assert!((out.get(1, 1).unwrap() - 4.0).abs() < 1e-9);
        // Corner cell sees only the four in-bounds neighbors {0, 1, 3, 4}.
        assert!((out.get(0, 0).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn focal_mean_skips_missing_neighbors_and_keeps_no_data() {
        let src = Raster::from_cells(
            "t",
            test_geometry(2, 2),
            vec![Some(1.0), None, Some(3.0), Some(5.0)],
        )
        .unwrap();
        let out = focal_mean(&src, 3).unwrap();
        assert!((out.get(0, 0).unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(out.get(0, 1), None);
    }

    #[test]
    fn focal_mean_window_one_is_identity() {
        let src = raster_from(&[1.0, 2.0, 3.0, 4.0], 2, 2);
        let out = focal_mean(&src, 1).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn focal_mean_rejects_even_windows() {
        let src = raster_from(&[1.0], 1, 1);
        assert_eq!(focal_mean(&src, 2).unwrap_err().exit_code(), 2);
    }
}
