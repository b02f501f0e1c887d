//! Spatial point sampling and attribute joins.
//!
//! A fixed-size random point sample is drawn uniformly over the circular
//! region, reproducibly from the run seed. Each point is then joined to the
//! value of the containing cell in every harmonized raster; points missing
//! any attribute are dropped, and the raw-vs-valid gap is reported so
//! coverage loss is never silent.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{Attributes, METERS_PER_DEGREE, Region, SamplePoint};
use crate::raster::Raster;

/// A sampled location before any attributes are joined.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
}

/// Raw vs valid counts of the sample; the gap measures coverage loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinDiagnostics {
    pub raw_count: usize,
    pub valid_count: usize,
}

impl JoinDiagnostics {
    pub fn dropped(&self) -> usize {
        self.raw_count - self.valid_count
    }
}

/// The joined point table.
#[derive(Debug, Clone)]
pub struct JoinedSample {
    pub points: Vec<SamplePoint>,
    pub diagnostics: JoinDiagnostics,
}

/// Draw `count` points uniformly at random inside the region.
///
/// The same (seed, region, count) always reproduces the same point set.
/// Point ids are assigned in draw order and stay stable through the join.
pub fn scatter_points(region: &Region, count: usize, seed: u64) -> Vec<ScatterPoint> {
    let mut rng = StdRng::seed_from_u64(scatter_seed(region, count, seed));
    let m_per_lon_deg = region.meters_per_lon_degree();

    (0..count)
        .map(|i| {
            // Radius via sqrt keeps density uniform over the disk area.
            let u: f64 = rng.r#gen();
            let theta: f64 = rng.r#gen::<f64>() * std::f64::consts::TAU;
            let r = region.buffer_m * u.sqrt();
            ScatterPoint {
                id: format!("P-{:04}", i + 1),
                lon: region.center_lon + r * theta.sin() / m_per_lon_deg,
                lat: region.center_lat + r * theta.cos() / METERS_PER_DEGREE,
            }
        })
        .collect()
}

fn scatter_seed(region: &Region, count: usize, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    count.hash(&mut hasher);
    region.center_lon.to_bits().hash(&mut hasher);
    region.center_lat.to_bits().hash(&mut hasher);
    region.buffer_m.to_bits().hash(&mut hasher);
    hasher.finish()
}

/// Join every harmonized raster to every point; keep only complete rows.
///
/// Per-point extraction is independent, so it fans out across the rayon
/// pool; results come back in point-id order regardless of worker count.
pub fn join_attributes(
    positions: &[ScatterPoint],
    rain_trend: &Raster,
    ndvi_trend: &Raster,
    population: &Raster,
    builtup_change: &Raster,
) -> JoinedSample {
    let joined: Vec<Option<SamplePoint>> = positions
        .par_iter()
        .map(|p| {
            let attrs = Attributes {
                rain_trend: rain_trend.value_at(p.lon, p.lat)?,
                ndvi_trend: ndvi_trend.value_at(p.lon, p.lat)?,
                pop: population.value_at(p.lon, p.lat)?,
                builtup_change: builtup_change.value_at(p.lon, p.lat)?,
            };
            Some(SamplePoint {
                id: p.id.clone(),
                lon: p.lon,
                lat: p.lat,
                attrs,
            })
        })
        .collect();

    let points: Vec<SamplePoint> = joined.into_iter().flatten().collect();
    let diagnostics = JoinDiagnostics {
        raw_count: positions.len(),
        valid_count: points.len(),
    };
    JoinedSample {
        points,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridGeometry;

    fn region() -> Region {
        Region::new(101.6869, 3.1319, 5_000.0)
    }

    fn constant_raster(region: &Region, value: Option<f64>) -> Raster {
        let geom = GridGeometry::covering(region, 500.0).unwrap();
        let cells = vec![value; geom.len()];
        Raster::from_cells("t", geom, cells).unwrap()
    }

    #[test]
    fn sampling_is_reproducible_for_a_seed() {
        let region = region();
        let a = scatter_points(&region, 100, 42);
        let b = scatter_points(&region, 100, 42);
        assert_eq!(a, b);

        let c = scatter_points(&region, 100, 7);
        assert_ne!(a, c);
    }

    #[test]
    fn sampled_points_lie_inside_the_region() {
        let region = region();
        for p in scatter_points(&region, 200, 11) {
            let d = region.distance_from_center_m(p.lon, p.lat);
            assert!(d <= region.buffer_m * 1.001, "point {} at {d} m", p.id);
        }
    }

    #[test]
    fn ids_follow_draw_order() {
        let region = region();
        let points = scatter_points(&region, 3, 1);
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["P-0001", "P-0002", "P-0003"]);
    }

    #[test]
    fn join_keeps_complete_rows_only() {
        let region = region();
        let positions = scatter_points(&region, 50, 42);
        let full = constant_raster(&region, Some(1.0));
        let empty = constant_raster(&region, None);

        let all = join_attributes(&positions, &full, &full, &full, &full);
        assert_eq!(all.diagnostics.raw_count, 50);
        assert_eq!(all.diagnostics.valid_count, 50);
        assert_eq!(all.diagnostics.dropped(), 0);

        let none = join_attributes(&positions, &full, &empty, &full, &full);
        assert_eq!(none.diagnostics.raw_count, 50);
        assert_eq!(none.diagnostics.valid_count, 0);
        assert!(none.points.is_empty());
    }

    #[test]
    fn join_preserves_point_order_and_values() {
        let region = region();
        let positions = scatter_points(&region, 20, 3);
        let full = constant_raster(&region, Some(2.5));
        let joined = join_attributes(&positions, &full, &full, &full, &full);
        let ids: Vec<&str> = joined.points.iter().map(|p| p.id.as_str()).collect();
        let expected: Vec<String> = (1..=20).map(|i| format!("P-{i:04}")).collect();
        assert_eq!(ids, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        assert!(joined.points.iter().all(|p| p.attrs.rain_trend == 2.5));
    }
}
