//! Per-point risk derivation and quadrant classification.
//!
//! All derived fields are pure functions of a point's joined attributes, so
//! they can be recomputed anywhere (exports included) and never need to be
//! persisted separately from the point.

use crate::domain::{Quadrant, RiskRecord, SamplePoint};

pub mod stats;

/// Multiplier applied to hazard x vulnerability x population so scores land
/// in a readable range.
pub const RISK_SCALE: f64 = 1.0e7;

/// Positive-only component of the rainfall-intensity trend.
pub fn hazard(rain_trend: f64) -> f64 {
    rain_trend.max(0.0)
}

/// Positive-only magnitude of vegetation decline.
pub fn vulnerability(ndvi_trend: f64) -> f64 {
    (-ndvi_trend).max(0.0)
}

/// Compound risk score, gated on both signals being present.
///
/// The explicit conjunction restates the intent: a location with rainfall
/// intensification but no vegetation loss (or vice versa) is not compound
/// risk. With both factors clamped non-negative the gate coincides with the
/// plain product's zero set; a test pins that equivalence.
pub fn risk_score(hazard: f64, vulnerability: f64, pop: f64) -> f64 {
    if hazard > 0.0 && vulnerability > 0.0 {
        hazard * vulnerability * pop * RISK_SCALE
    } else {
        0.0
    }
}

/// Total classification over the (rain-trend sign, ndvi-trend sign) pair.
/// Every valid point receives exactly one label.
pub fn classify(rain_trend: f64, ndvi_trend: f64) -> Quadrant {
    match (rain_trend > 0.0, ndvi_trend < 0.0) {
        (true, true) => Quadrant::HighRiskAligned,
        (true, false) => Quadrant::RainIncreaseOnly,
        (false, true) => Quadrant::VegLossOnly,
        (false, false) => Quadrant::LowChange,
    }
}

/// Extend a sample point with its derived fields.
pub fn derive_record(point: SamplePoint) -> RiskRecord {
    let h = hazard(point.attrs.rain_trend);
    let v = vulnerability(point.attrs.ndvi_trend);
    let score = risk_score(h, v, point.attrs.pop);
    let quadrant = classify(point.attrs.rain_trend, point.attrs.ndvi_trend);
    RiskRecord {
        point,
        hazard: h,
        vulnerability: v,
        risk_score: score,
        quadrant,
    }
}

/// Derive records for the whole valid-point table, preserving point order.
pub fn derive_records(points: Vec<SamplePoint>) -> Vec<RiskRecord> {
    points.into_iter().map(derive_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Attributes;

    fn point(rain: f64, ndvi: f64, pop: f64) -> SamplePoint {
        SamplePoint {
            id: "P-0001".to_string(),
            lon: 0.0,
            lat: 0.0,
            attrs: Attributes {
                rain_trend: rain,
                ndvi_trend: ndvi,
                pop,
                builtup_change: 0.0,
            },
        }
    }

    #[test]
    fn hazard_and_vulnerability_clamp_at_zero() {
        assert_eq!(hazard(0.3), 0.3);
        assert_eq!(hazard(-0.3), 0.0);
        assert_eq!(vulnerability(-0.01), 0.01);
        assert_eq!(vulnerability(0.01), 0.0);
    }

    #[test]
    fn risk_is_zero_unless_both_signals_present() {
        assert_eq!(risk_score(0.0, 0.5, 100.0), 0.0);
        assert_eq!(risk_score(0.5, 0.0, 100.0), 0.0);
        assert_eq!(risk_score(0.0, 0.0, 100.0), 0.0);
        assert!(risk_score(0.5, 0.01, 100.0) > 0.0);
    }

    #[test]
    fn gate_matches_the_plain_product_zero_set() {
        // With clamped inputs, the explicit gate and the raw product agree
        // everywhere, including negative raw trends.
        for rain in [-0.2, -0.0, 0.0, 0.1] {
            for ndvi in [-0.02, 0.0, 0.03] {
                for pop in [0.0, 50.0] {
                    let h = hazard(rain);
                    let v = vulnerability(ndvi);
                    let gated = risk_score(h, v, pop);
                    let product = h * v * pop * RISK_SCALE;
                    assert_eq!(gated, product, "rain={rain} ndvi={ndvi} pop={pop}");
                }
            }
        }
    }

    #[test]
    fn risk_is_monotonic_in_each_factor() {
        let base = risk_score(0.2, 0.01, 100.0);
        assert!(risk_score(0.3, 0.01, 100.0) > base);
        assert!(risk_score(0.2, 0.02, 100.0) > base);
        assert!(risk_score(0.2, 0.01, 200.0) > base);
    }

    #[test]
    fn classification_is_total_and_matches_signs() {
        assert_eq!(classify(0.1, -0.01), Quadrant::HighRiskAligned);
        assert_eq!(classify(0.1, 0.01), Quadrant::RainIncreaseOnly);
        assert_eq!(classify(-0.1, -0.01), Quadrant::VegLossOnly);
        assert_eq!(classify(-0.1, 0.01), Quadrant::LowChange);
        // Boundaries: zero rain is "no increase", zero ndvi is "no loss".
        assert_eq!(classify(0.0, 0.0), Quadrant::LowChange);
        assert_eq!(classify(0.0, -0.01), Quadrant::VegLossOnly);
        assert_eq!(classify(0.1, 0.0), Quadrant::RainIncreaseOnly);
    }

    #[test]
    fn derive_record_is_consistent_with_the_parts() {
        let record = derive_record(point(0.1, -0.01, 100.0));
        assert_eq!(record.hazard, 0.1);
        assert_eq!(record.vulnerability, 0.01);
        assert_eq!(record.quadrant, Quadrant::HighRiskAligned);
        assert!((record.risk_score - 0.1 * 0.01 * 100.0 * RISK_SCALE).abs() < 1e-9);
    }
}
