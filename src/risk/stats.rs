//! Aggregate statistics over the valid-point collection.
//!
//! Every aggregate is computed once per run, and every degenerate case
//! (empty point set, zero variance, zero total population) is an explicit
//! `None` in the summary rather than a crash, a NaN, or a zero that could be
//! misread as a measurement.

use crate::domain::{FieldStats, Histogram, Quadrant, RiskRecord};
use crate::sample::JoinDiagnostics;

/// Bin count for the non-zero risk-score histogram.
pub const RISK_HISTOGRAM_BINS: usize = 30;

const MIN_VARIANCE: f64 = 1e-18;

/// All aggregates for one run.
#[derive(Debug, Clone)]
pub struct Summary {
    pub raw_count: usize,
    pub valid_count: usize,

    /// Counts per quadrant, in `Quadrant::ALL` order; the four counts sum to
    /// `valid_count`.
    pub quadrant_counts: Vec<(Quadrant, usize)>,

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

impl Summary {
    pub fn quadrant_count(&self, quadrant: Quadrant) -> usize {
        self.quadrant_counts
            .iter()
            .find(|(q, _)| *q == quadrant)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Pearson correlation coefficient.
///
/// `None` when fewer than two pairs exist or either series has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let x_mean = xs.iter().sum::<f64>() / n as f64;
    let y_mean = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut x_var = 0.0;
    let mut y_var = 0.0;
    for i in 0..n {
        let dx = xs[i] - x_mean;
        let dy = ys[i] - y_mean;
        cov += dx * dy;
        x_var += dx * dx;
        y_var += dy * dy;
    }
    if x_var <= MIN_VARIANCE || y_var <= MIN_VARIANCE {
        return None;
    }
    let r = cov / (x_var * y_var).sqrt();
    r.is_finite().then_some(r)
}

/// Population-weighted mean of an attribute over points with population > 0.
///
/// Zero-population points carry no weight and are excluded outright, so an
/// all-unpopulated sample reports `None` instead of dividing by zero.
pub fn population_weighted_mean(
    records: &[RiskRecord],
    value: impl Fn(&RiskRecord) -> f64,
) -> Option<f64> {
    let mut weight_sum = 0.0;
    let mut weighted = 0.0;
    for r in records.iter().filter(|r| r.point.attrs.pop > 0.0) {
        let w = r.point.attrs.pop;
        weight_sum += w;
        weighted += w * value(r);
    }
    if weight_sum > 0.0 {
        Some(weighted / weight_sum)
    } else {
        None
    }
}

/// Min/max/mean/sample-sd of one attribute; `None` on an empty set, sd
/// absent below two points.
pub fn field_stats(values: &[f64]) -> Option<FieldStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    let mean = sum / n;
    let sd = if values.len() >= 2 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    } else {
        None
    };
    Some(FieldStats { min, max, mean, sd })
}

/// Histogram of the strictly positive risk scores; `None` when no point
/// scored above zero.
pub fn risk_histogram(records: &[RiskRecord], bins: usize) -> Option<Histogram> {
    let scores: Vec<f64> = records
        .iter()
        .map(|r| r.risk_score)
        .filter(|s| *s > 0.0)
        .collect();
    if scores.is_empty() || bins == 0 {
        return None;
    }

    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let mut counts = vec![0usize; bins];
    for s in scores {
        let idx = if span > 0.0 {
            (((s - min) / span) * bins as f64) as usize
        } else {
            0
        };
        counts[idx.min(bins - 1)] += 1;
    }
    Some(Histogram { min, max, counts })
}

/// Compute every aggregate over the valid-point collection.
pub fn summarize(records: &[RiskRecord], diagnostics: JoinDiagnostics) -> Summary {
    let valid_count = records.len();

    let quadrant_counts: Vec<(Quadrant, usize)> = Quadrant::ALL
        .into_iter()
        .map(|q| (q, records.iter().filter(|r| r.quadrant == q).count()))
        .collect();

    let rain: Vec<f64> = records.iter().map(|r| r.point.attrs.rain_trend).collect();
    let ndvi: Vec<f64> = records.iter().map(|r| r.point.attrs.ndvi_trend).collect();
    let built: Vec<f64> = records.iter().map(|r| r.point.attrs.builtup_change).collect();
    let pop: Vec<f64> = records.iter().map(|r| r.point.attrs.pop).collect();

    let aligned: Vec<&RiskRecord> = records
        .iter()
        .filter(|r| r.quadrant == Quadrant::HighRiskAligned)
        .collect();

    let total_population: f64 = pop.iter().sum();
    let aligned_population: f64 = aligned.iter().map(|r| r.point.attrs.pop).sum();

    let percent_aligned = if valid_count > 0 {
        Some(aligned.len() as f64 / valid_count as f64 * 100.0)
    } else {
        None
    };
    let percent_population_exposed = if total_population > 0.0 {
        Some(aligned_population / total_population * 100.0)
    } else {
        None
    };
    let cumulative_risk = if valid_count > 0 {
        Some(records.iter().map(|r| r.risk_score).sum())
    } else {
        None
    };
    let mean_risk_aligned = if !aligned.is_empty() {
        Some(aligned.iter().map(|r| r.risk_score).sum::<f64>() / aligned.len() as f64)
    } else {
        None
    };

    let nonzero_risk_count = records.iter().filter(|r| r.risk_score > 0.0).count();

    Summary {
        raw_count: diagnostics.raw_count,
        valid_count,
        quadrant_counts,
        corr_ndvi_rain: pearson(&ndvi, &rain),
        corr_built_rain: pearson(&built, &rain),
        pop_weighted_rain_mean: population_weighted_mean(records, |r| r.point.attrs.rain_trend),
        pop_weighted_ndvi_mean: population_weighted_mean(records, |r| r.point.attrs.ndvi_trend),
        percent_aligned,
        total_population,
        aligned_population,
        percent_population_exposed,
        cumulative_risk,
        mean_risk_aligned,
        zero_risk_count: valid_count - nonzero_risk_count,
        nonzero_risk_count,
        rain_stats: field_stats(&rain),
        ndvi_stats: field_stats(&ndvi),
        pop_stats: field_stats(&pop),
        built_stats: field_stats(&built),
        risk_histogram: risk_histogram(records, RISK_HISTOGRAM_BINS),
    }
}
