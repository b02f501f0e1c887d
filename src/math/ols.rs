//! Least squares for per-cell trend fitting.
//!
//! Every grid cell gets its own tiny regression of observed value against
//! time in fractional years:
//!
//! ```text
//! minimize Σ (v_i - (a + b·t_i))^2
//! ```
//!
//! Implementation choices:
//! - Times are centered on their mean before the solve. Calendar years make
//!   the raw `[1, t]` design poorly conditioned (columns of magnitude 1 vs
//!   ~2000); centering removes that without changing the slope.
//! - The 2-column system is solved by SVD, which stays robust when the time
//!   spread is small relative to its magnitude.
//! - Cells with fewer than 2 observations, or with no time variance, have no
//!   defined slope and report `None`; the caller records no-data.

use nalgebra::{DMatrix, DVector};

/// Minimum time variance (Σ(t−t̄)²) for a slope to be considered defined.
const MIN_TIME_VARIANCE: f64 = 1e-12;

/// Slope and intercept of a fitted line `v = intercept + slope·t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `v = intercept + slope·t` by ordinary least squares.
///
/// `times` and `values` must be the same length; pairs with a non-finite
/// entry are ignored. Returns `None` when fewer than two usable pairs remain
/// or the usable times carry no variance.
pub fn linear_trend(times: &[f64], values: &[f64]) -> Option<LinearTrend> {
    debug_assert_eq!(times.len(), values.len());

    let pairs: Vec<(f64, f64)> = times
        .iter()
        .zip(values.iter())
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(&t, &v)| (t, v))
        .collect();

    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let t_mean = pairs.iter().map(|(t, _)| t).sum::<f64>() / n as f64;
    let t_var: f64 = pairs.iter().map(|(t, _)| (t - t_mean).powi(2)).sum();
    if t_var <= MIN_TIME_VARIANCE {
        return None;
    }

    let mut x = DMatrix::<f64>::zeros(n, 2);
    let mut y = DVector::<f64>::zeros(n);
    for (i, &(t, v)) in pairs.iter().enumerate() {
        x[(i, 0)] = 1.0;
        x[(i, 1)] = t - t_mean;
        y[i] = v;
    }

    let beta = solve_least_squares(&x, &y)?;
    let slope = beta[1];
    // beta[0] is the value at t = t̄; shift back to the t = 0 intercept.
    let intercept = beta[0] - slope * t_mean;
    if slope.is_finite() && intercept.is_finite() {
        Some(LinearTrend { slope, intercept })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Closed-form OLS slope, computed independently of the solver.
    fn closed_form_slope(times: &[f64], values: &[f64]) -> f64 {
        let n = times.len() as f64;
        let t_mean = times.iter().sum::<f64>() / n;
        let v_mean = values.iter().sum::<f64>() / n;
        let num: f64 = times
            .iter()
            .zip(values)
            .map(|(t, v)| (t - t_mean) * (v - v_mean))
            .sum();
        let den: f64 = times.iter().map(|t| (t - t_mean).powi(2)).sum();
        num / den
    }

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit v = 2 + 3t on t = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn noiseless_linear_series_recovers_exact_slope() {
        // Calendar-year times, the regime every rainfall cell sees.
        let times: Vec<f64> = (2000..=2020).map(|y| y as f64).collect();
        let values: Vec<f64> = times.iter().map(|t| 4.2 + 0.37 * (t - 2000.0)).collect();

        let fit = linear_trend(&times, &values).unwrap();
        assert!((fit.slope - 0.37).abs() < 1e-9, "slope {}", fit.slope);
        assert!(
            (fit.intercept - (4.2 - 0.37 * 2000.0)).abs() < 1e-6,
            "intercept {}",
            fit.intercept
        );
    }

    #[test]
    fn slope_matches_closed_form_on_noisy_series() {
        let times: Vec<f64> = (0..14).map(|i| 2005.0 + i as f64 * 0.6).collect();
        // Deterministic pseudo-noise; no RNG needed for the comparison.
        let values: Vec<f64> = times
            .iter()
            .enumerate()
            .map(|(i, t)| 1.5 - 0.08 * t + ((i * 7919) % 13) as f64 * 0.01)
            .collect();

        let fit = linear_trend(&times, &values).unwrap();
        let expected = closed_form_slope(&times, &values);
        assert!((fit.slope - expected).abs() < 1e-9);
    }

    #[test]
    fn fractional_year_times_are_fit_jointly() {
        // Sub-annual composites: several observations per year, one fit.
        let times: Vec<f64> = (0..46).map(|i| 2018.0 + i as f64 * (16.0 / 365.0)).collect();
        let values: Vec<f64> = times.iter().map(|t| 0.8 - 0.004 * (t - 2018.0)).collect();
        let fit = linear_trend(&times, &values).unwrap();
        assert!((fit.slope + 0.004).abs() < 1e-9);
    }

    #[test]
    fn underdetermined_and_degenerate_inputs_are_none() {
        assert!(linear_trend(&[], &[]).is_none());
        assert!(linear_trend(&[2010.0], &[1.0]).is_none());
        // Two observations at the same instant: no time variance.
        assert!(linear_trend(&[2010.0, 2010.0], &[1.0, 2.0]).is_none());
        // Non-finite pairs are dropped before the count check.
        assert!(linear_trend(&[2010.0, f64::NAN], &[1.0, 2.0]).is_none());
    }
}
