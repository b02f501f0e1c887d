//! Numerical routines shared by the trend estimator.

pub mod ols;

pub use ols::{LinearTrend, linear_trend, solve_least_squares};
