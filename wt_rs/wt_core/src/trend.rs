//! Closed-form least-squares line fitting.
//!
//! [`fit`] treats every sample as one step apart (sample index `0..n`), which
//! is how rates have always been reported. [`fit_calendar`] spaces samples by
//! the days elapsed between their dates instead.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{WtError, WtResult};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrendFit {
    /// Rate of change per x-unit (sample step or day).
    pub slope: f64,
    pub intercept: f64,
}

impl TrendFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit `y = slope * i + intercept` over `(i, column[i])`.
pub fn fit(column: &[f64]) -> WtResult<TrendFit> {
    let n = column.len();
    match n {
        0 => return Err(WtError::EmptyInput { field: None }),
        1 => {
            return Ok(TrendFit {
                slope: 0.0,
                intercept: column[0],
            })
        }
        _ => {}
    }

    let nf = n as f64;
    let s0x = nf;
    let s1x = nf * (nf - 1.0) / 2.0;
    let s2x = nf * (nf - 1.0) * (2.0 * nf - 1.0) / 6.0;
    let s0y: f64 = column.iter().sum();
    let s1y: f64 = column
        .iter()
        .enumerate()
        .map(|(i, y)| i as f64 * y)
        .sum();

    let denom = s0x * s2x - s1x * s1x;
    Ok(TrendFit {
        slope: (s0x * s1y - s1x * s0y) / denom,
        intercept: (s0y * s2x - s1y * s1x) / denom,
    })
}

/// Least squares over explicit `(x, y)` points.
///
/// When every `x` is identical the line is flat through the mean of `y`.
pub fn fit_points(points: &[(f64, f64)]) -> WtResult<TrendFit> {
    if points.is_empty() {
        return Err(WtError::EmptyInput { field: None });
    }
    let n = points.len() as f64;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for &(x, y) in points {
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }
    let denom = n * sxx - sx * sx;
    if denom.abs() <= f64::EPSILON * n * sxx.max(1.0) {
        return Ok(TrendFit {
            slope: 0.0,
            intercept: sy / n,
        });
    }
    Ok(TrendFit {
        slope: (n * sxy - sx * sy) / denom,
        intercept: (sy * sxx - sxy * sx) / denom,
    })
}

/// Fit over days elapsed since the first sample's date.
pub fn fit_calendar(points: &[(NaiveDate, f64)]) -> WtResult<TrendFit> {
    let Some(&(origin, _)) = points.first() else {
        return Err(WtError::EmptyInput { field: None });
    };
    let xy: Vec<(f64, f64)> = points
        .iter()
        .map(|&(date, y)| ((date - origin).num_days() as f64, y))
        .collect();
    fit_points(&xy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn empty_column_is_rejected() {
        assert!(matches!(fit(&[]), Err(WtError::EmptyInput { .. })));
        assert!(matches!(fit_points(&[]), Err(WtError::EmptyInput { .. })));
        assert!(matches!(fit_calendar(&[]), Err(WtError::EmptyInput { .. })));
    }

    #[test]
    fn single_sample_is_flat() {
        let lf = fit(&[72.4]).unwrap();
        assert_eq!(lf.slope, 0.0);
        assert_eq!(lf.intercept, 72.4);
    }

    #[test]
    fn arithmetic_progression() {
        let lf = fit(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((lf.slope - 1.0).abs() < EPS);
        assert!((lf.intercept - 1.0).abs() < EPS);
    }

    #[test]
    fn downward_weight_trend() {
        let weights = [70.0, 70.2, 70.1, 69.9, 69.8, 69.7, 69.5];
        let lf = fit(&weights).unwrap();
        assert!(lf.slope < 0.0);
        assert!((lf.slope + 0.1).abs() < EPS);
        assert!((lf.evaluate(3.0) - 69.885_714_285_714_29).abs() < 1e-6);
    }

    #[test]
    fn repeated_fit_is_bit_identical() {
        let data = [80.1, 79.7, 79.9, 79.2, 78.8];
        let a = fit(&data).unwrap();
        let b = fit(&data).unwrap();
        assert_eq!(a.slope.to_bits(), b.slope.to_bits());
        assert_eq!(a.intercept.to_bits(), b.intercept.to_bits());
    }

    #[test]
    fn explicit_points_match_index_fit() {
        let data = [3.0, 5.5, 6.0, 9.5];
        let points: Vec<(f64, f64)> = data
            .iter()
            .enumerate()
            .map(|(i, &y)| (i as f64, y))
            .collect();
        let by_index = fit(&data).unwrap();
        let by_points = fit_points(&points).unwrap();
        assert!((by_index.slope - by_points.slope).abs() < EPS);
        assert!((by_index.intercept - by_points.intercept).abs() < EPS);
    }

    #[test]
    fn identical_abscissae_fall_back_to_mean() {
        let lf = fit_points(&[(2.0, 1.0), (2.0, 3.0)]).unwrap();
        assert_eq!(lf.slope, 0.0);
        assert!((lf.intercept - 2.0).abs() < EPS);
    }

    #[test]
    fn calendar_fit_uses_elapsed_days() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        // One sample per step, but the last one arrives after a nine-day gap.
        let points = [(d(1), 70.0), (d(2), 69.9), (d(11), 69.0)];
        let by_day = fit_calendar(&points).unwrap();
        assert!((by_day.slope + 0.1).abs() < 1e-6);
        assert!((by_day.intercept - 70.0).abs() < 1e-6);

        let by_step = fit(&[70.0, 69.9, 69.0]).unwrap();
        assert!(by_step.slope < by_day.slope);
    }
}
