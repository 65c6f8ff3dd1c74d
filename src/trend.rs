//! Linear trend fitting.

/// A fitted straight line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Closed-form ordinary least squares fit of `y` against `x` over the pairs where `y` is
    /// finite.
    ///
    /// Returns `None` if fewer than two finite samples exist or all samples share one `x`.
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        let samples: Vec<(f64, f64)> = x
            .iter()
            .zip(y)
            .filter(|(_, y)| y.is_finite())
            .map(|(x, y)| (*x, *y))
            .collect();
        if samples.len() < 2 {
            return None;
        }
        let n = samples.len() as f64;
        let x_mean = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
        let y_mean = samples.iter().map(|(_, y)| y).sum::<f64>() / n;
        let (sxy, sxx) = samples.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a trend over a time window and evaluate it at every time index of the window.
///
/// Time ordinals are the independent variable. Missing values are excluded from the fit but
/// still receive a fitted value. With fewer than two finite values every output is `None`.
pub fn fit_trend(times: &[i64], values: &[Option<f64>]) -> Vec<Option<f64>> {
    let x: Vec<f64> = times.iter().map(|t| *t as f64).collect();
    let y: Vec<f64> = values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    match LinearFit::fit(&x, &y) {
        Some(fit) => x.iter().map(|x| Some(fit.evaluate(*x))).collect(),
        None => vec![None; times.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: f64, actual: Option<f64>) {
        let actual = actual.unwrap();
        assert!(
            (expected - actual).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn fit_exact_line() {
        let fit = LinearFit::fit(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fit_least_squares() {
        let fit = LinearFit::fit(&[0.0, 1.0, 2.0, 3.0], &[0.5, 0.5, 2.5, 2.5]).unwrap();
        assert!((fit.slope - 0.8).abs() < 1e-12);
        assert!((fit.intercept - 0.3).abs() < 1e-12);
    }

    #[test]
    fn fit_requires_two_samples() {
        assert_eq!(None, LinearFit::fit(&[], &[]));
        assert_eq!(None, LinearFit::fit(&[1.0, 2.0], &[1.0, f64::NAN]));
    }

    #[test]
    fn fit_degenerate_x() {
        assert_eq!(None, LinearFit::fit(&[1.0, 1.0], &[1.0, 2.0]));
    }

    #[test]
    fn trend_all_missing() {
        let trend = fit_trend(&[3, 4, 5], &[None, None, None]);
        assert_eq!(vec![None, None, None], trend);
    }

    #[test]
    fn trend_single_finite_point() {
        let trend = fit_trend(&[3, 4, 5], &[None, Some(1.0), None]);
        assert_eq!(vec![None, None, None], trend);
    }

    #[test]
    fn trend_two_points_pass_through_both() {
        let times = [3, 4, 5, 6];
        let trend = fit_trend(&times, &[Some(2.0), None, None, Some(8.0)]);
        assert_close(2.0, trend[0]);
        assert_close(4.0, trend[1]);
        assert_close(6.0, trend[2]);
        assert_close(8.0, trend[3]);
    }

    #[test]
    fn trend_fills_missing_positions() {
        let trend = fit_trend(&[0, 1, 2, 3, 4], &[Some(0.0), None, Some(2.0), None, Some(4.0)]);
        assert!(trend.iter().all(Option::is_some));
        assert_close(1.0, trend[1]);
        assert_close(3.0, trend[3]);
    }

    #[test]
    fn trend_is_deterministic() {
        let times: Vec<i64> = (0..12).collect();
        let values: Vec<Option<f64>> = times.iter().map(|t| Some((*t as f64).sin())).collect();
        assert_eq!(fit_trend(&times, &values), fit_trend(&times, &values));
    }
}
