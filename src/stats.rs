//! Average-time statistics over measurement samples.
//!
//! The error margin is the half-width of a 99.9% Student-t confidence interval
//! around the mean, which is what average-time reports conventionally print
//! next to the score.

use std::time::Duration;

/// Two-sided 99.9% Student-t critical values for 1..=30 degrees of freedom.
const T_999: [f64; 30] = [
    636.619, 31.599, 12.924, 8.610, 6.869, 5.959, 5.408, 5.041, 4.781, 4.587, 4.437, 4.318,
    4.221, 4.140, 4.073, 4.015, 3.965, 3.922, 3.883, 3.850, 3.819, 3.792, 3.768, 3.745, 3.725,
    3.707, 3.690, 3.674, 3.659, 3.646,
];

/// Critical values beyond the table, keyed by degrees of freedom.
const T_999_TAIL: [(f64, f64); 4] = [(30.0, 3.646), (40.0, 3.551), (60.0, 3.460), (120.0, 3.373)];

const Z_999: f64 = 3.291;

/// Critical t value for a two-sided 99.9% interval.
pub fn t_critical_999(degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 {
        return f64::NAN;
    }
    if degrees_of_freedom <= T_999.len() {
        return T_999[degrees_of_freedom - 1];
    }
    // Interpolate linearly in 1/df between tabulated points, with the normal
    // quantile as the limit.
    let df = degrees_of_freedom as f64;
    let mut points = T_999_TAIL.to_vec();
    points.push((f64::INFINITY, Z_999));
    for pair in points.windows(2) {
        let (lo_df, lo_t) = pair[0];
        let (hi_df, hi_t) = pair[1];
        if df <= hi_df {
            let x = 1.0 / df;
            let x_lo = 1.0 / lo_df;
            let x_hi = if hi_df.is_infinite() { 0.0 } else { 1.0 / hi_df };
            return hi_t + (lo_t - hi_t) * (x - x_hi) / (x_lo - x_hi);
        }
    }
    Z_999
}

/// Summary of a set of millisecond samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub samples: Vec<f64>,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    /// `None` when there are fewer than two samples.
    pub error: Option<f64>,
}

impl Statistics {
    pub fn from_durations(durations: &[Duration]) -> Self {
        let ms: Vec<f64> = durations.iter().map(|d| duration_ms(*d)).collect();
        Self::from_samples(ms)
    }

    pub fn from_samples(samples: Vec<f64>) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                samples,
                mean: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                std_dev: f64::NAN,
                error: None,
            };
        }

        let mean = samples.iter().sum::<f64>() / n as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let (std_dev, error) = if n > 1 {
            let variance =
                samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            let sd = variance.sqrt();
            (sd, Some(t_critical_999(n - 1) * sd / (n as f64).sqrt()))
        } else {
            (0.0, None)
        };

        Self {
            samples,
            mean,
            min,
            max,
            std_dev,
            error,
        }
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// `(mean - error, mean + error)`, or `None` without an error margin.
    pub fn confidence_interval(&self) -> Option<(f64, f64)> {
        self.error.map(|e| (self.mean - e, self.mean + e))
    }
}

pub fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}
