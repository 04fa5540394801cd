//! Feature extraction: differencing, trailing moving-average smoothing, and
//! lag embedding, applied in that order to a packed sample window.

use crate::error::Outcome;

/// A `rows × dim` matrix of feature vectors, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
    pub dim: usize,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The three preprocessing parameters, fixed for a dimension's lifetime by
/// config.
#[derive(Debug, Clone, Copy)]
pub struct FeaturePipeline {
    pub diff_n: usize,
    pub smooth_n: usize,
    pub lag_n: usize,
}

impl FeaturePipeline {
    pub fn new(diff_n: usize, smooth_n: usize, lag_n: usize) -> Self {
        Self {
            diff_n,
            smooth_n: smooth_n.max(1),
            lag_n,
        }
    }

    /// Minimum sample-window length this pipeline can preprocess.
    pub fn min_samples(&self) -> usize {
        self.diff_n + self.smooth_n + self.lag_n
    }

    /// Transform `m` real values into a `(m - diff_n - (smooth_n-1) -
    /// lag_n) × (lag_n+1)` feature matrix.
    pub fn transform(&self, xs: &[f64]) -> Result<FeatureMatrix, Outcome> {
        let m = xs.len();
        let diff_n = self.diff_n;
        let smooth_n = self.smooth_n;
        let lag_n = self.lag_n;

        let m1 = m as i64 - diff_n as i64;
        if m1 <= 0 {
            return Err(Outcome::MissingData);
        }
        let m2 = m1 - (smooth_n as i64 - 1);
        if m2 <= 0 {
            return Err(Outcome::MissingData);
        }
        let m3 = m2 - lag_n as i64;
        if m3 <= 0 {
            return Err(Outcome::MissingData);
        }
        let rows_out = m3 as usize;

        // Differencing: diffed[k] = x[k] - x[k-diff_n], valid for k in
        // [diff_n, m).
        let mut diffed = vec![0.0f64; m];
        for k in diff_n..m {
            diffed[k] = xs[k] - xs[k - diff_n];
        }

        // Smoothing: centered trailing moving average of width smooth_n,
        // valid for p in [diff_n+smooth_n-1, m). Incremental accumulator:
        // O(m) total, not O(m*smooth_n).
        let start_p = diff_n + smooth_n - 1;
        let mut smoothed = vec![0.0f64; m];
        let mut window_sum: f64 = diffed[diff_n..diff_n + smooth_n].iter().sum();
        smoothed[start_p] = window_sum / smooth_n as f64;
        for p in (start_p + 1)..m {
            window_sum += diffed[p] - diffed[p - smooth_n];
            smoothed[p] = window_sum / smooth_n as f64;
        }

        // Lag embedding: row t uses smoothed positions [i_final-lag_n, i_final].
        let dim = lag_n + 1;
        let first_i_final = start_p + lag_n;
        let mut rows = Vec::with_capacity(rows_out);
        for t in 0..rows_out {
            let i_final = first_i_final + t;
            let mut row = Vec::with_capacity(dim);
            for j in 0..=lag_n {
                row.push(smoothed[i_final - j]);
            }
            rows.push(row);
        }

        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Outcome::MissingData);
        }

        Ok(FeatureMatrix { rows, dim })
    }
}
