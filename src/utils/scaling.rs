use serde::{Deserialize, Serialize};

/// Z-score normalization statistics for feature columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    /// The mean of each column
    pub mean: Vec<f32>,

    /// The unbiased standard deviation of each column
    pub std: Vec<f32>,
}

impl FeatureScaler {
    /// Compute column statistics over all rows.
    ///
    /// Columns with zero (or, for a single row, undefined) spread get a standard deviation of
    /// one, leaving them centered but unscaled.
    pub fn fit(rows: &[Vec<f32>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len() as f64;

        let mut mean = vec![0f64; width];
        for row in rows {
            for (sum, value) in mean.iter_mut().zip(row) {
                *sum += *value as f64;
            }
        }
        for value in mean.iter_mut() {
            *value /= n.max(1.0);
        }

        let mut variance = vec![0f64; width];
        for row in rows {
            for ((sum, value), mean) in variance.iter_mut().zip(row).zip(&mean) {
                let delta = *value as f64 - mean;
                *sum += delta * delta;
            }
        }

        let std = variance
            .into_iter()
            .map(|sum| {
                let std = if rows.len() > 1 {
                    (sum / (n - 1.0)).sqrt()
                } else {
                    0.0
                };

                if std > 0.0 && std.is_finite() {
                    std as f32
                } else {
                    1.0
                }
            })
            .collect();

        Self {
            mean: mean.into_iter().map(|value| value as f32).collect(),
            std,
        }
    }

    /// The number of columns the scaler was fitted on
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Normalize a single row
    pub fn transform_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(value, (mean, std))| (value - mean) / std)
            .collect()
    }

    /// Normalize every row
    pub fn transform(&self, rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
