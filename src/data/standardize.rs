// ============================================================
// Layer 4 — Feature Standardisation
// ============================================================
// Per-column z-scoring for tabular features:
//
//   x' = (x - mean) / std
//
// The statistics are fitted ONCE on the training split and then
// frozen; the test split is transformed with the very same
// numbers. Recomputing them on the test data would leak its
// distribution into preprocessing.
//
// std is the population standard deviation (divide by N), which
// is what numpy's `.std(axis=0)` computes. A column with zero
// variance is divided by 1 so it maps to all zeros instead of NaN.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Frozen per-column mean and standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f32>,
    pub std:  Vec<f32>,
}

impl Standardizer {
    /// Compute column statistics from an [N, F] training matrix.
    /// With no rows the result is the identity (mean 0, std 1).
    pub fn fit(x: &Array2<f64>) -> Self {
        let width = x.ncols();
        let Some(mean) = x.mean_axis(Axis(0)) else {
            return Self { mean: vec![0.0; width], std: vec![1.0; width] };
        };
        let std: Array1<f64> = x
            .std_axis(Axis(0), 0.0)
            .mapv(|sd| if sd > 0.0 { sd } else { 1.0 });

        Self {
            mean: mean.iter().map(|&m| m as f32).collect(),
            std:  std.iter().map(|&s| s as f32).collect(),
        }
    }

    pub fn transform_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&v, (&m, &s))| (v - m) / s)
            .collect()
    }
}
