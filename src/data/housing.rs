// ============================================================
// Layer 4 — Housing Price Data
// ============================================================
// Loads the Boston housing table (506 rows × 13 features, target
// = median home value in $1000s) from the same .npz archive the
// Keras `boston_housing` loader uses.
//
// The archive holds two numpy arrays written with np.savez:
//   x.npy — float64 [506, 13]
//   y.npy — float64 [506]
//
// Default split: shuffle once with a fixed seed (113), first 80%
// for training (404 rows), the rest for testing (102 rows). The
// shuffle reproduces numpy's RandomState, so the rows in each half
// are the ones `boston_housing.load_data()` returns.
//
// Reference: ndarray-npy documentation (NpzReader)

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};
use ndarray_npy::NpzReader;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};

use crate::data::splitter::shuffle_split;
use crate::infra::download::fetch_cached;

pub const HOUSING_URL: &str =
    "https://storage.googleapis.com/tensorflow/tf-keras-datasets/boston_housing.npz";
pub const HOUSING_FILE: &str = "boston_housing.npz";
pub const HOUSING_SEED: u32 = 113;
pub const HOUSING_TEST_FRACTION: f64 = 0.2;

/// One row of the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingSample {
    pub features: Vec<f32>,
    pub target:   f32,
}

/// Train/test halves of the table
#[derive(Debug, Clone)]
pub struct HousingSplit {
    pub train: Vec<HousingSample>,
    pub test:  Vec<HousingSample>,
}

/// Download (once) and load the housing table, then split it.
pub fn load_housing(data_dir: &Path) -> Result<HousingSplit> {
    let path = fetch_cached(HOUSING_URL, &data_dir.join(HOUSING_FILE))?;
    let rows = read_npz(&path)?;
    tracing::info!("Loaded {} housing rows from '{}'", rows.len(), path.display());
    Ok(split_housing(rows, HOUSING_TEST_FRACTION, HOUSING_SEED))
}

/// Parse the x/y arrays out of the archive into row samples.
pub fn read_npz(path: &Path) -> Result<Vec<HousingSample>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    let mut npz = NpzReader::new(file)
        .with_context(|| format!("'{}' is not a valid .npz archive", path.display()))?;

    let x: Array2<f64> = npz.by_name("x.npy").context("Missing array 'x' in housing archive")?;
    let y: Array1<f64> = npz.by_name("y.npy").context("Missing array 'y' in housing archive")?;
    rows_from_arrays(&x, &y)
}

fn rows_from_arrays(x: &Array2<f64>, y: &Array1<f64>) -> Result<Vec<HousingSample>> {
    if x.nrows() != y.len() {
        bail!("Housing arrays disagree: {} feature rows vs {} targets", x.nrows(), y.len());
    }
    Ok(x.outer_iter()
        .zip(y.iter())
        .map(|(row, &target)| HousingSample {
            features: row.iter().map(|&v| v as f32).collect(),
            target:   target as f32,
        })
        .collect())
}

/// Stack row features into an [N, F] matrix
pub fn feature_matrix(rows: &[HousingSample]) -> Array2<f64> {
    let width = rows.first().map_or(0, |r| r.features.len());
    Array2::from_shape_fn((rows.len(), width), |(r, c)| rows[r].features[c] as f64)
}

/// Seeded shuffle then split off the trailing `test_fraction` as test data.
pub fn split_housing(rows: Vec<HousingSample>, test_fraction: f64, seed: u32) -> HousingSplit {
    let (train, test) = shuffle_split(rows, 1.0 - test_fraction, seed);
    HousingSplit { train, test }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};

    #[test]
    fn test_rows_from_arrays() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![10.0, 20.0];
        let rows = rows_from_arrays(&x, &y).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].features, vec![3.0, 4.0]);
        assert_eq!(rows[1].target, 20.0);
    }

    #[test]
    fn test_mismatched_arrays_rejected() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![10.0];
        assert!(rows_from_arrays(&x, &y).is_err());
    }

    #[test]
    fn test_default_split_sizes() {
        let x = Array::from_shape_fn((506, 13), |(r, c)| (r * 13 + c) as f64);
        let y = Array::from_shape_fn(506, |r| r as f64);
        let rows  = rows_from_arrays(&x, &y).unwrap();
        let split = split_housing(rows, HOUSING_TEST_FRACTION, HOUSING_SEED);
        assert_eq!(split.train.len(), 404);
        assert_eq!(split.test.len(), 102);
        // Same rows, in the same order, as Keras' loader
        assert_eq!(split.train[0].target, 22.0);
        assert_eq!(split.train[1].target, 202.0);
        assert_eq!(split.test[101].target, 165.0);
    }

    #[test]
    fn test_feature_matrix_layout() {
        let rows = vec![
            HousingSample { features: vec![1.0, 2.0], target: 0.0 },
            HousingSample { features: vec![3.0, 4.0], target: 0.0 },
            HousingSample { features: vec![5.0, 6.0], target: 0.0 },
        ];
        let x = feature_matrix(&rows);
        assert_eq!(x.dim(), (3, 2));
        assert_eq!(x[[2, 1]], 6.0);
        assert_eq!(feature_matrix(&[]).dim(), (0, 0));
    }

    #[test]
    fn test_split_is_reproducible() {
        let rows: Vec<HousingSample> = (0..20)
            .map(|i| HousingSample { features: vec![i as f32], target: i as f32 })
            .collect();
        let a = split_housing(rows.clone(), 0.2, 7);
        let b = split_housing(rows, 0.2, 7);
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }
}
