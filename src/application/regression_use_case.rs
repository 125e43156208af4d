// ============================================================
// Layer 2 — RegressionUseCase
// ============================================================
// Trains the housing-price MLP from scratch and reports test MAE:
//
//   Step 1: Load and split the housing table   (Layer 4 - data)
//   Step 2: Standardise with train statistics  (Layer 4 - data)
//   Step 3: Hold out the last 20% of train     (Layer 4 - data)
//   Step 4: Build loaders                      (Layer 4 - data)
//   Step 5: Save config, open metrics.csv      (Layer 6 - infra)
//   Step 6: Fit with RMSprop                   (Layer 5 - ml)
//   Step 7: Evaluate and predict on test       (Layer 5 - ml)
//   Step 8: Plot curves                        (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{batcher::Batcher, DataLoaderBuilder},
    module::AutodiffModule,
    optim::RmsPropConfig,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    batcher::HousingBatcher,
    dataset::HousingDataset,
    housing::{feature_matrix, load_housing, HousingSample, HousingSplit},
    splitter::split_validation,
    standardize::Standardizer,
};
use crate::domain::training_history::TrainingHistory;
use crate::infra::{
    artifacts::RunArtifacts,
    plots::{plot_curves, Series},
};
use crate::ml::{
    backend::{BackendType, CpuTrainBackend, GpuTrainBackend},
    regressor::HousingRegressorConfig,
    trainer::{evaluate, fit, FitConfig},
};

/// Number of test rows whose prediction is reported
pub const PREVIEW_COUNT: usize = 5;

// ─── Regression Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressConfig {
    pub data_dir:         String,
    pub output_dir:       String,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub learning_rate:    f64,
    pub validation_split: f64,
    pub seed:             u64,
    pub backend:          BackendType,
}

impl Default for RegressConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data".to_string(),
            output_dir:       "runs/regression".to_string(),
            epochs:           100,
            batch_size:       16,
            learning_rate:    1e-3,
            validation_split: 0.2,
            seed:             42,
            backend:          BackendType::Wgpu,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegressionReport {
    pub test_loss:   f64,
    pub test_mae:    f64,
    /// (predicted, actual) for the first test rows
    pub predictions: Vec<(f32, f32)>,
    pub history:     TrainingHistory,
}

pub struct RegressionUseCase {
    config: RegressConfig,
}

impl RegressionUseCase {
    pub fn new(config: RegressConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<RegressionReport> {
        tracing::info!("Training housing regressor on the {} backend", self.config.backend);

        let split = load_housing(Path::new(&self.config.data_dir))?;

        match self.config.backend {
            BackendType::NdArray => run_pipeline::<CpuTrainBackend>(&self.config, split, Default::default()),
            BackendType::Wgpu    => run_pipeline::<GpuTrainBackend>(&self.config, split, Default::default()),
        }
    }
}

/// Apply frozen statistics to every row
fn standardize_rows(scaler: &Standardizer, rows: Vec<HousingSample>) -> Vec<HousingSample> {
    rows.into_iter()
        .map(|r| HousingSample { features: scaler.transform_row(&r.features), target: r.target })
        .collect()
}

/// Steps 2–8 on an already loaded train/test split
pub fn run_pipeline<B: AutodiffBackend>(
    cfg:    &RegressConfig,
    split:  HousingSplit,
    device: B::Device,
) -> Result<RegressionReport> {
    let HousingSplit { train, test } = split;
    let Some(num_features) = train.first().map(|r| r.features.len()) else {
        bail!("Housing training split is empty");
    };

    // ── Step 2: Standardise (statistics from train only) ──────────────────────
    let scaler = Standardizer::fit(&feature_matrix(&train));
    let train  = standardize_rows(&scaler, train);
    let test   = standardize_rows(&scaler, test);

    // ── Step 3: Validation split (tail, unshuffled) ───────────────────────────
    let (train, valid) = split_validation(train, cfg.validation_split);
    tracing::info!(
        "Split: {} train, {} validation, {} test",
        train.len(), valid.len(), test.len()
    );
    let preview: Vec<HousingSample> = test.iter().take(PREVIEW_COUNT).cloned().collect();

    // ── Step 4: Loaders ───────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(HousingBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(HousingDataset::new(train));

    let valid_loader = DataLoaderBuilder::new(HousingBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(HousingDataset::new(valid));

    let test_loader = DataLoaderBuilder::new(HousingBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(HousingDataset::new(test));

    // ── Step 5: Run directory ─────────────────────────────────────────────────
    let artifacts = RunArtifacts::create(&cfg.output_dir)?;
    artifacts.save_config(cfg)?;
    let logger = artifacts.metrics_logger("mae")?;

    // ── Step 6: Fit ───────────────────────────────────────────────────────────
    let model     = HousingRegressorConfig::new(num_features).init::<B>(&device);
    let mut optim = RmsPropConfig::new().with_alpha(0.9).with_epsilon(1e-7).init();
    let fit_cfg   = FitConfig { epochs: cfg.epochs, learning_rate: cfg.learning_rate };

    let (model, history) =
        fit::<B, _, _, _, _>(model, &mut optim, &fit_cfg, train_loader, valid_loader, "mae", Some(&logger))?;

    // ── Step 7: Evaluate and predict ──────────────────────────────────────────
    let model = model.valid();
    let (test_loss, test_mae) = evaluate::<B::InnerBackend, _, _>(&model, test_loader);

    let predictions: Vec<(f32, f32)> = if preview.is_empty() {
        Vec::new()
    } else {
        let batch = HousingBatcher::<B::InnerBackend>::new(device).batch(preview.clone());
        model.predict(batch.features)
            .into_iter()
            .zip(preview.iter().map(|r| r.target))
            .collect()
    };

    // ── Step 8: Plots ─────────────────────────────────────────────────────────
    let (loss, val_loss) = (history.loss(), history.val_loss());
    let (mae, val_mae)   = (history.metric(), history.val_metric());
    plot_curves(
        &artifacts.path("loss.svg"),
        "Training and validation loss",
        "mse",
        &[Series { label: "Train Loss", values: &loss }, Series { label: "Val Loss", values: &val_loss }],
    )?;
    plot_curves(
        &artifacts.path("mae.svg"),
        "Training and validation MAE",
        "mae",
        &[Series { label: "Train MAE", values: &mae }, Series { label: "Val MAE", values: &val_mae }],
    )?;
    tracing::info!("Wrote plots and metrics to '{}'", artifacts.dir().display());

    Ok(RegressionReport { test_loss, test_mae, predictions, history })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::housing::split_housing;

    fn synthetic(n: usize) -> Vec<HousingSample> {
        // Features on very different scales, target linear in them
        (0..n)
            .map(|i| {
                let a = (i % 9) as f32;
                let b = 100.0 + (i % 4) as f32 * 50.0;
                HousingSample { features: vec![a, b, 1.0], target: 3.0 * a + b / 50.0 }
            })
            .collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = RegressConfig::default();
        assert_eq!((cfg.epochs, cfg.batch_size), (100, 16));
        assert!((cfg.validation_split - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_standardize_rows_keeps_targets() {
        let rows = synthetic(12);
        let scaler = Standardizer::fit(&feature_matrix(&rows));
        let out = standardize_rows(&scaler, rows.clone());
        assert_eq!(out.len(), rows.len());
        for (a, b) in out.iter().zip(&rows) {
            assert_eq!(a.target, b.target);
            assert_eq!(a.features[2], 0.0); // constant column
        }
    }

    #[test]
    fn test_pipeline_on_synthetic_table() {
        let dir = std::env::temp_dir().join("ai_demos_regression_test");
        let cfg = RegressConfig {
            output_dir: dir.to_string_lossy().into_owned(),
            epochs:     3,
            backend:    BackendType::NdArray,
            ..RegressConfig::default()
        };
        let split = split_housing(synthetic(50), 0.2, 113);

        let report = run_pipeline::<CpuTrainBackend>(&cfg, split, Default::default()).unwrap();

        assert_eq!(report.history.epochs.len(), 3);
        assert!(report.test_mae.is_finite() && report.test_mae >= 0.0);
        assert_eq!(report.predictions.len(), PREVIEW_COUNT);
        for file in ["run_config.json", "metrics.csv", "loss.svg", "mae.svg"] {
            assert!(dir.join(file).exists(), "{file} missing");
        }
    }

    #[test]
    fn test_empty_training_split_is_an_error() {
        let split = HousingSplit { train: Vec::new(), test: synthetic(3) };
        assert!(run_pipeline::<CpuTrainBackend>(&RegressConfig::default(), split, Default::default()).is_err());
    }
}
