// ============================================================
// Layer 2 — ClassificationUseCase
// ============================================================
// Trains the digit CNN from scratch and reports test accuracy:
//
//   Step 1: Load MNIST train/test            (Layer 4 - data)
//   Step 2: Hold out the last 20% of train   (Layer 4 - data)
//   Step 3: Build loaders                    (Layer 4 - data)
//   Step 4: Save config, open metrics.csv    (Layer 6 - infra)
//   Step 5: Fit with Adam                    (Layer 5 - ml)
//   Step 6: Evaluate on the test split       (Layer 5 - ml)
//   Step 7: Predict the first test digits    (Layer 5 - ml)
//   Step 8: Plot curves and predictions      (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    data::dataloader::{batcher::Batcher, DataLoaderBuilder},
    module::AutodiffModule,
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::DigitBatcher,
    dataset::DigitDataset,
    digits::{load_digits, DigitSample, DigitSplit},
    splitter::split_validation,
};
use crate::domain::training_history::TrainingHistory;
use crate::infra::{
    artifacts::RunArtifacts,
    plots::{plot_curves, plot_digit_grid, DigitPanel, Series},
};
use crate::ml::{
    backend::{BackendType, CpuTrainBackend, GpuTrainBackend},
    classifier::DigitClassifierConfig,
    trainer::{evaluate, fit, FitConfig},
};

/// Number of test digits shown in predictions.svg
pub const PREVIEW_COUNT: usize = 10;

// ─── Classification Configuration ────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    pub output_dir:       String,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub learning_rate:    f64,
    pub validation_split: f64,
    pub seed:             u64,
    pub backend:          BackendType,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            output_dir:       "runs/classification".to_string(),
            epochs:           10,
            batch_size:       128,
            learning_rate:    1e-3,
            validation_split: 0.2,
            seed:             42,
            backend:          BackendType::Wgpu,
        }
    }
}

/// What a finished run reports back to the CLI
#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub test_loss:     f64,
    pub test_accuracy: f64,
    /// (actual, predicted) for the first test digits
    pub predictions:   Vec<(usize, usize)>,
    pub history:       TrainingHistory,
}

pub struct ClassificationUseCase {
    config: ClassifyConfig,
}

impl ClassificationUseCase {
    pub fn new(config: ClassifyConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ClassificationReport> {
        tracing::info!("Training digit classifier on the {} backend", self.config.backend);

        let train = load_digits(DigitSplit::Train);
        let test  = load_digits(DigitSplit::Test);

        match self.config.backend {
            BackendType::NdArray => run_pipeline::<CpuTrainBackend>(&self.config, train, test, Default::default()),
            BackendType::Wgpu    => run_pipeline::<GpuTrainBackend>(&self.config, train, test, Default::default()),
        }
    }
}

/// Steps 2–8 on already loaded samples
pub fn run_pipeline<B: AutodiffBackend>(
    cfg:    &ClassifyConfig,
    train:  Vec<DigitSample>,
    test:   Vec<DigitSample>,
    device: B::Device,
) -> Result<ClassificationReport> {
    // ── Step 2: Validation split (tail, unshuffled) ───────────────────────────
    let (train, valid) = split_validation(train, cfg.validation_split);
    tracing::info!(
        "Split: {} train, {} validation, {} test",
        train.len(), valid.len(), test.len()
    );
    let preview: Vec<DigitSample> = test.iter().take(PREVIEW_COUNT).cloned().collect();

    // ── Step 3: Loaders ───────────────────────────────────────────────────────
    // Training batches are reshuffled every epoch from the seeded rng
    let train_loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(DigitDataset::new(train));

    let valid_loader = DataLoaderBuilder::new(DigitBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(DigitDataset::new(valid));

    let test_loader = DataLoaderBuilder::new(DigitBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(DigitDataset::new(test));

    // ── Step 4: Run directory ─────────────────────────────────────────────────
    let artifacts = RunArtifacts::create(&cfg.output_dir)?;
    artifacts.save_config(cfg)?;
    let logger = artifacts.metrics_logger("accuracy")?;

    // ── Step 5: Fit ───────────────────────────────────────────────────────────
    let model     = DigitClassifierConfig::new().init::<B>(&device);
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init();
    let fit_cfg   = FitConfig { epochs: cfg.epochs, learning_rate: cfg.learning_rate };

    let (model, history) =
        fit::<B, _, _, _, _>(model, &mut optim, &fit_cfg, train_loader, valid_loader, "accuracy", Some(&logger))?;

    // ── Step 6: Evaluate ──────────────────────────────────────────────────────
    let model = model.valid();
    let (test_loss, test_accuracy) = evaluate::<B::InnerBackend, _, _>(&model, test_loader);

    // ── Step 7: Predict ───────────────────────────────────────────────────────
    let predictions: Vec<(usize, usize)> = if preview.is_empty() {
        Vec::new()
    } else {
        let batch = DigitBatcher::<B::InnerBackend>::new(device).batch(preview.clone());
        let predicted = model.predict_classes(batch.images);
        preview.iter().map(|s| s.label).zip(predicted).collect()
    };
    for (actual, predicted) in &predictions {
        tracing::debug!("Actual {} → predicted {}", actual, predicted);
    }

    // ── Step 8: Plots ─────────────────────────────────────────────────────────
    let panels: Vec<DigitPanel<'_>> = preview
        .iter()
        .zip(&predictions)
        .map(|(s, &(actual, predicted))| DigitPanel { pixels: &s.pixels, actual, predicted })
        .collect();
    plot_digit_grid(&artifacts.path("predictions.svg"), &panels)?;
    plot_history(&artifacts, &history)?;
    tracing::info!("Wrote plots and metrics to '{}'", artifacts.dir().display());

    Ok(ClassificationReport { test_loss, test_accuracy, predictions, history })
}

fn plot_history(artifacts: &RunArtifacts, history: &TrainingHistory) -> Result<()> {
    let (loss, val_loss) = (history.loss(), history.val_loss());
    let (acc, val_acc)   = (history.metric(), history.val_metric());

    plot_curves(
        &artifacts.path("loss.svg"),
        "Training and validation loss",
        "loss",
        &[Series { label: "Train Loss", values: &loss }, Series { label: "Validation Loss", values: &val_loss }],
    )?;
    plot_curves(
        &artifacts.path("accuracy.svg"),
        "Training and validation accuracy",
        "accuracy",
        &[Series { label: "Train Accuracy", values: &acc }, Series { label: "Validation Accuracy", values: &val_acc }],
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> Vec<DigitSample> {
        // Class k lights up row 2k+1 of the image
        (0..n)
            .map(|i| {
                let label = i % 10;
                let mut pixels = vec![0.0f32; 784];
                for col in 0..28 {
                    pixels[(2 * label + 1) * 28 + col] = 1.0;
                }
                DigitSample { pixels, label }
            })
            .collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = ClassifyConfig::default();
        assert_eq!((cfg.epochs, cfg.batch_size), (10, 128));
        assert!((cfg.learning_rate - 1e-3).abs() < 1e-12);
        assert!((cfg.validation_split - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_pipeline_on_synthetic_digits() {
        let dir = std::env::temp_dir().join("ai_demos_classification_test");
        let cfg = ClassifyConfig {
            output_dir: dir.to_string_lossy().into_owned(),
            epochs:     2,
            batch_size: 16,
            backend:    BackendType::NdArray,
            ..ClassifyConfig::default()
        };

        let report = run_pipeline::<CpuTrainBackend>(&cfg, synthetic(60), synthetic(20), Default::default())
            .unwrap();

        assert_eq!(report.history.epochs.len(), 2);
        assert!((0.0..=1.0).contains(&report.test_accuracy));
        assert_eq!(report.predictions.len(), PREVIEW_COUNT);
        for (actual, predicted) in &report.predictions {
            assert!(*actual < 10 && *predicted < 10);
        }
        for file in ["run_config.json", "metrics.csv", "loss.svg", "accuracy.svg", "predictions.svg"] {
            assert!(dir.join(file).exists(), "{file} missing");
        }
    }
}
