// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One fit/evaluate loop shared by both pipelines, written
// against a small `Supervised` trait instead of a concrete
// model:
//
//   step(batch) → batch-mean loss (a tensor, so it can be
//                 back-propagated) + metric sum + sample count
//
// The classifier reports "number of correct predictions" as its
// metric sum, the regressor "sum of absolute errors"; dividing
// by the sample count gives accuracy or MAE respectively.
//
// Per epoch:
//   1. training phase on B (Autodiff) — backward + optimiser step
//   2. validation phase on model.valid() — InnerBackend, no graph
//   3. record loss/metric/val_loss/val_metric, print, log to CSV
//
// Epoch values are sample-weighted means so a short last batch
// counts for what it holds, matching the numbers Keras prints.
// No checkpointing, no early stopping.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::domain::training_history::{EpochRecord, TrainingHistory};
use crate::infra::metrics::MetricsLogger;

/// What one forward pass over a batch reports back to the loop
pub struct StepOutput<B: Backend> {
    /// Mean loss over the batch — shape [1]
    pub loss:       Tensor<B, 1>,
    /// Sum of the per-sample metric over the batch
    pub metric_sum: f64,
    /// Number of samples in the batch
    pub count:      usize,
}

/// A model that can score one batch of type `I`.
pub trait Supervised<B: Backend, I> {
    fn step(&self, batch: I) -> StepOutput<B>;
}

#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub epochs:        usize,
    pub learning_rate: f64,
}

/// Sample-weighted running means of loss and metric
#[derive(Debug, Default, Clone, Copy)]
struct Running {
    loss_sum:   f64,
    metric_sum: f64,
    count:      usize,
}

impl Running {
    fn add(&mut self, batch_loss: f64, metric_sum: f64, count: usize) {
        self.loss_sum   += batch_loss * count as f64;
        self.metric_sum += metric_sum;
        self.count      += count;
    }

    fn loss(&self) -> f64 {
        if self.count > 0 { self.loss_sum / self.count as f64 } else { f64::NAN }
    }

    fn metric(&self) -> f64 {
        if self.count > 0 { self.metric_sum / self.count as f64 } else { f64::NAN }
    }
}

/// Train `model` for `cfg.epochs` epochs and return it with its history.
pub fn fit<B, M, O, I, IV>(
    mut model:    M,
    optim:        &mut O,
    cfg:          &FitConfig,
    train_loader: Arc<dyn DataLoader<I>>,
    valid_loader: Arc<dyn DataLoader<IV>>,
    metric_name:  &str,
    logger:       Option<&MetricsLogger>,
) -> Result<(M, TrainingHistory)>
where
    B:  AutodiffBackend,
    M:  AutodiffModule<B> + Supervised<B, I>,
    M::InnerModule: Supervised<B::InnerBackend, IV>,
    O:  Optimizer<M, B>,
{
    let mut history = TrainingHistory::new(metric_name);

    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train = Running::default();

        for batch in train_loader.iter() {
            let out = model.step(batch);

            let loss_val: f64 = out.loss.clone().into_scalar().elem::<f64>();
            train.add(loss_val, out.metric_sum, out.count);

            // Backward pass + optimiser update
            let grads = out.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → same weights on the InnerBackend, no autodiff graph
        let (val_loss, val_metric) =
            evaluate::<B::InnerBackend, _, _>(&model.valid(), valid_loader.clone());

        let record = EpochRecord {
            epoch,
            loss:   train.loss(),
            metric: train.metric(),
            val_loss,
            val_metric,
        };

        println!(
            "Epoch {:>3}/{} | loss={:.4} | {metric_name}={:.4} | val_loss={:.4} | val_{metric_name}={:.4}",
            epoch, cfg.epochs, record.loss, record.metric, record.val_loss, record.val_metric,
        );

        if let Some(logger) = logger {
            logger.log(&record)?;
        }
        history.push(record);
    }

    tracing::info!("Training complete after {} epochs", cfg.epochs);
    Ok((model, history))
}

/// Mean loss and mean metric of `model` over every batch of `loader`.
/// Returns NaN for both when the loader is empty.
pub fn evaluate<B, M, I>(model: &M, loader: Arc<dyn DataLoader<I>>) -> (f64, f64)
where
    B: Backend,
    M: Supervised<B, I>,
{
    let mut acc = Running::default();
    for batch in loader.iter() {
        let out = model.step(batch);
        let loss_val: f64 = out.loss.into_scalar().elem::<f64>();
        acc.add(loss_val, out.metric_sum, out.count);
    }
    (acc.loss(), acc.metric())
}
