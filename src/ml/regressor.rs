// ============================================================
// Layer 5 — Housing Regressor (MLP)
// ============================================================
//   [N, 13] → Linear 13→64, ReLU → Linear 64→64, ReLU → Linear 64→1
//
// Loss:   mean squared error over the batch
// Metric: mean absolute error — the step reports the SUM of
//         |prediction − target| so the loop can weight batches
//         by size.
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig, Relu,
    },
    prelude::*,
};

use crate::data::batcher::HousingBatch;
use crate::ml::trainer::{StepOutput, Supervised};

#[derive(Config, Debug)]
pub struct HousingRegressorConfig {
    pub num_features: usize,
    #[config(default = 64)]
    pub hidden: usize,
}

impl HousingRegressorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HousingRegressor<B> {
        HousingRegressor {
            input:      LinearConfig::new(self.num_features, self.hidden).init(device),
            hidden:     LinearConfig::new(self.hidden, self.hidden).init(device),
            output:     LinearConfig::new(self.hidden, 1).init(device),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct HousingRegressor<B: Backend> {
    pub input:      Linear<B>,
    pub hidden:     Linear<B>,
    pub output:     Linear<B>,
    pub activation: Relu,
}

impl<B: Backend> HousingRegressor<B> {
    /// features: [batch, num_features] → prices: [batch, 1]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.input.forward(features));
        let x = self.activation.forward(self.hidden.forward(x));
        self.output.forward(x)
    }

    /// One predicted price per row
    pub fn predict(&self, features: Tensor<B, 2>) -> Vec<f32> {
        self.forward(features)
            .flatten::<1>(0, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap_or_default()
    }
}

impl<B: Backend> Supervised<B, HousingBatch<B>> for HousingRegressor<B> {
    fn step(&self, batch: HousingBatch<B>) -> StepOutput<B> {
        let count = batch.targets.dims()[0];
        let preds = self.forward(batch.features);

        let abs_err: f64 = (preds.clone() - batch.targets.clone())
            .abs()
            .sum()
            .into_scalar()
            .elem::<f64>();

        let loss = MseLoss::new().forward(preds, batch.targets, Reduction::Mean);

        StepOutput { loss, metric_sum: abs_err, count }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataloader::{batcher::Batcher, DataLoaderBuilder};
    use burn::optim::RmsPropConfig;

    use crate::data::{batcher::HousingBatcher, dataset::HousingDataset, housing::HousingSample};
    use crate::ml::trainer::{fit, FitConfig};

    type TestBackend  = NdArray<f32>;
    type TrainBackend = Autodiff<TestBackend>;

    fn linear_rows(n: usize) -> Vec<HousingSample> {
        // target = 2·x0 − x1 + 3
        (0..n)
            .map(|i| {
                let x0 = (i % 7) as f32 / 7.0;
                let x1 = (i % 5) as f32 / 5.0;
                HousingSample { features: vec![x0, x1], target: 2.0 * x0 - x1 + 3.0 }
            })
            .collect()
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model  = HousingRegressorConfig::new(13).init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 2>::zeros([4, 13], &device);
        assert_eq!(model.forward(x).dims(), [4, 1]);
    }

    #[test]
    fn test_step_metric_is_absolute_error_sum() {
        let device = Default::default();
        let model  = HousingRegressorConfig::new(2).init::<TestBackend>(&device);
        let batch  = HousingBatcher::<TestBackend>::new(device).batch(linear_rows(6));

        let preds = model.predict(batch.features.clone());
        let truth: Vec<f32> = linear_rows(6).iter().map(|r| r.target).collect();
        let expected_abs: f64 = preds.iter().zip(&truth).map(|(p, t)| (p - t).abs() as f64).sum();
        let expected_mse: f64 = preds.iter().zip(&truth)
            .map(|(p, t)| ((p - t) as f64).powi(2)).sum::<f64>() / 6.0;

        let out = model.step(batch);
        assert_eq!(out.count, 6);
        assert!((out.metric_sum - expected_abs).abs() < 1e-3);
        let loss: f64 = out.loss.into_scalar().elem::<f64>();
        assert!((loss - expected_mse).abs() < 1e-3);
    }

    #[test]
    fn test_fit_reduces_training_loss() {
        let device = Default::default();
        let (train, val) = crate::data::splitter::split_validation(linear_rows(80), 0.2);

        let train_loader = DataLoaderBuilder::new(HousingBatcher::<TrainBackend>::new(device))
            .batch_size(16)
            .shuffle(7)
            .build(HousingDataset::new(train));
        let valid_loader = DataLoaderBuilder::new(HousingBatcher::<TestBackend>::new(device))
            .batch_size(16)
            .build(HousingDataset::new(val));

        let model     = HousingRegressorConfig::new(2).init::<TrainBackend>(&device);
        let mut optim = RmsPropConfig::new().with_alpha(0.9).with_epsilon(1e-7).init();
        let cfg       = FitConfig { epochs: 30, learning_rate: 1e-2 };

        let (_model, history) =
            fit::<TrainBackend, _, _, _, _>(model, &mut optim, &cfg, train_loader, valid_loader, "mae", None)
                .unwrap();

        assert_eq!(history.epochs.len(), 30);
        let first = history.epochs.first().unwrap().loss;
        let last  = history.epochs.last().unwrap().loss;
        assert!(last < first, "loss did not drop: {first} → {last}");
        assert!(history.epochs.iter().all(|e| e.val_metric >= 0.0));
    }
}
