// ============================================================
// Layer 5 — Digit Classifier (CNN)
// ============================================================
// Small convolutional network for 28×28 grayscale digits:
//
//   [N, 1, 28, 28]
//     Conv2d 1→32, 3×3, ReLU      → [N, 32, 26, 26]
//     MaxPool 2×2                 → [N, 32, 13, 13]
//     Conv2d 32→64, 3×3, ReLU     → [N, 64, 11, 11]
//     MaxPool 2×2                 → [N, 64,  5,  5]
//     Flatten                     → [N, 1600]
//     Linear 1600→128, ReLU       → [N, 128]
//     Linear 128→10               → [N, 10] logits
//
// `forward` returns logits; softmax is applied by `predict_proba`
// and folded into the loss as log_softmax for numerical safety.
//
// Loss: categorical cross-entropy against ONE-HOT targets
//   L = -mean_n Σ_k y[n,k] · log softmax(z)[n,k]
// Metric: accuracy (argmax of logits == label).
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    prelude::*,
    tensor::activation::{log_softmax, softmax},
};

use crate::data::batcher::DigitBatch;
use crate::ml::trainer::{StepOutput, Supervised};

#[derive(Config, Debug)]
pub struct DigitClassifierConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 128)]
    pub hidden: usize,
}

impl Default for DigitClassifierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitClassifier<B> {
        DigitClassifier {
            conv1:      Conv2dConfig::new([1, 32], [3, 3]).init(device),
            conv2:      Conv2dConfig::new([32, 64], [3, 3]).init(device),
            pool:       MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1:        LinearConfig::new(64 * 5 * 5, self.hidden).init(device),
            fc2:        LinearConfig::new(self.hidden, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct DigitClassifier<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub conv2:      Conv2d<B>,
    pub pool:       MaxPool2d,
    pub fc1:        Linear<B>,
    pub fc2:        Linear<B>,
    pub activation: Relu,
}

impl<B: Backend> DigitClassifier<B> {
    /// images: [batch, 1, 28, 28] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));
        let x = x.flatten::<2>(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// Class probabilities — each row sums to 1
    pub fn predict_proba(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Most likely class per image
    pub fn predict_classes(&self, images: Tensor<B, 4>) -> Vec<usize> {
        self.predict_proba(images)
            .argmax(1)
            .flatten::<1>(0, 1)
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap_or_default()
            .into_iter()
            .map(|c| c as usize)
            .collect()
    }
}

/// Mean categorical cross-entropy of `logits` against one-hot `targets`
pub fn categorical_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let per_sample = (targets * log_softmax(logits, 1)).sum_dim(1).neg();
    per_sample.mean()
}

impl<B: Backend> Supervised<B, DigitBatch<B>> for DigitClassifier<B> {
    fn step(&self, batch: DigitBatch<B>) -> StepOutput<B> {
        let count  = batch.labels.dims()[0];
        let logits = self.forward(batch.images);
        let loss   = categorical_cross_entropy(logits.clone(), batch.targets);

        // argmax(1) returns shape [batch, 1] — flatten to [batch]
        // before comparing with labels which is [batch]
        let correct: f64 = logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(batch.labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<f64>();

        StepOutput { loss, metric_sum: correct, count }
    }
}
