// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements burn's Batcher trait for both pipelines, turning a
// Vec of samples into device tensors.
//
// Digits:
//   Input:  N DigitSamples (784 pixels + class index)
//   Output: images  [N, 1, 28, 28]  float
//           targets [N, 10]         float, one-hot
//           labels  [N]             int,   class index
//
// Housing:
//   Input:  N HousingSamples (13 features + target)
//   Output: features [N, 13] float
//           targets  [N, 1]  float
//
// Every sample row already has the same width, so batching is a
// flatten-then-reshape:
//   [s1_f1, …, s1_fF, s2_f1, …, sN_fF] → [N, F]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::digits::{one_hot, DigitSample, IMAGE_SIDE, NUM_CLASSES};
use crate::data::housing::HousingSample;

// ─── DigitBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Normalised pixels — shape: [batch_size, 1, 28, 28]
    pub images: Tensor<B, 4>,

    /// One-hot targets — shape: [batch_size, 10]
    pub targets: Tensor<B, 2>,

    /// Class indices — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<DigitSample, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<DigitSample>) -> DigitBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let targets: Vec<f32> = items
            .iter()
            .flat_map(|s| one_hot(s.label, NUM_CLASSES))
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 1, IMAGE_SIDE, IMAGE_SIDE]);

        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, NUM_CLASSES]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        DigitBatch { images, targets, labels }
    }
}

// ─── HousingBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct HousingBatch<B: Backend> {
    /// Standardised features — shape: [batch_size, num_features]
    pub features: Tensor<B, 2>,

    /// Prices — shape: [batch_size, 1]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct HousingBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> HousingBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<HousingSample, HousingBatch<B>> for HousingBatcher<B> {
    fn batch(&self, items: Vec<HousingSample>) -> HousingBatch<B> {
        let batch_size   = items.len();
        let num_features = items.first().map(|s| s.features.len()).unwrap_or(0);

        let features: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();

        let targets: Vec<f32> = items.iter().map(|s| s.target).collect();

        let features = Tensor::<B, 1>::from_floats(features.as_slice(), &self.device)
            .reshape([batch_size, num_features]);

        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        HousingBatch { features, targets }
    }
}
