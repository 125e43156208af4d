// ============================================================
// Layer 4 — Handwritten Digit Data
// ============================================================
// Turns burn's MNIST items into normalised training samples.
//
// burn's MnistDataset hands out raw pixel intensities in
// [0, 255] as f32 and the label as a u8. The pipeline wants:
//
//   pixels → divided by 255 so every value lies in [0, 1]
//   label  → kept as an index here; the batcher expands it to a
//            one-hot vector of length 10 for the loss
//
// The channel axis (28×28 → 1×28×28) is added by the batcher
// when it builds the [N, 1, 28, 28] tensor.
//
// Reference: Burn Book §4 (Datasets)

use burn::data::dataset::{
    vision::{MnistDataset, MnistItem},
    Dataset,
};
use serde::{Deserialize, Serialize};

pub const IMAGE_SIDE:  usize = 28;
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

/// One normalised digit image with its class index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitSample {
    /// Row-major 28×28 pixels in [0, 1]
    pub pixels: Vec<f32>,
    /// Class index 0..=9
    pub label:  usize,
}

/// Which half of MNIST to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitSplit {
    Train,
    Test,
}

/// Scale raw intensities (0..=255) into [0, 1].
pub fn normalize_pixels(raw: &[f32]) -> Vec<f32> {
    raw.iter().map(|&p| p / 255.0).collect()
}

/// One-hot encode a class index.
/// Out-of-range labels give an all-zero vector.
pub fn one_hot(label: usize, num_classes: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; num_classes];
    if let Some(slot) = v.get_mut(label) {
        *slot = 1.0;
    }
    v
}

impl From<MnistItem> for DigitSample {
    fn from(item: MnistItem) -> Self {
        let mut raw = Vec::with_capacity(IMAGE_PIXELS);
        raw.extend(item.image.iter().flat_map(|row| row.iter().copied()));
        Self {
            pixels: normalize_pixels(&raw),
            label:  item.label as usize,
        }
    }
}

/// Load (downloading on first use) one MNIST split as normalised samples.
pub fn load_digits(split: DigitSplit) -> Vec<DigitSample> {
    let dataset = match split {
        DigitSplit::Train => MnistDataset::train(),
        DigitSplit::Test  => MnistDataset::test(),
    };
    let samples: Vec<DigitSample> = dataset.iter().map(DigitSample::from).collect();
    tracing::info!("Loaded {} MNIST {:?} images", samples.len(), split);
    samples
}
