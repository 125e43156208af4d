// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a dataset on disk (or behind a URL) and
// tensor batches on the training device.
//
// Classification:
//
//   MnistDataset → DigitSample (pixels / 255)
//       → split_validation (tail 20%)
//       → InMemoryDataset → DigitBatcher → DataLoader
//
// Regression:
//
//   boston_housing.npz → HousingSample
//       → shuffle_split (seed 113, 80/20 train/test)
//       → Standardizer (fitted on train only)
//       → split_validation (tail 20%)
//       → InMemoryDataset → HousingBatcher → DataLoader
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// MNIST loading, pixel normalisation, one-hot labels
pub mod digits;

/// Boston housing .npz loading and train/test split
pub mod housing;

/// Per-column mean/std standardisation
pub mod standardize;

/// Implements Burn's Dataset trait over in-memory samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded shuffle splits and Keras-style validation splits
pub mod splitter;
