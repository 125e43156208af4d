use burn::data::dataset::Dataset;

use crate::data::{digits::DigitSample, housing::HousingSample};

/// Samples held in memory behind burn's Dataset trait.
/// Both pipelines fit comfortably in RAM (60k digits, 404 rows).
pub struct InMemoryDataset<T> {
    samples: Vec<T>,
}

impl<T> InMemoryDataset<T> {
    pub fn new(samples: Vec<T>) -> Self { Self { samples } }
}

impl<T: Clone + Send + Sync> Dataset<T> for InMemoryDataset<T> {
    fn get(&self, index: usize) -> Option<T> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

pub type DigitDataset   = InMemoryDataset<DigitSample>;
pub type HousingDataset = InMemoryDataset<HousingSample>;
