// ============================================================
// Layer 4 — Train/Validation/Test Splitting
// ============================================================
// Two ways of cutting a sample list in two:
//
//   shuffle_split    — seeded shuffle, then cut. Used once to
//                      carve the housing table into train and test.
//                      The shuffle is numpy's legacy
//                      `RandomState(seed).shuffle`: MT19937 seeded
//                      with init_genrand, a backwards Fisher-Yates
//                      pass, and masked rejection sampling for each
//                      swap index. The same seed therefore selects
//                      the same rows as Keras' loaders.
//
//   split_validation — NO shuffle: the last `fraction` of the
//                      samples becomes the validation set. This
//                      mirrors Keras' `validation_split`, which
//                      always holds out the tail of the training
//                      arrays as given. Training batches are
//                      shuffled later by the DataLoader.
//
// Both cut at floor(len × train_fraction), so 404 rows at 0.8
// give 323 train / 81 validation.
//
// Reference: Rust Book §8 (Vectors)
//            rand / rand_mt crate documentation

use rand::RngCore;
use rand_mt::Mt;

/// Index where the training part ends
fn cut_index(total: usize, train_fraction: f64) -> usize {
    let fraction = train_fraction.clamp(0.0, 1.0);
    // Small epsilon so 0.7 × 50 = 34.999… still lands on 35
    (((total as f64) * fraction) + 1e-9).floor() as usize
}

/// Uniform integer in [0, max]: draw 32 bits, mask to the smallest
/// covering power of two, retry while above `max`.
fn bounded<R: RngCore>(rng: &mut R, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    let mask = u32::MAX >> max.leading_zeros();
    loop {
        let value = rng.next_u32() & mask;
        if value <= max {
            return value;
        }
    }
}

/// In-place shuffle drawing swap indices exactly like numpy's legacy shuffle
pub fn numpy_shuffle<T, R: RngCore>(samples: &mut [T], rng: &mut R) {
    for i in (1..samples.len()).rev() {
        let j = bounded(rng, i as u32) as usize;
        samples.swap(i, j);
    }
}

/// Shuffle with a fixed seed and split into (train, rest).
pub fn shuffle_split<T>(mut samples: Vec<T>, train_fraction: f64, seed: u32) -> (Vec<T>, Vec<T>) {
    let mut rng = Mt::new(seed);
    numpy_shuffle(&mut samples, &mut rng);

    let total    = samples.len();
    let split_at = cut_index(total, train_fraction).min(total);

    // split_off(n) removes elements [n..] from the Vec and returns them
    let rest = samples.split_off(split_at);

    tracing::debug!(
        "Shuffled split: {} / {} (seed {})",
        samples.len(),
        rest.len(),
        seed,
    );

    (samples, rest)
}

/// Hold out the trailing `validation_fraction` of `samples`, order preserved.
pub fn split_validation<T>(mut samples: Vec<T>, validation_fraction: f64) -> (Vec<T>, Vec<T>) {
    let total    = samples.len();
    let split_at = cut_index(total, 1.0 - validation_fraction).min(total);
    let val      = samples.split_off(split_at);

    tracing::debug!(
        "Validation split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    (samples, val)
}
