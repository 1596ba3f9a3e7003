// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles samples and splits them into two sets:
//   - Training set: used to fit the forest
//   - Test set:     held out to measure generalisation
//
// The shuffle is driven by a seeded StdRng so a given seed always
// produces the same split (the training flow uses seed 41).
//
// The test set gets ceil(n * test_fraction) items, the training
// set gets the rest.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Deterministically shuffle `samples` and split into (train, test).
///
/// # Arguments
/// * `samples`       - All available samples (consumed by this function)
/// * `test_fraction` - Proportion held out, e.g. 0.2 = 20%
/// * `seed`          - RNG seed for the shuffle
///
/// # Returns
/// A tuple (train_samples, test_samples)
pub fn split_train_test<T>(mut samples: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total      = samples.len();
    let fraction   = test_fraction.clamp(0.0, 1.0);
    let test_count = ((total as f64) * fraction).ceil() as usize;
    let split_at   = total - test_count.min(total);

    // split_off(n) removes elements [n..] and returns them
    let test = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} test (seed={})",
        samples.len(),
        test.len(),
        seed,
    );

    (samples, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test)     = split_train_test(items, 0.2, 41);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_rounds_test_size_up() {
        let items: Vec<usize> = (0..11).collect();
        let (train, test)     = split_train_test(items, 0.2, 41);
        // ceil(11 * 0.2) = 3
        assert_eq!(test.len(),  3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test)     = split_train_test(items, 0.3, 7);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_test((0..40).collect::<Vec<usize>>(), 0.25, 41);
        let b = split_train_test((0..40).collect::<Vec<usize>>(), 0.25, 41);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, test)     = split_train_test(items, 0.2, 41);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_zero_fraction_keeps_everything_for_training() {
        let items: Vec<usize> = (0..10).collect();
        let (train, test)     = split_train_test(items, 0.0, 41);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }
}
