use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Indices of a seeded train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Indices of the training items
    pub train: Vec<usize>,

    /// Indices of the held-out items
    pub test: Vec<usize>,
}

/// Randomly partition `0..n` into a train and a test set.
///
/// The test set receives `ceil(n * test_fraction)` items. The same seed always yields the same
/// partition.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let n_test = ((n as f64 * fraction).ceil() as usize).min(n);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let train = indices.split_off(n_test);

    Split {
        train,
        test: indices,
    }
}

/// Select the items at the given indices
pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}
