//! Reproducible stratified train/test partitioning

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::dataset::Dataset;
use super::error::CascadeError;

/// Result of a stratified split. Index lists refer to rows of the source
/// dataset and are sorted ascending.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Split `dataset` so each class keeps (approximately) its share in both partitions.
///
/// The test partition receives `ceil(test_size * n)` rows. Each class gets the floor
/// of its proportional share; leftover rows go to the classes with the largest
/// fractional remainder, ties broken by class order. Rows inside a class are
/// shuffled with a `StdRng` seeded from `seed`.
pub fn stratified_split(
    dataset: &Dataset,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit, CascadeError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(CascadeError::Configuration(format!(
            "test_size must be between 0 and 1 (exclusive), got {}",
            test_size
        )));
    }

    let n = dataset.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(CascadeError::InsufficientData(format!(
            "cannot split {} row(s) into non-empty train and test partitions with test_size {}",
            n, test_size
        )));
    }

    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, label) in dataset.labels.iter().enumerate() {
        by_class.entry(label.as_str()).or_default().push(i);
    }

    let allocation = allocate_test_counts(&by_class, n, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(n - n_test);
    let mut test_indices = Vec::with_capacity(n_test);

    for ((_, rows), take) in by_class.iter().zip(allocation) {
        let mut shuffled = rows.clone();
        shuffled.shuffle(&mut rng);
        test_indices.extend_from_slice(&shuffled[..take]);
        train_indices.extend_from_slice(&shuffled[take..]);
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok(TrainTestSplit {
        train: dataset.subset(&train_indices),
        test: dataset.subset(&test_indices),
        train_indices,
        test_indices,
    })
}

/// Per-class test counts summing to `n_test`, in the iteration order of `by_class`
fn allocate_test_counts(
    by_class: &BTreeMap<&str, Vec<usize>>,
    n: usize,
    n_test: usize,
) -> Vec<usize> {
    let shares: Vec<f64> = by_class
        .values()
        .map(|rows| rows.len() as f64 * n_test as f64 / n as f64)
        .collect();

    let mut counts: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let mut leftover = n_test - counts.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.partial_cmp(&ra)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let sizes: Vec<usize> = by_class.values().map(|rows| rows.len()).collect();
    for &class in order.iter().cycle() {
        if leftover == 0 {
            break;
        }
        if counts[class] < sizes[class] {
            counts[class] += 1;
            leftover -= 1;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::iris::load_iris;

    #[test]
    fn test_iris_split_sizes() {
        let split = stratified_split(&load_iris(), 0.25, 42).unwrap();
        assert_eq!(split.test.len(), 38);
        assert_eq!(split.train.len(), 112);
    }

    #[test]
    fn test_split_is_stratified() {
        let split = stratified_split(&load_iris(), 0.25, 7).unwrap();
        for (_, count) in split.test.class_counts() {
            assert!((12..=13).contains(&count), "unbalanced test class: {}", count);
        }
        for (_, count) in split.train.class_counts() {
            assert!((37..=38).contains(&count), "unbalanced train class: {}", count);
        }
    }

    #[test]
    fn test_split_partitions_all_rows() {
        let split = stratified_split(&load_iris(), 0.3, 1).unwrap();
        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = stratified_split(&load_iris(), 0.25, 42).unwrap();
        let b = stratified_split(&load_iris(), 0.25, 42).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
        assert_eq!(a.train_indices, b.train_indices);
    }

    #[test]
    fn test_different_seed_changes_split() {
        let a = stratified_split(&load_iris(), 0.25, 42).unwrap();
        let b = stratified_split(&load_iris(), 0.25, 43).unwrap();
        assert_ne!(a.test_indices, b.test_indices);
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(matches!(
            stratified_split(&load_iris(), 0.0, 42),
            Err(CascadeError::Configuration(_))
        ));
        assert!(matches!(
            stratified_split(&load_iris(), 1.0, 42),
            Err(CascadeError::Configuration(_))
        ));
    }

    #[test]
    fn test_allocation_sums_to_test_size() {
        let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        by_class.insert("a", (0..5).collect());
        by_class.insert("b", (5..12).collect());
        by_class.insert("c", (12..13).collect());
        let counts = allocate_test_counts(&by_class, 13, 4);
        assert_eq!(counts.iter().sum::<usize>(), 4);
        assert!(counts[2] <= 1);
    }
}
