//! Stratified train/test splitting
//!
//! The split keeps the class proportions of the full dataset in both
//! partitions and is fully determined by the seed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::TrainingError;

/// Row indices of the two partitions, each in shuffled order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `labels` into train/test indices, stratified by class
///
/// The test partition receives `ceil(test_fraction * n)` rows. Each class gets
/// the floor of its proportional share, and leftover slots go to the classes
/// with the largest fractional remainder (lower label first on ties).
///
/// # Errors
/// Empty input, a single class, a class with fewer than two members, or a
/// partition too small to hold every class.
pub fn stratified_split(
    labels: &[u8],
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidTestFraction(test_fraction));
    }
    let n = labels.len();
    if n == 0 {
        return Err(TrainingError::EmptyDataset {
            context: "Stratified split",
        });
    }

    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (row, &label) in labels.iter().enumerate() {
        match label {
            0 | 1 => by_class[label as usize].push(row),
            value => return Err(TrainingError::NonBinaryLabel { row, value }),
        }
    }

    for (class, members) in by_class.iter().enumerate() {
        if members.is_empty() {
            return Err(TrainingError::SingleClass {
                context: "Stratified split",
                present: 1 - class as u8,
            });
        }
    }
    for (class, members) in by_class.iter().enumerate() {
        if members.len() < 2 {
            return Err(TrainingError::ClassTooSmall {
                class: class as u8,
                count: members.len(),
            });
        }
    }

    let n_test = (test_fraction * n as f64).ceil() as usize;
    let n_train = n - n_test;
    let n_classes = by_class.len();
    if n_test < n_classes {
        return Err(TrainingError::PartitionTooSmall {
            partition: "test",
            size: n_test,
            classes: n_classes,
        });
    }
    if n_train < n_classes {
        return Err(TrainingError::PartitionTooSmall {
            partition: "train",
            size: n_train,
            classes: n_classes,
        });
    }

    let counts: Vec<usize> = by_class.iter().map(Vec::len).collect();
    let test_counts = allocate_test_counts(&counts, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);

    for (members, &k) in by_class.iter_mut().zip(test_counts.iter()) {
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..k]);
        train.extend_from_slice(&members[k..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

/// Distribute `n_test` slots across classes proportionally to `counts`
fn allocate_test_counts(counts: &[usize], n_test: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    let shares: Vec<f64> = counts
        .iter()
        .map(|&c| n_test as f64 * c as f64 / total as f64)
        .collect();

    let mut allocated: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let mut remaining = n_test - allocated.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    // Stable sort keeps the lower class first when remainders tie
    order.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    for &class in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        // Leave at least one member of every class for training
        if allocated[class] + 1 < counts[class] {
            allocated[class] += 1;
            remaining -= 1;
        }
    }

    allocated
}
