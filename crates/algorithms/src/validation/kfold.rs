//! K-fold index partitioning
//!
//! Indices `0..n` are cut into `K` contiguous test blocks; the first
//! `n % K` blocks hold one extra index. Each fold trains on everything
//! outside its block. With a shuffle seed the indices are permuted first,
//! so blocks are random but reproducible.

use offsetfield_core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// 1-based fold number
    pub index: usize,
    /// Training indices, ascending
    pub train: Vec<usize>,
    /// Held-out indices, ascending
    pub test: Vec<usize>,
}

/// K-fold splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
    shuffle_seed: Option<u64>,
}

impl KFold {
    /// Contiguous splitter with `n_splits >= 2` folds.
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(Error::InvalidParameter {
                name: "cv_splits",
                value: n_splits.to_string(),
                reason: "need at least 2 folds".into(),
            });
        }
        Ok(Self {
            n_splits,
            shuffle_seed: None,
        })
    }

    /// Permute indices with `seed` before splitting.
    pub fn with_shuffle(self, seed: u64) -> Self {
        Self {
            shuffle_seed: Some(seed),
            ..self
        }
    }

    /// Partition `0..n_samples`.
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if self.n_splits > n_samples {
            return Err(Error::InvalidParameter {
                name: "cv_splits",
                value: self.n_splits.to_string(),
                reason: format!("cannot exceed the number of samples ({})", n_samples),
            });
        }

        let mut order: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.shuffle_seed {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for f in 0..self.n_splits {
            let size = base + usize::from(f < extra);
            let mut in_test = vec![false; n_samples];
            for &i in &order[start..start + size] {
                in_test[i] = true;
            }
            let (test, train): (Vec<usize>, Vec<usize>) = (0..n_samples).partition(|&i| in_test[i]);
            folds.push(Fold {
                index: f + 1,
                train,
                test,
            });
            start += size;
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(folds: &[Fold], n: usize) {
        let mut seen = vec![0usize; n];
        for fold in folds {
            for &i in &fold.test {
                seen[i] += 1;
            }
            assert_eq!(fold.train.len() + fold.test.len(), n);
            assert!(fold.train.iter().all(|i| !fold.test.contains(i)));
        }
        assert!(seen.iter().all(|&c| c == 1), "coverage: {:?}", seen);
    }

    #[test]
    fn test_contiguous_sizes() {
        let folds = KFold::new(3).unwrap().split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(folds[0].test, vec![0, 1, 2, 3]);
        assert_eq!(folds[1].test, vec![4, 5, 6]);
        assert_eq!(folds[2].test, vec![7, 8, 9]);
        assert_eq!(folds[2].index, 3);
    }

    #[test]
    fn test_coverage_for_many_shapes() {
        for n in 2..25 {
            for k in 2..=n.min(8) {
                let folds = KFold::new(k).unwrap().split(n).unwrap();
                assert_eq!(folds.len(), k);
                assert_partition(&folds, n);
            }
        }
    }

    #[test]
    fn test_shuffled_coverage_and_reproducible() {
        let kf = KFold::new(4).unwrap().with_shuffle(42);
        let a = kf.split(17).unwrap();
        let b = kf.split(17).unwrap();
        assert_eq!(a, b);
        assert_partition(&a, 17);
    }

    #[test]
    fn test_invalid_splits() {
        assert!(KFold::new(1).is_err());
        assert!(KFold::new(5).unwrap().split(4).is_err());
    }

    #[test]
    fn test_leave_one_out() {
        let folds = KFold::new(5).unwrap().split(5).unwrap();
        for (i, f) in folds.iter().enumerate() {
            assert_eq!(f.test, vec![i]);
        }
    }
}
