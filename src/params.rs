//! Training parameters: the immutable configuration of a run.

use crate::error::TrainError;
use serde::{Deserialize, Serialize};

/// Centroid initialization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Init {
    /// Bypass K-Means|| entirely: seed `K` centroids as uniformly
    /// sampled rows and go straight to Lloyd's iteration.
    None,
    /// K-Means|| oversampling followed by K-Means++ reclustering.
    PlusPlus,
    /// K-Means|| oversampling followed by furthest-point reclustering.
    Furthest,
}

/// Upper bound on the number of clusters a run may request.
pub const MAX_K: u64 = 10_000_000;
/// Upper bound on the number of Lloyd iterations a run may request.
pub const MAX_ITERS: u64 = 1_000_000;

/// Immutable, validated configuration for a training run.
///
/// Implements [`serde::Serialize`]/[`Deserialize`] so the CLI can load
/// a baseline from a config file and override individual fields from
/// the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParameters {
    pub k: u64,
    pub max_iters: u64,
    pub init: Init,
    pub standardize: bool,
    pub seed: u64,
}

impl TrainingParameters {
    /// Validate against spec.md §4.7 step 1; `n` is the row count of
    /// the frame about to be trained on. Returns before any frame or
    /// model lock is acquired.
    pub fn validate(&self, n: u64) -> Result<(), TrainError> {
        if self.k < 1 || self.k > MAX_K {
            return Err(TrainError::Validation(format!(
                "k must be in [1, {MAX_K}], got {}",
                self.k
            )));
        }
        if self.max_iters < 1 || self.max_iters > MAX_ITERS {
            return Err(TrainError::Validation(format!(
                "max_iters must be in [1, {MAX_ITERS}], got {}",
                self.max_iters
            )));
        }
        if n < self.k {
            return Err(TrainError::Validation(format!(
                "cannot fit k={} clusters over n={} rows",
                self.k, n
            )));
        }
        Ok(())
    }

    /// K-Means|| oversampling factor `ell = SAMPLE_FACTOR * K`.
    pub fn ell(&self) -> u64 {
        crate::SAMPLE_FACTOR as u64 * self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn rejects_n_less_than_k() {
        let p = TrainingParameters {
            k: 5,
            max_iters: 10,
            init: Init::None,
            standardize: true,
            seed: 0,
        };
        assert!(p.validate(4).is_err());
        assert!(p.validate(5).is_ok());
    }

    /// spec.md §4.7 step 1: K and maxIters must each fall in
    /// `[1, MAX]`; out-of-range values on either bound are rejected.
    #[rstest]
    #[case(0, 10)]
    #[case(MAX_K + 1, 10)]
    #[case(1, 0)]
    #[case(1, MAX_ITERS + 1)]
    fn rejects_out_of_range_k_or_max_iters(#[case] k: u64, #[case] max_iters: u64) {
        let p = TrainingParameters {
            k,
            max_iters,
            init: Init::None,
            standardize: true,
            seed: 0,
        };
        assert!(p.validate(u64::MAX).is_err());
    }

    #[rstest]
    #[case(1, 1)]
    #[case(MAX_K, 1)]
    #[case(1, MAX_ITERS)]
    fn accepts_boundary_values(#[case] k: u64, #[case] max_iters: u64) {
        let p = TrainingParameters {
            k,
            max_iters,
            init: Init::None,
            standardize: true,
            seed: 0,
        };
        assert!(p.validate(k).is_ok());
    }
}
