//! ModelOutput: destandardized centroids plus the
//! reporting statistics the Driver writes after every accepted Lloyd
//! iteration.

use crate::distance::closest;
use serde::{Deserialize, Serialize};

/// The trained model, in destandardized (original) coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub names: Vec<String>,
    pub ncats: usize,
    /// Destandardized centroids, `centroids[k].len() == F` for every `k`.
    pub centroids: Vec<Vec<f64>>,
    pub rows_per_cluster: Vec<u64>,
    /// Per-cluster `withinmse[k] = cSqr[k] / rows[k]`.
    pub within_mse: Vec<f64>,
    pub total_avg_ss: f64,
    pub avg_within_ss: f64,
    pub avg_between_ss: f64,
    pub iterations: u64,
}

impl Model {
    /// Score a point against this model's centroids (in the model's
    /// own, destandardized coordinate space): returns the index of the
    /// nearest centroid.
    pub fn predict(&self, point: &[f64]) -> usize {
        closest(&self.centroids, point, self.centroids.len(), self.ncats).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_returns_nearest_centroid() {
        let model = Model {
            names: vec!["x".into()],
            ncats: 0,
            centroids: vec![vec![0.0], vec![10.0]],
            rows_per_cluster: vec![2, 2],
            within_mse: vec![0.0, 0.0],
            total_avg_ss: 0.0,
            avg_within_ss: 0.0,
            avg_between_ss: 0.0,
            iterations: 1,
        };
        assert_eq!(model.predict(&[1.0]), 0);
        assert_eq!(model.predict(&[9.0]), 1);
    }
}
