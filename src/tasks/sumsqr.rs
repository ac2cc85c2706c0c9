//! SumSqrTask: total squared distance from every row to
//! its nearest current centroid. Doubles as `N * avg_within_ss` at
//! reporting time and as the normalizing factor `Psi` for the sampler.

use crate::distance::closest;
use crate::frame::Frame;
use crate::mapreduce::map_reduce;
use crate::standardize::Standardizer;

/// Sum over all rows of `min_k distance(row, centroids[k])`.
pub fn run<F: Frame>(
    frame: &F,
    standardizer: &Standardizer,
    centroids: &[Vec<f64>],
    chunk_size: u64,
) -> f64 {
    let ncats = standardizer.ncats();
    let chunks = frame.chunks(chunk_size);
    map_reduce(
        &chunks,
        || 0.0_f64,
        |chunk| {
            let mut local = 0.0;
            for row in chunk.rows() {
                let values = standardizer.data(frame, row);
                let (_, dist) = closest(centroids, &values, centroids.len(), ncats);
                local += dist;
            }
            local
        },
        |a, b| a + b,
    )
}
