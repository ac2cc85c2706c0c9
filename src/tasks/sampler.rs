//! SamplerTask: K-Means|| oversampling pass. Each chunk
//! uses its own RNG seeded by `seed + chunk.start()`, the sole source
//! of cross-repartitioning non-reproducibility — tests
//! that assert determinism must fix chunking.

use crate::distance::closest;
use crate::frame::Frame;
use crate::mapreduce::map_reduce;
use crate::standardize::Standardizer;
use rand::{Rng, SeedableRng};

/// Emit standardized row values with probability
/// `min(1, ell * min_sqr_dist(row) / psi)`, via the rejection test
/// `ell * s > u * psi`. Candidate order is row-order within a chunk
/// and reduce-tree (chunk) order across chunks.
pub fn run<F: Frame>(
    frame: &F,
    standardizer: &Standardizer,
    centroids: &[Vec<f64>],
    psi: f64,
    ell: f64,
    seed: u64,
    chunk_size: u64,
) -> Vec<Vec<f64>> {
    let ncats = standardizer.ncats();
    let chunks = frame.chunks(chunk_size);
    map_reduce(
        &chunks,
        Vec::new,
        |chunk| {
            let mut rng = rand::rngs::SmallRng::seed_from_u64(seed.wrapping_add(chunk.start()));
            let mut local = Vec::new();
            for row in chunk.rows() {
                let values = standardizer.data(frame, row);
                let (_, s) = closest(centroids, &values, centroids.len(), ncats);
                let u: f64 = rng.gen_range(0.0..1.0);
                if ell * s > u * psi {
                    local.push(values);
                }
            }
            local
        },
        |mut a, b| {
            a.extend(b);
            a
        },
    )
}
