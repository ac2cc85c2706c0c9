//! DistanceKernel: hybrid L2 (numeric) / Hamming (categorical)
//! point-to-centroid dissimilarity with NA-aware scaling. A pure function module, no state.

/// Squared dissimilarity between `centroid` and `point`, both length
/// `F`, with the first `ncats` positions treated as categorical
/// (Hamming) and the remainder as numeric (squared Euclidean).
///
/// Missing dimensions (`NaN` in `point`) are skipped entirely and the
/// accumulated distance is rescaled by `F / pts` when `0 < pts < F`,
/// so rows with different numbers of missing dimensions remain
/// comparable.
pub fn distance(centroid: &[f64], point: &[f64], ncats: usize) -> f64 {
    debug_assert_eq!(centroid.len(), point.len());
    let f = centroid.len();
    let mut sqr = 0.0;
    let mut pts = f;
    for i in 0..ncats {
        let p = point[i];
        if p.is_nan() {
            pts -= 1;
            continue;
        }
        if p != centroid[i] {
            sqr += 1.0;
        }
    }
    for i in ncats..f {
        let p = point[i];
        if p.is_nan() {
            pts -= 1;
            continue;
        }
        let d = p - centroid[i];
        sqr += d * d;
    }
    if pts > 0 && pts < f {
        sqr * (f as f64) / (pts as f64)
    } else {
        sqr
    }
}

/// Index and squared distance of the nearest of the first `count`
/// centroids to `point`. Ties broken by lowest index.
pub fn closest(centroids: &[Vec<f64>], point: &[f64], count: usize, ncats: usize) -> (usize, f64) {
    assert!(count > 0 && count <= centroids.len());
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().take(count).enumerate() {
        let d = distance(centroid, point, ncats);
        if d < best_dist {
            best_dist = d;
            best_idx = idx;
        }
    }
    (best_idx, best_dist)
}
