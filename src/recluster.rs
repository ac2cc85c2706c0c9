//! Reclusterer: reduces the K-Means|| oversampled
//! candidate set down to exactly `K` initial centroids.
//!
//! `Init::None` bypasses this module entirely (the Driver seeds `K`
//! uniformly sampled rows directly); this module implements
//! `PlusPlus` and `Furthest` only.

use crate::distance::closest;
use rand::Rng;

/// A bounded number of fresh-`u` retries for the PlusPlus scan before
/// falling back to the furthest-point pick, guaranteeing termination
///.
const PLUSPLUS_SCAN_RETRIES: usize = 10_000;

/// K-Means++ reduction: `res[0] = candidates[0]`, then repeatedly scan
/// `candidates` in order for the first point whose distance to the
/// nearest already-chosen center exceeds `u * Psi`, an early-break
/// first-fit scan rather than a canonical weighted sample-of-one. This
/// is a faithful reproduction of the source variant and is preserved
/// as-is: it biases selection toward earlier candidates.
///
/// Always returns exactly `k` centroids (spec.md §4.6), even when the
/// K-Means|| candidate set is smaller than `k` (e.g. Psi collapses to
/// zero across all oversampling rounds on a degenerate/duplicate-heavy
/// dataset): once every distinct candidate has been chosen, the result
/// is padded by cycling back through the already-chosen centers. Such
/// duplicate centroids collapse to one cluster on the first Lloyd pass
/// and are split apart again by empty-cluster rescue.
pub fn plus_plus<R: Rng>(candidates: &[Vec<f64>], k: usize, ncats: usize, rng: &mut R) -> Vec<Vec<f64>> {
    assert!(!candidates.is_empty());
    let available = k.min(candidates.len());
    let mut res = vec![candidates[0].clone()];
    while res.len() < available {
        let psi: f64 = candidates
            .iter()
            .map(|p| closest(&res, p, res.len(), ncats).1)
            .sum();
        let mut chosen = None;
        for _ in 0..PLUSPLUS_SCAN_RETRIES {
            let u: f64 = rng.gen_range(0.0..1.0);
            let threshold = u * psi;
            if let Some(p) = candidates
                .iter()
                .find(|p| closest(&res, p, res.len(), ncats).1 >= threshold)
            {
                chosen = Some(p.clone());
                break;
            }
        }
        let chosen = chosen.unwrap_or_else(|| furthest_point(candidates, &res, ncats));
        res.push(chosen);
    }
    pad_to(&mut res, k);
    res
}

/// Furthest-point reduction: starting from `candidates[0]`, repeatedly
/// add the candidate maximizing distance to the nearest already-chosen
/// center, ties broken by lowest index. Always returns exactly `k`
/// centroids; see [`plus_plus`] for the padding rule when the
/// candidate set is smaller than `k`.
pub fn furthest(candidates: &[Vec<f64>], k: usize, ncats: usize) -> Vec<Vec<f64>> {
    assert!(!candidates.is_empty());
    let available = k.min(candidates.len());
    let mut res = vec![candidates[0].clone()];
    while res.len() < available {
        let next = furthest_point(candidates, &res, ncats);
        res.push(next);
    }
    pad_to(&mut res, k);
    res
}

fn furthest_point(candidates: &[Vec<f64>], res: &[Vec<f64>], ncats: usize) -> Vec<f64> {
    candidates
        .iter()
        .enumerate()
        .map(|(idx, p)| (idx, closest(res, p, res.len(), ncats).1))
        .max_by(|(ia, da), (ib, db)| da.partial_cmp(db).unwrap().then(ib.cmp(ia)))
        .map(|(idx, _)| candidates[idx].clone())
        .expect("candidates non-empty")
}

/// Pad `res` up to exactly `target` centroids by cycling back through
/// the centers already chosen, in order. No-op if `res.len() >= target`.
fn pad_to(res: &mut Vec<Vec<f64>>, target: usize) {
    let chosen = res.len();
    if chosen == 0 {
        return;
    }
    for i in chosen..target {
        res.push(res[i % chosen].clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn plus_plus_returns_exactly_k_centroids() {
        let candidates: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(0);
        let res = plus_plus(&candidates, 5, 0, &mut rng);
        assert_eq!(res.len(), 5);
    }

    #[test]
    fn furthest_returns_exactly_k_centroids() {
        let candidates: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let res = furthest(&candidates, 5, 0);
        assert_eq!(res.len(), 5);
    }

    #[test]
    fn furthest_picks_extremes_for_well_separated_clusters() {
        let candidates = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
        ];
        let res = furthest(&candidates, 2, 0);
        assert_eq!(res.len(), 2);
        let xs: Vec<f64> = res.iter().map(|c| c[0]).collect();
        assert!(xs.iter().any(|&x| x < 5.0));
        assert!(xs.iter().any(|&x| x >= 5.0));
    }

    #[test]
    fn furthest_starts_deterministically_from_first_candidate() {
        let candidates = vec![vec![0.0], vec![1.0], vec![2.0]];
        let a = furthest(&candidates, 1, 0);
        let b = furthest(&candidates, 1, 0);
        assert_eq!(a, vec![vec![0.0]]);
        assert_eq!(a, b);
    }

    #[test]
    fn k_larger_than_candidates_pads_to_exactly_k() {
        let candidates = vec![vec![0.0], vec![1.0]];
        let mut rng = rand::rngs::SmallRng::seed_from_u64(0);
        let res = plus_plus(&candidates, 10, 0, &mut rng);
        assert_eq!(res.len(), 10);
        // every padded centroid is a duplicate of one of the two
        // genuine candidates, not a fabricated value.
        assert!(res.iter().all(|c| c == &candidates[0] || c == &candidates[1]));
    }

    #[test]
    fn furthest_pads_to_exactly_k_when_candidates_are_scarce() {
        let candidates = vec![vec![0.0], vec![1.0]];
        let res = furthest(&candidates, 5, 0);
        assert_eq!(res.len(), 5);
        assert!(res.iter().all(|c| c == &candidates[0] || c == &candidates[1]));
    }
}
