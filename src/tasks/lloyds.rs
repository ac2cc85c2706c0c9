//! LloydsTask: assign every row to its nearest
//! centroid and accumulate per-cluster sums, categorical histograms,
//! row counts, and the single worst-fit row across the whole frame.

use crate::distance::{closest, distance};
use crate::frame::Frame;
use crate::mapreduce::map_reduce;
use crate::standardize::Standardizer;

/// Per-cluster accumulation produced by one Lloyd pass, after
/// map+reduce but before the Driver's post-reduce categorical
/// finalization.
#[derive(Debug, Clone)]
pub struct ClusterState {
    /// `[k][col]`, numeric positions only are meaningful (`[ncats, F)`);
    /// categorical positions stay `0.0` and are ignored.
    pub c_means: Vec<Vec<f64>>,
    /// `[k][col][level]`, jagged over categorical columns only.
    pub cats: Vec<Vec<Vec<u64>>>,
    pub c_sqr: Vec<f64>,
    pub rows: Vec<u64>,
    pub worst: Option<(u64, f64)>,
}

impl ClusterState {
    fn empty(k: usize, f: usize, ncats: usize, cardinality: &[i32]) -> Self {
        Self {
            c_means: vec![vec![0.0; f]; k],
            cats: (0..k)
                .map(|_| {
                    (0..ncats)
                        .map(|c| vec![0u64; cardinality[c].max(0) as usize])
                        .collect()
                })
                .collect(),
            c_sqr: vec![0.0; k],
            rows: vec![0; k],
            worst: None,
        }
    }

    fn absorb_row(&mut self, clu: usize, dist: f64, row_id: u64, values: &[f64], ncats: usize) {
        self.c_sqr[clu] += dist;
        for col in 0..ncats {
            let level = values[col] as usize;
            self.cats[clu][col][level] += 1;
        }
        for (col, &v) in values.iter().enumerate().skip(ncats) {
            self.c_means[clu][col] += v;
        }
        self.rows[clu] += 1;
        if dist > self.worst.map(|(_, e)| e).unwrap_or(f64::MIN) {
            self.worst = Some((row_id, dist));
        }
    }

    /// After a chunk's map pass, collapse numeric sums into local
    /// per-cluster means.
    fn local_finalize(&mut self, ncats: usize) {
        for clu in 0..self.c_means.len() {
            if self.rows[clu] > 0 {
                let n = self.rows[clu] as f64;
                for v in self.c_means[clu].iter_mut().skip(ncats) {
                    *v /= n;
                }
            }
        }
    }

    /// Recursive-mean reduce: combine two partial accumulators. Numeric
    /// means are combined via the weighted recursive mean rather than
    /// naive sum-then-divide, preserving precision for imbalanced
    /// partition sizes.
    fn combine(mut self, other: Self) -> Self {
        let k = self.c_means.len();
        for clu in 0..k {
            let ra = self.rows[clu] as f64;
            let rb = other.rows[clu] as f64;
            if ra + rb > 0.0 {
                for col in 0..self.c_means[clu].len() {
                    let ma = self.c_means[clu][col];
                    let mb = other.c_means[clu][col];
                    self.c_means[clu][col] = (ma * ra + mb * rb) / (ra + rb);
                }
            }
            for col in 0..self.cats[clu].len() {
                for level in 0..self.cats[clu][col].len() {
                    self.cats[clu][col][level] += other.cats[clu][col][level];
                }
            }
            self.c_sqr[clu] += other.c_sqr[clu];
            self.rows[clu] += other.rows[clu];
        }
        self.worst = match (self.worst, other.worst) {
            (Some(a), Some(b)) => Some(if a.1 >= b.1 { a } else { b }),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
        self
    }

    /// Finalize categorical centroid positions as the per-cluster
    /// modal level (ties broken by lowest level index), and numeric
    /// positions as the recursive mean already computed. Clusters with
    /// zero rows keep the centroid unchanged (caller applies rescue).
    pub fn finalize_centroids(&self, previous: &[Vec<f64>], ncats: usize) -> Vec<Vec<f64>> {
        previous
            .iter()
            .enumerate()
            .map(|(clu, prev)| {
                if self.rows[clu] == 0 {
                    return prev.clone();
                }
                let mut centroid = self.c_means[clu].clone();
                for col in 0..ncats {
                    let counts = &self.cats[clu][col];
                    let mode = counts
                        .iter()
                        .enumerate()
                        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
                        .map(|(level, _)| level)
                        .unwrap_or(0);
                    centroid[col] = mode as f64;
                }
                centroid
            })
            .collect()
    }
}

/// Run one Lloyd map/reduce pass against the current `centroids`.
pub fn run<F: Frame>(
    frame: &F,
    standardizer: &Standardizer,
    centroids: &[Vec<f64>],
    chunk_size: u64,
) -> ClusterState {
    let ncats = standardizer.ncats();
    let f = standardizer.num_features();
    let k = centroids.len();
    let cardinality: Vec<i32> = (0..ncats).map(|c| standardizer.cardinality(c)).collect();
    let chunks = frame.chunks(chunk_size);
    map_reduce(
        &chunks,
        || ClusterState::empty(k, f, ncats, &cardinality),
        |chunk| {
            let mut local = ClusterState::empty(k, f, ncats, &cardinality);
            for row in chunk.rows() {
                let values = standardizer.data(frame, row);
                let (clu, dist) = closest(centroids, &values, k, ncats);
                local.absorb_row(clu, dist, row, &values, ncats);
            }
            local.local_finalize(ncats);
            local
        },
        |a, b| a.combine(b),
    )
}

/// `Delta = sum_k distance(prev_k, new_k, ncats) / F`.
pub fn centroid_drift(previous: &[Vec<f64>], next: &[Vec<f64>], ncats: usize) -> f64 {
    let f = previous.first().map(|c| c.len()).unwrap_or(1).max(1);
    let total: f64 = previous
        .iter()
        .zip(next.iter())
        .map(|(p, n)| distance(p, n, ncats))
        .sum();
    total / f as f64
}
