//! Driver: orchestrates parameter validation, column
//! permutation, K-Means|| initialization, reclustering, and the Lloyd
//! convergence loop with empty-cluster rescue.

use crate::error::{Result, TrainError};
use crate::frame::{move_categoricals_first, Frame};
use crate::job::{Job, ModelStore};
use crate::model::Model;
use crate::params::{Init, TrainingParameters};
use crate::recluster;
use crate::standardize::Standardizer;
use crate::tasks::{lloyds, sampler, sumsqr};
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// `max(0, (long)(u * n) - 1)`: the in-repo row-sampling formula,
/// preserved byte-for-byte per spec.md §9 rather than replaced with
/// the unbiased `(long)(u * n)` clamped to `[0, n-1]`. This slightly
/// over-weights row 0.
fn random_row<R: Rng>(rng: &mut R, n: u64) -> u64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    let sampled = (u * n as f64) as i64 - 1;
    sampled.max(0) as u64
}

/// Orchestrates a single training run over a [`Frame`].
pub struct Driver {
    /// Row-range size handed to each map-phase chunk.
    chunk_size: u64,
    show_progress: bool,
}

impl Driver {
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Train a model over `frame`. Mutates `frame` in place once, to
    /// permute categorical columns to the leading positions
    ///.
    pub fn train<F: Frame>(
        &self,
        frame: &mut F,
        params: TrainingParameters,
    ) -> Result<Arc<Job<Model>>> {
        let n = frame.num_rows();
        params.validate(n)?;

        let ncats = move_categoricals_first(frame);
        let standardizer = Standardizer::fit(frame, params.standardize);
        let f = standardizer.num_features();
        let k = params.k as usize;

        log::info!(
            "{:<32}{:<32}",
            "starting training",
            format!("n={n} f={f} ncats={ncats} k={k}"),
        );

        let job = Job::start(params.max_iters + crate::KMEANS_ROUNDS as u64);
        let model_store: ModelStore<Model> = ModelStore::new();

        // Write-lock the model for the duration of this run and
        // release it on every exit path below, success or failure
        // (spec.md §5's resource policy).
        model_store.lock(Model {
            names: frame.names().to_vec(),
            ncats,
            centroids: Vec::new(),
            rows_per_cluster: Vec::new(),
            within_mse: Vec::new(),
            total_avg_ss: 0.0,
            avg_within_ss: 0.0,
            avg_between_ss: 0.0,
            iterations: 0,
        });

        let result = self.train_locked(frame, &standardizer, params, n, ncats, k, &job, &model_store);
        model_store.unlock();
        result
    }

    /// The body of [`Self::train`] once the model write-lock is held;
    /// `train` unlocks unconditionally after this returns.
    #[allow(clippy::too_many_arguments)]
    fn train_locked<F: Frame>(
        &self,
        frame: &mut F,
        standardizer: &Standardizer,
        params: TrainingParameters,
        n: u64,
        ncats: usize,
        k: usize,
        job: &Arc<Job<Model>>,
        model_store: &ModelStore<Model>,
    ) -> Result<Arc<Job<Model>>> {
        let mut rng = rand::rngs::SmallRng::seed_from_u64(params.seed.wrapping_sub(1));

        let mut centroids = match params.init {
            Init::None => (0..k)
                .map(|_| standardizer.data(frame, random_row(&mut rng, n)))
                .collect::<Vec<_>>(),
            Init::PlusPlus | Init::Furthest => {
                let result = self.kmeans_parallel(
                    frame,
                    standardizer,
                    &params,
                    n,
                    ncats,
                    job,
                    model_store,
                    &mut rng,
                );
                match result {
                    Ok(c) => c,
                    Err(e) => {
                        job.cancel(Some(e.to_string()));
                        return Err(e);
                    }
                }
            }
        };

        if !job.is_running() {
            return Err(TrainError::Cancelled);
        }

        match self.lloyd_loop(frame, standardizer, &params, n, ncats, k, &mut centroids, job, model_store) {
            Ok(model) => {
                model_store.update(model.clone());
                job.publish(model);
                job.done();
                Ok(Arc::clone(job))
            }
            Err(e) => {
                job.cancel(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// K-Means|| oversampling: five rounds of SumSqr -> Sampler,
    /// followed by reclustering down to `K` centroids.
    #[allow(clippy::too_many_arguments)]
    fn kmeans_parallel<F: Frame>(
        &self,
        frame: &F,
        standardizer: &Standardizer,
        params: &TrainingParameters,
        n: u64,
        ncats: usize,
        job: &Arc<Job<Model>>,
        model_store: &ModelStore<Model>,
        rng: &mut rand::rngs::SmallRng,
    ) -> Result<Vec<Vec<f64>>> {
        let mut candidates = vec![standardizer.data(frame, random_row(rng, n))];
        let ell = params.ell() as f64;
        let bar = crate::progress(crate::KMEANS_ROUNDS as u64, self.show_progress);

        for round in 0..crate::KMEANS_ROUNDS {
            if !job.is_running() {
                return Err(TrainError::Cancelled);
            }
            let psi = sumsqr::run(frame, standardizer, &candidates, self.chunk_size);
            let sample = sampler::run(
                frame,
                standardizer,
                &candidates,
                psi,
                ell,
                params.seed,
                self.chunk_size,
            );
            log::debug!(
                "{:<32}{:<32}",
                "kmeans|| round",
                format!("round={round} psi={psi:.4} sampled={}", sample.len()),
            );
            candidates.extend(sample);

            let snapshot = Model {
                names: Vec::new(),
                ncats,
                centroids: candidates.iter().map(|c| standardizer.destandardize(c)).collect(),
                rows_per_cluster: Vec::new(),
                within_mse: Vec::new(),
                total_avg_ss: psi / n as f64,
                avg_within_ss: psi / n as f64,
                avg_between_ss: 0.0,
                iterations: round as u64 + 1,
            };
            model_store.update(snapshot.clone());
            job.publish(snapshot);
            job.update(1);
            bar.inc(1);

            if !job.is_running() {
                return Err(TrainError::Cancelled);
            }
        }
        bar.finish_and_clear();

        let reclustered = match params.init {
            Init::PlusPlus => recluster::plus_plus(&candidates, params.k as usize, ncats, rng),
            Init::Furthest => recluster::furthest(&candidates, params.k as usize, ncats),
            Init::None => unreachable!("kmeans_parallel only runs for PlusPlus/Furthest"),
        };
        Ok(reclustered)
    }

    /// Lloyd's iteration to convergence or `max_iters`, with
    /// empty-cluster rescue.
    #[allow(clippy::too_many_arguments)]
    fn lloyd_loop<F: Frame>(
        &self,
        frame: &F,
        standardizer: &Standardizer,
        params: &TrainingParameters,
        n: u64,
        ncats: usize,
        k: usize,
        centroids: &mut Vec<Vec<f64>>,
        job: &Arc<Job<Model>>,
        model_store: &ModelStore<Model>,
    ) -> Result<Model> {
        let mut r: u64 = 0;
        let mut reinit_attempts: usize = 0;
        let mut last: Option<Model> = None;
        let bar = crate::progress(params.max_iters, self.show_progress);

        while r < params.max_iters {
            if !job.is_running() {
                return Err(TrainError::Cancelled);
            }
            let prev = centroids.clone();

            // Inner retry loop: rescues one empty cluster at a time,
            // re-running LloydsTask while more than one cluster is
            // empty, bounded by `reinit_attempts < k`.
            let (state, mut new_centroids, rows, _accepted_without_retry) = loop {
                let state = lloyds::run(frame, standardizer, centroids, self.chunk_size);
                let new_centroids = state.finalize_centroids(centroids, ncats);
                let mut rows = state.rows.clone();
                let empties: Vec<usize> = (0..k).filter(|&c| rows[c] == 0).collect();

                if empties.is_empty() {
                    break (state, new_centroids, rows, true);
                }

                let worst = state
                    .worst
                    .expect("lloyd pass over n >= k rows always assigns at least one row");
                let rescued_centroid = standardizer.data(frame, worst.0);
                let mut new_centroids = new_centroids;
                new_centroids[empties[0]] = rescued_centroid;
                rows[empties[0]] = 1;

                if empties.len() == 1 {
                    break (state, new_centroids, rows, true);
                }

                // More than one empty cluster: this pass doesn't count.
                reinit_attempts += 1;
                *centroids = new_centroids;
                if reinit_attempts >= k {
                    log::warn!(
                        "{:<32}{:<32}",
                        "rescue attempts exhausted",
                        format!("accepting {} empty clusters", empties.len() - 1),
                    );
                    reinit_attempts = 0;
                    break (state, centroids.clone(), rows, false);
                }
                continue;
            };

            let total_c_sqr: f64 = state.c_sqr.iter().sum();
            let avg_within_ss = total_c_sqr / n as f64;
            let within_mse: Vec<f64> = state
                .c_sqr
                .iter()
                .zip(rows.iter())
                .map(|(&sqr, &cnt)| if cnt > 0 { sqr / cnt as f64 } else { 0.0 })
                .collect();

            let avg_ss = if k == 1 {
                avg_within_ss
            } else {
                let origin = vec![vec![0.0; standardizer.num_features()]];
                let psi0 = sumsqr::run(frame, standardizer, &origin, self.chunk_size);
                psi0 / n as f64
            };
            let avg_between_ss = avg_ss - avg_within_ss;

            let delta = lloyds::centroid_drift(&prev, &new_centroids, ncats);

            let model = Model {
                names: frame.names().to_vec(),
                ncats,
                centroids: new_centroids
                    .iter()
                    .map(|c| standardizer.destandardize(c))
                    .collect(),
                rows_per_cluster: rows,
                within_mse,
                total_avg_ss: avg_ss,
                avg_within_ss,
                avg_between_ss,
                iterations: r + 1,
            };
            model_store.update(model.clone());
            job.publish(model.clone());
            job.update(1);
            bar.inc(1);

            r += 1;
            std::mem::swap(centroids, &mut new_centroids);
            last = Some(model);

            log::info!(
                "{:<32}{:<32}",
                "lloyd iteration",
                format!("r={r} delta={delta:.3e} avgWithinSS={avg_within_ss:.4}"),
            );

            if delta < crate::CONVERGENCE_EPSILON {
                log::info!("{:<32}{:<32}", "converged", format!("r={r} delta={delta:.3e}"));
                break;
            }
        }
        bar.finish_and_clear();

        last.ok_or_else(|| TrainError::Runtime("Lloyd loop produced no iterations".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::VecFrame;
    use approx::assert_relative_eq;

    #[test]
    fn s1_trivial_k1_numeric() {
        let mut frame = VecFrame::from_numeric(vec!["x".into()], vec![vec![1.0, 2.0, 3.0, 4.0]]);
        let params = TrainingParameters {
            k: 1,
            max_iters: 10,
            init: Init::None,
            standardize: false,
            seed: 0,
        };
        let job = Driver::new(2).train(&mut frame, params).unwrap();
        let model = job.snapshot().unwrap();
        assert_eq!(model.centroids.len(), 1);
        assert_relative_eq!(model.centroids[0][0], 2.5, epsilon = 1e-6);
        assert_eq!(model.rows_per_cluster, vec![4]);
        assert_relative_eq!(model.avg_within_ss, 1.25, epsilon = 1e-6);
        assert_relative_eq!(model.avg_between_ss, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn s2_two_well_separated_clusters() {
        let mut frame = VecFrame::from_numeric(
            vec!["x".into(), "y".into()],
            vec![vec![0.0, 0.0, 10.0, 10.0], vec![0.0, 1.0, 10.0, 11.0]],
        );
        let params = TrainingParameters {
            k: 2,
            max_iters: 50,
            init: Init::Furthest,
            standardize: false,
            seed: 42,
        };
        let job = Driver::new(2).train(&mut frame, params).unwrap();
        let model = job.snapshot().unwrap();
        let mut rows = model.rows_per_cluster.clone();
        rows.sort();
        assert_eq!(rows, vec![2, 2]);
        assert!((model.avg_within_ss - 0.25).abs() < 1e-6);
    }

    #[test]
    fn s3_categorical_only() {
        let mut frame = VecFrame::from_numeric(Vec::new(), Vec::new());
        frame.push_categorical("c".into(), vec![0, 0, 1, 1, 2, 2, 2], 3);
        let params = TrainingParameters {
            k: 3,
            max_iters: 20,
            init: Init::Furthest,
            standardize: false,
            seed: 1,
        };
        let job = Driver::new(3).train(&mut frame, params).unwrap();
        let model = job.snapshot().unwrap();
        let mut rows = model.rows_per_cluster.clone();
        rows.sort();
        assert_eq!(rows, vec![2, 2, 3]);
        assert!(model.avg_within_ss.abs() < 1e-9);
        let mut levels: Vec<i64> = model.centroids.iter().map(|c| c[0].round() as i64).collect();
        levels.sort();
        assert_eq!(levels, vec![0, 1, 2]);
    }

    #[test]
    fn s5_empty_cluster_rescue_does_not_panic() {
        let mut frame = VecFrame::from_numeric(vec!["x".into()], vec![vec![5.0; 5]]);
        let params = TrainingParameters {
            k: 3,
            max_iters: 5,
            init: Init::None,
            standardize: false,
            seed: 3,
        };
        let job = Driver::new(5).train(&mut frame, params).unwrap();
        let model = job.snapshot().unwrap();
        // All 5 rows are identical, so every reported iteration here
        // hits the `reinit_attempts >= k` bound on its very first
        // pass: the published model is a just-rescued state with one
        // synthetic row (spec.md §8 property 2 allows `sum == N + 1`
        // immediately after a rescue, not just `sum == N`).
        let sum: u64 = model.rows_per_cluster.iter().sum();
        assert!(sum == 5 || sum == 6, "rows_per_cluster sum was {sum}");
    }

    #[test]
    fn rejects_invalid_k() {
        let mut frame = VecFrame::from_numeric(vec!["x".into()], vec![vec![1.0, 2.0]]);
        let params = TrainingParameters {
            k: 0,
            max_iters: 10,
            init: Init::None,
            standardize: false,
            seed: 0,
        };
        let result = Driver::new(2).train(&mut frame, params);
        assert!(matches!(result, Err(TrainError::Validation(_))));
    }

    #[test]
    fn determinism_same_seed_same_chunking() {
        let make_frame = || {
            VecFrame::from_numeric(
                vec!["x".into(), "y".into()],
                vec![
                    vec![0.0, 1.0, 0.2, 9.0, 9.5, 8.8, 0.1, 9.2],
                    vec![0.0, 0.1, 1.0, 9.0, 9.2, 9.5, 0.3, 9.1],
                ],
            )
        };
        let params = || TrainingParameters {
            k: 2,
            max_iters: 30,
            init: Init::PlusPlus,
            standardize: true,
            seed: 123,
        };
        let mut f1 = make_frame();
        let mut f2 = make_frame();
        let job1 = Driver::new(3).train(&mut f1, params()).unwrap();
        let job2 = Driver::new(3).train(&mut f2, params()).unwrap();
        let m1 = job1.snapshot().unwrap();
        let m2 = job2.snapshot().unwrap();
        assert_eq!(m1.centroids, m2.centroids);
    }
}
