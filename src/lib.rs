//! Distributed, scalable K-Means|| clustering trainer.
//!
//! This crate implements the training *core* described by the project
//! specification: three data-parallel map/reduce passes (`SumSqr`,
//! `Sampler`, `Lloyds`) composed by a [`driver::Driver`] into a
//! K-Means|| initialization followed by Lloyd's iteration, over a
//! columnar frame mixing numeric and categorical features.
//!
//! Dataset ingestion, the job scheduler, model persistence, and the
//! HTTP/RPC surface are explicitly out of scope here: this crate
//! consumes those as the traits in [`frame`] and [`job`], and ships a
//! minimal in-memory reference implementation of each so the core is
//! directly testable.

pub mod distance;
pub mod driver;
pub mod error;
pub mod frame;
pub mod job;
pub mod mapreduce;
pub mod model;
pub mod params;
pub mod recluster;
pub mod standardize;
pub mod tasks;

pub use driver::Driver;
pub use error::TrainError;
pub use model::Model;
pub use params::{Init, TrainingParameters};

/// Number of K-Means|| oversampling rounds run by the driver before
/// reclustering the candidate set down to `K` centroids.
pub const KMEANS_ROUNDS: usize = 5;

/// Oversampling factor `ell` used by the sampler, expressed as a
/// multiple of `K` (`ell = SAMPLE_FACTOR * K`).
pub const SAMPLE_FACTOR: usize = 3;

/// Convergence threshold on mean per-feature centroid drift between
/// successive accepted Lloyd iterations.
pub const CONVERGENCE_EPSILON: f64 = 1e-6;

/// Standardization is skipped (multiplier forced to `1.0`) for any
/// column whose standard deviation falls at or below this floor.
pub const SIGMA_FLOOR: f64 = 1e-6;

/// Build an [`indicatif::ProgressBar`] with the teacher's terminal
/// progress style. Returns a hidden bar when `enabled` is `false`, so
/// tests and headless runs never pay for terminal I/O.
pub fn progress(total: u64, enabled: bool) -> indicatif::ProgressBar {
    if !enabled {
        return indicatif::ProgressBar::hidden();
    }
    let bar = indicatif::ProgressBar::new(total);
    bar.set_style(
        indicatif::ProgressStyle::with_template(
            "{elapsed_precise} {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    bar
}
