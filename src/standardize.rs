//! Standardizer: per-column centering/scaling derived once from the
//! training frame, applied during row materialization and reversed
//! for reporting.

use crate::frame::Frame;

/// Per-column centering/scaling factors plus the NA-imputation and
/// (de)standardization row transforms.
#[derive(Debug, Clone)]
pub struct Standardizer {
    /// `true` for the leading `ncats` columns.
    is_categorical: Vec<bool>,
    cardinality: Vec<i32>,
    mean: Vec<f64>,
    /// `1/sigma` if `sigma > SIGMA_FLOOR`, else `1.0`.
    mult: Vec<f64>,
    standardize: bool,
}

impl Standardizer {
    /// Derive centering/scaling from `frame`'s per-column statistics.
    /// `frame` must already have its categorical columns permuted to
    /// the leading positions (see [`crate::frame::move_categoricals_first`]).
    pub fn fit<F: Frame>(frame: &F, standardize: bool) -> Self {
        let f = frame.num_cols();
        let mut is_categorical = Vec::with_capacity(f);
        let mut cardinality = Vec::with_capacity(f);
        let mut mean = Vec::with_capacity(f);
        let mut mult = Vec::with_capacity(f);
        for col in 0..f {
            let card = frame.cardinality(col);
            is_categorical.push(card >= 0);
            cardinality.push(card);
            let mu = frame.mean(col);
            mean.push(mu);
            let sigma = frame.sigma(col);
            mult.push(if sigma > crate::SIGMA_FLOOR {
                1.0 / sigma
            } else {
                1.0
            });
        }
        Self {
            is_categorical,
            cardinality,
            mean,
            mult,
            standardize,
        }
    }

    pub fn ncats(&self) -> usize {
        self.is_categorical.iter().filter(|c| **c).count()
    }

    /// `-1` for numeric columns, `c >= 0` for categorical columns.
    pub fn cardinality(&self, col: usize) -> i32 {
        self.cardinality[col]
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    /// Materialize one row into standardized-coordinate values,
    /// length `F`. Numeric NA imputes to `mean`, then standardizes if
    /// configured. Categorical NA imputes to
    /// `min(round(mean), cardinality - 1)`, never standardized.
    pub fn data<F: Frame>(&self, frame: &F, row: u64) -> Vec<f64> {
        let f = self.num_features();
        let mut out = Vec::with_capacity(f);
        for col in 0..f {
            let raw = frame.at(row, col);
            out.push(self.materialize(col, raw));
        }
        out
    }

    fn materialize(&self, col: usize, raw: f64) -> f64 {
        if self.is_categorical[col] {
            if raw.is_nan() {
                let card = self.cardinality[col].max(1) as f64;
                self.mean[col].round().min(card - 1.0).max(0.0)
            } else {
                raw
            }
        } else {
            let value = if raw.is_nan() { self.mean[col] } else { raw };
            if self.standardize {
                (value - self.mean[col]) * self.mult[col]
            } else {
                value
            }
        }
    }

    /// Inverse the numeric-column transform only; categorical
    /// positions pass through unchanged.
    pub fn destandardize(&self, centroid: &[f64]) -> Vec<f64> {
        centroid
            .iter()
            .enumerate()
            .map(|(col, &v)| {
                if self.is_categorical[col] || !self.standardize {
                    v
                } else {
                    v / self.mult[col] + self.mean[col]
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::VecFrame;

    #[test]
    fn numeric_na_imputes_to_mean() {
        let frame = VecFrame::from_numeric(vec!["x".into()], vec![vec![1.0, 2.0, 3.0, f64::NAN]]);
        let std = Standardizer::fit(&frame, false);
        let row = std.data(&frame, 3);
        assert!((row[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn standardize_roundtrips_within_tolerance() {
        let frame = VecFrame::from_numeric(
            vec!["x".into()],
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]],
        );
        let std = Standardizer::fit(&frame, true);
        for row in 0..frame.num_rows() {
            let raw = frame.at(row, 0);
            let standardized = std.data(&frame, row);
            let destd = std.destandardize(&standardized);
            assert!((destd[0] - raw).abs() < 1e-9);
        }
    }

    #[test]
    fn categorical_na_imputes_to_clamped_rounded_mean() {
        let mut frame = VecFrame::from_numeric(Vec::new(), Vec::new());
        frame.push_categorical("cat".into(), vec![0, 0, 2], 3);
        let std = Standardizer::fit(&frame, true);
        // mean of present levels (0,0,2) = 0.667 -> round -> 1, clamp to [0, 2]
        let imputed = std.materialize(0, f64::NAN);
        assert_eq!(imputed, 1.0);
    }

    #[test]
    fn sigma_below_floor_disables_scaling() {
        let frame = VecFrame::from_numeric(vec!["const".into()], vec![vec![5.0, 5.0, 5.0]]);
        let std = Standardizer::fit(&frame, true);
        assert_eq!(std.mult[0], 1.0);
    }
}
