//! Holdout sampling for offline evaluation
//!
//! Splits the positive entries of an interaction matrix into an observed
//! view (model input) and a held-out target view (ground truth). Rows with
//! a single interaction are never sampled from, so every source keeps at
//! least part of its signal.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::degree::degrees;
use crate::error::Result;
use crate::matrix::{batched_dense_op, Axis, SparseMatrix};

/// Marker written over the entries of rows eligible for holdout.
pub const HOLDOUT_SENTINEL: f64 = 2.0;

/// Observed / target pair of identical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutSplit {
    pub observed: SparseMatrix,
    pub target: SparseMatrix,
}

impl HoldoutSplit {
    /// Union of both views, densified `batch_size` rows at a time.
    pub fn recombine(&self, batch_size: usize) -> Result<SparseMatrix> {
        batched_dense_op(batch_size, f64::max, &self.observed, &self.target)
    }

    /// Fraction of positive entries that ended up in the target.
    pub fn realized_ratio(&self) -> f64 {
        let held = self.target.nnz();
        let total = held + self.observed.nnz();
        if total == 0 {
            0.0
        } else {
            held as f64 / total as f64
        }
    }
}

/// Random edge holdout over rows with degree > 1
#[derive(Debug, Clone)]
pub struct HoldoutSampler {
    /// Target share of eligible entries to hold out
    pub ratio: f64,
    /// Fixed seed for reproducible splits; fresh entropy when `None`
    pub seed: Option<u64>,
}

impl Default for HoldoutSampler {
    fn default() -> Self {
        Self {
            ratio: 0.4,
            seed: None,
        }
    }
}

impl HoldoutSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the holdout ratio
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    /// Seed the sampler's RNG
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// RNG the sampler draws from when none is supplied.
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    pub fn sample(&self, matrix: &SparseMatrix) -> Result<HoldoutSplit> {
        self.sample_with_rng(matrix, &mut self.rng())
    }

    /// Split `matrix` drawing from `rng`.
    ///
    /// Each eligible entry is held out with probability
    /// `ratio * eligible / nnz`, computed from the realized eligible count,
    /// so the achieved ratio varies around the requested one.
    pub fn sample_with_rng<R: Rng + ?Sized>(
        &self,
        matrix: &SparseMatrix,
        rng: &mut R,
    ) -> Result<HoldoutSplit> {
        let eligible: Vec<bool> = degrees(matrix, Axis::Rows)
            .into_iter()
            .map(|d| d > 1.0)
            .collect();
        let marked = matrix
            .pruned()
            .reassign_on_mask(&eligible, HOLDOUT_SENTINEL, Axis::Rows)?;

        let candidates = marked
            .iter()
            .filter(|&(_, _, v)| v == HOLDOUT_SENTINEL)
            .count();
        let probability = if marked.is_empty() {
            0.0
        } else {
            candidates as f64 / marked.nnz() as f64 * self.ratio
        };

        let mut observed = Vec::with_capacity(marked.nnz());
        let mut target = Vec::new();
        for (row, col, value) in marked.iter() {
            if value != HOLDOUT_SENTINEL {
                observed.push((row, col, value));
            } else if rng.gen::<f64>() < probability {
                target.push((row, col, 1.0));
            } else {
                observed.push((row, col, 1.0));
            }
        }

        let split = HoldoutSplit {
            observed: SparseMatrix::from_sorted(matrix.rows(), matrix.cols(), observed),
            target: SparseMatrix::from_sorted(matrix.rows(), matrix.cols(), target),
        };
        tracing::debug!(
            eligible = candidates,
            held_out = split.target.nnz(),
            ratio = split.realized_ratio(),
            "holdout sampled"
        );
        Ok(split)
    }
}
