//! Exhaustive grid search over the four degree exponents
//!
//! Every combination gets its own freshly sampled holdout split, a freshly
//! reset predictor, and is scored by MAP@k. The best combination is then
//! re-evaluated on an independent split as a test run.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::matrix::SparseMatrix;
use crate::predictor::LinkPredictor;
use crate::propagation::Exponents;
use crate::sampling::HoldoutSampler;

const DEFAULT_AXIS: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];

/// Candidate values per exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub alpha: Vec<f64>,
    pub beta: Vec<f64>,
    pub gamma: Vec<f64>,
    pub delta: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self::uniform(&DEFAULT_AXIS)
    }
}

impl ParamGrid {
    /// The same candidate values on every axis.
    pub fn uniform(values: &[f64]) -> Self {
        Self {
            alpha: values.to_vec(),
            beta: values.to_vec(),
            gamma: values.to_vec(),
            delta: values.to_vec(),
        }
    }

    /// Number of combinations.
    pub fn len(&self) -> usize {
        self.alpha.len() * self.beta.len() * self.gamma.len() * self.delta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cartesian product in lexicographic order, `delta` varying fastest.
    pub fn combinations(&self) -> impl Iterator<Item = Exponents> + '_ {
        self.alpha.iter().flat_map(move |&alpha| {
            self.beta.iter().flat_map(move |&beta| {
                self.gamma.iter().flat_map(move |&gamma| {
                    self.delta
                        .iter()
                        .map(move |&delta| Exponents::new(alpha, beta, gamma, delta))
                })
            })
        })
    }
}

/// One scored combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub exponents: Exponents,
    pub score: f64,
}

/// Result of a grid search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Highest-scoring combination; `None` if nothing scored above zero
    pub best: Option<Trial>,
    /// Every successfully scored combination, in grid order
    pub trials: Vec<Trial>,
    /// Combinations that failed, with the error message
    pub skipped: Vec<(Exponents, String)>,
    /// Score of `best` on an independent holdout split
    pub test_score: Option<f64>,
}

/// Grid search driver
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub grid: ParamGrid,
    pub sampler: HoldoutSampler,
    /// Template for rounds, augmentation rate and k; exponents are overwritten
    pub predictor: LinkPredictor,
    pub batch_size: usize,
    /// Rows scored per split; all rows when `None`
    pub total: Option<usize>,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            grid: ParamGrid::default(),
            sampler: HoldoutSampler::default(),
            predictor: LinkPredictor::default(),
            batch_size: 600,
            total: None,
        }
    }
}

impl GridSearch {
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            ..Self::default()
        }
    }

    pub fn with_sampler(mut self, sampler: HoldoutSampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_predictor(mut self, predictor: LinkPredictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Search over `matrix`, drawing splits from the sampler's own RNG.
    pub fn run(&self, matrix: &SparseMatrix) -> SearchOutcome {
        self.run_with_rng(matrix, &mut self.sampler.rng())
    }

    /// Search over `matrix`, drawing every split from `rng`.
    ///
    /// A failing combination is logged and skipped; the search always runs
    /// to completion.
    pub fn run_with_rng<R: Rng + ?Sized>(&self, matrix: &SparseMatrix, rng: &mut R) -> SearchOutcome {
        let _span = tracing::info_span!("grid_search", combinations = self.grid.len()).entered();
        let mut predictor = self.predictor.clone();
        let mut outcome = SearchOutcome::default();

        for exponents in self.grid.combinations() {
            match self.evaluate(&mut predictor, matrix, exponents, rng) {
                Ok(score) => {
                    tracing::info!(
                        alpha = exponents.alpha,
                        beta = exponents.beta,
                        gamma = exponents.gamma,
                        delta = exponents.delta,
                        score,
                        "combination scored"
                    );
                    let trial = Trial { exponents, score };
                    if score > outcome.best.map_or(0.0, |best| best.score) {
                        outcome.best = Some(trial);
                    }
                    outcome.trials.push(trial);
                }
                Err(err) => {
                    tracing::warn!(?exponents, error = %err, "combination failed, skipping");
                    outcome.skipped.push((exponents, err.to_string()));
                }
            }
        }

        if let Some(best) = outcome.best {
            match self.evaluate(&mut predictor, matrix, best.exponents, rng) {
                Ok(score) => {
                    tracing::info!(score, exponents = ?best.exponents, "final test score");
                    outcome.test_score = Some(score);
                }
                Err(err) => tracing::warn!(error = %err, "test run failed"),
            }
        }
        outcome
    }

    /// Fresh split, fresh degrees, fit on the observed view, score against
    /// the held-out target.
    fn evaluate<R: Rng + ?Sized>(
        &self,
        predictor: &mut LinkPredictor,
        matrix: &SparseMatrix,
        exponents: Exponents,
        rng: &mut R,
    ) -> Result<f64> {
        let _span = tracing::debug_span!("combination", ?exponents).entered();
        let split = self.sampler.sample_with_rng(matrix, rng)?;
        let total = self.total.unwrap_or(matrix.rows());

        predictor.reset();
        predictor.set_params(exponents, self.predictor.rounds, self.predictor.k);
        predictor.fit_multi(&split.observed, self.batch_size, total)?;
        let outcome = predictor.score(&split.observed, &split.target, self.batch_size, total)?;
        Ok(outcome.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Reduce;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Block-structured interactions: sources in group g buy items of group g.
    fn grouped() -> SparseMatrix {
        let mut entries = Vec::new();
        for row in 0..30 {
            let group = row % 3;
            for col in (group * 4)..(group * 4 + 4) {
                if (row + col) % 4 != 0 {
                    entries.push((row, col, 1.0));
                }
            }
        }
        SparseMatrix::from_triplets(30, 12, entries, Reduce::Max).unwrap()
    }

    #[test]
    fn test_default_grid_has_625_combinations() {
        let grid = ParamGrid::default();
        assert_eq!(grid.len(), 625);
        assert_eq!(grid.combinations().count(), 625);

        let first = grid.combinations().next().unwrap();
        assert_eq!(first, Exponents::uniform(0.1));
        let second = grid.combinations().nth(1).unwrap();
        assert_eq!(second, Exponents::new(0.1, 0.1, 0.1, 0.3));
    }

    #[test]
    fn test_search_finds_best_and_tests_it() {
        let grid = ParamGrid {
            alpha: vec![0.1, 0.9],
            beta: vec![0.5],
            gamma: vec![0.5],
            delta: vec![0.1, 0.9],
        };
        let search = GridSearch::new(grid)
            .with_sampler(HoldoutSampler::new().with_ratio(0.4))
            .with_predictor(LinkPredictor::new().with_k(4))
            .with_batch_size(7);

        let outcome = search.run_with_rng(&grouped(), &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(outcome.trials.len(), 4);
        assert!(outcome.skipped.is_empty());

        let best = outcome.best.unwrap();
        let max = outcome
            .trials
            .iter()
            .map(|t| t.score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.score, max);
        assert!(best.score > 0.0);
        assert!(outcome.test_score.is_some());
    }

    #[test]
    fn test_seeded_search_is_reproducible() {
        let grid = ParamGrid::uniform(&[0.3, 0.7]);
        let search = GridSearch::new(grid)
            .with_sampler(HoldoutSampler::new().with_seed(9))
            .with_batch_size(10);
        let a = search.run(&grouped());
        let b = search.run(&grouped());
        assert_eq!(a.trials, b.trials);
        assert_eq!(a.test_score, b.test_score);
    }

    #[test]
    fn test_failing_combination_is_skipped() {
        let grid = ParamGrid {
            alpha: vec![0.5, f64::NAN],
            ..ParamGrid::uniform(&[0.5])
        };
        let search = GridSearch::new(grid)
            .with_sampler(HoldoutSampler::new().with_seed(4))
            .with_predictor(LinkPredictor::new().with_k(4))
            .with_batch_size(10);

        let outcome = search.run(&grouped());
        assert_eq!(outcome.trials.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].0.alpha.is_nan());
        assert!(outcome.skipped[0].1.contains("non-finite"));
        assert_eq!(outcome.trials[0].exponents, Exponents::uniform(0.5));
    }

    #[test]
    fn test_empty_grid_has_no_best() {
        let grid = ParamGrid {
            delta: Vec::new(),
            ..ParamGrid::default()
        };
        assert!(grid.is_empty());
        let outcome = GridSearch::new(grid).run(&grouped());
        assert!(outcome.trials.is_empty());
        assert!(outcome.best.is_none());
        assert!(outcome.test_score.is_none());
    }

    #[test]
    fn test_edgeless_matrix_scores_zero() {
        let search = GridSearch::new(ParamGrid::uniform(&[0.5]))
            .with_sampler(HoldoutSampler::new().with_seed(2));
        let outcome = search.run(&SparseMatrix::empty(5, 4));
        assert_eq!(outcome.trials.len(), 1);
        assert_eq!(outcome.trials[0].score, 0.0);
        assert!(outcome.best.is_none());
    }
}
