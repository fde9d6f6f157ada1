//! LinkProp / LinkProp-Multi link predictor
//!
//! Implements the neighborhood-based predictor from "Revisiting
//! Neighborhood-based Link Prediction for Collaborative Filtering"
//! (arXiv:2203.15789): a degree-reweighted two-hop propagation, optionally
//! iterated by self-augmentation rounds that feed confident predictions back
//! into the degree statistics.
//!
//! State machine:
//!
//! ```text
//! Unfit --fit--> Fitted{0} --merge round 1--> Augmented{1} --fit--> Fitted{1} --> ...
//! ```

use crate::degree::{DegreeCache, DegreeStats};
use crate::error::{LinkPropError, Result};
use crate::matrix::{row_batches, CsrMatrix, Reduce, SparseMatrix};
use crate::metrics::mean_average_precision;
use crate::pipeline::observer::{
    BatchClock, BatchObserver, BatchReportBuilder, TracingObserver, STAGE_AUGMENT, STAGE_PREDICT,
    STAGE_SCORE,
};
use crate::propagation::{Exponents, PropagationScorer};

/// Lifecycle of a [`LinkPredictor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorState {
    /// No propagation matrices yet.
    Unfit,
    /// Propagation matrices built; `round` augmentation rounds applied.
    Fitted { round: usize },
    /// Degrees recomputed from round `round`'s augmented matrix, not yet refit.
    Augmented { round: usize },
}

/// Result of [`LinkPredictor::score`].
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Mean of the per-batch MAP@k values
    pub map: f64,
    /// MAP@k of each batch, in sweep order
    pub batch_maps: Vec<f64>,
    /// Predicted top-k ids for every scored row
    pub predictions: Vec<Vec<usize>>,
}

/// Degree-normalized propagation link predictor
#[derive(Debug, Clone)]
pub struct LinkPredictor {
    /// Degree exponents
    pub exponents: Exponents,
    /// Total rounds for `fit_multi` (1 = plain fit)
    pub rounds: usize,
    /// New edges injected per existing edge and round (`t`)
    pub augment_rate: f64,
    /// Number of predictions per row
    pub k: usize,
    degrees: DegreeCache,
    scorer: Option<PropagationScorer>,
    state: PredictorState,
}

impl Default for LinkPredictor {
    fn default() -> Self {
        Self {
            exponents: Exponents::default(),
            rounds: 1,
            augment_rate: 0.05,
            k: 12,
            degrees: DegreeCache::Cold,
            scorer: None,
            state: PredictorState::Unfit,
        }
    }
}

impl LinkPredictor {
    /// Create a new LinkPredictor with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the degree exponents
    pub fn with_exponents(mut self, exponents: Exponents) -> Self {
        self.exponents = exponents;
        self
    }

    /// Set the number of rounds used by `fit_multi`
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    /// Set the augmentation rate `t`
    pub fn with_augment_rate(mut self, rate: f64) -> Self {
        self.augment_rate = rate;
        self
    }

    /// Set the number of predictions per row
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Re-parameterize in place. Cached degrees are kept; call
    /// [`reset`](Self::reset) to drop them.
    pub fn set_params(&mut self, exponents: Exponents, rounds: usize, k: usize) {
        self.exponents = exponents;
        self.rounds = rounds.max(1);
        self.k = k;
    }

    /// Drop cached degrees and propagation matrices.
    pub fn reset(&mut self) {
        self.degrees.invalidate();
        self.scorer = None;
        self.state = PredictorState::Unfit;
    }

    pub fn state(&self) -> PredictorState {
        self.state
    }

    /// Degrees the current propagation matrices were built with.
    pub fn degree_stats(&self) -> Option<&DegreeStats> {
        self.degrees.stats()
    }

    pub fn scorer(&self) -> Result<&PropagationScorer> {
        self.scorer.as_ref().ok_or(LinkPropError::NotFitted)
    }

    /// Build the two propagation matrices from `matrix`.
    ///
    /// Degrees are computed from `matrix` only when the cache is cold.
    pub fn fit(&mut self, matrix: &SparseMatrix) -> Result<()> {
        let _span = tracing::debug_span!("fit", rows = matrix.rows(), cols = matrix.cols()).entered();

        let degrees = self.degrees.get_or_compute(matrix)?;
        self.scorer = Some(PropagationScorer::build(matrix, degrees, self.exponents)?);

        let round = match self.state {
            PredictorState::Augmented { round } | PredictorState::Fitted { round } => round,
            PredictorState::Unfit => 0,
        };
        self.state = PredictorState::Fitted { round };
        Ok(())
    }

    /// `fit`, then `rounds - 1` self-augmentation rounds over rows `0..total`.
    pub fn fit_multi(&mut self, matrix: &SparseMatrix, batch_size: usize, total: usize) -> Result<()> {
        self.fit_multi_with_observer(matrix, batch_size, total, &mut TracingObserver)
    }

    /// [`fit_multi`](Self::fit_multi) with batch and round notifications.
    ///
    /// Each round predicts `ceil(links * t / width)` new edges per row of
    /// every batch, merges them into a fresh copy of `matrix` with value 1.0
    /// under `max`, and recomputes degrees from that copy. Propagation
    /// matrices are then rebuilt from the unaltered `matrix`: only the
    /// degree statistics carry the augmentation forward.
    pub fn fit_multi_with_observer(
        &mut self,
        matrix: &SparseMatrix,
        batch_size: usize,
        total: usize,
        observer: &mut impl BatchObserver,
    ) -> Result<()> {
        self.fit(matrix)?;

        let total = total.min(matrix.rows());
        let bridge = CsrMatrix::transpose_of(matrix);

        for round in 1..self.rounds {
            let _span = tracing::info_span!("augment_round", round).entered();
            let mut augmented = matrix.clone();

            for (start, end) in row_batches(total, batch_size) {
                observer.on_batch_start(STAGE_AUGMENT, start, end);
                let clock = BatchClock::start();

                let links = matrix.slice_rows(start, end).total_weight();
                let k = (links * self.augment_rate / (end - start) as f64).ceil() as usize;
                let predicted = self.predict_topk_with_bridge(&bridge, matrix, start, end, k)?;

                let candidates: usize = predicted.iter().map(Vec::len).sum();
                let new_edges = predicted.iter().enumerate().flat_map(|(offset, cols)| {
                    cols.iter().map(move |&col| (start + offset, col, 1.0))
                });
                augmented = augmented.merge(new_edges, Reduce::Max)?;

                let report = BatchReportBuilder::new(start, end, clock.elapsed())
                    .candidates(candidates)
                    .build();
                observer.on_batch_end(STAGE_AUGMENT, &report);
            }

            let added = augmented.nnz() - matrix.nnz();
            observer.on_round_end(round, added);

            self.degrees.recompute_from(&augmented);
            self.state = PredictorState::Augmented { round };
            self.fit(matrix)?;
        }
        Ok(())
    }

    /// Top-`k` new destination ids for rows `[start, end)` of `matrix`.
    ///
    /// Cells already at 1.0 are zeroed, so observed edges never rank;
    /// non-positive scores are dropped, so a row may get fewer than `k` ids.
    ///
    /// Builds the transpose of `matrix` on every call. Batch drivers should
    /// build it once with [`CsrMatrix::transpose_of`] and call
    /// [`predict_topk_with_bridge`](Self::predict_topk_with_bridge).
    pub fn predict_topk(
        &self,
        matrix: &SparseMatrix,
        start: usize,
        end: usize,
        k: usize,
    ) -> Result<Vec<Vec<usize>>> {
        let bridge = CsrMatrix::transpose_of(matrix);
        self.predict_topk_with_bridge(&bridge, matrix, start, end, k)
    }

    /// [`predict_topk`](Self::predict_topk) against a prebuilt
    /// `CsrMatrix::transpose_of(matrix)`.
    pub fn predict_topk_with_bridge(
        &self,
        bridge: &CsrMatrix,
        matrix: &SparseMatrix,
        start: usize,
        end: usize,
        k: usize,
    ) -> Result<Vec<Vec<usize>>> {
        let scorer = self.scorer()?;
        if scorer.shape() != matrix.shape() {
            return Err(LinkPropError::Shape {
                op: "predict_topk",
                expected: scorer.shape(),
                got: matrix.shape(),
            });
        }

        let scores = scorer.score_rows(bridge, start, end)?;
        let observed = matrix.slice_rows(start, end).to_dense();
        let masked = scores.zip_map(&observed, |score, seen| {
            if seen == 1.0 {
                0.0
            } else {
                score.max(0.0)
            }
        })?;
        Ok(masked.top_k(k.min(matrix.cols())))
    }

    /// Top-k predictions for every row of `x`, swept in batches.
    pub fn predict(&self, x: &SparseMatrix, batch_size: usize) -> Result<Vec<Vec<usize>>> {
        let bridge = CsrMatrix::transpose_of(x);
        let mut observer = TracingObserver;
        let mut out = Vec::with_capacity(x.rows());

        for (start, end) in row_batches(x.rows(), batch_size) {
            observer.on_batch_start(STAGE_PREDICT, start, end);
            let clock = BatchClock::start();

            let predicted = self.predict_topk_with_bridge(&bridge, x, start, end, self.k)?;

            let report = BatchReportBuilder::new(start, end, clock.elapsed())
                .candidates(predicted.iter().map(Vec::len).sum())
                .build();
            observer.on_batch_end(STAGE_PREDICT, &report);
            out.extend(predicted);
        }
        Ok(out)
    }

    /// MAP@k of predictions on `x` against held-out targets `y`, over rows
    /// `0..total`. The running mean is logged after every batch.
    pub fn score(
        &self,
        x: &SparseMatrix,
        y: &SparseMatrix,
        batch_size: usize,
        total: usize,
    ) -> Result<ScoreOutcome> {
        self.score_with_observer(x, y, batch_size, total, &mut TracingObserver)
    }

    /// [`score`](Self::score) with batch notifications.
    pub fn score_with_observer(
        &self,
        x: &SparseMatrix,
        y: &SparseMatrix,
        batch_size: usize,
        total: usize,
        observer: &mut impl BatchObserver,
    ) -> Result<ScoreOutcome> {
        if x.shape() != y.shape() {
            return Err(LinkPropError::Shape {
                op: "score",
                expected: x.shape(),
                got: y.shape(),
            });
        }

        let _span = tracing::info_span!("score", total, batch_size, k = self.k).entered();
        let bridge = CsrMatrix::transpose_of(x);
        let total = total.min(x.rows());
        let mut batch_maps = Vec::new();
        let mut predictions = Vec::with_capacity(total);

        for (start, end) in row_batches(total, batch_size) {
            observer.on_batch_start(STAGE_SCORE, start, end);
            let clock = BatchClock::start();

            let predicted = self.predict_topk_with_bridge(&bridge, x, start, end, self.k)?;
            let target = y.slice_rows(start, end).to_dense().top_k(self.k);
            let batch_map = mean_average_precision(&target, &predicted, self.k);
            batch_maps.push(batch_map);
            let running = mean(&batch_maps);

            let report = BatchReportBuilder::new(start, end, clock.elapsed())
                .candidates(predicted.iter().map(Vec::len).sum())
                .batch_map(batch_map)
                .running_map(running)
                .build();
            observer.on_batch_end(STAGE_SCORE, &report);
            predictions.extend(predicted);
        }

        Ok(ScoreOutcome {
            map: mean(&batch_maps),
            batch_maps,
            predictions,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::observer::{BatchTimingObserver, NoopObserver};

    /// 4x3 fixture: edges {(0,0),(0,1),(1,2),(2,0),(2,1),(2,2)}
    fn fixture() -> SparseMatrix {
        SparseMatrix::from_triplets(
            4,
            3,
            vec![
                (0, 0, 1.0),
                (0, 1, 1.0),
                (1, 2, 1.0),
                (2, 0, 1.0),
                (2, 1, 1.0),
                (2, 2, 1.0),
            ],
            Reduce::Add,
        )
        .unwrap()
    }

    /// Two customer clusters sharing one bridge customer.
    fn clustered() -> SparseMatrix {
        let edges = vec![
            (0, 0),
            (0, 1),
            (1, 0),
            (1, 1),
            (1, 2),
            (2, 1),
            (2, 2),
            (3, 3),
            (3, 4),
            (4, 3),
            (4, 4),
            (4, 5),
            (5, 4),
            (5, 5),
            (6, 2),
            (6, 3),
        ];
        SparseMatrix::from_triplets(7, 6, edges.into_iter().map(|(r, c)| (r, c, 1.0)), Reduce::Max)
            .unwrap()
    }

    #[test]
    fn test_unfit_predictor_rejects_prediction() {
        let p = LinkPredictor::new();
        assert_eq!(p.state(), PredictorState::Unfit);
        assert!(matches!(
            p.predict_topk(&fixture(), 0, 1, 2),
            Err(LinkPropError::NotFitted)
        ));
    }

    #[test]
    fn test_fixture_row_zero_only_gets_unobserved_column() {
        let m = fixture();
        let mut p = LinkPredictor::new()
            .with_exponents(Exponents::uniform(0.0))
            .with_k(2);
        p.fit(&m).unwrap();
        assert_eq!(p.state(), PredictorState::Fitted { round: 0 });

        let top = p.predict_topk(&m, 0, 4, 2).unwrap();
        // Columns 0 and 1 are observed for row 0; column 2 is reached through source 2
        assert_eq!(top[0], vec![2]);
        // Row 2 has observed every column
        assert!(top[2].is_empty());
        // Row 3 has no edges, so no signal
        assert!(top[3].is_empty());
    }

    #[test]
    fn test_predict_topk_never_returns_observed() {
        let m = clustered();
        let mut p = LinkPredictor::new().with_k(6);
        p.fit(&m).unwrap();

        let top = p.predict_topk(&m, 0, m.rows(), 6).unwrap();
        for (row, cols) in top.iter().enumerate() {
            for &col in cols {
                assert_ne!(m.get(row, col), 1.0, "row {row} got observed column {col}");
            }
        }
    }

    #[test]
    fn test_observed_masked_when_scores_are_large() {
        // Row 0 buys items 0..400; rows 1..=400 buy every item. Two-hop
        // scores for row 0 reach 400 * 400, far past any fixed offset.
        let mut edges: Vec<(usize, usize, f64)> = (0..400).map(|c| (0, c, 1.0)).collect();
        for row in 1..=400 {
            edges.extend((0..=400).map(|c| (row, c, 1.0)));
        }
        let m = SparseMatrix::from_triplets(401, 401, edges, Reduce::Max).unwrap();

        let mut p = LinkPredictor::new()
            .with_exponents(Exponents::uniform(0.0))
            .with_k(3);
        p.fit(&m).unwrap();

        let top = p.predict_topk(&m, 0, 1, 3).unwrap();
        assert_eq!(top, vec![vec![400]]);
    }

    #[test]
    fn test_prebuilt_bridge_matches_predict_topk() {
        let m = clustered();
        let mut p = LinkPredictor::new().with_k(3);
        p.fit(&m).unwrap();

        let bridge = CsrMatrix::transpose_of(&m);
        for (start, end) in row_batches(m.rows(), 3) {
            assert_eq!(
                p.predict_topk_with_bridge(&bridge, &m, start, end, 3).unwrap(),
                p.predict_topk(&m, start, end, 3).unwrap()
            );
        }
    }

    #[test]
    fn test_predict_matches_single_batch() {
        let m = clustered();
        let mut p = LinkPredictor::new().with_k(3);
        p.fit(&m).unwrap();

        let batched = p.predict(&m, 2).unwrap();
        let whole = p.predict_topk(&m, 0, m.rows(), 3).unwrap();
        assert_eq!(batched, whole);
        assert_eq!(batched.len(), m.rows());
    }

    #[test]
    fn test_fit_multi_single_round_equals_fit() {
        let m = clustered();

        let mut single = LinkPredictor::new().with_k(3);
        single.fit(&m).unwrap();

        let mut multi = LinkPredictor::new().with_k(3).with_rounds(1);
        multi.fit_multi(&m, 3, m.rows()).unwrap();

        assert_eq!(multi.state(), PredictorState::Fitted { round: 0 });
        assert_eq!(multi.degree_stats(), single.degree_stats());
        assert_eq!(
            multi.predict(&m, 3).unwrap(),
            single.predict(&m, 3).unwrap()
        );
    }

    #[test]
    fn test_fit_multi_grows_degrees_not_base_matrix() {
        let m = clustered();
        let base = DegreeStats::from_matrix(&m);

        let mut p = LinkPredictor::new()
            .with_k(3)
            .with_rounds(3)
            .with_augment_rate(0.5);
        let mut obs = BatchTimingObserver::new();
        p.fit_multi_with_observer(&m, 3, m.rows(), &mut obs).unwrap();

        assert_eq!(p.state(), PredictorState::Fitted { round: 2 });
        assert_eq!(obs.rounds().len(), 2);
        assert!(obs.rounds().iter().all(|&(_, added)| added > 0));

        let grown = p.degree_stats().unwrap();
        let before: f64 = base.sources.iter().sum();
        let after: f64 = grown.sources.iter().sum();
        assert!(after > before);
        for (b, a) in base.sources.iter().zip(&grown.sources) {
            assert!(a >= b);
        }

        // Propagation still runs over the base edge pattern
        assert_eq!(p.scorer().unwrap().alpha_beta().nnz(), m.nnz());
    }

    #[test]
    fn test_zero_rate_adds_nothing() {
        let m = clustered();
        let mut p = LinkPredictor::new().with_rounds(2).with_augment_rate(0.0);
        let mut obs = BatchTimingObserver::new();
        p.fit_multi_with_observer(&m, 4, m.rows(), &mut obs).unwrap();
        assert_eq!(obs.rounds(), &[(1, 0)]);
        assert_eq!(p.degree_stats(), Some(&DegreeStats::from_matrix(&m)));
    }

    #[test]
    fn test_score_perfect_on_recoverable_edge() {
        let m = fixture();
        let target = SparseMatrix::from_triplets(4, 3, vec![(0, 2, 1.0)], Reduce::Add).unwrap();

        let mut p = LinkPredictor::new()
            .with_exponents(Exponents::uniform(0.0))
            .with_k(2);
        p.fit(&m).unwrap();
        let mut obs = BatchTimingObserver::new();
        let outcome = p.score_with_observer(&m, &target, 1, 1, &mut obs).unwrap();

        assert!((outcome.map - 1.0).abs() < 1e-12);
        assert_eq!(outcome.batch_maps, vec![1.0]);
        assert_eq!(outcome.predictions, vec![vec![2]]);
        assert_eq!(obs.reports()[0].1.running_map(), Some(1.0));
    }

    #[test]
    fn test_score_running_mean_per_batch() {
        let m = clustered();
        let target = SparseMatrix::from_triplets(7, 6, vec![(0, 2, 1.0)], Reduce::Add).unwrap();
        let mut p = LinkPredictor::new().with_k(3);
        p.fit(&m).unwrap();

        let mut obs = BatchTimingObserver::new();
        let outcome = p.score_with_observer(&m, &target, 2, 100, &mut obs).unwrap();
        assert_eq!(outcome.batch_maps.len(), 4);
        assert_eq!(outcome.predictions.len(), 7);

        let last = obs.reports().last().unwrap().1.running_map().unwrap();
        assert!((last - outcome.map).abs() < 1e-12);
    }

    #[test]
    fn test_score_shape_mismatch() {
        let m = fixture();
        let mut p = LinkPredictor::new();
        p.fit(&m).unwrap();
        let err = p
            .score_with_observer(&m, &SparseMatrix::empty(4, 2), 2, 4, &mut NoopObserver)
            .unwrap_err();
        assert!(matches!(err, LinkPropError::Shape { op: "score", .. }));
    }

    #[test]
    fn test_reset_returns_to_unfit() {
        let m = fixture();
        let mut p = LinkPredictor::new();
        p.fit(&m).unwrap();
        p.reset();
        assert_eq!(p.state(), PredictorState::Unfit);
        assert!(p.degree_stats().is_none());
        assert!(p.scorer().is_err());
    }

    #[test]
    fn test_degrees_cached_across_fits() {
        let m = fixture();
        let mut p = LinkPredictor::new();
        p.fit(&m).unwrap();
        let first = p.degree_stats().cloned();

        // Refit on a sparser matrix of the same shape keeps the cached degrees
        let sparser = SparseMatrix::from_triplets(4, 3, vec![(0, 0, 1.0)], Reduce::Add).unwrap();
        p.fit(&sparser).unwrap();
        assert_eq!(p.degree_stats().cloned(), first);
    }
}
