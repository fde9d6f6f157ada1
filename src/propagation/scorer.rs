//! Propagation scorer over a row batch

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::{inverse_degree_powers, Exponents};
use crate::degree::DegreeStats;
use crate::error::{LinkPropError, Result};
use crate::matrix::{CsrMatrix, DenseBlock, SparseMatrix};

/// The two reweighted copies of the interaction matrix.
///
/// Both share the nonzero pattern of the matrix they were built from; no
/// densification happens until a row batch is scored.
#[derive(Debug, Clone)]
pub struct PropagationScorer {
    alpha_beta: CsrMatrix,
    gamma_delta: CsrMatrix,
}

impl PropagationScorer {
    /// Reweight `matrix` with `degrees` raised to the negated exponents.
    pub fn build(
        matrix: &SparseMatrix,
        degrees: &DegreeStats,
        exponents: Exponents,
    ) -> Result<Self> {
        if !exponents.is_finite() {
            return Err(LinkPropError::InvalidConfig(format!(
                "non-finite exponents {exponents:?}"
            )));
        }
        if degrees.shape() != matrix.shape() {
            return Err(LinkPropError::Shape {
                op: "propagation",
                expected: matrix.shape(),
                got: degrees.shape(),
            });
        }

        let source_alpha = inverse_degree_powers(&degrees.sources, exponents.alpha);
        let dest_beta = inverse_degree_powers(&degrees.destinations, exponents.beta);
        let source_gamma = inverse_degree_powers(&degrees.sources, exponents.gamma);
        let dest_delta = inverse_degree_powers(&degrees.destinations, exponents.delta);

        // Weights only touch stored edges, so the outer product
        // d_u^-a * d_i^-b is never formed.
        let edges = matrix.pruned();
        let alpha_beta = edges.map_values(|u, i, v| source_alpha[u] * dest_beta[i] * v);
        let gamma_delta = edges.map_values(|u, i, v| source_gamma[u] * dest_delta[i] * v);

        let alpha_beta = CsrMatrix::from_coo(&alpha_beta);
        tracing::debug!(
            edges = alpha_beta.nnz(),
            cold_sources = alpha_beta.empty_rows().len(),
            "propagation matrices built"
        );
        Ok(Self {
            alpha_beta,
            gamma_delta: CsrMatrix::from_coo(&gamma_delta),
        })
    }

    /// Shape of the matrix the scorer was built from.
    pub fn shape(&self) -> (usize, usize) {
        self.alpha_beta.shape()
    }

    pub fn alpha_beta(&self) -> &CsrMatrix {
        &self.alpha_beta
    }

    pub fn gamma_delta(&self) -> &CsrMatrix {
        &self.gamma_delta
    }

    /// Two-hop scores for source rows `[start, end)`.
    ///
    /// `bridge` is the CSR transpose of the current working matrix
    /// (destination -> source, unweighted). Rows are scored in parallel;
    /// each writes only its own output row.
    pub fn score_rows(&self, bridge: &CsrMatrix, start: usize, end: usize) -> Result<DenseBlock> {
        let (rows, cols) = self.shape();
        if bridge.shape() != (cols, rows) {
            return Err(LinkPropError::Shape {
                op: "score_rows",
                expected: (cols, rows),
                got: bridge.shape(),
            });
        }
        let end = end.min(rows);
        let start = start.min(end);

        let scores: Vec<Vec<f64>> = (start..end)
            .into_par_iter()
            .map(|row| self.score_row(bridge, row))
            .collect();
        DenseBlock::from_rows(scores, cols)
    }

    fn score_row(&self, bridge: &CsrMatrix, row: usize) -> Vec<f64> {
        // Hop 1 + 2: source -> destinations -> co-purchasing sources
        let mut reached: FxHashMap<usize, f64> = FxHashMap::default();
        for (dest, weight) in self.alpha_beta.row(row) {
            for (source, link) in bridge.row(dest) {
                *reached.entry(source).or_insert(0.0) += weight * link;
            }
        }

        // Hop 3: co-purchasing sources -> their destinations
        let mut out = vec![0.0; self.gamma_delta.num_cols];
        for (source, mass) in reached {
            for (dest, weight) in self.gamma_delta.row(source) {
                out[dest] += mass * weight;
            }
        }
        out
    }
}
