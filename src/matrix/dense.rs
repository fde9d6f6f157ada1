//! Dense row-major block for one batch of rows

use super::coo::SparseMatrix;
use crate::error::{LinkPropError, Result};

/// A dense `(rows, cols)` block, row-major.
///
/// Only ever materialized for a row batch, so memory stays at
/// `O(batch_size * cols)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBlock {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseBlock {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Assemble from per-row vectors, each of length `cols`.
    pub fn from_rows(rows: Vec<Vec<f64>>, cols: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in &rows {
            if row.len() != cols {
                return Err(LinkPropError::Length {
                    op: "from_rows",
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Elementwise `op(self, other)` over two blocks of the same shape.
    pub fn zip_map<F>(&self, other: &DenseBlock, op: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.shape() != other.shape() {
            return Err(LinkPropError::Shape {
                op: "zip_map",
                expected: self.shape(),
                got: other.shape(),
            });
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        })
    }

    /// Column ids of the `k` highest-scoring cells in `row`.
    ///
    /// Non-positive scores are never returned, so rows with fewer than `k`
    /// positive candidates yield a shorter list. Ties break by ascending
    /// column id.
    pub fn top_k_row(&self, row: usize, k: usize) -> Vec<usize> {
        let mut candidates: Vec<(usize, f64)> = self
            .row(row)
            .iter()
            .enumerate()
            .filter(|&(_, &score)| score > 0.0)
            .map(|(col, &score)| (col, score))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        candidates.truncate(k);
        candidates.into_iter().map(|(col, _)| col).collect()
    }

    /// [`top_k_row`](Self::top_k_row) for every row.
    pub fn top_k(&self, k: usize) -> Vec<Vec<usize>> {
        (0..self.rows).map(|row| self.top_k_row(row, k)).collect()
    }

    /// Re-sparsify, dropping zero cells.
    pub fn to_sparse(&self) -> SparseMatrix {
        let entries = self
            .data
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value != 0.0)
            .map(|(i, &value)| (i / self.cols, i % self.cols, value))
            .collect();
        // Row-major scan yields sorted, unique coordinates.
        SparseMatrix::from_sorted(self.rows, self.cols, entries)
    }
}
