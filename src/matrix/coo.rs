//! Coordinate (triplet) sparse matrix
//!
//! Entries are kept sorted by `(row, col)` with no duplicate coordinates.
//! Every mutation path re-coalesces under a [`Reduce`], so the invariant
//! holds after `merge`, `assign`, `stack` and friends.

use serde::{Deserialize, Serialize};

use super::dense::DenseBlock;
use super::Axis;
use crate::error::{LinkPropError, Result};

/// Reduction applied when two entries share a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduce {
    /// Accumulate values.
    Add,
    /// Keep the larger value (no duplicate-edge inflation).
    Max,
}

impl Reduce {
    #[inline]
    fn apply(self, current: f64, incoming: f64) -> f64 {
        match self {
            Reduce::Add => current + incoming,
            Reduce::Max => current.max(incoming),
        }
    }
}

/// A sparse matrix over a fixed `(rows, cols)` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TripletData", into = "TripletData")]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    row_idx: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// An all-zero matrix of the given shape.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_idx: Vec::new(),
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from arbitrary triplets, coalescing duplicates with `reduce`.
    ///
    /// Fails if any coordinate lies outside `(rows, cols)`.
    pub fn from_triplets<I>(rows: usize, cols: usize, entries: I, reduce: Reduce) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut entries: Vec<_> = entries.into_iter().collect();
        for &(row, col, _) in &entries {
            check_bounds(row, col, rows, cols)?;
        }
        entries.sort_by_key(|&(row, col, _)| (row, col));
        Ok(Self::from_sorted(rows, cols, coalesce_sorted(entries, reduce)))
    }

    /// Assemble from entries already sorted and free of duplicates.
    pub(crate) fn from_sorted(rows: usize, cols: usize, entries: Vec<(usize, usize, f64)>) -> Self {
        let mut row_idx = Vec::with_capacity(entries.len());
        let mut col_idx = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (row, col, value) in entries {
            row_idx.push(row);
            col_idx.push(col);
            values.push(value);
        }
        Self {
            rows,
            cols,
            row_idx,
            col_idx,
            values,
        }
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

    /// Number of stored entries (explicit zeros included).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over stored `(row, col, value)` triplets in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.row_idx
            .iter()
            .zip(&self.col_idx)
            .zip(&self.values)
            .map(|((&row, &col), &value)| (row, col, value))
    }

    /// Stored triplets with exactly-zero values filtered out.
    ///
    /// Accumulation can legitimately produce zeros (`+1` then `-1`); those
    /// are not edges.
    pub fn nonzero(&self) -> Vec<(usize, usize, f64)> {
        self.iter().filter(|&(_, _, value)| value != 0.0).collect()
    }

    /// Copy without explicit zero entries.
    pub fn pruned(&self) -> Self {
        Self::from_sorted(self.rows, self.cols, self.nonzero())
    }

    fn position(&self, row: usize, col: usize) -> std::result::Result<usize, usize> {
        let start = self.row_idx.partition_point(|&r| r < row);
        let end = self.row_idx.partition_point(|&r| r <= row);
        self.col_idx[start..end]
            .binary_search(&col)
            .map(|offset| start + offset)
            .map_err(|offset| start + offset)
    }

    /// Value at `(row, col)`; absent or out-of-range cells read as 0.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.position(row, col)
            .map(|idx| self.values[idx])
            .unwrap_or(0.0)
    }

    /// Set `(row, col)` to `value`.
    ///
    /// Equivalent to merging the delta `value - current` under [`Reduce::Add`]:
    /// repeated assigns converge to `value` without duplicate triplets.
    pub fn assign(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        check_bounds(row, col, self.rows, self.cols)?;
        match self.position(row, col) {
            Ok(idx) => self.values[idx] = value,
            Err(idx) => {
                self.row_idx.insert(idx, row);
                self.col_idx.insert(idx, col);
                self.values.insert(idx, value);
            }
        }
        Ok(())
    }

    /// Overwrite every stored entry whose row (`Axis::Rows`) or column
    /// (`Axis::Cols`) is selected by `mask`.
    ///
    /// Cells without a stored entry are never created.
    pub fn reassign_on_mask(&self, mask: &[bool], value: f64, axis: Axis) -> Result<Self> {
        let expected = match axis {
            Axis::Rows => self.rows,
            Axis::Cols => self.cols,
        };
        if mask.len() != expected {
            return Err(LinkPropError::Length {
                op: "reassign_on_mask",
                expected,
                got: mask.len(),
            });
        }

        let mut out = self.clone();
        for (i, slot) in out.values.iter_mut().enumerate() {
            let selector = match axis {
                Axis::Rows => self.row_idx[i],
                Axis::Cols => self.col_idx[i],
            };
            if mask[selector] {
                *slot = value;
            }
        }
        Ok(out)
    }

    /// Merge extra triplets into a copy of this matrix, coalescing with `reduce`.
    pub fn merge<I>(&self, entries: I, reduce: Reduce) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let incoming = Self::from_triplets(self.rows, self.cols, entries, reduce)?;
        if incoming.is_empty() {
            return Ok(self.clone());
        }

        let mut merged = Vec::with_capacity(self.nnz() + incoming.nnz());
        let mut left = self.iter().peekable();
        let mut right = incoming.iter().peekable();
        loop {
            let next = match (left.peek().copied(), right.peek().copied()) {
                (Some((lr, lc, lv)), Some((rr, rc, rv))) => match (lr, lc).cmp(&(rr, rc)) {
                    std::cmp::Ordering::Less => {
                        left.next();
                        (lr, lc, lv)
                    }
                    std::cmp::Ordering::Greater => {
                        right.next();
                        (rr, rc, rv)
                    }
                    std::cmp::Ordering::Equal => {
                        left.next();
                        right.next();
                        (lr, lc, reduce.apply(lv, rv))
                    }
                },
                (Some(entry), None) => {
                    left.next();
                    entry
                }
                (None, Some(entry)) => {
                    right.next();
                    entry
                }
                (None, None) => break,
            };
            merged.push(next);
        }

        Ok(Self::from_sorted(self.rows, self.cols, merged))
    }

    /// Vertical concatenation: rows of `other` are offset by `self.rows()`.
    pub fn stack(&self, other: &SparseMatrix) -> Result<Self> {
        if self.cols != other.cols {
            return Err(LinkPropError::Shape {
                op: "stack",
                expected: (other.rows, self.cols),
                got: other.shape(),
            });
        }

        // Offsetting keeps the concatenation sorted and duplicate-free.
        let mut out = self.clone();
        out.rows += other.rows;
        out.row_idx
            .extend(other.row_idx.iter().map(|&row| row + self.rows));
        out.col_idx.extend_from_slice(&other.col_idx);
        out.values.extend_from_slice(&other.values);
        Ok(out)
    }

    /// Rows `[start, end)` as a `(end - start, cols)` matrix.
    ///
    /// `end` is clamped to the row count.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.rows);
        let start = start.min(end);
        let lo = self.row_idx.partition_point(|&r| r < start);
        let hi = self.row_idx.partition_point(|&r| r < end);
        Self {
            rows: end - start,
            cols: self.cols,
            row_idx: self.row_idx[lo..hi].iter().map(|&r| r - start).collect(),
            col_idx: self.col_idx[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
        }
    }

    pub fn transpose(&self) -> Self {
        let mut entries: Vec<_> = self.iter().map(|(r, c, v)| (c, r, v)).collect();
        entries.sort_by_key(|&(row, col, _)| (row, col));
        Self::from_sorted(self.cols, self.rows, entries)
    }

    /// Copy with each value replaced by `f(row, col, value)`; the sparsity
    /// pattern is preserved.
    pub fn map_values<F>(&self, f: F) -> Self
    where
        F: Fn(usize, usize, f64) -> f64,
    {
        let mut out = self.clone();
        for (i, slot) in out.values.iter_mut().enumerate() {
            *slot = f(self.row_idx[i], self.col_idx[i], *slot);
        }
        out
    }

    /// Sum of values per row (`Axis::Rows`) or per column (`Axis::Cols`).
    pub fn sum_axis(&self, axis: Axis) -> Vec<f64> {
        match axis {
            Axis::Rows => {
                let mut sums = vec![0.0; self.rows];
                for (row, _, value) in self.iter() {
                    sums[row] += value;
                }
                sums
            }
            Axis::Cols => {
                let mut sums = vec![0.0; self.cols];
                for (_, col, value) in self.iter() {
                    sums[col] += value;
                }
                sums
            }
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Materialize as a dense block. Only call this on a row batch.
    pub fn to_dense(&self) -> DenseBlock {
        let mut block = DenseBlock::zeros(self.rows, self.cols);
        for (row, col, value) in self.iter() {
            block.set(row, col, value);
        }
        block
    }
}

fn check_bounds(row: usize, col: usize, rows: usize, cols: usize) -> Result<()> {
    if row >= rows || col >= cols {
        return Err(LinkPropError::Index {
            row,
            col,
            rows,
            cols,
        });
    }
    Ok(())
}

/// Merge adjacent duplicates of a `(row, col)`-sorted triplet list.
fn coalesce_sorted(entries: Vec<(usize, usize, f64)>, reduce: Reduce) -> Vec<(usize, usize, f64)> {
    let mut out: Vec<(usize, usize, f64)> = Vec::with_capacity(entries.len());
    for (row, col, value) in entries {
        if let Some(last) = out.last_mut() {
            if last.0 == row && last.1 == col {
                last.2 = reduce.apply(last.2, value);
                continue;
            }
        }
        out.push((row, col, value));
    }
    out
}

/// Serialized form; validated and re-coalesced on load.
#[derive(Serialize, Deserialize)]
struct TripletData {
    shape: (usize, usize),
    row: Vec<usize>,
    col: Vec<usize>,
    value: Vec<f64>,
}

impl From<SparseMatrix> for TripletData {
    fn from(m: SparseMatrix) -> Self {
        Self {
            shape: (m.rows, m.cols),
            row: m.row_idx,
            col: m.col_idx,
            value: m.values,
        }
    }
}

impl TryFrom<TripletData> for SparseMatrix {
    type Error = LinkPropError;

    fn try_from(data: TripletData) -> Result<Self> {
        let n = data.value.len();
        if data.row.len() != n || data.col.len() != n {
            return Err(LinkPropError::Length {
                op: "deserialize",
                expected: n,
                got: data.row.len().min(data.col.len()),
            });
        }
        let (rows, cols) = data.shape;
        let entries = data
            .row
            .into_iter()
            .zip(data.col)
            .zip(data.value)
            .map(|((r, c), v)| (r, c, v));
        SparseMatrix::from_triplets(rows, cols, entries, Reduce::Add)
    }
}
