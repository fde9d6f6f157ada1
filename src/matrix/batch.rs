//! Row batching
//!
//! All densification goes through this module: a row range is materialized,
//! operated on, and re-sparsified before the next range is touched.

use super::coo::SparseMatrix;
use crate::error::{LinkPropError, Result};

/// Half-open row ranges `[start, end)` covering `0..total` in steps of
/// `batch_size`. A zero `batch_size` is treated as 1.
pub fn row_batches(total: usize, batch_size: usize) -> impl Iterator<Item = (usize, usize)> {
    let step = batch_size.max(1);
    (0..total)
        .step_by(step)
        .map(move |start| (start, (start + step).min(total)))
}

/// Apply `op` elementwise to two same-shape sparse matrices, one row batch
/// at a time, and stack the re-sparsified results.
///
/// `op(0.0, 0.0)` should be `0.0`; otherwise the result is no longer sparse.
pub fn batched_dense_op<F>(
    batch_size: usize,
    op: F,
    a: &SparseMatrix,
    b: &SparseMatrix,
) -> Result<SparseMatrix>
where
    F: Fn(f64, f64) -> f64,
{
    if a.shape() != b.shape() {
        return Err(LinkPropError::Shape {
            op: "batched_dense_op",
            expected: a.shape(),
            got: b.shape(),
        });
    }

    let mut result = SparseMatrix::empty(0, a.cols());
    for (start, end) in row_batches(a.rows(), batch_size) {
        let left = a.slice_rows(start, end).to_dense();
        let right = b.slice_rows(start, end).to_dense();
        let block = left.zip_map(&right, &op)?;
        result = result.stack(&block.to_sparse())?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::coo::Reduce;

    #[test]
    fn test_row_batches_cover_range() {
        let batches: Vec<_> = row_batches(7, 3).collect();
        assert_eq!(batches, vec![(0, 3), (3, 6), (6, 7)]);
        assert_eq!(row_batches(0, 3).count(), 0);
        assert_eq!(row_batches(2, 0).count(), 2);
    }

    #[test]
    fn test_batched_dense_op_matches_elementwise() {
        let a = SparseMatrix::from_triplets(
            5,
            3,
            vec![(0, 0, 1.0), (2, 1, 2.0), (4, 2, 1.0)],
            Reduce::Add,
        )
        .unwrap();
        let b = SparseMatrix::from_triplets(
            5,
            3,
            vec![(0, 0, 3.0), (3, 1, 1.0), (4, 2, 5.0)],
            Reduce::Add,
        )
        .unwrap();

        for batch_size in [1, 2, 5, 100] {
            let out = batched_dense_op(batch_size, f64::max, &a, &b).unwrap();
            assert_eq!(out.shape(), (5, 3));
            assert_eq!(out.get(0, 0), 3.0);
            assert_eq!(out.get(2, 1), 2.0);
            assert_eq!(out.get(3, 1), 1.0);
            assert_eq!(out.get(4, 2), 5.0);
            assert_eq!(out.nnz(), 4);
        }
    }

    #[test]
    fn test_batched_dense_op_drops_zero_results() {
        let a = SparseMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (1, 1, 1.0)], Reduce::Add)
            .unwrap();
        let out = batched_dense_op(1, |x, y| x - y, &a, &a).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_batched_dense_op_shape_mismatch() {
        let a = SparseMatrix::empty(2, 2);
        let b = SparseMatrix::empty(2, 3);
        assert!(batched_dense_op(1, |x, _| x, &a, &b).is_err());
    }
}
