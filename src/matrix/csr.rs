//! Compressed Sparse Row (CSR) matrix view
//!
//! CSR is optimized for iteration over the entries of one row, which is
//! exactly what the two-hop propagation product needs: each hop walks the
//! rows touched by the previous one.

use super::coo::SparseMatrix;

/// A sparse matrix in Compressed Sparse Row format
///
/// Built from a coalesced [`SparseMatrix`], whose row-major order lets the
/// conversion run in a single pass.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Number of rows
    pub num_rows: usize,
    /// Number of columns
    pub num_cols: usize,
    /// Row pointers: row i's entries are at indices row_ptr[i]..row_ptr[i+1]
    pub row_ptr: Vec<usize>,
    /// Column index for each entry
    pub col_idx: Vec<usize>,
    /// Entry values
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// Convert a coalesced triplet matrix into CSR format
    pub fn from_coo(matrix: &SparseMatrix) -> Self {
        let (num_rows, num_cols) = matrix.shape();
        let mut row_ptr = vec![0usize; num_rows + 1];
        let mut col_idx = Vec::with_capacity(matrix.nnz());
        let mut values = Vec::with_capacity(matrix.nnz());

        for (row, col, value) in matrix.iter() {
            row_ptr[row + 1] += 1;
            col_idx.push(col);
            values.push(value);
        }
        for i in 0..num_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        Self {
            num_rows,
            num_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// CSR view of the transpose of `matrix` (columns become rows)
    pub fn transpose_of(matrix: &SparseMatrix) -> Self {
        Self::from_coo(&matrix.transpose())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows, self.num_cols)
    }

    /// Iterate over the `(col, value)` entries of a row
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        (start..end).map(move |i| (self.col_idx[i], self.values[i]))
    }

    /// Number of stored entries in a row
    pub fn row_nnz(&self, row: usize) -> usize {
        self.row_ptr[row + 1] - self.row_ptr[row]
    }

    /// Total number of stored entries
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.col_idx.is_empty()
    }

    /// Rows without any stored entry
    pub fn empty_rows(&self) -> Vec<usize> {
        (0..self.num_rows)
            .filter(|&row| self.row_nnz(row) == 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::coo::Reduce;

    fn build_test_matrix() -> SparseMatrix {
        SparseMatrix::from_triplets(
            3,
            3,
            vec![(0, 1, 1.0), (1, 2, 2.0), (0, 2, 1.5)],
            Reduce::Add,
        )
        .unwrap()
    }

    #[test]
    fn test_csr_conversion() {
        let csr = CsrMatrix::from_coo(&build_test_matrix());

        assert_eq!(csr.shape(), (3, 3));
        assert_eq!(csr.row_ptr, vec![0, 2, 3, 3]);
        assert_eq!(csr.nnz(), 3);
    }

    #[test]
    fn test_row_iteration() {
        let csr = CsrMatrix::from_coo(&build_test_matrix());

        // Row 0 has entries in columns 1 and 2
        let entries: Vec<_> = csr.row(0).collect();
        assert_eq!(entries.len(), 2);

        let second = entries.iter().find(|(c, _)| *c == 2);
        assert!(second.is_some());
        assert!((second.unwrap().1 - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_transpose_view() {
        let csr = CsrMatrix::transpose_of(&build_test_matrix());

        assert_eq!(csr.row_nnz(2), 2);
        let sources: Vec<_> = csr.row(2).map(|(c, _)| c).collect();
        assert_eq!(sources, vec![0, 1]);
        assert_eq!(csr.row_nnz(0), 0);
    }

    #[test]
    fn test_empty_matrix() {
        let csr = CsrMatrix::from_coo(&SparseMatrix::empty(0, 4));

        assert!(csr.is_empty());
        assert_eq!(csr.row_ptr, vec![0]);
    }

    #[test]
    fn test_empty_rows() {
        let csr = CsrMatrix::from_coo(&build_test_matrix());

        assert_eq!(csr.empty_rows(), vec![2]);
    }
}
