//! Sparse matrix primitives
//!
//! The interaction matrix is stored as sorted, coalesced triplets
//! ([`coo::SparseMatrix`]). Products run over a compressed-row view
//! ([`csr::CsrMatrix`]), and dense data only ever exists one row batch at a
//! time ([`dense::DenseBlock`], [`batch`]).

pub mod batch;
pub mod builder;
pub mod coo;
pub mod csr;
pub mod dense;

pub use batch::{batched_dense_op, row_batches};
pub use coo::{Reduce, SparseMatrix};
pub use csr::CsrMatrix;
pub use dense::DenseBlock;

/// Matrix axis selector.
///
/// `Rows` addresses source entities (one value per row), `Cols` addresses
/// destination entities (one value per column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Cols,
}
