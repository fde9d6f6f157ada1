//! Node degree statistics
//!
//! Degrees are weight sums along an axis. They are computed once per
//! predictor, reused across `fit` calls, and recomputed from scratch (never
//! patched) after an augmentation round changes the matrix.

use crate::error::{LinkPropError, Result};
use crate::matrix::{Axis, SparseMatrix};

/// Weight sum per row (`Axis::Rows`) or per column (`Axis::Cols`).
pub fn degrees(matrix: &SparseMatrix, axis: Axis) -> Vec<f64> {
    matrix.sum_axis(axis)
}

/// Source-side and destination-side degree vectors of one matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeStats {
    /// Degree of each source (row)
    pub sources: Vec<f64>,
    /// Degree of each destination (column)
    pub destinations: Vec<f64>,
}

impl DegreeStats {
    pub fn from_matrix(matrix: &SparseMatrix) -> Self {
        Self {
            sources: degrees(matrix, Axis::Rows),
            destinations: degrees(matrix, Axis::Cols),
        }
    }

    /// Shape of the matrix these degrees were computed from.
    pub fn shape(&self) -> (usize, usize) {
        (self.sources.len(), self.destinations.len())
    }
}

/// Degree cache with an explicit populated/empty state.
///
/// The first `fit` on a cold cache populates it; later fits reuse it until
/// [`invalidate`](Self::invalidate) or [`recompute_from`](Self::recompute_from).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DegreeCache {
    #[default]
    Cold,
    Warm(DegreeStats),
}

impl DegreeCache {
    pub fn is_warm(&self) -> bool {
        matches!(self, DegreeCache::Warm(_))
    }

    pub fn stats(&self) -> Option<&DegreeStats> {
        match self {
            DegreeCache::Warm(stats) => Some(stats),
            DegreeCache::Cold => None,
        }
    }

    /// Cached degrees, computing them from `matrix` on a cold cache.
    ///
    /// Fails if warm degrees belong to a matrix of another shape.
    pub fn get_or_compute(&mut self, matrix: &SparseMatrix) -> Result<&DegreeStats> {
        if let DegreeCache::Warm(stats) = self {
            if stats.shape() != matrix.shape() {
                return Err(LinkPropError::Shape {
                    op: "degree cache",
                    expected: stats.shape(),
                    got: matrix.shape(),
                });
            }
        } else {
            tracing::debug!(
                rows = matrix.rows(),
                cols = matrix.cols(),
                "computing degree statistics"
            );
            *self = DegreeCache::Warm(DegreeStats::from_matrix(matrix));
        }

        self.stats().ok_or(LinkPropError::NotFitted)
    }

    /// Replace the cached degrees with those of `matrix`.
    pub fn recompute_from(&mut self, matrix: &SparseMatrix) {
        *self = DegreeCache::Warm(DegreeStats::from_matrix(matrix));
    }

    pub fn invalidate(&mut self) {
        *self = DegreeCache::Cold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Reduce;

    fn sample() -> SparseMatrix {
        SparseMatrix::from_triplets(
            3,
            2,
            vec![(0, 0, 1.0), (0, 1, 1.0), (2, 1, 1.0)],
            Reduce::Add,
        )
        .unwrap()
    }

    #[test]
    fn test_degree_sums_agree() {
        let m = sample();
        let rows: f64 = degrees(&m, Axis::Rows).iter().sum();
        let cols: f64 = degrees(&m, Axis::Cols).iter().sum();
        assert!((rows - m.total_weight()).abs() < 1e-12);
        assert!((cols - m.total_weight()).abs() < 1e-12);
    }

    #[test]
    fn test_max_merge_new_edge_increments_degrees() {
        let m = sample();
        let before = DegreeStats::from_matrix(&m);

        let merged = m.merge(vec![(1, 0, 1.0)], Reduce::Max).unwrap();
        let after = DegreeStats::from_matrix(&merged);
        assert_eq!(after.sources[1], before.sources[1] + 1.0);
        assert_eq!(after.destinations[0], before.destinations[0] + 1.0);

        let unchanged = m.merge(vec![(0, 0, 1.0)], Reduce::Max).unwrap();
        assert_eq!(DegreeStats::from_matrix(&unchanged), before);
    }

    #[test]
    fn test_cache_populates_once() {
        let m = sample();
        let mut cache = DegreeCache::default();
        assert!(!cache.is_warm());

        let first = cache.get_or_compute(&m).unwrap().clone();
        assert!(cache.is_warm());

        // A different matrix of the same shape reuses the cached degrees
        let other = SparseMatrix::empty(3, 2);
        assert_eq!(cache.get_or_compute(&other).unwrap(), &first);

        cache.invalidate();
        assert_eq!(
            cache.get_or_compute(&other).unwrap().sources,
            vec![0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_cache_rejects_shape_change() {
        let mut cache = DegreeCache::default();
        cache.recompute_from(&sample());
        let err = cache.get_or_compute(&SparseMatrix::empty(4, 2)).unwrap_err();
        assert!(matches!(err, LinkPropError::Shape { .. }));
    }
}
