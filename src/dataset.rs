//! Interaction dataset with an on-disk cache
//!
//! Bundles the interaction matrix with the id spaces of its rows (sources)
//! and columns (destinations). Building from raw transactions is the
//! expensive step, so the result can be persisted as JSON and reloaded.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LinkPropError, Result};
use crate::matrix::builder::{IdIndex, InteractionBuilder};
use crate::matrix::SparseMatrix;

/// Interaction matrix plus the external ids of its rows and columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionDataset {
    pub matrix: SparseMatrix,
    pub sources: IdIndex,
    pub destinations: IdIndex,
}

impl InteractionDataset {
    /// Build from ordered id lists and `(source, destination)` transactions.
    ///
    /// Row `i` is `sources[i]`, column `j` is `destinations[j]`. Repeated
    /// purchases collapse to a single 1.0 edge.
    pub fn from_transactions<I, S>(
        sources: I,
        destinations: I,
        transactions: &[(S, S)],
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        S: AsRef<str> + Sync,
    {
        let mut builder =
            InteractionBuilder::new(IdIndex::from_ids(sources), IdIndex::from_ids(destinations));
        builder.extend_transactions(transactions)?;
        let matrix = builder.build()?;
        let (sources, destinations) = builder.into_indices();

        tracing::info!(
            sources = sources.len(),
            destinations = destinations.len(),
            transactions = transactions.len(),
            edges = matrix.nnz(),
            "interaction matrix built"
        );
        Ok(Self {
            matrix,
            sources,
            destinations,
        })
    }

    fn check_shape(&self) -> Result<()> {
        let ids = (self.sources.len(), self.destinations.len());
        if self.matrix.shape() != ids {
            return Err(LinkPropError::Shape {
                op: "dataset",
                expected: ids,
                got: self.matrix.shape(),
            });
        }
        Ok(())
    }

    /// Write the dataset as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a dataset written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let dataset: Self = serde_json::from_reader(reader)?;
        dataset.check_shape()?;
        Ok(dataset)
    }

    /// Load the cache at `path` if it exists, otherwise build from
    /// transactions and write the cache.
    pub fn load_or_build<I, S>(
        path: &Path,
        sources: I,
        destinations: I,
        transactions: &[(S, S)],
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        S: AsRef<str> + Sync,
    {
        match Self::load(path) {
            Ok(dataset) => {
                tracing::debug!(path = %path.display(), "loaded cached dataset");
                return Ok(dataset);
            }
            Err(LinkPropError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let dataset = Self::from_transactions(sources, destinations, transactions)?;
        dataset.save(path)?;
        tracing::debug!(path = %path.display(), "wrote dataset cache");
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn build() -> InteractionDataset {
        InteractionDataset::from_transactions(
            vec!["c1", "c2", "c3"],
            vec!["a1", "a2"],
            &[("c1", "a1"), ("c1", "a1"), ("c2", "a2"), ("c3", "a1")],
        )
        .unwrap()
    }

    #[test]
    fn test_from_transactions() {
        let ds = build();
        assert_eq!(ds.matrix.shape(), (3, 2));
        assert_eq!(ds.matrix.nnz(), 3);
        assert_eq!(ds.matrix.get(0, 0), 1.0);
        assert_eq!(ds.sources.get("c2"), Some(1));
        assert_eq!(ds.destinations.id(1), Some("a2"));
    }

    #[test]
    fn test_unknown_transaction_id() {
        let err = InteractionDataset::from_transactions(vec!["c1"], vec!["a1"], &[("c1", "zz")])
            .unwrap_err();
        assert!(matches!(err, LinkPropError::UnknownId(id) if id == "zz"));
    }

    #[test]
    fn test_save_load_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("derived").join("interactions.json");
        let ds = build();
        ds.save(&path).unwrap();
        let loaded = InteractionDataset::load(&path).unwrap();
        assert_eq!(loaded, ds);
        assert_eq!(loaded.sources.get("c3"), Some(2));
    }

    #[test]
    fn test_load_or_build_prefers_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let first = InteractionDataset::load_or_build(
            &path,
            vec!["c1", "c2"],
            vec!["a1"],
            &[("c1", "a1")],
        )
        .unwrap();
        assert!(path.exists());

        // Different inputs: the cache wins
        let second = InteractionDataset::load_or_build(
            &path,
            vec!["x"],
            vec!["y"],
            &[("x", "y")],
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        let result = InteractionDataset::load_or_build(&path, vec!["c"], vec!["a"], &[("c", "a")]);
        assert!(matches!(result, Err(LinkPropError::Serde(_))));
    }
}
