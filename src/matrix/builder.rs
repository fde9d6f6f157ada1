//! Interaction matrix builder with id interning
//!
//! This module maps external string ids (customers, articles) to dense
//! row/column indices using FxHashMap for O(1) lookups, and turns a
//! transaction list into a `max`-coalesced interaction matrix.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::coo::{Reduce, SparseMatrix};
use crate::error::{LinkPropError, Result};

/// Transaction lists below this size are resolved sequentially.
const PARALLEL_THRESHOLD: usize = 1000;

/// Bidirectional mapping between external ids and dense indices
///
/// Serialized as the plain id list; the lookup map is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IdIndex {
    /// Index -> external id
    ids: Vec<String>,
    /// External id -> index
    index: FxHashMap<String, usize>,
}

impl IdIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered id list; a repeated id keeps its first index
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::new();
        for id in ids {
            out.get_or_create(id.as_ref());
        }
        out
    }

    /// Get or create the index for the given id
    pub fn get_or_create(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }

        let idx = self.ids.len();
        self.index.insert(id.to_string(), idx);
        self.ids.push(id.to_string());
        idx
    }

    /// Look up the index of an id
    pub fn get(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Look up the id at an index
    pub fn id(&self, idx: usize) -> Option<&str> {
        self.ids.get(idx).map(String::as_str)
    }

    /// All ids in index order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<String>> for IdIndex {
    fn from(ids: Vec<String>) -> Self {
        Self::from_ids(ids)
    }
}

impl From<IdIndex> for Vec<String> {
    fn from(index: IdIndex) -> Self {
        index.ids
    }
}

/// Accumulates `(source, destination)` transactions over fixed id spaces
#[derive(Debug)]
pub struct InteractionBuilder {
    sources: IdIndex,
    destinations: IdIndex,
    edges: Vec<(usize, usize)>,
}

impl InteractionBuilder {
    /// Create a builder over known source and destination id lists
    pub fn new(sources: IdIndex, destinations: IdIndex) -> Self {
        Self {
            sources,
            destinations,
            edges: Vec::new(),
        }
    }

    fn resolve(&self, source: &str, destination: &str) -> Result<(usize, usize)> {
        let row = self
            .sources
            .get(source)
            .ok_or_else(|| LinkPropError::UnknownId(source.to_string()))?;
        let col = self
            .destinations
            .get(destination)
            .ok_or_else(|| LinkPropError::UnknownId(destination.to_string()))?;
        Ok((row, col))
    }

    /// Record a single transaction
    pub fn add_transaction(&mut self, source: &str, destination: &str) -> Result<()> {
        let edge = self.resolve(source, destination)?;
        self.edges.push(edge);
        Ok(())
    }

    /// Record many transactions, resolving ids in parallel for large inputs
    pub fn extend_transactions<S>(&mut self, transactions: &[(S, S)]) -> Result<()>
    where
        S: AsRef<str> + Sync,
    {
        // For small inputs, sequential is faster
        let resolved: Vec<(usize, usize)> = if transactions.len() < PARALLEL_THRESHOLD {
            transactions
                .iter()
                .map(|(s, d)| self.resolve(s.as_ref(), d.as_ref()))
                .collect::<Result<_>>()?
        } else {
            transactions
                .par_iter()
                .map(|(s, d)| self.resolve(s.as_ref(), d.as_ref()))
                .collect::<Result<_>>()?
        };
        self.edges.extend(resolved);
        Ok(())
    }

    /// Number of recorded transactions (duplicates included)
    pub fn transaction_count(&self) -> usize {
        self.edges.len()
    }

    /// Build the interaction matrix; repeated purchases collapse to 1.0
    pub fn build(&self) -> Result<SparseMatrix> {
        SparseMatrix::from_triplets(
            self.sources.len(),
            self.destinations.len(),
            self.edges.iter().map(|&(row, col)| (row, col, 1.0)),
            Reduce::Max,
        )
    }

    /// Hand back the id indices
    pub fn into_indices(self) -> (IdIndex, IdIndex) {
        (self.sources, self.destinations)
    }
}
