//! # linkprop
//!
//! Neighborhood-based link prediction for collaborative filtering over a
//! sparse bipartite source × destination interaction matrix (customers ×
//! articles, users × items).
//!
//! Scores are degree-reweighted two-hop propagations,
//! `M_ab[rows] @ Mᵀ @ M_gd`, and can be refined by self-augmentation rounds
//! that feed confident predictions back into the degree statistics. Dense
//! data only ever exists one row batch at a time.
//!
//! ## Example
//!
//! ```rust,ignore
//! use linkprop::{HoldoutSampler, LinkPredictor, SparseMatrix};
//!
//! let split = HoldoutSampler::new().with_seed(7).sample(&matrix)?;
//! let mut predictor = LinkPredictor::new().with_rounds(2).with_k(12);
//! predictor.fit_multi(&split.observed, 600, split.observed.rows())?;
//! let outcome = predictor.score(&split.observed, &split.target, 600, 1000)?;
//! println!("MAP@12 = {:.4}", outcome.map);
//! ```

pub mod dataset;
pub mod degree;
pub mod error;
pub mod export;
pub mod matrix;
pub mod metrics;
pub mod pipeline;
pub mod predictor;
pub mod propagation;
pub mod sampling;
pub mod search;

pub use dataset::InteractionDataset;
pub use degree::{degrees, DegreeCache, DegreeStats};
pub use error::{LinkPropError, Result};
pub use matrix::{Axis, CsrMatrix, DenseBlock, Reduce, SparseMatrix};
pub use metrics::{average_precision_at_k, mean_average_precision};
pub use pipeline::LinkPropSpec;
pub use predictor::{LinkPredictor, PredictorState, ScoreOutcome};
pub use propagation::{Exponents, PropagationScorer};
pub use sampling::{HoldoutSampler, HoldoutSplit};
pub use search::{GridSearch, ParamGrid, SearchOutcome};
