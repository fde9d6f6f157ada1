//! Run configuration for the link predictor.
//!
//! A [`LinkPropSpec`] carries the exponents, augmentation schedule, batching
//! and holdout settings of one run. It is validated by
//! [`super::validation::ValidationEngine`] before anything is built from it.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "v": 1,
//!   "params": { "alpha": 0.5, "beta": 0.1, "gamma": 0.9, "delta": 0.3 },
//!   "rounds": 2,
//!   "t": 0.05,
//!   "k": 12,
//!   "batch_size": 600,
//!   "total": 1000,
//!   "holdout": { "ratio": 0.4, "seed": 7 },
//!   "strict": false
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::validation::{ValidationEngine, ValidationReport};
use crate::error::{LinkPropError, Result};
use crate::predictor::LinkPredictor;
use crate::propagation::Exponents;
use crate::sampling::HoldoutSampler;
use crate::search::{GridSearch, ParamGrid};

/// Spec version this crate reads.
pub const SPEC_VERSION: u32 = 1;

/// Top-level run specification (v1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPropSpec {
    /// Spec version (currently `1`).
    pub v: u32,

    /// Degree exponents; omitted ones take the tuned defaults.
    #[serde(default)]
    pub params: Exponents,

    /// Total rounds; `1` is a plain fit.
    #[serde(default = "default_rounds")]
    pub rounds: usize,

    /// Augmentation rate: new edges per existing edge and round.
    #[serde(default = "default_t")]
    pub t: f64,

    /// Predictions per row.
    #[serde(default = "default_k")]
    pub k: usize,

    /// Rows densified at a time.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Limit on the rows swept by augmentation and scoring.
    #[serde(default)]
    pub total: Option<usize>,

    #[serde(default)]
    pub holdout: HoldoutSpec,

    /// If `true`, unrecognized fields are errors; if `false`, warnings.
    #[serde(default)]
    pub strict: bool,

    /// Captures any fields not recognized by the schema.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

/// Holdout split settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldoutSpec {
    #[serde(default = "default_ratio")]
    pub ratio: f64,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl Default for HoldoutSpec {
    fn default() -> Self {
        Self {
            ratio: default_ratio(),
            seed: None,
            unknown_fields: HashMap::new(),
        }
    }
}

fn default_rounds() -> usize {
    1
}

fn default_t() -> f64 {
    0.05
}

fn default_k() -> usize {
    12
}

fn default_batch_size() -> usize {
    600
}

fn default_ratio() -> f64 {
    0.4
}

impl Default for LinkPropSpec {
    fn default() -> Self {
        Self {
            v: SPEC_VERSION,
            params: Exponents::default(),
            rounds: default_rounds(),
            t: default_t(),
            k: default_k(),
            batch_size: default_batch_size(),
            total: None,
            holdout: HoldoutSpec::default(),
            strict: false,
            unknown_fields: HashMap::new(),
        }
    }
}

impl LinkPropSpec {
    /// Parse a spec from JSON without validating it.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Run the default rule set.
    pub fn validate(&self) -> ValidationReport {
        ValidationEngine::with_defaults().validate(self)
    }

    /// Fail with every error-severity diagnostic joined into one message.
    /// Warnings are logged.
    pub fn ensure_valid(&self) -> Result<()> {
        let report = self.validate();
        for warning in report.warnings() {
            tracing::warn!(%warning, "spec warning");
        }
        if report.has_errors() {
            let message = report
                .errors()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(LinkPropError::InvalidConfig(message));
        }
        Ok(())
    }

    /// Rows to sweep for a matrix with `rows` rows.
    pub fn total_for(&self, rows: usize) -> usize {
        self.total.map_or(rows, |total| total.min(rows))
    }

    /// Validate and build an unfitted predictor.
    pub fn build_predictor(&self) -> Result<LinkPredictor> {
        self.ensure_valid()?;
        Ok(LinkPredictor::new()
            .with_exponents(self.params)
            .with_rounds(self.rounds)
            .with_augment_rate(self.t)
            .with_k(self.k))
    }

    /// Validate and build the holdout sampler.
    pub fn sampler(&self) -> Result<HoldoutSampler> {
        self.ensure_valid()?;
        let sampler = HoldoutSampler::new().with_ratio(self.holdout.ratio);
        Ok(match self.holdout.seed {
            Some(seed) => sampler.with_seed(seed),
            None => sampler,
        })
    }

    /// Validate and build a grid search over `grid` with this spec's
    /// schedule, batching and holdout settings.
    pub fn grid_search(&self, grid: ParamGrid) -> Result<GridSearch> {
        let search = GridSearch::new(grid)
            .with_predictor(self.build_predictor()?)
            .with_sampler(self.sampler()?)
            .with_batch_size(self.batch_size);
        Ok(match self.total {
            Some(total) => search.with_total(total),
            None => search,
        })
    }
}
