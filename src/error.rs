//! Error types for the link prediction engine.

use thiserror::Error;

/// Errors raised by matrix operations, fitting, scoring and I/O.
#[derive(Debug, Error)]
pub enum LinkPropError {
    /// A coordinate lies outside the declared matrix shape.
    #[error("index ({row}, {col}) out of bounds for matrix of shape ({rows}, {cols})")]
    Index {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Two operands (or an operand and a cached statistic) disagree on shape.
    #[error("shape mismatch in {op}: expected {expected:?}, got {got:?}")]
    Shape {
        op: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// A mask or vector length does not match the axis it indexes.
    #[error("length mismatch in {op}: expected {expected}, got {got}")]
    Length {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// Prediction or scoring was requested before `fit`.
    #[error("predictor has not been fitted")]
    NotFitted,

    /// A transaction references an id missing from the id lists.
    #[error("unknown id: {0}")]
    UnknownId(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinkPropError>;
