//! Stable machine-readable codes for configuration diagnostics.

use serde::Serialize;

/// Category of a [`PipelineSpecError`](super::errors::PipelineSpecError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// `v` names a spec version this crate does not read.
    UnsupportedVersion,
    /// A numeric value is NaN or infinite.
    NonFinite,
    /// A count that must be positive is zero.
    NotPositive,
    /// A value lies outside its allowed range.
    OutOfRange,
    /// A field the schema does not know.
    UnknownField,
    /// Catch-all for custom rules.
    ValidationFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion => "unsupported_version",
            Self::NonFinite => "non_finite",
            Self::NotPositive => "not_positive",
            Self::OutOfRange => "out_of_range",
            Self::UnknownField => "unknown_field",
            Self::ValidationFailed => "validation_failed",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
