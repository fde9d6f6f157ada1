//! Validation engine for run specifications.
//!
//! The engine runs all registered [`ValidationRule`]s against a
//! [`LinkPropSpec`](super::spec::LinkPropSpec) and collects every diagnostic
//! into a [`ValidationReport`]. It never short-circuits on the first error,
//! so users see all problems at once.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use linkprop::pipeline::validation::ValidationEngine;
//!
//! let engine = ValidationEngine::with_defaults();
//! let report = engine.validate(&spec);
//! if report.has_errors() {
//!     for err in report.errors() {
//!         eprintln!("{err}");
//!     }
//! }
//! ```

use std::collections::HashMap;

use serde::Serialize;

use super::error_code::ErrorCode;
use super::errors::PipelineSpecError;
use super::spec::{LinkPropSpec, SPEC_VERSION};

// ─── Severity ───────────────────────────────────────────────────────────────

/// Whether a diagnostic is a hard error or a soft warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

// ─── Diagnostic ─────────────────────────────────────────────────────────────

/// A single validation finding: an error or warning attached to a
/// [`PipelineSpecError`] that carries the code, path, message, and hint.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    #[serde(flatten)]
    pub error: PipelineSpecError,
}

impl ValidationDiagnostic {
    pub fn error(err: PipelineSpecError) -> Self {
        Self {
            severity: Severity::Error,
            error: err,
        }
    }

    pub fn warning(err: PipelineSpecError) -> Self {
        Self {
            severity: Severity::Warning,
            error: err,
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Collected diagnostics from running all validation rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    /// Iterate over error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &PipelineSpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &d.error)
    }

    /// Iterate over warning-severity diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &PipelineSpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| &d.error)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns `true` if there are no errors (warnings are acceptable).
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

// ─── Rule trait ─────────────────────────────────────────────────────────────

/// A single validation rule that inspects a [`LinkPropSpec`] and returns
/// zero or more diagnostics.
pub trait ValidationRule: Send + Sync {
    /// Short, stable identifier for this rule (e.g., `"positive_counts"`).
    fn name(&self) -> &str;

    fn validate(&self, spec: &LinkPropSpec) -> Vec<ValidationDiagnostic>;
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs a set of [`ValidationRule`]s against a [`LinkPropSpec`] and collects
/// all diagnostics into a [`ValidationReport`].
pub struct ValidationEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationEngine {
    /// Create an empty engine with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create an engine pre-loaded with the default rule set.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(VersionRule));
        engine.add_rule(Box::new(FiniteExponentsRule));
        engine.add_rule(Box::new(PositiveCountsRule));
        engine.add_rule(Box::new(AugmentRateRule));
        engine.add_rule(Box::new(HoldoutRatioRule));
        engine.add_rule(Box::new(UnknownFieldsRule));
        engine
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run all rules against `spec` and return the collected report.
    pub fn validate(&self, spec: &LinkPropSpec) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            report.diagnostics.extend(rule.validate(spec));
        }
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Concrete rules
// ═══════════════════════════════════════════════════════════════════════════

// ─── 1. Known spec version ──────────────────────────────────────────────────

struct VersionRule;

impl ValidationRule for VersionRule {
    fn name(&self) -> &str {
        "version"
    }

    fn validate(&self, spec: &LinkPropSpec) -> Vec<ValidationDiagnostic> {
        if spec.v == SPEC_VERSION {
            return vec![];
        }
        vec![ValidationDiagnostic::error(
            PipelineSpecError::new(
                ErrorCode::UnsupportedVersion,
                "/v",
                format!("spec version {} is not supported", spec.v),
            )
            .with_hint(format!("Set \"v\": {SPEC_VERSION}")),
        )]
    }
}

// ─── 2. Exponents must be finite ────────────────────────────────────────────

struct FiniteExponentsRule;

impl ValidationRule for FiniteExponentsRule {
    fn name(&self) -> &str {
        "finite_exponents"
    }

    fn validate(&self, spec: &LinkPropSpec) -> Vec<ValidationDiagnostic> {
        let p = &spec.params;
        [
            ("alpha", p.alpha),
            ("beta", p.beta),
            ("gamma", p.gamma),
            ("delta", p.delta),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_finite())
        .map(|(field, value)| {
            ValidationDiagnostic::error(PipelineSpecError::new(
                ErrorCode::NonFinite,
                format!("/params/{field}"),
                format!("{field} must be finite, got {value}"),
            ))
        })
        .collect()
    }
}

// ─── 3. Counts must be positive ─────────────────────────────────────────────

struct PositiveCountsRule;

impl ValidationRule for PositiveCountsRule {
    fn name(&self) -> &str {
        "positive_counts"
    }

    fn validate(&self, spec: &LinkPropSpec) -> Vec<ValidationDiagnostic> {
        let checks: &[(&str, Option<usize>)] = &[
            ("k", Some(spec.k)),
            ("batch_size", Some(spec.batch_size)),
            ("rounds", Some(spec.rounds)),
            ("total", spec.total),
        ];

        checks
            .iter()
            .filter(|&&(_, value)| value == Some(0))
            .map(|&(field, _)| {
                let hint = if field == "total" {
                    "Remove total to sweep every row, or set it to a positive value".to_string()
                } else {
                    format!("Set {field} to 1 or more")
                };
                ValidationDiagnostic::error(
                    PipelineSpecError::new(
                        ErrorCode::NotPositive,
                        format!("/{field}"),
                        format!("{field} must be greater than 0"),
                    )
                    .with_hint(hint),
                )
            })
            .collect()
    }
}

// ─── 4. Augmentation rate ───────────────────────────────────────────────────

struct AugmentRateRule;

impl ValidationRule for AugmentRateRule {
    fn name(&self) -> &str {
        "augment_rate"
    }

    fn validate(&self, spec: &LinkPropSpec) -> Vec<ValidationDiagnostic> {
        if !spec.t.is_finite() {
            return vec![ValidationDiagnostic::error(PipelineSpecError::new(
                ErrorCode::NonFinite,
                "/t",
                format!("t must be finite, got {}", spec.t),
            ))];
        }
        if spec.t < 0.0 {
            return vec![ValidationDiagnostic::error(
                PipelineSpecError::new(
                    ErrorCode::OutOfRange,
                    "/t",
                    format!("t must be non-negative, got {}", spec.t),
                )
                .with_hint("Use 0 to disable augmentation"),
            )];
        }
        vec![]
    }
}

// ─── 5. Holdout ratio in [0, 1] ─────────────────────────────────────────────

struct HoldoutRatioRule;

impl ValidationRule for HoldoutRatioRule {
    fn name(&self) -> &str {
        "holdout_ratio"
    }

    fn validate(&self, spec: &LinkPropSpec) -> Vec<ValidationDiagnostic> {
        let ratio = spec.holdout.ratio;
        if (0.0..=1.0).contains(&ratio) {
            vec![]
        } else {
            vec![ValidationDiagnostic::error(
                PipelineSpecError::new(
                    ErrorCode::OutOfRange,
                    "/holdout/ratio",
                    format!("holdout ratio must be within [0, 1], got {ratio}"),
                )
                .with_hint("The default is 0.4"),
            )]
        }
    }
}

// ─── 6. Unknown fields (strict → error, non-strict → warning) ──────────────

struct UnknownFieldsRule;

impl UnknownFieldsRule {
    /// Collect unknown-field diagnostics at the given JSON pointer `path`
    /// from a `HashMap` of extra fields captured by `#[serde(flatten)]`.
    fn check_unknowns(
        path: &str,
        unknowns: &HashMap<String, serde_json::Value>,
        strict: bool,
    ) -> Vec<ValidationDiagnostic> {
        let mut keys: Vec<&String> = unknowns.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let diag_fn = if strict {
                    ValidationDiagnostic::error
                } else {
                    ValidationDiagnostic::warning
                };
                diag_fn(
                    PipelineSpecError::new(
                        ErrorCode::UnknownField,
                        format!("{path}/{key}"),
                        format!("unrecognized field \"{key}\""),
                    )
                    .with_hint("Check spelling or remove this field"),
                )
            })
            .collect()
    }
}

impl ValidationRule for UnknownFieldsRule {
    fn name(&self) -> &str {
        "unknown_fields"
    }

    fn validate(&self, spec: &LinkPropSpec) -> Vec<ValidationDiagnostic> {
        let mut out = Self::check_unknowns("", &spec.unknown_fields, spec.strict);
        out.extend(Self::check_unknowns(
            "/holdout",
            &spec.holdout.unknown_fields,
            spec.strict,
        ));
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════
