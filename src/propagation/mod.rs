//! Degree-reweighted two-hop propagation
//!
//! The interaction matrix `M` is reweighted twice:
//!
//! - `M_ab[u, i] = d_u^-alpha * d_i^-beta  * M[u, i]`
//! - `M_gd[u, i] = d_u^-gamma * d_i^-delta * M[u, i]`
//!
//! and a batch of source rows is scored as `M_ab[rows] @ Mᵀ @ M_gd`:
//! source -> destination (weighted), destination -> source through the
//! unweighted transpose of the working matrix, then source -> destination
//! again (second weighting). The four exponents let popularity be penalized
//! or boosted independently per hop and per side.

pub mod scorer;

pub use scorer::PropagationScorer;

use serde::{Deserialize, Serialize};

/// The four degree exponents driving the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exponents {
    /// Source-degree exponent on the first hop
    pub alpha: f64,
    /// Destination-degree exponent on the first hop
    pub beta: f64,
    /// Source-degree exponent on the last hop
    pub gamma: f64,
    /// Destination-degree exponent on the last hop
    pub delta: f64,
}

impl Default for Exponents {
    /// Best setting found by grid search on the H&M purchase data.
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.1,
            gamma: 0.9,
            delta: 0.3,
        }
    }
}

impl Exponents {
    pub fn new(alpha: f64, beta: f64, gamma: f64, delta: f64) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            delta,
        }
    }

    /// All four exponents set to `value`.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn is_finite(&self) -> bool {
        [self.alpha, self.beta, self.gamma, self.delta]
            .iter()
            .all(|x| x.is_finite())
    }
}

/// `degree^(-exponent)` for each entry, with `inf` (from a zero degree)
/// mapped to 0 so nodes without signal contribute nothing.
pub fn inverse_degree_powers(degrees: &[f64], exponent: f64) -> Vec<f64> {
    degrees
        .iter()
        .map(|&d| {
            let w = d.powf(-exponent);
            if w.is_infinite() {
                0.0
            } else {
                w
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_degree_maps_to_zero() {
        let w = inverse_degree_powers(&[0.0, 1.0, 4.0], 0.5);
        assert_eq!(w[0], 0.0);
        assert!((w[1] - 1.0).abs() < 1e-12);
        assert!((w[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_exponent_is_identity_weight() {
        let w = inverse_degree_powers(&[0.0, 3.0, 10.0], 0.0);
        assert_eq!(w, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_exponents_deserialize_with_defaults() {
        let e: Exponents = serde_json::from_str(r#"{ "alpha": 0.7 }"#).unwrap();
        assert_eq!(e.alpha, 0.7);
        assert_eq!(e.beta, Exponents::default().beta);
    }
}
