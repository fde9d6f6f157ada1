//! Ranking metrics
//!
//! MAP@k as used for the purchase-prediction task: for each row, precision
//! is accumulated at every rank that hits a relevant id, then normalized by
//! the number of relevant ids reachable within `k`.

use rustc_hash::FxHashSet;

/// Average precision of one ranked list against a relevant set.
///
/// Returns 0 when `truth` is empty or `k` is 0. Repeated predicted ids only
/// count once.
pub fn average_precision_at_k(truth: &[usize], predicted: &[usize], k: usize) -> f64 {
    if truth.is_empty() || k == 0 {
        return 0.0;
    }

    let mut remaining: FxHashSet<usize> = truth.iter().copied().collect();
    let relevant = remaining.len().min(k);
    let mut hits = 0usize;
    let mut precision_sum = 0.0;

    for (rank, id) in predicted.iter().take(k).enumerate() {
        if remaining.remove(id) {
            hits += 1;
            precision_sum += hits as f64 / (rank + 1) as f64;
        }
    }

    precision_sum / relevant as f64
}

/// Mean of [`average_precision_at_k`] over rows of `y_true`.
///
/// Rows missing from `y_pred` count as empty predictions.
pub fn mean_average_precision(y_true: &[Vec<usize>], y_pred: &[Vec<usize>], k: usize) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .enumerate()
        .map(|(i, truth)| {
            let predicted = y_pred.get(i).map(Vec::as_slice).unwrap_or(&[]);
            average_precision_at_k(truth, predicted, k)
        })
        .sum();
    total / y_true.len() as f64
}

/// Row-wise intersection of two ragged id lists, each result sorted.
pub fn intersect_rows(a: &[Vec<usize>], b: &[Vec<usize>]) -> Vec<Vec<usize>> {
    a.iter()
        .zip(b)
        .map(|(left, right)| {
            let right: FxHashSet<usize> = right.iter().copied().collect();
            let mut common: Vec<usize> = left
                .iter()
                .copied()
                .filter(|id| right.contains(id))
                .collect::<FxHashSet<_>>()
                .into_iter()
                .collect();
            common.sort_unstable();
            common
        })
        .collect()
}
