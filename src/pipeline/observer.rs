//! Batch observer: hooks for logging, profiling and early inspection.
//!
//! Observers receive notifications at row-batch and augmentation-round
//! boundaries without coupling to the scoring logic, e.g. to watch the
//! running MAP on large data.

use std::time::{Duration, Instant};

/// Stage name for augmentation sweeps in `fit_multi`.
pub const STAGE_AUGMENT: &str = "augment";
/// Stage name for `predict` sweeps.
pub const STAGE_PREDICT: &str = "predict";
/// Stage name for `score` sweeps.
pub const STAGE_SCORE: &str = "score";

// ─── Clock ──────────────────────────────────────────────────────────────────

/// Wall-clock timer for one batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchClock {
    started: Instant,
}

impl BatchClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// What happened in one row batch `[start, end)`.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub start: usize,
    pub end: usize,
    pub elapsed: Duration,
    candidates: Option<usize>,
    batch_map: Option<f64>,
    running_map: Option<f64>,
}

impl BatchReport {
    pub fn new(start: usize, end: usize, elapsed: Duration) -> Self {
        Self {
            start,
            end,
            elapsed,
            candidates: None,
            batch_map: None,
            running_map: None,
        }
    }

    /// Number of candidate ids produced for the batch.
    pub fn candidates(&self) -> Option<usize> {
        self.candidates
    }

    /// MAP@k of this batch alone.
    pub fn batch_map(&self) -> Option<f64> {
        self.batch_map
    }

    /// Mean of the batch MAPs seen so far.
    pub fn running_map(&self) -> Option<f64> {
        self.running_map
    }
}

/// Fluent construction of a [`BatchReport`] with optional metrics.
#[derive(Debug)]
pub struct BatchReportBuilder {
    report: BatchReport,
}

impl BatchReportBuilder {
    pub fn new(start: usize, end: usize, elapsed: Duration) -> Self {
        Self {
            report: BatchReport::new(start, end, elapsed),
        }
    }

    pub fn candidates(mut self, n: usize) -> Self {
        self.report.candidates = Some(n);
        self
    }

    pub fn batch_map(mut self, map: f64) -> Self {
        self.report.batch_map = Some(map);
        self
    }

    pub fn running_map(mut self, map: f64) -> Self {
        self.report.running_map = Some(map);
        self
    }

    pub fn build(self) -> BatchReport {
        self.report
    }
}

// ─── Observer trait ─────────────────────────────────────────────────────────

/// Callbacks at batch and round boundaries. All methods default to no-ops.
pub trait BatchObserver {
    fn on_batch_start(&mut self, _stage: &'static str, _start: usize, _end: usize) {}

    fn on_batch_end(&mut self, _stage: &'static str, _report: &BatchReport) {}

    /// Called after an augmentation round merged `added` new edges.
    fn on_round_end(&mut self, _round: usize, _added: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Observer that emits batch and round events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BatchObserver for TracingObserver {
    fn on_batch_end(&mut self, stage: &'static str, report: &BatchReport) {
        match report.running_map() {
            Some(running) => tracing::info!(
                stage,
                start = report.start,
                end = report.end,
                batch_map = report.batch_map().unwrap_or(0.0),
                running_map = running,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "batch scored"
            ),
            None => tracing::debug!(
                stage,
                start = report.start,
                end = report.end,
                candidates = report.candidates().unwrap_or(0),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "batch done"
            ),
        }
    }

    fn on_round_end(&mut self, round: usize, added: usize) {
        tracing::info!(round, added, "augmentation round merged");
    }
}

/// Observer that keeps every report, for profiling and tests.
#[derive(Debug, Default)]
pub struct BatchTimingObserver {
    reports: Vec<(&'static str, BatchReport)>,
    rounds: Vec<(usize, usize)>,
}

impl BatchTimingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[(&'static str, BatchReport)] {
        &self.reports
    }

    /// `(round, added_edges)` for each completed augmentation round.
    pub fn rounds(&self) -> &[(usize, usize)] {
        &self.rounds
    }

    pub fn total_elapsed(&self) -> Duration {
        self.reports.iter().map(|(_, r)| r.elapsed).sum()
    }
}

impl BatchObserver for BatchTimingObserver {
    fn on_batch_end(&mut self, stage: &'static str, report: &BatchReport) {
        self.reports.push((stage, report.clone()));
    }

    fn on_round_end(&mut self, round: usize, added: usize) {
        self.rounds.push((round, added));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_builder_sets_optional_metrics() {
        let report = BatchReportBuilder::new(0, 10, Duration::from_millis(3))
            .batch_map(0.5)
            .running_map(0.25)
            .candidates(7)
            .build();
        assert_eq!(report.batch_map(), Some(0.5));
        assert_eq!(report.running_map(), Some(0.25));
        assert_eq!(report.candidates(), Some(7));

        let bare = BatchReport::new(0, 1, Duration::ZERO);
        assert!(bare.batch_map().is_none());
    }

    #[test]
    fn test_timing_observer_collects() {
        let mut obs = BatchTimingObserver::new();
        obs.on_batch_start(STAGE_SCORE, 0, 2);
        obs.on_batch_end(
            STAGE_SCORE,
            &BatchReport::new(0, 2, Duration::from_millis(2)),
        );
        obs.on_round_end(1, 4);

        assert_eq!(obs.reports().len(), 1);
        assert_eq!(obs.reports()[0].0, STAGE_SCORE);
        assert_eq!(obs.rounds(), &[(1, 4)]);
        assert_eq!(obs.total_elapsed(), Duration::from_millis(2));
    }

    #[test]
    fn test_noop_observer_as_trait_object() {
        let mut obs: Box<dyn BatchObserver> = Box::new(NoopObserver);
        obs.on_batch_start(STAGE_PREDICT, 0, 1);
        obs.on_batch_end(STAGE_PREDICT, &BatchReport::new(0, 1, Duration::ZERO));
    }
}
