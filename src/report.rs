//! Reporting hooks for callers that track detection and recognition rates.
//!
//! The pipeline never accumulates statistics itself. It emits one
//! [`DetectionEvent`] per pathway run and one [`RecognitionEvent`] per region
//! to whatever [`ReportSink`] the scanner was built with.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::models::{CodeType, Pathway};

/// One pathway's output for one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionEvent {
    /// Pathway that ran
    pub pathway: Pathway,
    /// Raw candidates it produced
    pub candidates: usize,
    /// Wall time spent in the pathway
    pub elapsed_ms: f64,
}

/// Outcome of reading one resolved region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionEvent {
    /// Symbology of the read, `None` when the region was unreadable
    pub code_type: Option<CodeType>,
    /// Time spent on the region
    pub decode_time_ms: f64,
}

impl RecognitionEvent {
    /// Whether the region produced a validated read
    pub fn recognized(&self) -> bool {
        self.code_type.is_some()
    }
}

/// Receiver for pipeline events. Shared across worker threads in batch mode.
pub trait ReportSink: Send + Sync {
    /// A detection pathway finished
    fn record_detection(&self, event: &DetectionEvent);

    /// A region was read or given up on
    fn record_recognition(&self, event: &RecognitionEvent);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn record_detection(&self, _event: &DetectionEvent) {}

    fn record_recognition(&self, _event: &RecognitionEvent) {}
}

/// Counters accumulated by [`MetricsSink`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Pathway runs
    pub detection_runs: usize,
    /// Raw candidates per pathway, indexed like [`Pathway::ALL`]
    pub candidates: [usize; 4],
    /// Regions read
    pub recognized: usize,
    /// Regions given up on
    pub unrecognized: usize,
    /// Reads per symbology, sorted by label
    pub per_type: Vec<(CodeType, usize)>,
    /// Total time spent reading regions
    pub total_decode_ms: f64,
}

impl MetricsSnapshot {
    /// Candidates attributed to one pathway
    pub fn candidates_for(&self, pathway: Pathway) -> usize {
        Pathway::ALL
            .iter()
            .position(|&p| p == pathway)
            .map_or(0, |i| self.candidates[i])
    }

    /// Fraction of regions that were read
    pub fn recognition_rate(&self) -> f64 {
        let total = self.recognized + self.unrecognized;
        if total == 0 {
            0.0
        } else {
            self.recognized as f64 / total as f64
        }
    }

    /// Mean time per region
    pub fn mean_decode_ms(&self) -> f64 {
        let total = self.recognized + self.unrecognized;
        if total == 0 {
            0.0
        } else {
            self.total_decode_ms / total as f64
        }
    }
}

/// Thread-safe counter sink
#[derive(Debug, Default)]
pub struct MetricsSink {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsSink {
    /// Empty counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        // Counters stay usable even if a recording thread panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ReportSink for MetricsSink {
    fn record_detection(&self, event: &DetectionEvent) {
        let mut m = self.lock();
        m.detection_runs += 1;
        if let Some(i) = Pathway::ALL.iter().position(|&p| p == event.pathway) {
            m.candidates[i] += event.candidates;
        }
    }

    fn record_recognition(&self, event: &RecognitionEvent) {
        let mut m = self.lock();
        m.total_decode_ms += event.decode_time_ms;
        let Some(code_type) = event.code_type else {
            m.unrecognized += 1;
            return;
        };
        m.recognized += 1;
        match m.per_type.iter_mut().find(|(t, _)| *t == code_type) {
            Some((_, count)) => *count += 1,
            None => {
                m.per_type.push((code_type, 1));
                m.per_type.sort_by_key(|(t, _)| t.label());
            }
        }
    }
}
