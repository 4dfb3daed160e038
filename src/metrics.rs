//! Workflow activity counters exposed over the metrics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing workflow activity.
#[derive(Default)]
pub struct WorkflowMetrics {
    documents_processed: AtomicU64,
    ingest_failures: AtomicU64,
    searches_served: AtomicU64,
}

impl WorkflowMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully ingested document.
    pub fn record_processed(&self) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed ingestion attempt.
    pub fn record_failure(&self) {
        self.ingest_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one answered search query.
    pub fn record_search(&self) {
        self.searches_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            ingest_failures: self.ingest_failures.load(Ordering::Relaxed),
            searches_served: self.searches_served.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of workflow counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested successfully since startup.
    pub documents_processed: u64,
    /// Number of ingestion attempts that failed since startup.
    pub ingest_failures: u64,
    /// Number of search queries answered since startup.
    pub searches_served: u64,
}
