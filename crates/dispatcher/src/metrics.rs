//! Dispatcher counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::DrainReport;

/// Counters for one dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Jobs accepted by the backend
    submitted: AtomicU64,
    /// Jobs that could not be started or submitted
    launch_failures: AtomicU64,
    /// Jobs that ran and failed (local backend only)
    job_failures: AtomicU64,
    /// Workers or submitters joined by `wait`
    drained: AtomicU64,
    /// Joined handles that ended unsuccessfully
    drain_failures: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn launch_failures(&self) -> u64 {
        self.launch_failures.load(Ordering::Relaxed)
    }

    pub fn inc_launch_failures(&self) {
        self.launch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_failures(&self) -> u64 {
        self.job_failures.load(Ordering::Relaxed)
    }

    pub fn inc_job_failures(&self) {
        self.job_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold a drain report into the totals
    pub fn add_drain(&self, report: &DrainReport) {
        self.drained
            .fetch_add(report.joined as u64, Ordering::Relaxed);
        self.drain_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted(),
            launch_failures: self.launch_failures(),
            job_failures: self.job_failures(),
            drained: self.drained.load(Ordering::Relaxed),
            drain_failures: self.drain_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub launch_failures: u64,
    pub job_failures: u64,
    pub drained: u64,
    pub drain_failures: u64,
}
