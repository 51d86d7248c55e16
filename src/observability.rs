use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Collaborator call metrics
#[derive(Debug, Default)]
pub struct CollaboratorMetrics {
    pub total_calls: AtomicU64,
    pub failures: AtomicU64,
    pub deadline_hits: AtomicU64,
}

impl CollaboratorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deadline_hit(&self, phase: &str) {
        self.deadline_hits.fetch_add(1, Ordering::Relaxed);
        warn!(phase = phase, "Collaborator call hit the workflow deadline");
    }

    pub fn get_stats(&self) -> CollaboratorStats {
        CollaboratorStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            deadline_hits: self.deadline_hits.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Collaborator metrics: calls={}, failures={}, deadline_hits={}",
            stats.total_calls, stats.failures, stats.deadline_hits
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorStats {
    pub total_calls: u64,
    pub failures: u64,
    pub deadline_hits: u64,
}

static COLLABORATOR_METRICS: std::sync::LazyLock<CollaboratorMetrics> =
    std::sync::LazyLock::new(CollaboratorMetrics::new);

pub fn collaborator_metrics() -> &'static CollaboratorMetrics {
    &COLLABORATOR_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> u64 {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        debug!(
            operation = %self.operation,
            duration_ms,
            "Operation completed"
        );
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_accumulate() {
        let metrics = CollaboratorMetrics::new();
        metrics.record_call();
        metrics.record_call();
        metrics.record_failure();
        metrics.record_deadline_hit("audit");

        assert_eq!(
            metrics.get_stats(),
            CollaboratorStats {
                total_calls: 2,
                failures: 1,
                deadline_hits: 1,
            }
        );
    }
}
