use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    mark_attempts: AtomicU64,
    marks_recorded: AtomicU64,
    marks_rejected: AtomicU64,
    departures_recorded: AtomicU64,
    operation_failures: AtomicU64,
    sync_pushed: AtomicU64,
    sync_pulled: AtomicU64,
    sync_failed: AtomicU64,
}

impl Metrics {
    pub fn record_mark_attempt(&self) {
        self.mark_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mark(&self) {
        self.marks_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_departure(&self) {
        self.departures_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, fault: bool) {
        if fault {
            self.operation_failures.fetch_add(1, Ordering::Relaxed);
        } else {
            self.marks_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_push(&self, succeeded: usize, failed: usize) {
        self.sync_pushed
            .fetch_add(succeeded as u64, Ordering::Relaxed);
        self.sync_failed.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_pull(&self, applied: usize, failed: usize) {
        self.sync_pulled.fetch_add(applied as u64, Ordering::Relaxed);
        self.sync_failed.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn marks_recorded(&self) -> u64 {
        self.marks_recorded.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let attempts = self.mark_attempts.load(Ordering::Relaxed);
        let recorded = self.marks_recorded.load(Ordering::Relaxed);
        let rejected = self.marks_rejected.load(Ordering::Relaxed);
        let departures = self.departures_recorded.load(Ordering::Relaxed);
        let failures = self.operation_failures.load(Ordering::Relaxed);
        let pushed = self.sync_pushed.load(Ordering::Relaxed);
        let pulled = self.sync_pulled.load(Ordering::Relaxed);
        let sync_failed = self.sync_failed.load(Ordering::Relaxed);

        format!(
            "# TYPE muster_mark_attempts_total counter\n\
muster_mark_attempts_total {}\n\
# TYPE muster_marks_recorded_total counter\n\
muster_marks_recorded_total {}\n\
# TYPE muster_marks_rejected_total counter\n\
muster_marks_rejected_total {}\n\
# TYPE muster_departures_recorded_total counter\n\
muster_departures_recorded_total {}\n\
# TYPE muster_operation_failures_total counter\n\
muster_operation_failures_total {}\n\
# TYPE muster_sync_pushed_total counter\n\
muster_sync_pushed_total {}\n\
# TYPE muster_sync_pulled_total counter\n\
muster_sync_pulled_total {}\n\
# TYPE muster_sync_failed_total counter\n\
muster_sync_failed_total {}\n",
            attempts, recorded, rejected, departures, failures, pushed, pulled, sync_failed
        )
    }
}
