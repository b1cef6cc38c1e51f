//! Progress tracking for document transfers.

use log::info;
use std::cell::Cell;
use std::time::Instant;

/// Counts records copied and skipped while a document is transferred.
pub struct ProgressTracker {
    records_copied: Cell<usize>,
    records_skipped: Cell<usize>,
    start_time: Instant,
    last_report_count: Cell<usize>,
    report_interval: usize,
}

impl ProgressTracker {
    /// Create a new progress tracker with a specified reporting interval.
    ///
    /// The tracker will log progress every `report_interval` records.
    pub fn new(report_interval: usize) -> Self {
        Self {
            records_copied: Cell::new(0),
            records_skipped: Cell::new(0),
            start_time: Instant::now(),
            last_report_count: Cell::new(0),
            report_interval: report_interval.max(1),
        }
    }

    /// Increment the copied counter and log progress if interval reached.
    pub fn increment_copied(&self) {
        let count = self.records_copied.get() + 1;
        self.records_copied.set(count);

        if count - self.last_report_count.get() >= self.report_interval {
            self.last_report_count.set(count);
            let elapsed = self.start_time.elapsed();
            info!(
                "Progress: {} records copied (elapsed: {:.1}s)",
                count,
                elapsed.as_secs_f64()
            );
        }
    }

    /// Increment the skipped counter (silent).
    pub fn increment_skipped(&self) {
        self.records_skipped.set(self.records_skipped.get() + 1);
    }

    /// Log final statistics.
    pub fn finish(&self, stage: &str) {
        info!(
            "{}: {} records copied, {} skipped in {:.2}s",
            stage,
            self.copied_count(),
            self.skipped_count(),
            self.start_time.elapsed().as_secs_f64()
        );
    }

    pub fn copied_count(&self) -> usize {
        self.records_copied.get()
    }

    pub fn skipped_count(&self) -> usize {
        self.records_skipped.get()
    }
}
