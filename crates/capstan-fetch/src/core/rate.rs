//! Progress accounting for byte streams.

use std::time::{Duration, Instant};

use crate::data::progress::Progress;

/// Default minimum time between two progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Decides when a transfer is due a progress report and what it says.
///
/// Pure state machine: callers feed it chunk sizes and clock readings, it
/// throttles reports to one per `interval` and computes the rate over the
/// elapsed window, which smooths bursty chunk arrival instead of letting
/// the displayed rate spike per chunk. The bytes counted never decrease,
/// and [`finish`](Self::finish) always produces a last report that lands
/// on the expected total when one is known.
#[derive(Debug)]
pub struct ProgressCounter {
    total: Option<u64>,
    interval: Duration,
    transferred: u64,
    window_started: Instant,
    window_bytes: u64,
    rate: u64,
}

impl ProgressCounter {
    pub fn new(total: Option<u64>, interval: Duration, now: Instant) -> Self {
        Self {
            total,
            interval,
            transferred: 0,
            window_started: now,
            window_bytes: 0,
            rate: 0,
        }
    }

    /// Account for a received chunk. Returns a report when one is due.
    pub fn record(&mut self, now: Instant, len: u64) -> Option<Progress> {
        self.transferred += len;
        self.window_bytes += len;

        let elapsed = now.duration_since(self.window_started);
        if elapsed < self.interval {
            return None;
        }
        let delta = self.window_bytes;
        self.roll_window(now, elapsed);
        Some(Progress {
            total: self.total,
            transferred: self.transferred,
            delta,
            bytes_per_second: self.rate,
        })
    }

    /// Close the transfer. The final report is always produced, with
    /// `transferred` raised to `total` when the total size was known.
    pub fn finish(&mut self, now: Instant) -> Progress {
        let reported = self.transferred - self.window_bytes;
        if let Some(total) = self.total {
            self.transferred = self.transferred.max(total);
        }
        let elapsed = now.duration_since(self.window_started);
        self.roll_window(now, elapsed);
        Progress {
            total: self.total,
            transferred: self.transferred,
            delta: self.transferred - reported,
            bytes_per_second: self.rate,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn roll_window(&mut self, now: Instant, elapsed: Duration) {
        if self.window_bytes > 0 && elapsed > Duration::ZERO {
            self.rate = (self.window_bytes as f64 / elapsed.as_secs_f64()) as u64;
        }
        self.window_bytes = 0;
        self.window_started = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn throttles_reports_to_the_interval() {
        let start = Instant::now();
        let mut counter = ProgressCounter::new(Some(1000), INTERVAL, start);

        assert!(counter.record(start + Duration::from_millis(10), 100).is_none());
        assert!(counter.record(start + Duration::from_millis(50), 100).is_none());

        let report = counter
            .record(start + Duration::from_millis(120), 100)
            .expect("interval elapsed, report due");
        assert_eq!(report.transferred, 300);
        assert_eq!(report.delta, 300);
        assert_eq!(report.total, Some(1000));

        // The window restarts after a report.
        assert!(counter.record(start + Duration::from_millis(130), 100).is_none());
    }

    #[test]
    fn rate_is_bytes_over_window() {
        let start = Instant::now();
        let mut counter = ProgressCounter::new(None, INTERVAL, start);

        let report = counter
            .record(start + Duration::from_millis(100), 1000)
            .unwrap();
        // 1000 bytes over 100ms.
        assert_eq!(report.bytes_per_second, 10_000);
    }

    #[test]
    fn transferred_is_monotonic() {
        let start = Instant::now();
        let mut counter = ProgressCounter::new(Some(5000), Duration::ZERO, start);

        let mut last = 0;
        for i in 1..=10 {
            let report = counter
                .record(start + Duration::from_millis(i * 20), 500)
                .expect("zero interval reports every chunk");
            assert!(report.transferred >= last);
            last = report.transferred;
        }
        assert_eq!(last, 5000);
    }

    #[test]
    fn finish_lands_on_known_total() {
        let start = Instant::now();
        let mut counter = ProgressCounter::new(Some(1000), INTERVAL, start);

        // Below the interval: nothing reported yet.
        assert!(counter.record(start + Duration::from_millis(10), 400).is_none());
        assert!(counter.record(start + Duration::from_millis(20), 600).is_none());

        let last = counter.finish(start + Duration::from_millis(30));
        assert_eq!(last.transferred, 1000);
        assert_eq!(last.delta, 1000);
        assert_eq!(last.percent(), Some(100.0));
        assert!(last.is_complete());
    }

    #[test]
    fn finish_with_unknown_total_keeps_actual_count() {
        let start = Instant::now();
        let mut counter = ProgressCounter::new(None, INTERVAL, start);
        counter.record(start + Duration::from_millis(5), 123);

        let last = counter.finish(start + Duration::from_millis(10));
        assert_eq!(last.transferred, 123);
        assert_eq!(last.total, None);
        assert_eq!(last.percent(), None);
    }

    #[test]
    fn finish_of_empty_transfer_reports_zero() {
        let start = Instant::now();
        let mut counter = ProgressCounter::new(Some(0), INTERVAL, start);

        let last = counter.finish(start + Duration::from_millis(1));
        assert_eq!(last.transferred, 0);
        assert_eq!(last.delta, 0);
        assert_eq!(last.percent(), Some(100.0));
    }

    #[test]
    fn delta_covers_bytes_since_previous_report() {
        let start = Instant::now();
        let mut counter = ProgressCounter::new(Some(400), INTERVAL, start);

        counter.record(start + Duration::from_millis(100), 100).unwrap();
        assert!(counter.record(start + Duration::from_millis(150), 100).is_none());
        let report = counter
            .record(start + Duration::from_millis(210), 100)
            .unwrap();
        assert_eq!(report.transferred, 300);
        assert_eq!(report.delta, 200);

        let last = counter.finish(start + Duration::from_millis(220));
        assert_eq!(last.transferred, 400);
        assert_eq!(last.delta, 100);
    }
}
