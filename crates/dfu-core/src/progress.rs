//! Transfer progress accounting.
//!
//! Converts per-chunk byte counts into the sample shape carried by
//! `progressChanged` notifications. Percent is relative to the current image
//! part and restarts when a new part begins; the instantaneous speed covers
//! the interval since the previous sample and the average speed covers the
//! whole transfer. Values are reported as computed, without clamping.

use std::time::Instant;

/// One progress sample for the current upload part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    /// 1-based index of the part being transferred.
    pub current_part: i32,
    /// Total number of parts in the image.
    pub parts_total: i32,
    /// Percent of the current part transferred.
    pub percent: i32,
    /// Bytes per second over the last sampling interval.
    pub speed_bps: f64,
    /// Bytes per second since the transfer began.
    pub avg_speed_bps: f64,
}

/// Accounting state for a chunked transfer.
#[derive(Debug)]
pub struct ProgressTracker {
    parts_total: i32,
    current_part: i32,
    part_size: u64,
    part_sent: u64,
    total_sent: u64,
    started_at: Instant,
    last_at: Instant,
    last_total: u64,
}

impl ProgressTracker {
    /// Start tracking a transfer of `parts_total` parts at `now`.
    pub fn new(parts_total: i32, now: Instant) -> Self {
        Self {
            parts_total,
            current_part: 0,
            part_size: 0,
            part_sent: 0,
            total_sent: 0,
            started_at: now,
            last_at: now,
            last_total: 0,
        }
    }

    /// Begin a new part. The transport may re-enter a part after a restart;
    /// the per-part byte count resets either way.
    pub fn begin_part(&mut self, part: i32, part_size: u64) {
        self.current_part = part;
        self.part_size = part_size;
        self.part_sent = 0;
    }

    /// Record `bytes` more bytes sent at `now` and produce a sample.
    pub fn record(&mut self, bytes: u64, now: Instant) -> ProgressSample {
        self.part_sent += bytes;
        self.total_sent += bytes;

        let percent = if self.part_size == 0 {
            0
        } else {
            ((self.part_sent * 100) / self.part_size) as i32
        };

        let interval = now.duration_since(self.last_at).as_secs_f64();
        let speed_bps = if interval > 0.0 {
            (self.total_sent - self.last_total) as f64 / interval
        } else {
            0.0
        };

        let elapsed = now.duration_since(self.started_at).as_secs_f64();
        let avg_speed_bps = if elapsed > 0.0 {
            self.total_sent as f64 / elapsed
        } else {
            0.0
        };

        self.last_at = now;
        self.last_total = self.total_sent;

        ProgressSample {
            current_part: self.current_part,
            parts_total: self.parts_total,
            percent,
            speed_bps,
            avg_speed_bps,
        }
    }

    /// Total bytes recorded across all parts.
    pub fn total_sent(&self) -> u64 {
        self.total_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_percent_is_per_part() {
        let t0 = Instant::now();
        let mut tracker = ProgressTracker::new(2, t0);

        tracker.begin_part(1, 1000);
        let s = tracker.record(250, t0 + Duration::from_secs(1));
        assert_eq!(s.current_part, 1);
        assert_eq!(s.parts_total, 2);
        assert_eq!(s.percent, 25);

        let s = tracker.record(750, t0 + Duration::from_secs(2));
        assert_eq!(s.percent, 100);

        // New part restarts the percentage.
        tracker.begin_part(2, 4000);
        let s = tracker.record(1000, t0 + Duration::from_secs(3));
        assert_eq!(s.current_part, 2);
        assert_eq!(s.percent, 25);
    }

    #[test]
    fn test_speeds() {
        let t0 = Instant::now();
        let mut tracker = ProgressTracker::new(1, t0);
        tracker.begin_part(1, 4096);

        let s = tracker.record(1024, t0 + Duration::from_secs(1));
        assert_eq!(s.speed_bps, 1024.0);
        assert_eq!(s.avg_speed_bps, 1024.0);

        // 512 more bytes over the next second: instantaneous drops,
        // average covers both seconds.
        let s = tracker.record(512, t0 + Duration::from_secs(2));
        assert_eq!(s.speed_bps, 512.0);
        assert_eq!(s.avg_speed_bps, 768.0);
        assert_eq!(tracker.total_sent(), 1536);
    }

    #[test]
    fn test_zero_interval_reports_zero_speed() {
        let t0 = Instant::now();
        let mut tracker = ProgressTracker::new(1, t0);
        tracker.begin_part(1, 100);

        let s = tracker.record(50, t0);
        assert_eq!(s.speed_bps, 0.0);
        assert_eq!(s.avg_speed_bps, 0.0);
        assert_eq!(s.percent, 50);
    }

    #[test]
    fn test_part_restart_resets_bytes() {
        let t0 = Instant::now();
        let mut tracker = ProgressTracker::new(1, t0);

        tracker.begin_part(1, 1000);
        tracker.record(900, t0 + Duration::from_secs(1));

        // Transport restarts the same part from scratch.
        tracker.begin_part(1, 1000);
        let s = tracker.record(100, t0 + Duration::from_secs(2));
        assert_eq!(s.percent, 10);
        // Average still accounts for everything actually sent.
        assert_eq!(tracker.total_sent(), 1000);
    }
}
