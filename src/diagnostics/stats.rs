use serde::Serialize;
use std::time::Instant;

/// Counters for the frame pipeline of one preview session.
///
/// A "drop" is a frame the processor declined (uninterpretable buffer or
/// filter produced no output). Never surfaced to the user, counted here
/// for observability only.
pub struct FrameStats {
    processed: u64,
    dropped: u64,
    started: Instant,
}

/// Snapshot of frame stats for IPC serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStatsSnapshot {
    pub processed: u64,
    pub dropped: u64,
    pub drop_rate: f64,
    pub fps: f64,
}

impl FrameStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            processed: 0,
            dropped: 0,
            started: Instant::now(),
        }
    }

    /// Record a frame that made it through the processor to the display slot.
    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    /// Record a frame the processor declined.
    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Displayed frames per second since the session started.
    pub fn fps(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Fraction of delivered frames that were dropped.
    pub fn drop_rate(&self) -> f64 {
        let total = self.processed + self.dropped;
        if total > 0 {
            self.dropped as f64 / total as f64
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> FrameStatsSnapshot {
        FrameStatsSnapshot {
            processed: self.processed,
            dropped: self.dropped,
            drop_rate: self.drop_rate(),
            fps: self.fps(),
        }
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stats_are_zeroed() {
        let stats = FrameStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.processed, 0);
        assert_eq!(snap.dropped, 0);
        assert_eq!(snap.drop_rate, 0.0);
    }

    #[test]
    fn counters_accumulate() {
        let mut stats = FrameStats::new();
        stats.record_processed();
        stats.record_processed();
        stats.record_dropped();
        let snap = stats.snapshot();
        assert_eq!(snap.processed, 2);
        assert_eq!(snap.dropped, 1);
    }

    #[test]
    fn drop_rate_is_fraction_of_all_delivered_frames() {
        let mut stats = FrameStats::new();
        for _ in 0..3 {
            stats.record_processed();
        }
        stats.record_dropped();
        assert!((stats.drop_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_serialises_camel_case() {
        let mut stats = FrameStats::new();
        stats.record_dropped();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["dropped"], 1);
        assert!(json.get("dropRate").is_some());
    }
}
