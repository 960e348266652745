use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Rolling frame statistics for the diagnostic overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub fps: f32,
    pub frame_ms: f32,
}

pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_report_time: Instant,
    frame_count: u32,
    frame_dt: f32,
    stats: FrameStats,
}

impl FrameTiming {
    pub fn new(now: Instant) -> Self {
        Self {
            last_frame_time: None,
            last_report_time: now,
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            stats: FrameStats {
                fps: 0.0,
                frame_ms: 0.0,
            },
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Records a frame at `now`. Stats refresh twice a second; returns `true`
    /// when they did.
    pub fn tick(&mut self, now: Instant) -> bool {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt.as_secs_f32();

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_report_time);
        if elapsed < REPORT_INTERVAL {
            return false;
        }
        self.stats = FrameStats {
            fps: self.frame_count as f32 / elapsed.as_secs_f32(),
            frame_ms: self.frame_dt * 1000.0,
        };
        self.frame_count = 0;
        self.last_report_time = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_after_interval() {
        let start = Instant::now();
        let mut timing = FrameTiming::new(start);
        for i in 1..30 {
            assert!(!timing.tick(start + Duration::from_millis(i * 16)));
        }
        assert!(timing.tick(start + Duration::from_millis(500)));
        let stats = timing.stats();
        assert!((stats.fps - 60.0).abs() < 1e-3, "fps {}", stats.fps);
        assert!((stats.frame_ms - 36.0).abs() < 1e-3);
    }
}
