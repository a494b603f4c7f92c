use std::collections::VecDeque;

const SAMPLE_COUNT: usize = 60;

/// Rolling frame and snapshot rates for the periodic status line.
pub struct DebugStats {
    frame_times: VecDeque<f64>,
    snapshot_times: VecDeque<f64>,
    fps: f64,
    snapshot_rate: f64,
}

impl Default for DebugStats {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugStats {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(SAMPLE_COUNT),
            snapshot_times: VecDeque::with_capacity(SAMPLE_COUNT),
            fps: 0.0,
            snapshot_rate: 0.0,
        }
    }

    pub fn record_frame(&mut self, dt_ms: f64) {
        if dt_ms <= 0.0 {
            return;
        }

        if self.frame_times.len() >= SAMPLE_COUNT {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt_ms);

        let avg_dt = self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64;
        self.fps = 1000.0 / avg_dt;
    }

    pub fn record_snapshot(&mut self, now_ms: f64) {
        if self.snapshot_times.len() >= SAMPLE_COUNT {
            self.snapshot_times.pop_front();
        }
        self.snapshot_times.push_back(now_ms);

        if let (Some(oldest), true) = (self.snapshot_times.front(), self.snapshot_times.len() >= 2) {
            let elapsed = now_ms - oldest;
            if elapsed > 0.0 {
                self.snapshot_rate = (self.snapshot_times.len() - 1) as f64 * 1000.0 / elapsed;
            }
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn snapshot_rate(&self) -> f64 {
        self.snapshot_rate
    }
}
