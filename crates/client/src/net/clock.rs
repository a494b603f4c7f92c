use std::collections::VecDeque;

pub const RTT_SAMPLES: usize = 16;

/// Estimates the offset between the server clock and ours from ping
/// round trips.
///
/// `offset = local - (server + rtt / 2)`, so a server timestamp maps to
/// local time as `server + offset`.
#[derive(Debug, Clone, Default)]
pub struct ClockSync {
    offset_ms: f64,
    samples: VecDeque<f64>,
    synced: bool,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one pong. `sent_ms` and `now_ms` are local times, `server_ms`
    /// the server's clock when it answered.
    pub fn record(&mut self, sent_ms: f64, server_ms: f64, now_ms: f64) {
        let rtt = (now_ms - sent_ms).max(0.0);
        self.offset_ms = now_ms - (server_ms + rtt / 2.0);
        self.synced = true;

        if self.samples.len() == RTT_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(rtt);
    }

    /// Adopts a server timestamp without a round trip, e.g. from the welcome
    /// message, until the first pong arrives.
    pub fn seed(&mut self, server_ms: f64, now_ms: f64) {
        if !self.synced {
            self.offset_ms = now_ms - server_ms;
        }
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn offset_ms(&self) -> f64 {
        self.offset_ms
    }

    pub fn to_local(&self, server_ms: f64) -> f64 {
        server_ms + self.offset_ms
    }

    pub fn rtt_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Mean absolute deviation of the retained round trips.
    pub fn jitter_ms(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let mean = self.rtt_ms();
        self.samples.iter().map(|s| (s - mean).abs()).sum::<f64>() / self.samples.len() as f64
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
