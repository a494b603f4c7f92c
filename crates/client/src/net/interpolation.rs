use glam::DVec3;

use baize::math::smoothstep;
use baize::{Ball, BallState, DeltaDecoder, Outcome, SnapshotError, TableSnapshot};

use super::clock::ClockSync;

pub const DEFAULT_INTERPOLATION_DELAY_MS: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct InterpolationConfig {
    pub delay_ms: f64,
    pub capacity: usize,
    /// Broadcast interval while balls are moving fast.
    pub expected_interval_ms: f64,
    pub time_correction_rate: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_INTERPOLATION_DELAY_MS,
            capacity: 32,
            expected_interval_ms: 50.0,
            time_correction_rate: 0.1,
        }
    }
}

impl InterpolationConfig {
    fn ideal_count(&self) -> f64 {
        (self.delay_ms / self.expected_interval_ms.max(1.0)).ceil().max(1.0)
    }
}

/// One ball as it should be drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedBall {
    pub id: u32,
    pub pos: DVec3,
    pub vel: DVec3,
    pub rvel: DVec3,
    pub state: BallState,
}

impl InterpolatedBall {
    pub fn apply_to(&self, ball: &mut Ball) {
        ball.pos = self.pos;
        ball.vel = self.vel;
        ball.rvel = self.rvel;
        ball.state = self.state;
    }
}

#[derive(Debug)]
struct TimedSnapshot {
    local_ms: f64,
    snapshot: TableSnapshot,
}

/// Authoritative snapshots waiting to be rendered, ordered by their
/// timestamp mapped into local time.
#[derive(Debug)]
pub struct SnapshotBuffer {
    config: InterpolationConfig,
    snapshots: Vec<TimedSnapshot>,
    decoder: DeltaDecoder,
    render_ms: Option<f64>,
    newest_local_ms: f64,
    newest_arrival_ms: f64,
    dropped: u64,
    outrun: bool,
    outcomes: Vec<Outcome>,
}

impl SnapshotBuffer {
    pub fn new(config: InterpolationConfig) -> Self {
        Self {
            config,
            snapshots: Vec::new(),
            decoder: DeltaDecoder::new(),
            render_ms: None,
            newest_local_ms: f64::NEG_INFINITY,
            newest_arrival_ms: 0.0,
            dropped: 0,
            outrun: false,
            outcomes: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(InterpolationConfig::default())
    }

    /// Reconstructs `snapshot` against the last full one and buffers it.
    /// A delta whose baseline is unknown is dropped; the caller should ask
    /// the server for a full state.
    pub fn push(
        &mut self,
        snapshot: TableSnapshot,
        clock: &ClockSync,
        now_ms: f64,
    ) -> Result<(), SnapshotError> {
        let snapshot = self.decoder.decode(snapshot)?;
        if self
            .snapshots
            .iter()
            .any(|s| s.snapshot.server_tick == snapshot.server_tick)
        {
            return Ok(());
        }

        let local_ms = clock.to_local(snapshot.timestamp_ms as f64);
        if local_ms >= self.newest_local_ms {
            self.newest_local_ms = local_ms;
            self.newest_arrival_ms = now_ms;
        }
        self.outcomes.extend_from_slice(&snapshot.outcomes);

        let index = self
            .snapshots
            .iter()
            .position(|s| s.local_ms > local_ms)
            .unwrap_or(self.snapshots.len());
        self.snapshots.insert(index, TimedSnapshot { local_ms, snapshot });

        while self.snapshots.len() > self.config.capacity {
            self.snapshots.remove(0);
            self.dropped += 1;
        }
        Ok(())
    }

    /// Advances the render clock by `dt_ms`, easing it toward a point
    /// `delay_ms` behind the newest snapshot. The clock never moves
    /// backwards.
    pub fn update(&mut self, now_ms: f64, dt_ms: f64) {
        if self.snapshots.is_empty() {
            return;
        }
        let target =
            self.newest_local_ms + (now_ms - self.newest_arrival_ms) - self.config.delay_ms;

        self.render_ms = Some(match self.render_ms {
            None => target,
            Some(render) if dt_ms > 0.0 => {
                let advanced = render + dt_ms;
                let correction = ((target - advanced) * self.config.time_correction_rate)
                    .clamp(-dt_ms / 2.0, dt_ms / 2.0);
                advanced + correction
            }
            Some(render) => render,
        });

        if let Some(render) = self.render_ms {
            while self.snapshots.len() > 2 && self.snapshots[1].local_ms <= render {
                self.snapshots.remove(0);
            }
        }
    }

    /// Balls at the current render time. Past the newest snapshot the newest
    /// state is held rather than guessed forward.
    pub fn sample(&mut self) -> Option<Vec<InterpolatedBall>> {
        let render = self.render_ms?;
        let first = self.snapshots.first()?;
        self.outrun = false;

        if self.snapshots.len() == 1 || render <= first.local_ms {
            return Some(interpolate(&first.snapshot, &first.snapshot, 0.0));
        }

        for pair in self.snapshots.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            if before.local_ms <= render && render <= after.local_ms {
                let span = after.local_ms - before.local_ms;
                let t = if span > 0.0 {
                    (render - before.local_ms) / span
                } else {
                    1.0
                };
                return Some(interpolate(&before.snapshot, &after.snapshot, smoothstep(t)));
            }
        }

        self.outrun = true;
        let len = self.snapshots.len();
        Some(interpolate(
            &self.snapshots[len - 2].snapshot,
            &self.snapshots[len - 1].snapshot,
            1.0,
        ))
    }

    /// Outcomes carried by buffered snapshots since the last call.
    pub fn take_outcomes(&mut self) -> Vec<Outcome> {
        std::mem::take(&mut self.outcomes)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn render_time_ms(&self) -> Option<f64> {
        self.render_ms
    }

    /// Whether the render clock has reached the newest buffered snapshot.
    pub fn caught_up(&self) -> bool {
        match (self.render_ms, self.snapshots.last()) {
            (Some(render), Some(last)) => render >= last.local_ms,
            _ => false,
        }
    }

    /// Fraction of the ideal number of snapshots buffered ahead of the
    /// render clock.
    pub fn buffer_health(&self) -> f64 {
        let Some(render) = self.render_ms else {
            return 0.0;
        };
        let ahead = self.snapshots.iter().filter(|s| s.local_ms > render).count();
        (ahead as f64 / self.config.ideal_count()).clamp(0.0, 1.0)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.decoder.reset();
        self.render_ms = None;
        self.newest_local_ms = f64::NEG_INFINITY;
        self.newest_arrival_ms = 0.0;
        self.outrun = false;
        self.outcomes.clear();
    }

    pub fn stats(&self) -> InterpolationStats {
        InterpolationStats {
            buffered: self.snapshots.len(),
            dropped: self.dropped,
            render_time_ms: self.render_ms.unwrap_or(0.0),
            health: self.buffer_health(),
            outrun: self.outrun,
        }
    }
}

fn interpolate(before: &TableSnapshot, after: &TableSnapshot, t: f64) -> Vec<InterpolatedBall> {
    after
        .balls
        .iter()
        .map(|next| {
            let (pos, vel) = match before.ball(next.id) {
                Some(prev) => (
                    prev.position().lerp(next.position(), t),
                    prev.velocity().lerp(next.velocity(), t),
                ),
                None => (next.position(), next.velocity()),
            };
            InterpolatedBall {
                id: u32::from(next.id),
                pos,
                vel,
                rvel: next.spin(),
                state: next.ball_state(),
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct InterpolationStats {
    pub buffered: usize,
    pub dropped: u64,
    pub render_time_ms: f64,
    pub health: f64,
    pub outrun: bool,
}

#[cfg(test)]
mod tests {
    use baize::{BallSnapshot, DeltaConfig, DeltaEncoder};

    use super::*;

    fn snapshot(tick: u32, time_ms: u64, x: f64) -> TableSnapshot {
        let mut ball = Ball::new(0, DVec3::new(x, 0.0, 0.0));
        ball.vel = DVec3::new(1.0, 0.0, 0.0);
        ball.state = BallState::Sliding;
        TableSnapshot {
            server_tick: tick,
            timestamp_ms: time_ms,
            is_full: true,
            baseline_tick: tick,
            balls: vec![BallSnapshot::from_ball(&ball)],
            outcomes: Vec::new(),
            is_stationary: false,
        }
    }

    #[test]
    fn steady_20hz_stream_is_healthy_and_monotonic() {
        let clock = ClockSync::new();
        let mut buffer = SnapshotBuffer::with_defaults();
        let mut now = 0u64;
        let mut last_render = f64::NEG_INFINITY;
        for frame in 0..300 {
            now += 10;
            if now % 50 == 0 {
                let tick = (now / 50) as u32;
                buffer
                    .push(snapshot(tick, now, now as f64 / 1000.0), &clock, now as f64)
                    .unwrap();
            }
            buffer.update(now as f64, 10.0);
            if let Some(render) = buffer.render_time_ms() {
                assert!(render > last_render, "render time stalled at frame {frame}");
                last_render = render;
            }
            if now > 500 {
                assert_eq!(buffer.buffer_health(), 1.0, "at {now}ms");
            }
        }
        assert_eq!(buffer.dropped(), 0);
    }

    #[test]
    fn sample_eases_between_bracketing_snapshots() {
        let clock = ClockSync::new();
        let mut buffer = SnapshotBuffer::with_defaults();
        buffer.push(snapshot(1, 1000, 0.0), &clock, 1000.0).unwrap();
        buffer.push(snapshot(2, 1100, 1.0), &clock, 1100.0).unwrap();
        // render clock lands 100ms behind the newest snapshot
        buffer.update(1100.0, 0.0);
        assert_eq!(buffer.sample().unwrap()[0].pos.x, 0.0);
        buffer.update(1125.0, 25.0);
        let quarter = buffer.sample().unwrap()[0].pos.x;
        assert!((quarter - smoothstep(0.25)).abs() < 1e-6);
        assert!(quarter < 0.25);
    }

    #[test]
    fn outrunning_the_buffer_holds_the_newest_state() {
        let clock = ClockSync::new();
        let mut buffer = SnapshotBuffer::with_defaults();
        buffer.push(snapshot(1, 0, 0.0), &clock, 0.0).unwrap();
        buffer.push(snapshot(2, 50, 0.5), &clock, 50.0).unwrap();
        buffer.update(50.0, 0.0);
        for i in 1..100 {
            buffer.update(50.0 + f64::from(i) * 10.0, 10.0);
        }
        let balls = buffer.sample().unwrap();
        assert_eq!(balls[0].pos.x, f64::from(0.5f32));
        assert!(buffer.stats().outrun);
        assert!(buffer.caught_up());
    }

    #[test]
    fn overflow_drops_the_oldest() {
        let clock = ClockSync::new();
        let config = InterpolationConfig {
            capacity: 4,
            ..Default::default()
        };
        let mut buffer = SnapshotBuffer::new(config);
        for tick in 0..10u32 {
            let t = u64::from(tick) * 50;
            buffer.push(snapshot(tick, t, 0.0), &clock, t as f64).unwrap();
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.dropped(), 6);
    }

    #[test]
    fn out_of_order_arrivals_are_sorted() {
        let clock = ClockSync::new();
        let mut buffer = SnapshotBuffer::with_defaults();
        buffer.push(snapshot(1, 0, 0.0), &clock, 0.0).unwrap();
        buffer.push(snapshot(3, 100, 1.0), &clock, 100.0).unwrap();
        buffer.push(snapshot(2, 50, 0.5), &clock, 110.0).unwrap();
        let order: Vec<u32> = buffer.snapshots.iter().map(|s| s.snapshot.server_tick).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn delta_without_baseline_is_refused() {
        let clock = ClockSync::new();
        let mut encoder = DeltaEncoder::new(DeltaConfig::default());
        let full = encoder.encode(snapshot(1, 0, 0.0), true);
        let delta = encoder.encode(snapshot(2, 50, 0.5), false);
        assert!(!delta.is_full);

        let mut buffer = SnapshotBuffer::with_defaults();
        assert!(matches!(
            buffer.push(delta.clone(), &clock, 50.0),
            Err(SnapshotError::MissingBaseline { baseline_tick: 1 })
        ));
        assert!(buffer.is_empty());

        buffer.push(full, &clock, 0.0).unwrap();
        buffer.push(delta, &clock, 50.0).unwrap();
        assert_eq!(buffer.len(), 2);
    }
}
