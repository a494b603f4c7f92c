use glam::DVec3;
use log::{debug, warn};

use baize::math::smoothstep;
use baize::{AimState, BallState, Table, TableSnapshot};

use crate::net::SnapshotBuffer;

/// Duration of the hand-over from visual motion to authoritative playback.
pub const BLEND_MS: f64 = 150.0;
/// Per-second exponential decay of the cue ball's visual speed.
pub const VISUAL_DECAY: f64 = 1.5;

const CUE: u32 = 0;

/// Which source currently moves the balls on screen. Only the active mode
/// writes to the mirrored table.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackMode {
    Idle,
    /// Shooter only: the cue ball glides off along the aim line while the
    /// shot travels to the server and back.
    VisualMotion { vel: DVec3, origin: DVec3 },
    Blend {
        from: Vec<(u32, DVec3)>,
        elapsed_ms: f64,
    },
    Snapshots,
}

#[derive(Debug)]
pub struct Playback {
    mode: PlaybackMode,
    final_state: Option<TableSnapshot>,
    settled_tick: Option<u32>,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

impl Playback {
    pub fn new() -> Self {
        Self {
            mode: PlaybackMode::Idle,
            final_state: None,
            settled_tick: None,
        }
    }

    pub fn mode(&self) -> &PlaybackMode {
        &self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == PlaybackMode::Idle
    }

    /// Overwrites the mirror with an authoritative state and stops playback.
    pub fn load(&mut self, table: &mut Table, state: &TableSnapshot) {
        state.apply(table);
        self.mode = PlaybackMode::Idle;
        self.final_state = None;
    }

    pub fn start_visual(&mut self, table: &Table, aim: &AimState) {
        let origin = table.cue_ball().map(|cue| cue.pos).unwrap_or_default();
        self.final_state = None;
        self.mode = PlaybackMode::VisualMotion {
            vel: aim.velocity(),
            origin,
        };
    }

    /// Someone else's shot: follow the snapshots from the start.
    pub fn watch(&mut self) {
        self.final_state = None;
        self.mode = PlaybackMode::Snapshots;
    }

    /// Puts the cue ball back where it was before a rejected shot.
    pub fn cancel(&mut self, table: &mut Table) {
        if let PlaybackMode::VisualMotion { origin, .. } = self.mode {
            if let Some(cue) = table.ball_mut(CUE) {
                cue.pos = origin;
                cue.set_stationary();
            }
        }
        self.mode = PlaybackMode::Idle;
        self.final_state = None;
    }

    pub fn place_cue(&mut self, table: &mut Table, pos: DVec3) {
        if let Err(err) = table.place_ball(CUE, pos) {
            warn!("could not mirror cue ball placement: {}", err);
        }
    }

    /// Records the state the shot ends in. It is applied once playback has
    /// caught up with the newest snapshot.
    pub fn finish(&mut self, final_state: TableSnapshot) {
        if self.mode == PlaybackMode::Idle {
            self.mode = PlaybackMode::Snapshots;
        }
        self.settled_tick = Some(final_state.server_tick);
        self.final_state = Some(final_state);
    }

    /// A shot struck before the last final state has already ended. The next
    /// shot is struck on the tick the previous one settled on.
    pub fn is_stale_shot(&self, server_tick: u32) -> bool {
        self.settled_tick.is_some_and(|settled| server_tick < settled)
    }

    /// Moves the mirror forward by one frame. Returns `true` on the frame the
    /// shot settles.
    pub fn update(&mut self, table: &mut Table, buffer: &mut SnapshotBuffer, dt_ms: f64) -> bool {
        let next = match &mut self.mode {
            PlaybackMode::Idle => None,
            PlaybackMode::VisualMotion { vel, .. } => {
                if buffer.sample().is_some() {
                    debug!("first snapshot arrived, blending");
                    Some(PlaybackMode::Blend {
                        from: table.balls().iter().map(|ball| (ball.id, ball.pos)).collect(),
                        elapsed_ms: 0.0,
                    })
                } else {
                    glide(table, vel, dt_ms / 1000.0);
                    None
                }
            }
            PlaybackMode::Blend { from, elapsed_ms } => {
                *elapsed_ms += dt_ms;
                let t = smoothstep((*elapsed_ms / BLEND_MS).min(1.0));
                if let Some(balls) = buffer.sample() {
                    for target in &balls {
                        let start = from
                            .iter()
                            .find(|(id, _)| *id == target.id)
                            .map_or(target.pos, |&(_, pos)| pos);
                        if let Some(ball) = table.ball_mut(target.id) {
                            target.apply_to(ball);
                            ball.pos = start.lerp(target.pos, t);
                        }
                    }
                }
                (*elapsed_ms >= BLEND_MS).then_some(PlaybackMode::Snapshots)
            }
            PlaybackMode::Snapshots => {
                if let Some(balls) = buffer.sample() {
                    for target in &balls {
                        if let Some(ball) = table.ball_mut(target.id) {
                            target.apply_to(ball);
                        }
                    }
                }
                None
            }
        };
        if let Some(mode) = next {
            self.mode = mode;
        }

        if self.mode == PlaybackMode::Snapshots && buffer.caught_up() {
            if let Some(final_state) = self.final_state.take() {
                final_state.apply(table);
                self.mode = PlaybackMode::Idle;
                return true;
            }
        }
        false
    }
}

fn glide(table: &mut Table, vel: &mut DVec3, dt: f64) {
    let limit_x = table.geometry().table_x;
    let limit_y = table.geometry().table_y;
    if let Some(cue) = table.ball_mut(CUE) {
        cue.pos += *vel * dt;
        cue.pos.x = cue.pos.x.clamp(-limit_x, limit_x);
        cue.pos.y = cue.pos.y.clamp(-limit_y, limit_y);
        cue.vel = *vel;
        cue.state = BallState::Rolling;
    }
    *vel *= (-VISUAL_DECAY * dt).exp();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::clock::ClockSync;
    use baize::{Ball, BallSnapshot, PhysicsParams, Rack, TableGeometry};

    fn table() -> Table {
        let params = PhysicsParams::default();
        let geometry = TableGeometry::pool(params.ball_radius);
        Table::new(Rack::practice_pair(&geometry), geometry, params)
    }

    fn state(tick: u32, time_ms: u64, cue_x: f64, table: &Table) -> TableSnapshot {
        let mut snapshot = TableSnapshot::capture(table, tick, time_ms);
        let mut cue = Ball::new(0, DVec3::new(cue_x, 0.0, 0.0));
        cue.state = BallState::Rolling;
        snapshot.balls[0] = BallSnapshot::from_ball(&cue);
        snapshot
    }

    #[test]
    fn visual_motion_moves_only_the_cue_ball() {
        let mut table = table();
        let object = table.ball(1).unwrap().pos;
        let start = table.cue_ball().unwrap().pos;
        let mut buffer = SnapshotBuffer::with_defaults();
        let mut playback = Playback::new();
        playback.start_visual(&table, &AimState::new(0.0, 2.0));

        let mut last_step = f64::INFINITY;
        let mut last_x = start.x;
        for _ in 0..10 {
            playback.update(&mut table, &mut buffer, 16.0);
            let x = table.cue_ball().unwrap().pos.x;
            assert!(x - last_x < last_step);
            last_step = x - last_x;
            last_x = x;
        }
        assert!(last_x > start.x);
        assert_eq!(table.ball(1).unwrap().pos, object);
    }

    #[test]
    fn first_snapshot_blends_into_playback() {
        let mut table = table();
        let clock = ClockSync::new();
        let mut buffer = SnapshotBuffer::with_defaults();
        let mut playback = Playback::new();
        playback.start_visual(&table, &AimState::new(0.0, 2.0));
        for _ in 0..5 {
            playback.update(&mut table, &mut buffer, 16.0);
        }

        let target = -0.2;
        buffer.push(state(1, 0, target, &table), &clock, 0.0).unwrap();
        buffer.update(0.0, 0.0);
        playback.update(&mut table, &mut buffer, 16.0);
        assert!(matches!(playback.mode(), PlaybackMode::Blend { .. }));

        let mut frames = 0;
        while playback.mode() != &PlaybackMode::Snapshots {
            playback.update(&mut table, &mut buffer, 16.0);
            frames += 1;
            assert!(frames < 20);
        }
        let cue = table.cue_ball().unwrap();
        assert!((cue.pos.x - target).abs() < 1e-6);
        assert_eq!(cue.state, BallState::Rolling);
    }

    #[test]
    fn cancel_restores_the_cue_ball() {
        let mut table = table();
        let start = table.cue_ball().unwrap().pos;
        let mut buffer = SnapshotBuffer::with_defaults();
        let mut playback = Playback::new();
        playback.start_visual(&table, &AimState::new(1.0, 3.0));
        playback.update(&mut table, &mut buffer, 50.0);
        assert_ne!(table.cue_ball().unwrap().pos, start);

        playback.cancel(&mut table);
        assert!(playback.is_idle());
        let cue = table.cue_ball().unwrap();
        assert_eq!(cue.pos, start);
        assert!(!cue.in_motion());
    }

    #[test]
    fn watcher_settles_once_caught_up() {
        let mut table = table();
        let clock = ClockSync::new();
        let mut buffer = SnapshotBuffer::with_defaults();
        let mut playback = Playback::new();
        playback.watch();

        buffer.push(state(1, 0, -0.5, &table), &clock, 0.0).unwrap();
        let mut final_state = state(2, 50, -0.4, &table);
        final_state.balls[0].state = BallState::Stationary.to_u8();
        final_state.is_stationary = true;
        buffer.push(final_state.clone(), &clock, 50.0).unwrap();
        playback.finish(final_state);

        buffer.update(50.0, 0.0);
        assert!(!playback.update(&mut table, &mut buffer, 0.0));
        assert_eq!(playback.mode(), &PlaybackMode::Snapshots);

        let mut now = 50.0;
        let mut settled = false;
        while !settled {
            now += 10.0;
            buffer.update(now, 10.0);
            settled = playback.update(&mut table, &mut buffer, 10.0);
            assert!(now < 2000.0, "never settled");
        }
        assert!(playback.is_idle());
        let cue = table.cue_ball().unwrap();
        assert_eq!(cue.state, BallState::Stationary);
        assert!((cue.pos.x + 0.4).abs() < 1e-6);
    }

    #[test]
    fn acceptance_of_a_settled_shot_is_stale() {
        let table = table();
        let mut playback = Playback::new();
        assert!(!playback.is_stale_shot(0));

        playback.watch();
        playback.finish(TableSnapshot::capture(&table, 40, 2000));
        assert!(playback.is_stale_shot(12));
        assert!(!playback.is_stale_shot(40));
        assert!(!playback.is_stale_shot(41));
    }
}
