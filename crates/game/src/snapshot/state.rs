use glam::DVec3;
use rkyv::{Archive, Deserialize, Serialize};

use crate::math::{from_array, fround, to_array};
use crate::physics::{Ball, BallState, Outcome, Table};

/// A single ball as sent over the wire.
///
/// Positions are sent at full `f32` precision so that resting positions
/// are reproduced exactly. Velocity and spin are quantised.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[rkyv(derive(Debug))]
pub struct BallSnapshot {
    pub id: u8,
    pub number: Option<u8>,
    pub state: u8,
    pub pos: [f32; 3],
    pub vel: [i16; 3],
    pub rvel: [i16; 3],
}

impl BallSnapshot {
    pub const VELOCITY_SCALE: f32 = 1000.0;
    pub const SPIN_SCALE: f32 = 10.0;

    pub fn from_ball(ball: &Ball) -> Self {
        Self {
            id: ball.id as u8,
            number: ball.number,
            state: ball.state.to_u8(),
            pos: to_array(ball.pos),
            vel: quantize(ball.vel, Self::VELOCITY_SCALE),
            rvel: quantize(ball.rvel, Self::SPIN_SCALE),
        }
    }

    pub fn position(&self) -> DVec3 {
        from_array(self.pos)
    }

    pub fn velocity(&self) -> DVec3 {
        dequantize(self.vel, Self::VELOCITY_SCALE)
    }

    pub fn spin(&self) -> DVec3 {
        dequantize(self.rvel, Self::SPIN_SCALE)
    }

    pub fn ball_state(&self) -> BallState {
        BallState::from_u8(self.state).unwrap_or(BallState::Stationary)
    }

    pub fn apply_to(&self, ball: &mut Ball) {
        ball.pos = self.position();
        ball.vel = fround(self.velocity());
        ball.rvel = fround(self.spin());
        ball.state = self.ball_state();
        if !ball.in_motion() {
            ball.vel = DVec3::ZERO;
            ball.rvel = DVec3::ZERO;
        }
    }
}

fn quantize(v: DVec3, scale: f32) -> [i16; 3] {
    let limit = f32::from(i16::MAX) / scale;
    to_array(v).map(|c| (c.clamp(-limit, limit) * scale).round() as i16)
}

fn dequantize(v: [i16; 3], scale: f32) -> DVec3 {
    from_array(v.map(|c| f32::from(c) / scale))
}

/// Authoritative table state at one server tick.
///
/// A full snapshot lists every ball. A delta lists only balls that changed
/// relative to the full snapshot at `baseline_tick`.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[rkyv(derive(Debug))]
pub struct TableSnapshot {
    pub server_tick: u32,
    pub timestamp_ms: u64,
    pub is_full: bool,
    pub baseline_tick: u32,
    pub balls: Vec<BallSnapshot>,
    /// Outcomes since the previous broadcast.
    pub outcomes: Vec<Outcome>,
    pub is_stationary: bool,
}

impl TableSnapshot {
    pub fn capture(table: &Table, server_tick: u32, timestamp_ms: u64) -> Self {
        Self {
            server_tick,
            timestamp_ms,
            is_full: true,
            baseline_tick: server_tick,
            balls: table.balls().iter().map(BallSnapshot::from_ball).collect(),
            outcomes: Vec::new(),
            is_stationary: table.all_stationary(),
        }
    }

    pub fn ball(&self, id: u8) -> Option<&BallSnapshot> {
        self.balls.iter().find(|ball| ball.id == id)
    }

    /// Writes every listed ball into `table`.
    pub fn apply(&self, table: &mut Table) {
        for snapshot in &self.balls {
            if let Some(ball) = table.ball_mut(u32::from(snapshot.id)) {
                snapshot.apply_to(ball);
            }
        }
    }
}
