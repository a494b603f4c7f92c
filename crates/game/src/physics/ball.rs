use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::geometry::TableGeometry;
use super::params::PhysicsParams;
use crate::math::{fround, passes_through_zero, up_cross};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BallState {
    Stationary,
    Rolling,
    Sliding,
    Falling,
    InPocket,
}

impl BallState {
    pub fn to_u8(self) -> u8 {
        match self {
            BallState::Stationary => 0,
            BallState::Rolling => 1,
            BallState::Sliding => 2,
            BallState::Falling => 3,
            BallState::InPocket => 4,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BallState::Stationary),
            1 => Some(BallState::Rolling),
            2 => Some(BallState::Sliding),
            3 => Some(BallState::Falling),
            4 => Some(BallState::InPocket),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub id: u32,
    pub number: Option<u8>,
    pub pos: DVec3,
    pub vel: DVec3,
    pub rvel: DVec3,
    pub state: BallState,
    /// Index of the pocket the ball is falling into.
    pub pocket: Option<usize>,
}

impl Ball {
    pub fn new(id: u32, pos: DVec3) -> Self {
        Self {
            id,
            number: None,
            pos: fround(pos),
            vel: DVec3::ZERO,
            rvel: DVec3::ZERO,
            state: BallState::Stationary,
            pocket: None,
        }
    }

    pub fn with_number(mut self, number: u8) -> Self {
        self.number = Some(number);
        self
    }

    pub fn in_motion(&self) -> bool {
        matches!(
            self.state,
            BallState::Rolling | BallState::Sliding | BallState::Falling
        )
    }

    pub fn on_table(&self) -> bool {
        !matches!(self.state, BallState::Falling | BallState::InPocket)
    }

    pub fn future_position(&self, t: f64) -> DVec3 {
        self.pos + self.vel * t
    }

    pub fn set_stationary(&mut self) {
        self.vel = DVec3::ZERO;
        self.rvel = DVec3::ZERO;
        self.state = BallState::Stationary;
    }

    pub fn is_rolling(&self, params: &PhysicsParams) -> bool {
        self.vel.length_squared() != 0.0
            && self.rvel.length_squared() != 0.0
            && surface_velocity_full(self.vel, self.rvel, params.ball_radius).length()
                < PhysicsParams::TRANSITION_SPEED
    }

    /// Advances the ball by `t` seconds.
    pub fn update(&mut self, t: f64, params: &PhysicsParams, geometry: &TableGeometry) {
        if self.state == BallState::InPocket {
            return;
        }
        self.pos += self.vel * t;
        match (self.state, self.pocket) {
            (BallState::Falling, Some(index)) => {
                if let Some(pocket) = geometry.pockets.get(index) {
                    pocket.update_fall(self, t, params);
                }
            }
            _ => self.update_velocity(t, params),
        }
        self.pos = fround(self.pos);
        self.vel = fround(self.vel);
        self.rvel = fround(self.rvel);
    }

    fn update_velocity(&mut self, t: f64, params: &PhysicsParams) {
        if !self.in_motion() {
            return;
        }
        if self.is_rolling(params) {
            self.state = BallState::Rolling;
            self.force_roll(params);
            self.roll(t, params);
        } else {
            self.state = BallState::Sliding;
            self.slide(t, params);
        }
    }

    fn roll(&mut self, t: f64, params: &PhysicsParams) {
        let (dv, dw) = rolling_delta(self.rvel, params);
        self.add_delta(t, dv, dw);
    }

    fn slide(&mut self, t: f64, params: &PhysicsParams) {
        let (dv, dw) = sliding_delta(self.vel, self.rvel, params);
        self.add_delta(t, dv, dw);
    }

    fn add_delta(&mut self, t: f64, dv: DVec3, dw: DVec3) {
        let dv = dv * t;
        let dw = dw * t;
        if !self.halts(dv, dw) {
            self.vel += dv;
            self.rvel += dw;
        }
    }

    fn halts(&mut self, dv: DVec3, dw: DVec3) -> bool {
        let vz = passes_through_zero(self.vel, dv);
        let wz = passes_through_zero(self.rvel, dw);
        let halts = if self.state == BallState::Rolling {
            vz || wz
        } else {
            vz && wz
        };
        if halts && self.rvel.z.abs() < PhysicsParams::SPIN_EPSILON {
            self.set_stationary();
            return true;
        }
        false
    }

    /// Sets the horizontal spin to exactly match the velocity, keeping side spin.
    fn force_roll(&mut self, params: &PhysicsParams) {
        let wz = self.rvel.z;
        self.rvel = up_cross(self.vel) / params.ball_radius;
        self.rvel.z = wz;
    }
}

pub fn surface_velocity(v: DVec3, w: DVec3, r: f64) -> DVec3 {
    DVec3::new(v.x - r * w.y, v.y + r * w.x, 0.0)
}

pub fn surface_velocity_full(v: DVec3, w: DVec3, r: f64) -> DVec3 {
    DVec3::new(v.x - r * w.y, v.y + r * w.x, r * w.z)
}

fn side_spin_decay(w: DVec3, params: &PhysicsParams) -> f64 {
    let r = params.ball_radius;
    -(5.0 / 2.0) * (params.mz() / (params.ball_mass * r * r)) * w.z.signum_or_zero()
}

pub(crate) fn sliding_delta(v: DVec3, w: DVec3, params: &PhysicsParams) -> (DVec3, DVec3) {
    let r = params.ball_radius;
    let va = surface_velocity(v, w, r);
    let dv = va.normalize_or_zero() * -params.mu_sliding * params.gravity;
    let mut dw = up_cross(va).normalize_or_zero()
        * (5.0 / 2.0 * params.mu_sliding * params.gravity / r);
    dw.z = side_spin_decay(w, params);
    (dv, dw)
}

pub(crate) fn rolling_delta(w: DVec3, params: &PhysicsParams) -> (DVec3, DVec3) {
    let r = params.ball_radius;
    let m = params.ball_mass;
    let mag = w.truncate().length();
    if mag == 0.0 {
        return (DVec3::ZERO, DVec3::new(0.0, 0.0, side_spin_decay(w, params)));
    }
    let k = (5.0 / 7.0 * params.mxy()) / (m * r) / mag;
    let kw = (5.0 / 7.0 * params.mxy()) / (m * r * r) / mag;
    let dv = DVec3::new(-k * w.y, k * w.x, 0.0);
    let dw = DVec3::new(-kw * w.x, -kw * w.y, side_spin_decay(w, params));
    (dv, dw)
}

trait SignumOrZero {
    fn signum_or_zero(self) -> Self;
}

impl SignumOrZero for f64 {
    fn signum_or_zero(self) -> f64 {
        if self == 0.0 { 0.0 } else { self.signum() }
    }
}
