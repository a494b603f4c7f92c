use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::ball::{Ball, BallState};
use super::geometry::Rail;
use super::params::PhysicsParams;
use crate::math::smoothstep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CushionModel {
    /// Han (2005) impulse model choosing between stick and slip at the rail.
    #[default]
    Han,
    /// Han model with the stick and slip impulses blended near the boundary
    /// between the two regimes.
    HanBlend,
    /// Restitution on the normal component and halved spin.
    Simple,
}

#[derive(Debug, Clone, Copy)]
struct Impulse {
    x: f64,
    y: f64,
    z: f64,
}

impl CushionModel {
    /// Bounces `ball` off `rail`, returning the incident speed into the rail.
    pub fn bounce(self, ball: &mut Ball, rail: Rail, params: &PhysicsParams) -> f64 {
        let v = rail.to_local(ball.vel);
        let w = rail.to_local(ball.rvel);
        let (dv, dw) = match self {
            CushionModel::Han => han_delta(v, w, params, han_stick_or_slip),
            CushionModel::HanBlend => han_delta(v, w, params, han_blended),
            CushionModel::Simple => simple_delta(v, w, params),
        };
        ball.vel = rail.to_world(v + dv);
        ball.rvel = rail.to_world(w + dw);
        ball.state = BallState::Sliding;
        v.x.abs()
    }
}

struct HanTerms {
    sin_a: f64,
    cos_a: f64,
    sx: f64,
    sy: f64,
    a: f64,
    pz_e: f64,
    pz_s: f64,
    mu: f64,
}

fn han_terms(v: DVec3, w: DVec3, params: &PhysicsParams) -> HanTerms {
    let r = params.ball_radius;
    let m = params.ball_mass;
    let sin_a = params.cushion_sin_theta();
    let cos_a = (1.0 - sin_a * sin_a).sqrt();
    let sx = v.x * sin_a - v.z * cos_a + r * w.y;
    let sy = -v.y - r * w.z * cos_a + r * w.x * sin_a;
    let c = v.x * cos_a - v.z * sin_a;
    let a = 7.0 / (2.0 * m);
    let b = 1.0 / m;
    let e = params.cushion_restitution;
    HanTerms {
        sin_a,
        cos_a,
        sx,
        sy,
        a,
        pz_e: (1.0 + e) * c / b,
        pz_s: sx.hypot(sy) / a,
        mu: params.mu_cushion,
    }
}

fn stick_impulse(t: &HanTerms) -> Impulse {
    Impulse {
        x: -t.sx / t.a * t.sin_a - t.pz_e * t.cos_a,
        y: t.sy / t.a,
        z: t.sx / t.a * t.cos_a - t.pz_e * t.sin_a,
    }
}

fn slip_impulse(t: &HanTerms) -> Impulse {
    let phi = t.sy.atan2(t.sx);
    let (sin_phi, cos_phi) = phi.sin_cos();
    Impulse {
        x: -t.mu * t.pz_e * cos_phi * t.sin_a - t.pz_e * t.cos_a,
        y: t.mu * t.pz_e * sin_phi,
        z: t.mu * t.pz_e * cos_phi * t.cos_a - t.pz_e * t.sin_a,
    }
}

fn han_stick_or_slip(t: &HanTerms) -> Impulse {
    if t.pz_s <= t.pz_e {
        stick_impulse(t)
    } else {
        slip_impulse(t)
    }
}

fn han_blended(t: &HanTerms) -> Impulse {
    if t.pz_e <= 0.0 {
        return stick_impulse(t);
    }
    let weight = smoothstep(t.pz_s / t.pz_e - 0.5);
    let stick = stick_impulse(t);
    let slip = slip_impulse(t);
    Impulse {
        x: stick.x + (slip.x - stick.x) * weight,
        y: stick.y + (slip.y - stick.y) * weight,
        z: stick.z + (slip.z - stick.z) * weight,
    }
}

fn han_delta(
    v: DVec3,
    w: DVec3,
    params: &PhysicsParams,
    impulse: fn(&HanTerms) -> Impulse,
) -> (DVec3, DVec3) {
    let terms = han_terms(v, w, params);
    let p = impulse(&terms);
    let m = params.ball_mass;
    let r_over_i = params.ball_radius / params.inertia();
    let dv = DVec3::new(p.x / m, p.y / m, 0.0);
    let dw = DVec3::new(
        -r_over_i * p.y * terms.sin_a,
        r_over_i * (p.x * terms.sin_a - p.z * terms.cos_a),
        r_over_i * p.y * terms.cos_a,
    );
    (dv, dw)
}

fn simple_delta(v: DVec3, w: DVec3, params: &PhysicsParams) -> (DVec3, DVec3) {
    let dv = DVec3::new(-(1.0 + params.cushion_restitution) * v.x, 0.0, 0.0);
    let dw = DVec3::new(-w.x * 0.5, -w.y * 0.5, 0.0);
    (dv, dw)
}
