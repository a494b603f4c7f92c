use glam::DVec3;

use super::ball::{Ball, BallState};
use super::params::PhysicsParams;

/// Returns whether two balls would overlap after `t` seconds of straight
/// line travel.
pub fn will_collide(a: &Ball, b: &Ball, t: f64, params: &PhysicsParams) -> bool {
    if !(a.in_motion() || b.in_motion()) || !a.on_table() || !b.on_table() {
        return false;
    }
    let diameter = 2.0 * params.ball_radius;
    a.future_position(t).distance_squared(b.future_position(t)) < diameter * diameter
}

/// Earliest time in `[0, t]` at which the balls are exactly touching.
pub fn time_of_contact(a: &Ball, b: &Ball, t: f64, params: &PhysicsParams) -> f64 {
    let dp = a.pos - b.pos;
    let dv = a.vel - b.vel;
    let diameter = 2.0 * params.ball_radius;
    let qa = dv.length_squared();
    let qb = 2.0 * dp.dot(dv);
    let qc = dp.length_squared() - diameter * diameter;
    if qa == 0.0 {
        return 0.0;
    }
    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return 0.0;
    }
    let root = (-qb - discriminant.sqrt()) / (2.0 * qa);
    root.clamp(0.0, t)
}

/// Resolves the impact along the line of centres at the moment of contact,
/// including throw from cloth-like friction between the ball surfaces.
/// Positions are left alone; the step that follows moves the balls.
/// Returns the closing speed along the line of centres.
pub fn collide(a: &mut Ball, b: &mut Ball, t: f64, params: &PhysicsParams) -> f64 {
    let contact = time_of_contact(a, b, t, params);
    let mut normal = b.future_position(contact) - a.future_position(contact);
    normal.z = 0.0;
    let speed = resolve_throw(a, b, normal.normalize_or_zero(), params);
    a.state = BallState::Sliding;
    b.state = BallState::Sliding;
    speed
}

fn dynamic_friction(relative_speed: f64) -> f64 {
    0.01 + 0.108 * (-1.088 * relative_speed).exp()
}

fn resolve_throw(a: &mut Ball, b: &mut Ball, ab: DVec3, params: &PhysicsParams) -> f64 {
    let r = params.ball_radius;
    let m = params.ball_mass;
    let e = params.ball_restitution;
    let inertia = params.inertia();

    let ab_tangent = DVec3::new(-ab.y, ab.x, 0.0);

    let lever = ab * r;
    let v_point = a.vel - b.vel + a.rvel.cross(lever) + b.rvel.cross(lever);
    let vn = ab.dot(v_point);
    let v_rel = v_point - ab * vn;
    let v_rel_mag = v_rel.length();

    let jn = -(1.0 + e) * vn / (2.0 / m);
    let jt = if v_rel_mag > 0.0 {
        let mu = dynamic_friction(v_rel_mag);
        0.25 * (mu * jn.abs() / v_rel_mag).min(1.0 / 7.0) * -ab_tangent.dot(v_rel)
    } else {
        0.0
    };

    let impulse = ab * jn + ab_tangent * jt;
    a.vel += impulse / m;
    b.vel -= impulse / m;

    // equal and opposite tangential impulses at opposite levers give both
    // balls the same torque
    let torque = lever.cross(ab_tangent * jt) / inertia;
    a.rvel += torque;
    b.rvel += torque;
    vn.abs()
}
