use glam::DVec3;

use super::ball::{Ball, BallState};
use super::geometry::Pocket;
use super::params::PhysicsParams;
use crate::math::up_cross;

/// Height a ball of radius `r` comes to rest at once it lies in a pocket.
/// Higher ids stack lower so pocketed balls never share a position.
pub fn resting_depth(id: u32, r: f64) -> f64 {
    -4.0 * r - r * f64::from(id) / 4.0
}

impl Pocket {
    /// A ball is captured once its centre reaches the pocket radius.
    pub fn will_capture(&self, ball: &Ball, t: f64) -> bool {
        let mut offset = ball.future_position(t) - self.pos;
        offset.z = 0.0;
        offset.length() <= self.radius
    }

    pub fn capture(&self, ball: &mut Ball, index: usize, t: f64, params: &PhysicsParams) -> f64 {
        let speed = ball.vel.length();
        ball.vel.z = -params.gravity * t;
        ball.state = BallState::Falling;
        ball.pocket = Some(index);
        speed
    }

    /// Funnels a falling ball towards the pocket centre until it settles.
    pub fn update_fall(&self, ball: &mut Ball, t: f64, params: &PhysicsParams) {
        let r = params.ball_radius;
        let g = params.gravity;
        ball.vel.z -= r * 10.0 * t * g;

        let mut to_centre = self.pos - ball.pos;
        to_centre.z = 0.0;
        if to_centre.length() > self.radius - r {
            let to_centre = to_centre.normalize_or_zero();
            if ball.pos.z > -r / 2.0 {
                ball.vel += to_centre * (r * 7.0 * t * g);
                ball.rvel += up_cross(to_centre) * (7.0 * t * g);
            }
            if ball.vel.dot(to_centre) < 0.0 {
                let lateral = ball.vel.length() / 2.0;
                ball.vel.x = to_centre.x * lateral;
                ball.vel.y = to_centre.y * lateral;
            }
        }

        let floor = resting_depth(ball.id, r);
        if ball.pos.z < floor + r && ball.rvel.length_squared() != 0.0 {
            ball.pos.z = floor + r;
            ball.vel = DVec3::new(0.0, 0.0, -r / 10.0);
            ball.rvel = DVec3::ZERO;
        }
        if ball.pos.z < floor {
            ball.pos.z = floor;
            ball.vel = DVec3::ZERO;
            ball.rvel = DVec3::ZERO;
            ball.state = BallState::InPocket;
        }
    }
}
