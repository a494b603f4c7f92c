use super::ball::{Ball, BallState};
use super::geometry::Knuckle;
use super::params::PhysicsParams;

impl Knuckle {
    pub fn will_bounce(&self, ball: &Ball, t: f64, params: &PhysicsParams) -> bool {
        let approaching = (self.pos - ball.pos).dot(ball.vel) > 0.0;
        approaching
            && ball.future_position(t).distance(self.pos) < self.radius + params.ball_radius
    }

    /// Reflects the ball off the knuckle and returns the normal impact speed.
    pub fn bounce(&self, ball: &mut Ball, params: &PhysicsParams) -> f64 {
        let mut normal = ball.pos - self.pos;
        normal.z = 0.0;
        let normal = normal.normalize_or_zero();
        let vn = ball.vel.dot(normal);
        ball.vel -= normal * ((1.0 + params.knuckle_restitution) * vn);
        ball.rvel *= 0.5;
        ball.state = BallState::Sliding;
        vn.abs()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;

    #[test]
    fn head_on_knuckle_reflects() {
        let params = PhysicsParams::default();
        let knuckle = Knuckle {
            pos: DVec3::ZERO,
            radius: params.ball_radius,
        };
        let mut ball = Ball::new(0, DVec3::new(-2.0 * params.ball_radius - 0.001, 0.0, 0.0));
        ball.vel = DVec3::new(1.0, 0.0, 0.0);
        ball.state = BallState::Rolling;
        assert!(knuckle.will_bounce(&ball, 0.01, &params));
        let speed = knuckle.bounce(&mut ball, &params);
        assert_eq!(speed, 1.0);
        assert!((ball.vel.x + params.knuckle_restitution).abs() < 1e-12);
        assert!(!knuckle.will_bounce(&ball, 0.01, &params));
    }

    #[test]
    fn knuckle_restitution_is_tuned_apart_from_the_cushion() {
        let params = PhysicsParams {
            knuckle_restitution: 0.5,
            ..Default::default()
        };
        let knuckle = Knuckle {
            pos: DVec3::ZERO,
            radius: params.ball_radius,
        };
        let mut ball = Ball::new(0, DVec3::new(-2.0 * params.ball_radius, 0.0, 0.0));
        ball.vel = DVec3::new(2.0, 0.0, 0.0);
        ball.state = BallState::Sliding;
        knuckle.bounce(&mut ball, &params);
        assert!((ball.vel.x + 1.0).abs() < 1e-12);
        assert_ne!(params.knuckle_restitution, params.cushion_restitution);
    }
}
