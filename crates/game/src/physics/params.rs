use serde::{Deserialize, Serialize};

/// Physical constants of the ball set, cloth and cushions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsParams {
    pub ball_radius: f64,
    pub ball_mass: f64,
    pub gravity: f64,
    /// Rolling resistance coefficient.
    pub mu: f64,
    /// Sliding friction between ball and cloth.
    pub mu_sliding: f64,
    /// Friction between ball and cushion rubber.
    pub mu_cushion: f64,
    /// Radius of the contact patch used for spin decay about the vertical.
    pub rho: f64,
    pub cushion_restitution: f64,
    /// Restitution of the rounded cushion ends at the pocket jaws.
    pub knuckle_restitution: f64,
    pub ball_restitution: f64,
    /// Height of the cushion nose above the cloth, as a multiple of the radius.
    pub cushion_height: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            ball_radius: 0.03275,
            ball_mass: 0.23,
            gravity: 9.8,
            mu: 0.00985,
            mu_sliding: 0.16,
            mu_cushion: 0.85,
            rho: 0.034,
            cushion_restitution: 0.86,
            knuckle_restitution: 0.86,
            ball_restitution: 0.99,
            cushion_height: 7.0 / 5.0,
        }
    }
}

impl PhysicsParams {
    pub const TRANSITION_SPEED: f64 = 0.05;
    pub const SPIN_EPSILON: f64 = 0.01;

    pub fn with_radius(ball_radius: f64) -> Self {
        Self {
            ball_radius,
            ..Default::default()
        }
    }

    pub fn inertia(&self) -> f64 {
        2.0 / 5.0 * self.ball_mass * self.ball_radius * self.ball_radius
    }

    /// Torque opposing spin about the vertical axis.
    pub fn mz(&self) -> f64 {
        self.mu * self.ball_mass * self.gravity * 2.0 / 5.0 * self.rho
    }

    /// Torque opposing rolling.
    pub fn mxy(&self) -> f64 {
        7.0 / (5.0 * std::f64::consts::SQRT_2)
            * self.ball_radius
            * self.mu
            * self.ball_mass
            * self.gravity
    }

    /// `sin` of the angle between the cushion contact normal and the cloth.
    pub fn cushion_sin_theta(&self) -> f64 {
        self.cushion_height - 1.0
    }
}
