use glam::DVec3;
use rkyv::{Archive, Deserialize, Serialize};

use crate::math::{from_array, rotate_about, unit_at_angle, up_cross};

/// Cue parameters for a single stroke.
///
/// `offset` is the tip position on the cue ball face in units of the ball
/// radius: `x` to the right, `y` upwards.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[rkyv(derive(Debug))]
pub struct AimState {
    pub angle: f32,
    pub power: f32,
    pub offset: [f32; 3],
    pub pos: [f32; 3],
}

impl AimState {
    pub const MAX_OFFSET: f32 = 0.5;

    pub fn new(angle: f32, power: f32) -> Self {
        Self {
            angle,
            power,
            offset: [0.0; 3],
            pos: [0.0; 3],
        }
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = [x, y, 0.0];
        self
    }

    pub fn is_valid(&self, max_power: f32) -> bool {
        let [x, y, _] = self.offset;
        self.angle.is_finite()
            && self.power.is_finite()
            && self.power > 0.0
            && self.power <= max_power
            && x.is_finite()
            && y.is_finite()
            && x.hypot(y) <= Self::MAX_OFFSET
    }

    pub fn velocity(&self) -> DVec3 {
        unit_at_angle(f64::from(self.angle)) * f64::from(self.power)
    }

    pub fn offset_vec(&self) -> DVec3 {
        from_array(self.offset)
    }
}

/// Spin imparted by a cue tip striking `offset` from the ball centre while
/// launching the ball at `vel`.
pub fn cue_to_spin(offset: DVec3, vel: DVec3, r: f64) -> DVec3 {
    let speed = vel.length();
    if speed == 0.0 {
        return DVec3::ZERO;
    }
    let dir = vel / speed;
    let spin_axis = (-offset.x).atan2(offset.y);
    let spin_rate = 5.0 / 2.0 * speed * (offset.length() * r) / (r * r);
    rotate_about(up_cross(dir), dir, spin_axis) * spin_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f64 = 0.03275;

    #[test]
    fn centre_ball_has_no_spin() {
        let spin = cue_to_spin(DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0), R);
        assert_eq!(spin, DVec3::ZERO);
    }

    #[test]
    fn top_spin_rolls_forward() {
        let spin = cue_to_spin(DVec3::new(0.0, 0.3, 0.0), DVec3::new(2.0, 0.0, 0.0), R);
        assert!(spin.y > 0.0);
        assert!(spin.x.abs() < 1e-9 && spin.z.abs() < 1e-9);
    }

    #[test]
    fn right_english_spins_clockwise() {
        let spin = cue_to_spin(DVec3::new(0.3, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0), R);
        assert!(spin.z < 0.0);
    }

    #[test]
    fn aim_validation() {
        assert!(AimState::new(0.0, 3.0).is_valid(8.0));
        assert!(!AimState::new(0.0, 0.0).is_valid(8.0));
        assert!(!AimState::new(0.0, 9.0).is_valid(8.0));
        assert!(!AimState::new(f32::NAN, 1.0).is_valid(8.0));
        assert!(!AimState::new(0.0, 1.0).with_offset(0.5, 0.5).is_valid(8.0));
    }
}
