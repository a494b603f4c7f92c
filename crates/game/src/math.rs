use glam::{DQuat, DVec3};

pub const UP: DVec3 = DVec3::Z;

/// `UP × v`, the direction a ball rolls in when spinning about `v`.
#[inline]
pub fn up_cross(v: DVec3) -> DVec3 {
    DVec3::new(-v.y, v.x, 0.0)
}

#[inline]
pub fn unit_at_angle(theta: f64) -> DVec3 {
    let (sin, cos) = theta.sin_cos();
    DVec3::new(cos, sin, 0.0)
}

pub fn rotate_about(v: DVec3, axis: DVec3, angle: f64) -> DVec3 {
    DQuat::from_axis_angle(axis, angle) * v
}

/// Rounds every component to the nearest `f32`. Applied after each step so
/// that independently computed trajectories cannot drift apart through
/// double precision residue.
#[inline]
pub fn fround(v: DVec3) -> DVec3 {
    v.as_vec3().as_dvec3()
}

#[inline]
pub fn passes_through_zero(v: DVec3, dv: DVec3) -> bool {
    (v + dv).dot(v) <= 0.0
}

#[inline]
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn to_array(v: DVec3) -> [f32; 3] {
    v.as_vec3().to_array()
}

pub fn from_array(a: [f32; 3]) -> DVec3 {
    glam::Vec3::from_array(a).as_dvec3()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_cross_is_perpendicular() {
        let v = DVec3::new(3.0, -2.0, 0.0);
        assert_eq!(up_cross(v).dot(v), 0.0);
        assert_eq!(up_cross(DVec3::X), DVec3::Y);
    }

    #[test]
    fn fround_is_idempotent() {
        let v = DVec3::new(0.1, 1.0 / 3.0, -7.123456789);
        let once = fround(v);
        assert_eq!(once, fround(once));
        assert_ne!(once.y, v.y);
    }

    #[test]
    fn zero_crossing() {
        let v = DVec3::new(1.0, 0.0, 0.0);
        assert!(!passes_through_zero(v, DVec3::new(-0.5, 0.0, 0.0)));
        assert!(passes_through_zero(v, DVec3::new(-1.0, 0.0, 0.0)));
        assert!(passes_through_zero(v, DVec3::new(-1.5, 0.0, 0.0)));
    }

    #[test]
    fn smoothstep_endpoints() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(2.0), 1.0);
    }
}
