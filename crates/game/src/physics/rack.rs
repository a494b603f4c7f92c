use glam::DVec3;

use super::ball::Ball;
use super::geometry::TableGeometry;

/// Standard ball layouts. The cue ball is always id `0`.
pub struct Rack;

impl Rack {
    /// Spacing between rows, leaving a small gap between neighbours.
    fn gap(r: f64) -> f64 {
        2.0 * r + 2.0 * 0.0233 * r
    }

    fn cue_ball(geometry: &TableGeometry) -> Ball {
        Ball::new(0, geometry.head_spot())
    }

    fn position(apex: DVec3, row: usize, column: usize, gap: f64) -> DVec3 {
        let row_spacing = gap * (3f64.sqrt() / 2.0);
        DVec3::new(
            apex.x + row as f64 * row_spacing,
            apex.y + (column as f64 - row as f64 / 2.0) * gap,
            0.0,
        )
    }

    /// Fifteen ball triangle with the apex on the foot spot.
    pub fn triangle(geometry: &TableGeometry) -> Vec<Ball> {
        const NUMBERS: [u8; 15] = [1, 9, 2, 10, 8, 3, 11, 7, 14, 4, 5, 13, 15, 6, 12];
        let gap = Self::gap(geometry.ball_radius);
        let apex = geometry.foot_spot();
        let mut balls = vec![Self::cue_ball(geometry)];
        let mut numbers = NUMBERS.iter();
        for row in 0..5 {
            for column in 0..=row {
                let id = balls.len() as u32;
                let mut ball = Ball::new(id, Self::position(apex, row, column, gap));
                if let Some(&number) = numbers.next() {
                    ball = ball.with_number(number);
                }
                balls.push(ball);
            }
        }
        balls
    }

    /// Nine ball diamond with the one ball on the foot spot and the nine in
    /// the middle.
    pub fn diamond(geometry: &TableGeometry) -> Vec<Ball> {
        const LAYOUT: [(usize, usize, u8); 9] = [
            (0, 0, 1),
            (1, 0, 2),
            (1, 1, 3),
            (2, 0, 4),
            (2, 1, 9),
            (2, 2, 5),
            (3, 1, 6),
            (3, 2, 7),
            (4, 2, 8),
        ];
        let gap = Self::gap(geometry.ball_radius);
        let apex = geometry.foot_spot();
        let mut balls = vec![Self::cue_ball(geometry)];
        for (index, (row, column, number)) in LAYOUT.into_iter().enumerate() {
            let ball = Ball::new(index as u32 + 1, Self::position(apex, row, column, gap))
                .with_number(number);
            balls.push(ball);
        }
        balls
    }

    /// Cue ball and a single object ball on the foot spot.
    pub fn practice_pair(geometry: &TableGeometry) -> Vec<Ball> {
        vec![
            Self::cue_ball(geometry),
            Ball::new(1, geometry.foot_spot()).with_number(1),
        ]
    }
}
