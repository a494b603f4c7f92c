use glam::DVec3;
use log::{debug, error};
use thiserror::Error;

use super::aim::{AimState, cue_to_spin};
use super::ball::{Ball, BallState};
use super::collision;
use super::cushion::CushionModel;
use super::geometry::TableGeometry;
use super::outcome::Outcome;
use super::params::PhysicsParams;
use super::pocket::resting_depth;
use crate::math::fround;

pub const MAX_RESOLUTION_DEPTH: usize = 100;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PhysicsError {
    #[error("collision resolution did not settle within {0} passes")]
    DepthExceeded(usize),
    #[error("no ball with id {0}")]
    UnknownBall(u32),
}

/// Compact table state: positions and states only. Enough to seed an
/// identical simulation while every ball is at rest.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortState {
    pub balls: Vec<(DVec3, BallState)>,
}

#[derive(Debug, Clone)]
pub struct Table {
    balls: Vec<Ball>,
    pairs: Vec<(usize, usize)>,
    outcomes: Vec<Outcome>,
    geometry: TableGeometry,
    params: PhysicsParams,
    cushion_model: CushionModel,
}

impl Table {
    pub fn new(balls: Vec<Ball>, geometry: TableGeometry, params: PhysicsParams) -> Self {
        let count = balls.len();
        let pairs = (0..count)
            .flat_map(|a| (a + 1..count).map(move |b| (a, b)))
            .collect();
        Self {
            balls,
            pairs,
            outcomes: Vec::new(),
            geometry,
            params,
            cushion_model: CushionModel::default(),
        }
    }

    pub fn with_cushion_model(mut self, model: CushionModel) -> Self {
        self.cushion_model = model;
        self
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn ball(&self, id: u32) -> Option<&Ball> {
        self.balls.get(id as usize)
    }

    pub fn cue_ball(&self) -> Option<&Ball> {
        self.balls.first()
    }

    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    pub fn cushion_model(&self) -> CushionModel {
        self.cushion_model
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn drain_outcomes(&mut self) -> Vec<Outcome> {
        std::mem::take(&mut self.outcomes)
    }

    pub fn all_stationary(&self) -> bool {
        self.balls.iter().all(|ball| !ball.in_motion())
    }

    pub fn max_speed(&self) -> f64 {
        self.balls
            .iter()
            .map(|ball| ball.vel.length())
            .fold(0.0, f64::max)
    }

    /// Advances every ball by `t`, resolving collisions and boundary
    /// contacts until no further event falls inside the step.
    pub fn advance(&mut self, t: f64) -> Result<(), PhysicsError> {
        let at_rest: Vec<bool> = self
            .balls
            .iter()
            .map(|ball| ball.state == BallState::Stationary)
            .collect();
        let mut depth = 0;
        while !self.prepare_advance_all(t) {
            depth += 1;
            if depth > MAX_RESOLUTION_DEPTH {
                error!("collision resolution depth exceeded");
                return Err(PhysicsError::DepthExceeded(MAX_RESOLUTION_DEPTH));
            }
        }
        let (params, geometry) = (&self.params, &self.geometry);
        for (ball, was_at_rest) in self.balls.iter_mut().zip(at_rest) {
            ball.update(t, params, geometry);
            // a ball struck from rest slides for at least one step
            if was_at_rest && ball.state == BallState::Rolling {
                ball.state = BallState::Sliding;
            }
        }
        Ok(())
    }

    /// Resolves at most one event. Returns `true` when the step is clear.
    fn prepare_advance_all(&mut self, t: f64) -> bool {
        for index in 0..self.pairs.len() {
            let (a, b) = self.pairs[index];
            if !self.prepare_advance_pair(a, b, t) {
                return false;
            }
        }
        for index in 0..self.balls.len() {
            if !self.prepare_advance_to_boundaries(index, t) {
                return false;
            }
        }
        true
    }

    fn prepare_advance_pair(&mut self, a: usize, b: usize, t: f64) -> bool {
        let params = self.params;
        let (first, second) = self.balls.split_at_mut(b);
        let (ball_a, ball_b) = (&mut first[a], &mut second[0]);
        if !collision::will_collide(ball_a, ball_b, t, &params) {
            return true;
        }
        let speed = collision::collide(ball_a, ball_b, t, &params);
        self.outcomes.push(Outcome::Collision {
            a: ball_a.id,
            b: ball_b.id,
            speed: speed as f32,
        });
        false
    }

    fn prepare_advance_to_boundaries(&mut self, index: usize, t: f64) -> bool {
        let params = &self.params;
        let geometry = &self.geometry;
        let ball = &mut self.balls[index];
        if !ball.in_motion() || !ball.on_table() {
            return true;
        }
        let future = ball.future_position(t);
        if geometry.within_cushions(future) {
            return true;
        }

        if let Some(rail) = geometry.rail_hit(future) {
            let heading_out = ball.vel.dot(rail.to_world(DVec3::X)) > 0.0;
            if heading_out {
                let speed = self.cushion_model.bounce(ball, rail, params);
                self.outcomes.push(Outcome::Cushion {
                    ball: ball.id,
                    speed: speed as f32,
                });
                return false;
            }
            return true;
        }

        if let Some(knuckle) = geometry
            .knuckles
            .iter()
            .find(|knuckle| knuckle.will_bounce(ball, t, params))
        {
            let speed = knuckle.bounce(ball, params);
            self.outcomes.push(Outcome::Cushion {
                ball: ball.id,
                speed: speed as f32,
            });
            return false;
        }

        if let Some((pocket_index, pocket)) = geometry
            .pockets
            .iter()
            .enumerate()
            .find(|(_, pocket)| pocket.will_capture(ball, t))
        {
            let speed = pocket.capture(ball, pocket_index, t, params);
            debug!("ball {} falling into pocket {}", ball.id, pocket_index);
            self.outcomes.push(Outcome::Pot {
                ball: ball.id,
                pocket: pocket_index as u8,
                speed: speed as f32,
            });
            return false;
        }
        true
    }

    /// Strikes the cue ball.
    pub fn hit(&mut self, aim: &AimState) -> Result<(), PhysicsError> {
        let r = self.params.ball_radius;
        let cue = self.balls.first_mut().ok_or(PhysicsError::UnknownBall(0))?;
        cue.vel = fround(aim.velocity());
        cue.rvel = fround(cue_to_spin(aim.offset_vec(), cue.vel, r));
        cue.state = BallState::Sliding;
        self.outcomes.push(Outcome::Hit {
            ball: cue.id,
            speed: aim.power,
        });
        Ok(())
    }

    /// Places a ball at rest on the cloth, e.g. cue ball in hand or a respot.
    pub fn place_ball(&mut self, id: u32, pos: DVec3) -> Result<(), PhysicsError> {
        let ball = self
            .balls
            .get_mut(id as usize)
            .ok_or(PhysicsError::UnknownBall(id))?;
        ball.pos = fround(DVec3::new(pos.x, pos.y, 0.0));
        ball.pocket = None;
        ball.set_stationary();
        Ok(())
    }

    /// Returns whether a ball at `pos` would touch any ball on the table
    /// other than `except`.
    pub fn overlaps_any(&self, pos: DVec3, except: Option<u32>) -> bool {
        let diameter = 2.0 * self.params.ball_radius;
        self.balls
            .iter()
            .filter(|ball| Some(ball.id) != except && ball.on_table())
            .any(|ball| ball.pos.truncate().distance(pos.truncate()) < diameter)
    }

    /// First free spot along the table's long axis starting at `from`,
    /// moving towards the head rail.
    pub fn free_spot(&self, from: DVec3, except: Option<u32>) -> DVec3 {
        let step = self.params.ball_radius / 2.0;
        let mut pos = DVec3::new(from.x, from.y, 0.0);
        while self.overlaps_any(pos, except) && pos.x > -self.geometry.table_x {
            pos.x -= step;
        }
        pos
    }

    /// Brings every moving ball to an immediate stop. Falling balls are
    /// treated as potted.
    pub fn halt_all(&mut self) {
        for ball in &mut self.balls {
            match ball.state {
                BallState::Falling => {
                    ball.pos.z = f64::from(resting_depth(ball.id, self.params.ball_radius) as f32);
                    ball.vel = DVec3::ZERO;
                    ball.rvel = DVec3::ZERO;
                    ball.state = BallState::InPocket;
                }
                BallState::Rolling | BallState::Sliding => ball.set_stationary(),
                BallState::Stationary | BallState::InPocket => {}
            }
        }
    }

    pub fn short_state(&self) -> ShortState {
        ShortState {
            balls: self.balls.iter().map(|ball| (ball.pos, ball.state)).collect(),
        }
    }

    pub fn apply_short_state(&mut self, state: &ShortState) {
        for (ball, &(pos, ball_state)) in self.balls.iter_mut().zip(&state.balls) {
            ball.pos = fround(pos);
            ball.vel = DVec3::ZERO;
            ball.rvel = DVec3::ZERO;
            ball.state = match ball_state {
                BallState::Falling => BallState::InPocket,
                BallState::Rolling | BallState::Sliding => BallState::Stationary,
                other => other,
            };
            ball.pocket = None;
        }
    }

    /// Direct access for applying authoritative snapshot state.
    pub fn ball_mut(&mut self, id: u32) -> Option<&mut Ball> {
        self.balls.get_mut(id as usize)
    }
}
