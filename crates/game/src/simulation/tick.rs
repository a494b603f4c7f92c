use std::time::Duration;

use crate::physics::{Outcome, PhysicsError, Table};

pub const PHYSICS_TICK_RATE: u32 = 512;

/// Longest slice of wall time fed into one update; anything beyond is
/// dropped rather than simulated in a burst.
const MAX_FRAME: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f64,
    accumulator: f64,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(PHYSICS_TICK_RATE)
    }
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            dt: 1.0 / f64::from(tick_rate),
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta.as_secs_f64().min(MAX_FRAME);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    pub fn alpha(&self) -> f64 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Steps `table` until every ball is at rest, returning the outcomes and
/// the number of steps taken.
pub fn run_until_stationary(
    table: &mut Table,
    dt: f64,
    max_steps: u32,
) -> Result<(Vec<Outcome>, u32), PhysicsError> {
    let mut outcomes = table.drain_outcomes();
    let mut steps = 0;
    while !table.all_stationary() && steps < max_steps {
        table.advance(dt)?;
        outcomes.append(&mut table.drain_outcomes());
        steps += 1;
    }
    Ok((outcomes, steps))
}
