use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{BallSnapshot, TableSnapshot};

bitflags! {
    /// Which parts of a ball differ from the baseline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BallChange: u8 {
        const POSITION = 1 << 0;
        const VELOCITY = 1 << 1;
        const SPIN = 1 << 2;
        const STATE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaConfig {
    /// Metres a ball must move before it is resent.
    pub position_epsilon: f32,
    pub velocity_epsilon: f32,
    pub spin_epsilon: f32,
    /// Every n-th broadcast is sent in full.
    pub full_interval: u32,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            position_epsilon: 0.001,
            velocity_epsilon: 0.005,
            spin_epsilon: 0.5,
            full_interval: 10,
        }
    }
}

pub fn change_mask(current: &BallSnapshot, baseline: &BallSnapshot, config: &DeltaConfig) -> BallChange {
    let mut change = BallChange::empty();
    if current.position().distance(baseline.position()) as f32 > config.position_epsilon {
        change |= BallChange::POSITION;
    }
    if (current.velocity() - baseline.velocity()).length() as f32 > config.velocity_epsilon {
        change |= BallChange::VELOCITY;
    }
    if (current.spin() - baseline.spin()).length() as f32 > config.spin_epsilon {
        change |= BallChange::SPIN;
    }
    if current.state != baseline.state {
        change |= BallChange::STATE;
    }
    change
}

/// Turns full table captures into deltas against the last full snapshot
/// sent.
#[derive(Debug, Default)]
pub struct DeltaEncoder {
    config: DeltaConfig,
    baseline: Option<TableSnapshot>,
    since_full: u32,
}

impl DeltaEncoder {
    pub fn new(config: DeltaConfig) -> Self {
        Self {
            config,
            baseline: None,
            since_full: 0,
        }
    }

    pub fn baseline(&self) -> Option<&TableSnapshot> {
        self.baseline.as_ref()
    }

    /// Forces the next snapshot to be sent in full.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.since_full = 0;
    }

    pub fn encode(&mut self, current: TableSnapshot, force_full: bool) -> TableSnapshot {
        let due = self.since_full + 1 >= self.config.full_interval;
        let baseline = match &self.baseline {
            Some(baseline) if !force_full && !due => baseline,
            _ => {
                self.since_full = 0;
                self.baseline = Some(current.clone());
                return current;
            }
        };
        self.since_full += 1;

        let balls = current
            .balls
            .iter()
            .filter(|ball| match baseline.ball(ball.id) {
                Some(base) => !change_mask(ball, base, &self.config).is_empty(),
                None => true,
            })
            .copied()
            .collect();

        TableSnapshot {
            is_full: false,
            baseline_tick: baseline.server_tick,
            balls,
            ..current
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("delta against tick {baseline_tick} but no matching full snapshot")]
    MissingBaseline { baseline_tick: u32 },
}

/// Rebuilds full snapshots from a stream of fulls and deltas.
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    last_full: Option<TableSnapshot>,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_full(&self) -> Option<&TableSnapshot> {
        self.last_full.as_ref()
    }

    pub fn reset(&mut self) {
        self.last_full = None;
    }

    pub fn decode(&mut self, snapshot: TableSnapshot) -> Result<TableSnapshot, SnapshotError> {
        if snapshot.is_full {
            self.last_full = Some(snapshot.clone());
            return Ok(snapshot);
        }
        let baseline = self
            .last_full
            .as_ref()
            .filter(|full| full.server_tick == snapshot.baseline_tick)
            .ok_or(SnapshotError::MissingBaseline {
                baseline_tick: snapshot.baseline_tick,
            })?;

        let mut balls = baseline.balls.clone();
        for changed in &snapshot.balls {
            match balls.iter_mut().find(|ball| ball.id == changed.id) {
                Some(ball) => *ball = *changed,
                None => balls.push(*changed),
            }
        }
        balls.sort_by_key(|ball| ball.id);

        Ok(TableSnapshot {
            is_full: true,
            balls,
            ..snapshot
        })
    }
}
