use glam::DVec3;

use baize::{AimState, Table};

const CUE: u32 = 0;

/// Plays automatically: places the cue ball near the head spot and shoots
/// straight at the nearest object ball after a short pause.
#[derive(Debug, Clone)]
pub struct Bot {
    think_ms: f64,
    ready_at: Option<f64>,
    max_power: f32,
}

impl Default for Bot {
    fn default() -> Self {
        Self::new(600.0)
    }
}

impl Bot {
    pub fn new(think_ms: f64) -> Self {
        Self {
            think_ms,
            ready_at: None,
            max_power: 4.0,
        }
    }

    /// Returns `true` once the bot has waited long enough to act on its turn.
    /// Call [`Bot::idle`] whenever it is not the bot's move.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        let ready_at = *self.ready_at.get_or_insert(now_ms + self.think_ms);
        if now_ms >= ready_at {
            self.ready_at = None;
            true
        } else {
            false
        }
    }

    pub fn idle(&mut self) {
        self.ready_at = None;
    }

    pub fn choose_shot(&self, table: &Table) -> Option<AimState> {
        let cue = table.cue_ball().filter(|cue| cue.on_table())?;
        let target = table
            .balls()
            .iter()
            .filter(|ball| ball.id != CUE && ball.on_table())
            .min_by(|a, b| {
                let da = a.pos.distance_squared(cue.pos);
                let db = b.pos.distance_squared(cue.pos);
                da.total_cmp(&db)
            })?;

        let to_target = target.pos - cue.pos;
        let angle = to_target.y.atan2(to_target.x) as f32;
        let power = (1.0 + 1.5 * to_target.length() as f32).min(self.max_power);
        Some(AimState::new(angle, power))
    }

    pub fn choose_placement(&self, table: &Table) -> DVec3 {
        table.free_spot(table.geometry().head_spot(), Some(CUE))
    }
}
