use log::debug;

use super::{GameState, Rules, TurnResult};
use crate::physics::{Ball, BallState, Outcome, Rack, Table, TableGeometry};
use crate::room::PlayerSlot;
use crate::snapshot::TableSnapshot;

/// Free play: pot anything, keep shooting while you pot, clear the table
/// to win. Scratches and misses hand the opponent ball in hand.
#[derive(Debug, Clone)]
pub struct PracticeRules {
    rack: fn(&TableGeometry) -> Vec<Ball>,
}

impl Default for PracticeRules {
    fn default() -> Self {
        Self::triangle()
    }
}

impl PracticeRules {
    pub fn triangle() -> Self {
        Self {
            rack: Rack::triangle,
        }
    }

    pub fn diamond() -> Self {
        Self { rack: Rack::diamond }
    }

    pub fn with_rack(rack: fn(&TableGeometry) -> Vec<Ball>) -> Self {
        Self { rack }
    }
}

const CUE: u32 = 0;

impl Rules for PracticeRules {
    fn name(&self) -> &'static str {
        "practice"
    }

    fn rack(&self, geometry: &TableGeometry) -> Vec<Ball> {
        (self.rack)(geometry)
    }

    fn process_shot(
        &mut self,
        table: &mut Table,
        state: &GameState,
        final_snapshot: &TableSnapshot,
        outcomes: &[Outcome],
        shooter: PlayerSlot,
    ) -> TurnResult {
        let scratched = Outcome::is_potted(outcomes, CUE);
        let missed = Outcome::first_contact(outcomes, CUE).is_none();
        let potted = Outcome::potted(outcomes).filter(|&ball| ball != CUE).count();
        let fouled = scratched || missed;

        if scratched {
            let spot = table.free_spot(table.geometry().head_spot(), Some(CUE));
            if let Err(e) = table.place_ball(CUE, spot) {
                debug!("could not respot cue ball: {e}");
            }
        }

        let cleared = final_snapshot
            .balls
            .iter()
            .filter(|ball| u32::from(ball.id) != CUE)
            .all(|ball| ball.ball_state() == BallState::InPocket);

        let message = if scratched {
            format!("player {shooter} scratched")
        } else if missed {
            format!("player {shooter} missed every ball")
        } else if potted > 0 {
            format!("player {shooter} potted {potted}")
        } else {
            format!("no pot for player {shooter}")
        };

        TurnResult {
            fouled,
            continues_turn: !fouled && potted > 0,
            ball_in_hand: fouled,
            behind_head_string: scratched && state.break_shot,
            player_wins: cleared && !fouled,
            player_loses: false,
            message,
        }
    }
}
