mod practice;

use rkyv::{Archive, Deserialize, Serialize};

use crate::physics::{Ball, Outcome, Table, TableGeometry};
use crate::room::PlayerSlot;
use crate::snapshot::TableSnapshot;

pub use practice::PracticeRules;

/// What happens next after a shot has come to rest.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[rkyv(derive(Debug))]
pub struct TurnResult {
    pub fouled: bool,
    pub continues_turn: bool,
    pub ball_in_hand: bool,
    /// Ball in hand is restricted to the area behind the head string.
    pub behind_head_string: bool,
    pub player_wins: bool,
    pub player_loses: bool,
    pub message: String,
}

/// Match state the rules can read when judging a shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub current_player: PlayerSlot,
    pub shot_count: u32,
    pub break_shot: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_player: 0,
            shot_count: 0,
            break_shot: true,
        }
    }
}

/// Game specific judgement of a finished shot.
///
/// `table` is handed over so the rules can respot balls; the room applies
/// turn order, ball in hand and match end from the returned result.
pub trait Rules: Send {
    fn name(&self) -> &'static str;

    fn rack(&self, geometry: &TableGeometry) -> Vec<Ball>;

    fn process_shot(
        &mut self,
        table: &mut Table,
        state: &GameState,
        final_snapshot: &TableSnapshot,
        outcomes: &[Outcome],
        shooter: PlayerSlot,
    ) -> TurnResult;
}

pub fn rules_by_name(name: &str) -> Option<Box<dyn Rules>> {
    match name {
        "practice" | "eightball" => Some(Box::new(PracticeRules::triangle())),
        "nineball" => Some(Box::new(PracticeRules::diamond())),
        _ => None,
    }
}
