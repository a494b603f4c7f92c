use rkyv::{Archive, Deserialize, Serialize};

/// Something notable that happened during a shot.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[rkyv(derive(Debug))]
pub enum Outcome {
    Hit { ball: u32, speed: f32 },
    Collision { a: u32, b: u32, speed: f32 },
    Cushion { ball: u32, speed: f32 },
    Pot { ball: u32, pocket: u8, speed: f32 },
}

impl Outcome {
    pub fn involves(&self, id: u32) -> bool {
        match *self {
            Outcome::Collision { a, b, .. } => a == id || b == id,
            Outcome::Hit { ball, .. } | Outcome::Cushion { ball, .. } | Outcome::Pot { ball, .. } => {
                ball == id
            }
        }
    }

    pub fn speed(&self) -> f32 {
        match *self {
            Outcome::Hit { speed, .. }
            | Outcome::Collision { speed, .. }
            | Outcome::Cushion { speed, .. }
            | Outcome::Pot { speed, .. } => speed,
        }
    }

    /// First ball the cue ball touched, if any.
    pub fn first_contact(outcomes: &[Outcome], cue: u32) -> Option<u32> {
        outcomes.iter().find_map(|outcome| match *outcome {
            Outcome::Collision { a, b, .. } if a == cue => Some(b),
            Outcome::Collision { a, b, .. } if b == cue => Some(a),
            _ => None,
        })
    }

    pub fn potted(outcomes: &[Outcome]) -> impl Iterator<Item = u32> + '_ {
        outcomes.iter().filter_map(|outcome| match *outcome {
            Outcome::Pot { ball, .. } => Some(ball),
            _ => None,
        })
    }

    pub fn is_potted(outcomes: &[Outcome], id: u32) -> bool {
        Self::potted(outcomes).any(|ball| ball == id)
    }

    /// Rail contacts made by `id`.
    pub fn cushion_count(outcomes: &[Outcome], id: u32) -> usize {
        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Outcome::Cushion { ball, .. } if *ball == id))
            .count()
    }
}
