use rkyv::{Archive, Deserialize, Serialize};

use super::channel::Reliability;
use crate::physics::AimState;
use crate::room::{PlayerSlot, RoomId, RoomState};
use crate::rules::TurnResult;
use crate::snapshot::TableSnapshot;

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientMessage {
    /// Joins a named room, or any open room when `room_id` is `None`.
    JoinRoom {
        room_id: Option<RoomId>,
        player_name: String,
    },
    Hit {
        aim: AimState,
        sequence: u32,
    },
    PlaceBall {
        pos: [f32; 3],
        sequence: u32,
    },
    RequestState,
    LeaveRoom,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerMessage {
    Welcome(Welcome),
    Snapshot(TableSnapshot),
    ShotAccepted {
        sequence: u32,
        server_tick: u32,
        shooter: PlayerSlot,
        aim: AimState,
    },
    ShotRejected {
        sequence: u32,
        reason: String,
    },
    BallPlaced {
        pos: [f32; 3],
        player: PlayerSlot,
    },
    Stationary {
        final_state: TableSnapshot,
        turn_result: TurnResult,
    },
    RoomStatus(RoomStatus),
    GameOver {
        winner: Option<PlayerSlot>,
        reason: String,
    },
    JoinDenied {
        reason: String,
    },
}

impl ServerMessage {
    pub fn reliability(&self) -> Reliability {
        match self {
            ServerMessage::Snapshot(_) => Reliability::Unreliable,
            _ => Reliability::Reliable,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::Welcome(_) => "welcome",
            ServerMessage::Snapshot(_) => "snapshot",
            ServerMessage::ShotAccepted { .. } => "shot_accepted",
            ServerMessage::ShotRejected { .. } => "shot_rejected",
            ServerMessage::BallPlaced { .. } => "ball_placed",
            ServerMessage::Stationary { .. } => "stationary",
            ServerMessage::RoomStatus(_) => "room_status",
            ServerMessage::GameOver { .. } => "game_over",
            ServerMessage::JoinDenied { .. } => "join_denied",
        }
    }
}

impl ClientMessage {
    pub fn reliability(&self) -> Reliability {
        match self {
            ClientMessage::RequestState => Reliability::Unreliable,
            _ => Reliability::Reliable,
        }
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Welcome {
    pub room_id: RoomId,
    pub player_slot: PlayerSlot,
    pub server_time_ms: u64,
    pub initial_state: TableSnapshot,
    pub status: RoomStatus,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PlayerInfo {
    pub slot: PlayerSlot,
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct RoomStatus {
    pub room_id: RoomId,
    pub state: RoomState,
    pub rules: String,
    pub players: Vec<PlayerInfo>,
    pub current_player: PlayerSlot,
    pub shot_count: u32,
    pub ball_in_hand: bool,
    pub behind_head_string: bool,
    pub simulating: bool,
    /// Time left for a disconnected player to return while paused.
    pub reconnect_remaining_ms: Option<u32>,
}
