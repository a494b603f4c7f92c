mod game_room;
mod manager;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ServerMessage;
use crate::physics::{CushionModel, PhysicsError, PhysicsParams, TableGeometry};
use crate::snapshot::DeltaConfig;

pub use game_room::GameRoom;
pub use manager::RoomManager;

pub type RoomId = u64;
pub type PlayerSlot = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
pub enum RoomState {
    /// Seats still open.
    Waiting,
    Playing,
    /// A player dropped mid-game and may still return.
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableKind {
    #[default]
    Pool,
    Carom,
}

impl TableKind {
    pub fn geometry(self, ball_radius: f64) -> TableGeometry {
        match self {
            TableKind::Pool => TableGeometry::pool(ball_radius),
            TableKind::Carom => TableGeometry::carom(ball_radius),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    pub rules: String,
    pub table: TableKind,
    pub cushion_model: CushionModel,
    pub physics: PhysicsParams,
    /// Players needed before play starts; `1` for solo practice.
    pub seats: u8,
    pub max_power: f32,
    pub tick_rate: u32,
    pub fast_broadcast_hz: u32,
    pub slow_broadcast_hz: u32,
    /// Fastest ball speed at or below which the slow rate applies.
    pub fast_speed_threshold: f64,
    pub delta: DeltaConfig,
    pub reconnect_window: Duration,
    pub waiting_timeout: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            rules: String::from("practice"),
            table: TableKind::default(),
            cushion_model: CushionModel::default(),
            physics: PhysicsParams::default(),
            seats: 2,
            max_power: 8.0,
            tick_rate: crate::simulation::PHYSICS_TICK_RATE,
            fast_broadcast_hz: 20,
            slow_broadcast_hz: 10,
            fast_speed_threshold: 0.5,
            delta: DeltaConfig::default(),
            reconnect_window: Duration::from_secs(60),
            waiting_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlayer {
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(PlayerSlot),
}

#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room is full")]
    RoomFull,
    #[error("no room with id {0}")]
    UnknownRoom(RoomId),
    #[error("room limit reached")]
    TooManyRooms,
    #[error("unknown rule set {0:?}")]
    UnknownRules(String),
    #[error("game is not in progress")]
    NotPlaying,
    #[error("not seated in a room")]
    NotInRoom,
    #[error("game is paused")]
    Paused,
    #[error("not your turn")]
    NotYourTurn,
    #[error("balls are still moving")]
    ShotInProgress,
    #[error("invalid shot: {0}")]
    InvalidShot(&'static str),
    #[error("no ball in hand")]
    NotBallInHand,
    #[error("invalid placement: {0}")]
    InvalidPlacement(&'static str),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}
