pub mod math;
pub mod net;
pub mod physics;
pub mod room;
pub mod rules;
pub mod simulation;
pub mod snapshot;

pub use net::{
    Channel, ClientConnection, ClientMessage, ConnectionError, ConnectionManager,
    ConnectionState, DEFAULT_PORT, DEFAULT_TIMEOUT, NetworkEndpoint, NetworkStats, Packet, PacketError,
    PacketHeader, PacketLossSimulation, PacketType, PlayerInfo, Reliability, RoomStatus,
    ServerMessage, Welcome, rand_u64,
};
pub use physics::{
    AimState, Ball, BallState, CushionModel, Outcome, PhysicsError, PhysicsParams, Rack,
    ShortState, Table, TableGeometry,
};
pub use room::{
    GameRoom, PlayerSlot, Recipient, RoomError, RoomId, RoomManager, RoomMessage, RoomSettings,
    RoomState, TableKind,
};
pub use rules::{GameState, PracticeRules, Rules, TurnResult};
pub use simulation::{FixedTimestep, PHYSICS_TICK_RATE};
pub use snapshot::{BallSnapshot, DeltaConfig, DeltaDecoder, DeltaEncoder, SnapshotError, TableSnapshot};
