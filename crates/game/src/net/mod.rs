mod channel;
mod connection;
mod endpoint;
mod message;
mod protocol;
mod stats;

pub use channel::{AckTracker, Channel, MAX_SEND_ATTEMPTS, RESEND_INTERVAL, ReceiveTracker, Reliability};
pub use connection::{ClientConnection, ConnectionError, ConnectionManager, ConnectionState, DEFAULT_TIMEOUT};
pub use endpoint::NetworkEndpoint;
pub use message::{ClientMessage, PlayerInfo, RoomStatus, ServerMessage, Welcome};
pub use protocol::{
    DEFAULT_PORT, MAX_PACKET_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION, Packet, PacketError,
    PacketHeader, PacketType, sequence_greater_than,
};
pub use stats::{NetworkStats, PacketLossSimulation, rand_percent, rand_u64};
