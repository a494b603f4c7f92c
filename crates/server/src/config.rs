use std::time::Duration;

use baize::{DEFAULT_TIMEOUT, PacketLossSimulation, RoomSettings};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_clients: usize,
    pub max_rooms: usize,
    pub client_timeout: Duration,
    pub room: RoomSettings,
    pub global_packet_loss: Option<PacketLossSimulation>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_clients: 64,
            max_rooms: 32,
            client_timeout: DEFAULT_TIMEOUT,
            room: RoomSettings::default(),
            global_packet_loss: None,
        }
    }
}
