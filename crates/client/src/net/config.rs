use std::time::Duration;

use baize::TableKind;

use super::interpolation::InterpolationConfig;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub player_name: String,
    pub room_id: Option<u64>,
    pub table: TableKind,
    pub connection_timeout: Duration,
    pub handshake_retry: Duration,
    pub ping_interval: Duration,
    pub interpolation: InterpolationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_name: String::from("player"),
            room_id: None,
            table: TableKind::Pool,
            connection_timeout: Duration::from_secs(10),
            handshake_retry: Duration::from_millis(500),
            ping_interval: Duration::from_millis(250),
            interpolation: InterpolationConfig::default(),
        }
    }
}
