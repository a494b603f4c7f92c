use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use log::{debug, info, warn};

use baize::{
    ClientMessage, ConnectionManager, ConnectionState, NetworkEndpoint, NetworkStats, Packet,
    PacketType, Recipient, Reliability, RoomError, RoomId, RoomManager,
    RoomMessage, RoomState, ServerMessage,
};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};

pub struct GameServer {
    endpoint: NetworkEndpoint,
    connections: ConnectionManager,
    rooms: RoomManager,
    config: ServerConfig,
    last_update: Instant,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let mut endpoint = NetworkEndpoint::bind(bind_addr)?;
        if let Some(loss) = config.global_packet_loss.clone() {
            endpoint.set_packet_loss(loss);
        }

        Ok(Self {
            endpoint,
            connections: ConnectionManager::with_timeout(config.max_clients, config.client_timeout),
            rooms: RoomManager::new(config.room.clone(), config.max_rooms),
            last_update: Instant::now(),
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    fn server_time_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn shutdown_connections(&mut self) {
        let client_ids: Vec<u32> = self.connections.iter().map(|c| c.client_id).collect();
        for client_id in client_ids {
            self.kick_client(client_id);
        }
    }

    pub fn kick_client(&mut self, client_id: u32) {
        if let Some(client) = self.connections.get(client_id) {
            let packet = self.endpoint.create_packet(PacketType::Disconnect);
            if let Err(e) = self.endpoint.send_to(&packet, client.addr) {
                debug!("disconnect to client {} not sent: {}", client_id, e);
            }
        }
        self.drop_client(client_id, DisconnectReason::Kicked);
    }

    fn drop_client(&mut self, client_id: u32, reason: DisconnectReason) {
        if let Some(client) = self.connections.remove(client_id) {
            if let Some((room_id, slot)) = client.seat {
                self.rooms.disconnect(room_id, slot);
            }
            self.pending_events
                .push_back(ServerEvent::ClientDisconnected { client_id, reason });
        }
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_update;
        self.last_update = now;

        if let Err(e) = self.process_network() {
            self.pending_events.push_back(ServerEvent::Error {
                message: format!("Network error: {}", e),
            });
        }

        let server_time_ms = self.server_time_ms();
        self.rooms.update(delta, server_time_ms);
        self.deliver_room_messages();
        self.resend_reliable();

        let timed_out = self.connections.cleanup_timed_out();
        for client in timed_out {
            if let Some((room_id, slot)) = client.seat {
                self.rooms.disconnect(room_id, slot);
            }
            self.pending_events.push_back(ServerEvent::ClientDisconnected {
                client_id: client.client_id,
                reason: DisconnectReason::Timeout,
            });
        }

        for room_id in self.rooms.cleanup() {
            for client in self.connections.iter_mut() {
                if client.seat.is_some_and(|(id, _)| id == room_id) {
                    client.seat = None;
                }
            }
            self.pending_events
                .push_back(ServerEvent::RoomClosed { room_id });
        }
    }

    fn deliver_room_messages(&mut self) {
        for (room_id, RoomMessage { recipient, message }) in self.rooms.drain_messages() {
            let targets: Vec<u32> = match recipient {
                Recipient::All => self
                    .connections
                    .iter()
                    .filter(|c| c.seat.is_some_and(|(id, _)| id == room_id))
                    .map(|c| c.client_id)
                    .collect(),
                Recipient::Player(slot) => {
                    self.connections.find_seat(room_id, slot).into_iter().collect()
                }
            };
            for client_id in targets {
                self.send_message(client_id, message.clone());
            }
        }
    }

    fn send_message(&mut self, client_id: u32, message: ServerMessage) {
        let Some(client) = self.connections.get_mut(client_id) else {
            return;
        };
        let reliability = message.reliability();
        let name = message.name();
        let addr = client.addr;
        let packet = client.send_packet(PacketType::Server(message), reliability);
        if let Err(e) = self.endpoint.send_to(&packet, addr) {
            self.pending_events.push_back(ServerEvent::Error {
                message: format!("Failed to send {} to {}: {}", name, addr, e),
            });
        }
    }

    fn resend_reliable(&mut self) {
        let mut resends = Vec::new();
        for client in self.connections.iter_mut() {
            let addr = client.addr;
            resends.extend(client.collect_resends().into_iter().map(|p| (p, addr)));
        }
        for (packet, addr) in resends {
            if let Err(e) = self.endpoint.send_to(&packet, addr) {
                warn!("resend to {} failed: {}", addr, e);
            }
        }
    }

    fn process_network(&mut self) -> io::Result<()> {
        let packets = self.endpoint.receive()?;

        for (packet, addr) in packets {
            self.handle_packet(packet, addr)?;
        }

        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) -> io::Result<()> {
        match packet.payload {
            PacketType::ConnectionRequest { client_salt } => {
                return self.handle_connection_request(addr, client_salt);
            }
            PacketType::ChallengeResponse { combined_salt } => {
                return self.handle_challenge_response(addr, combined_salt);
            }
            _ => {}
        }

        let Some(client) = self.connections.get_by_addr_mut(&addr) else {
            return Ok(());
        };
        if client.state != ConnectionState::Connected {
            return Ok(());
        }
        let client_id = client.client_id;
        let Some(payload) = client.process_packet(packet) else {
            return Ok(());
        };

        match payload {
            PacketType::Ping { client_time_ms } => {
                let pong = PacketType::Pong {
                    client_time_ms,
                    server_time_ms: self.server_time_ms(),
                };
                if let Some(client) = self.connections.get_mut(client_id) {
                    let packet = client.send_packet(pong, Reliability::Unreliable);
                    self.endpoint.send_to(&packet, addr)?;
                }
            }
            PacketType::Disconnect => {
                self.drop_client(client_id, DisconnectReason::Graceful);
            }
            PacketType::Client(message) => {
                self.handle_client_message(client_id, message);
            }
            _ => {}
        }

        Ok(())
    }

    fn handle_connection_request(&mut self, addr: SocketAddr, client_salt: u64) -> io::Result<()> {
        self.pending_events
            .push_back(ServerEvent::ClientConnecting { addr });

        let challenge = match self.connections.get_or_create_pending(addr, client_salt) {
            Ok(client) => PacketType::ConnectionChallenge {
                server_salt: client.server_salt,
                challenge: client.combined_salt(),
            },
            Err(reason) => {
                let packet = self.endpoint.create_packet(PacketType::ConnectionDenied {
                    reason: reason.to_string(),
                });
                self.endpoint.send_to(&packet, addr)?;
                self.pending_events.push_back(ServerEvent::ConnectionDenied {
                    addr,
                    reason: reason.to_string(),
                });
                return Ok(());
            }
        };

        let packet = self.endpoint.create_packet(challenge);
        self.endpoint.send_to(&packet, addr)?;

        Ok(())
    }

    fn handle_challenge_response(&mut self, addr: SocketAddr, combined_salt: u64) -> io::Result<()> {
        let Some(client) = self.connections.get_by_addr_mut(&addr) else {
            return Ok(());
        };

        // a duplicate response after acceptance is answered again
        if client.state != ConnectionState::Connected {
            if let Err(e) = client.accept_challenge(combined_salt) {
                self.pending_events.push_back(ServerEvent::Error {
                    message: format!("{} from {}", e, addr),
                });
                return Ok(());
            }
            self.pending_events.push_back(ServerEvent::ClientConnected {
                client_id: client.client_id,
                addr,
            });
        }
        client.touch();

        let client_id = client.client_id;
        let packet = client.send_packet(
            PacketType::ConnectionAccepted { client_id },
            Reliability::Reliable,
        );
        self.endpoint.send_to(&packet, addr)?;

        Ok(())
    }

    fn handle_client_message(&mut self, client_id: u32, message: ClientMessage) {
        let Some(client) = self.connections.get(client_id) else {
            return;
        };
        let seat = client.seat;

        let result = match (message, seat) {
            (ClientMessage::JoinRoom { room_id, player_name }, None) => {
                self.join_room(client_id, room_id, player_name);
                Ok(())
            }
            (ClientMessage::JoinRoom { .. }, Some(_)) => {
                debug!("client {} asked to join while seated", client_id);
                Ok(())
            }
            (ClientMessage::Hit { aim, sequence }, Some((room_id, slot))) => self
                .rooms
                .get_mut(room_id)
                .ok_or(RoomError::UnknownRoom(room_id))
                .and_then(|room| room.handle_hit(slot, aim, sequence))
                .map_err(|e| (sequence, e)),
            (ClientMessage::PlaceBall { pos, sequence }, Some((room_id, slot))) => self
                .rooms
                .get_mut(room_id)
                .ok_or(RoomError::UnknownRoom(room_id))
                .and_then(|room| room.handle_place_ball(slot, pos, sequence))
                .map_err(|e| (sequence, e)),
            (ClientMessage::RequestState, Some((room_id, slot))) => {
                if let Some(room) = self.rooms.get_mut(room_id) {
                    room.handle_request_state(slot);
                }
                Ok(())
            }
            (ClientMessage::LeaveRoom, Some((room_id, slot))) => {
                self.rooms.leave(room_id, slot);
                if let Some(client) = self.connections.get_mut(client_id) {
                    client.seat = None;
                }
                Ok(())
            }
            (ClientMessage::Hit { sequence, .. } | ClientMessage::PlaceBall { sequence, .. }, None) => {
                Err((sequence, RoomError::NotInRoom))
            }
            (ClientMessage::RequestState | ClientMessage::LeaveRoom, None) => Ok(()),
        };

        if let Err((sequence, error)) = result {
            let reason = error.to_string();
            debug!("client {} rejected: {}", client_id, reason);
            self.pending_events.push_back(ServerEvent::Rejected {
                client_id,
                reason: reason.clone(),
            });
            self.send_message(client_id, ServerMessage::ShotRejected { sequence, reason });
        }
    }

    fn join_room(
        &mut self,
        client_id: u32,
        room_id: Option<RoomId>,
        player_name: String,
    ) {
        match self.rooms.join(room_id, &player_name) {
            Ok((room_id, slot)) => {
                if let Some(client) = self.connections.get_mut(client_id) {
                    client.seat = Some((room_id, slot));
                    client.player_name = Some(player_name.clone());
                }
                info!("{} joined room {} in seat {}", player_name, room_id, slot);
                self.pending_events.push_back(ServerEvent::PlayerJoined {
                    client_id,
                    room_id,
                    slot,
                    name: player_name,
                });
            }
            Err(error) => {
                let reason = error.to_string();
                self.pending_events.push_back(ServerEvent::Rejected {
                    client_id,
                    reason: reason.clone(),
                });
                self.send_message(client_id, ServerMessage::JoinDenied { reason });
            }
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            client_count: self.connections.connected_count(),
            max_clients: self.config.max_clients,
            room_count: self.rooms.len(),
            simulating_rooms: self.rooms.simulating_count(),
            network_stats: self.endpoint.stats().clone(),
        }
    }

    pub fn client_infos(&self) -> Vec<ClientInfo> {
        self.connections
            .iter()
            .filter(|c| c.state == ConnectionState::Connected)
            .map(|c| ClientInfo {
                client_id: c.client_id,
                addr: c.addr.to_string(),
                name: c.player_name.clone(),
                seat: c.seat,
                idle_ms: c.last_receive_time.elapsed().as_millis() as u64,
                rtt_ms: c.rtt_ms(),
                pending_reliable: c.pending_reliable(),
            })
            .collect()
    }

    pub fn room_infos(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<RoomInfo> = self
            .rooms
            .iter()
            .map(|room| {
                let status = room.status();
                RoomInfo {
                    room_id: room.id(),
                    state: room.state(),
                    players: status.players.iter().map(|p| p.name.clone()).collect(),
                    current_player: status.current_player,
                    shot_count: status.shot_count,
                    simulating: room.is_simulating(),
                    tick: room.tick(),
                }
            })
            .collect();
        rooms.sort_by_key(|r| r.room_id);
        rooms
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub client_count: usize,
    pub max_clients: usize,
    pub room_count: usize,
    pub simulating_rooms: usize,
    pub network_stats: NetworkStats,
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: u32,
    pub addr: String,
    pub name: Option<String>,
    pub seat: Option<(RoomId, u8)>,
    pub idle_ms: u64,
    pub rtt_ms: f32,
    pub pending_reliable: usize,
}

#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomState,
    pub players: Vec<String>,
    pub current_player: u8,
    pub shot_count: u32,
    pub simulating: bool,
    pub tick: u32,
}
