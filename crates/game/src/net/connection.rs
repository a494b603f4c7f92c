use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::channel::{Channel, Reliability};
use super::protocol::{Packet, PacketType};
use super::stats::rand_u64;
use crate::room::{PlayerSlot, RoomId};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("server full")]
    ServerFull,
    #[error("challenge response did not match")]
    BadChallenge,
}

/// Server side view of one client.
#[derive(Debug)]
pub struct ClientConnection {
    pub addr: SocketAddr,
    pub client_id: u32,
    pub state: ConnectionState,
    pub client_salt: u64,
    pub server_salt: u64,
    pub last_receive_time: Instant,
    /// Seat held by this client, once it has joined a room.
    pub seat: Option<(RoomId, PlayerSlot)>,
    pub player_name: Option<String>,
    channel: Channel,
}

impl ClientConnection {
    pub fn new(addr: SocketAddr, client_id: u32, client_salt: u64) -> Self {
        Self {
            addr,
            client_id,
            state: ConnectionState::Connecting,
            client_salt,
            server_salt: rand_u64(),
            last_receive_time: Instant::now(),
            seat: None,
            player_name: None,
            channel: Channel::new(),
        }
    }

    pub fn combined_salt(&self) -> u64 {
        self.client_salt ^ self.server_salt
    }

    pub fn accept_challenge(&mut self, combined_salt: u64) -> Result<(), ConnectionError> {
        if combined_salt != self.combined_salt() {
            return Err(ConnectionError::BadChallenge);
        }
        self.state = ConnectionState::Connected;
        Ok(())
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_receive_time.elapsed() > timeout
    }

    pub fn touch(&mut self) {
        self.last_receive_time = Instant::now();
    }

    pub fn send_packet(&mut self, payload: PacketType, reliability: Reliability) -> Packet {
        self.channel.send(payload, reliability)
    }

    /// Returns the payload of a fresh packet, `None` for duplicates.
    pub fn process_packet(&mut self, packet: Packet) -> Option<PacketType> {
        self.touch();
        self.channel.receive(packet)
    }

    pub fn collect_resends(&mut self) -> Vec<Packet> {
        self.channel.collect_resends()
    }

    pub fn rtt_ms(&self) -> f32 {
        self.channel.rtt_ms()
    }

    pub fn pending_reliable(&self) -> usize {
        self.channel.pending_reliable()
    }
}

#[derive(Debug)]
pub struct ConnectionManager {
    clients_by_addr: HashMap<SocketAddr, u32>,
    clients: HashMap<u32, ClientConnection>,
    next_client_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ConnectionManager {
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients_by_addr: HashMap::new(),
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    pub fn get_or_create_pending(
        &mut self,
        addr: SocketAddr,
        client_salt: u64,
    ) -> Result<&mut ClientConnection, ConnectionError> {
        let client_id = match self.clients_by_addr.get(&addr) {
            Some(&id) => id,
            None => {
                if self.clients.len() >= self.max_clients {
                    return Err(ConnectionError::ServerFull);
                }
                let id = self.next_client_id;
                self.next_client_id += 1;
                self.clients
                    .insert(id, ClientConnection::new(addr, id, client_salt));
                self.clients_by_addr.insert(addr, id);
                id
            }
        };
        self.clients
            .get_mut(&client_id)
            .ok_or(ConnectionError::ServerFull)
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&ClientConnection> {
        self.clients_by_addr
            .get(addr)
            .and_then(|id| self.clients.get(id))
    }

    pub fn get_by_addr_mut(&mut self, addr: &SocketAddr) -> Option<&mut ClientConnection> {
        let id = self.clients_by_addr.get(addr)?;
        self.clients.get_mut(id)
    }

    pub fn get(&self, client_id: u32) -> Option<&ClientConnection> {
        self.clients.get(&client_id)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut ClientConnection> {
        self.clients.get_mut(&client_id)
    }

    /// The connected client occupying a seat, if any.
    pub fn find_seat(&self, room_id: RoomId, slot: PlayerSlot) -> Option<u32> {
        self.clients
            .values()
            .find(|client| client.seat == Some((room_id, slot)))
            .map(|client| client.client_id)
    }

    pub fn remove(&mut self, client_id: u32) -> Option<ClientConnection> {
        let connection = self.clients.remove(&client_id)?;
        self.clients_by_addr.remove(&connection.addr);
        Some(connection)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientConnection> {
        self.clients.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientConnection> {
        self.clients.values_mut()
    }

    /// Drops silent clients, returning them so their seats can be released.
    pub fn cleanup_timed_out(&mut self) -> Vec<ClientConnection> {
        let timed_out: Vec<u32> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(self.timeout))
            .map(|client| client.client_id)
            .collect();
        timed_out
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    pub fn connected_count(&self) -> usize {
        self.clients
            .values()
            .filter(|client| client.state == ConnectionState::Connected)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn pending_connection_is_reused() {
        let mut manager = ConnectionManager::new(4);
        let id = manager.get_or_create_pending(addr(5000), 7).unwrap().client_id;
        let again = manager.get_or_create_pending(addr(5000), 7).unwrap().client_id;
        assert_eq!(id, again);
        assert_eq!(manager.total_count(), 1);
    }

    #[test]
    fn full_server_refuses() {
        let mut manager = ConnectionManager::new(1);
        manager.get_or_create_pending(addr(5000), 1).unwrap();
        assert_eq!(
            manager.get_or_create_pending(addr(5001), 2).err(),
            Some(ConnectionError::ServerFull)
        );
    }

    #[test]
    fn challenge_must_match() {
        let mut manager = ConnectionManager::new(1);
        let client = manager.get_or_create_pending(addr(5000), 99).unwrap();
        assert_eq!(client.accept_challenge(0), Err(ConnectionError::BadChallenge));
        assert_eq!(client.state, ConnectionState::Connecting);
        let salt = client.combined_salt();
        client.accept_challenge(salt).unwrap();
        assert_eq!(manager.connected_count(), 1);
    }

    #[test]
    fn seats_are_found_by_room_and_slot() {
        let mut manager = ConnectionManager::new(4);
        let client = manager.get_or_create_pending(addr(5000), 1).unwrap();
        client.seat = Some((3, 1));
        let id = client.client_id;
        assert_eq!(manager.find_seat(3, 1), Some(id));
        assert_eq!(manager.find_seat(3, 0), None);
    }
}
