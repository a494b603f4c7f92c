use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use log::{debug, info, warn};

use baize::{
    Channel, ClientMessage, ConnectionState, NetworkEndpoint, NetworkStats, Packet,
    PacketLossSimulation, PacketType, Reliability, ServerMessage, rand_u64,
};

use super::clock::ClockSync;
use super::config::ClientConfig;

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    Connected { client_id: u32 },
    Denied { reason: String },
    Message(ServerMessage),
    Disconnected { reason: String },
}

/// Client end of the connection: handshake, keepalive pings, clock sync and
/// the reliable channel to the server.
pub struct NetworkClient {
    endpoint: NetworkEndpoint,
    channel: Channel,
    config: ClientConfig,
    state: ConnectionState,
    client_id: Option<u32>,
    client_salt: u64,
    server_salt: Option<u64>,
    connect_started: Option<Instant>,
    last_handshake_send: Instant,
    last_ping: Instant,
    last_receive: Instant,
    clock: ClockSync,
    epoch: Instant,
    events: VecDeque<NetworkEvent>,
}

impl NetworkClient {
    pub fn new(config: ClientConfig) -> io::Result<Self> {
        let endpoint = NetworkEndpoint::bind("0.0.0.0:0")?;
        let now = Instant::now();

        Ok(Self {
            endpoint,
            channel: Channel::new(),
            config,
            state: ConnectionState::Disconnected,
            client_id: None,
            client_salt: rand_u64(),
            server_salt: None,
            connect_started: None,
            last_handshake_send: now,
            last_ping: now,
            last_receive: now,
            clock: ClockSync::new(),
            epoch: now,
            events: VecDeque::new(),
        })
    }

    pub fn set_packet_loss(&mut self, loss: PacketLossSimulation) {
        self.endpoint.set_packet_loss(loss);
    }

    /// Milliseconds on the local clock all client timing is expressed in.
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    pub fn connect(&mut self, server_addr: SocketAddr) -> io::Result<()> {
        info!("Connecting to {}", server_addr);

        self.reset();
        self.endpoint.set_remote(server_addr);
        self.state = ConnectionState::Connecting;
        self.connect_started = Some(Instant::now());
        self.send_handshake()
    }

    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Connected {
            let packet = self.channel.send(PacketType::Disconnect, Reliability::Unreliable);
            if let Err(e) = self.endpoint.send(&packet) {
                debug!("disconnect not sent: {}", e);
            }
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.channel = Channel::new();
        self.client_id = None;
        self.client_salt = rand_u64();
        self.server_salt = None;
        self.connect_started = None;
        self.clock.reset();
    }

    fn send_handshake(&mut self) -> io::Result<()> {
        let payload = match self.server_salt {
            Some(server_salt) => PacketType::ChallengeResponse {
                combined_salt: self.client_salt ^ server_salt,
            },
            None => PacketType::ConnectionRequest {
                client_salt: self.client_salt,
            },
        };
        let packet = self.endpoint.create_packet(payload);
        self.endpoint.send(&packet)?;
        self.last_handshake_send = Instant::now();
        Ok(())
    }

    pub fn send(&mut self, message: ClientMessage) -> io::Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not connected"));
        }
        let reliability = message.reliability();
        let packet = self.channel.send(PacketType::Client(message), reliability);
        self.endpoint.send(&packet)?;
        Ok(())
    }

    pub fn update(&mut self) -> io::Result<()> {
        self.process_network()?;

        match self.state {
            ConnectionState::Connecting => {
                let timed_out = self
                    .connect_started
                    .is_some_and(|start| start.elapsed() > self.config.connection_timeout);
                if timed_out {
                    warn!("Connection timeout");
                    self.reset();
                    self.events.push_back(NetworkEvent::Disconnected {
                        reason: String::from("connection timed out"),
                    });
                } else if self.last_handshake_send.elapsed() >= self.config.handshake_retry {
                    self.send_handshake()?;
                }
            }
            ConnectionState::Connected => {
                for packet in self.channel.collect_resends() {
                    if let Err(e) = self.endpoint.send(&packet) {
                        debug!("resend failed: {}", e);
                    }
                }

                if self.last_ping.elapsed() >= self.config.ping_interval {
                    self.send_ping()?;
                }

                if self.last_receive.elapsed() > self.config.connection_timeout {
                    warn!("Server connection lost");
                    self.reset();
                    self.events.push_back(NetworkEvent::Disconnected {
                        reason: String::from("server stopped responding"),
                    });
                }
            }
            ConnectionState::Disconnected => {}
        }

        Ok(())
    }

    fn send_ping(&mut self) -> io::Result<()> {
        let client_time_ms = self.now_ms() as u64;
        let packet = self
            .channel
            .send(PacketType::Ping { client_time_ms }, Reliability::Unreliable);
        self.endpoint.send(&packet)?;
        self.last_ping = Instant::now();
        Ok(())
    }

    fn process_network(&mut self) -> io::Result<()> {
        let packets = self.endpoint.receive()?;

        for (packet, addr) in packets {
            if Some(addr) != self.endpoint.remote_addr() {
                debug!("ignoring packet from {}", addr);
                continue;
            }
            self.last_receive = Instant::now();

            match packet.payload {
                PacketType::ConnectionChallenge {
                    server_salt,
                    challenge,
                } => self.handle_challenge(server_salt, challenge)?,
                PacketType::ConnectionDenied { reason } => {
                    warn!("Connection denied: {}", reason);
                    self.reset();
                    self.events.push_back(NetworkEvent::Denied { reason });
                }
                PacketType::Disconnect => {
                    info!("Disconnected by server");
                    self.reset();
                    self.events.push_back(NetworkEvent::Disconnected {
                        reason: String::from("disconnected by server"),
                    });
                }
                payload => {
                    let packet = Packet::new(packet.header, payload);
                    if let Some(payload) = self.channel.receive(packet) {
                        self.handle_payload(payload);
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_challenge(&mut self, server_salt: u64, challenge: u64) -> io::Result<()> {
        if self.state != ConnectionState::Connecting {
            return Ok(());
        }
        if challenge != self.client_salt ^ server_salt {
            warn!("Challenge mismatch");
            return Ok(());
        }
        debug!("Received challenge from server");
        self.server_salt = Some(server_salt);
        self.send_handshake()
    }

    fn handle_payload(&mut self, payload: PacketType) {
        match payload {
            PacketType::ConnectionAccepted { client_id } => {
                if self.state != ConnectionState::Connected {
                    info!("Connected to server with client ID {}", client_id);
                    self.state = ConnectionState::Connected;
                    self.client_id = Some(client_id);
                    self.connect_started = None;
                    self.events.push_back(NetworkEvent::Connected { client_id });
                }
            }
            PacketType::Pong {
                client_time_ms,
                server_time_ms,
            } => {
                let now = self.now_ms();
                self.clock
                    .record(client_time_ms as f64, server_time_ms as f64, now);
                debug!(
                    "rtt {:.1}ms jitter {:.1}ms",
                    self.clock.rtt_ms(),
                    self.clock.jitter_ms()
                );
            }
            PacketType::Server(message) => {
                if let ServerMessage::Welcome(welcome) = &message {
                    let now = self.now_ms();
                    self.clock.seed(welcome.server_time_ms as f64, now);
                }
                self.events.push_back(NetworkEvent::Message(message));
            }
            _ => {}
        }
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = NetworkEvent> + '_ {
        self.events.drain(..)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    pub fn pending_reliable(&self) -> usize {
        self.channel.pending_reliable()
    }
}
