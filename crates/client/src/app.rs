use std::io;
use std::net::SocketAddr;

use log::{debug, info, warn};

use baize::math::{from_array, to_array};
use baize::{
    AimState, Ball, ClientMessage, PhysicsParams, PlayerSlot, RoomState, RoomStatus, ServerMessage,
    SnapshotError, Table, TableSnapshot, Welcome,
};

use crate::debug::DebugStats;
use crate::game::{
    Bot, ControllerEvent, ControllerMode, Playback, SoundCue, SoundDetector, server_cues,
};
use crate::net::{ClientConfig, NetworkClient, NetworkEvent, SnapshotBuffer};

const STATUS_INTERVAL_MS: f64 = 5000.0;

/// One headless client session: mirrors the room's table from server
/// messages and plays it back frame by frame.
pub struct App {
    network: NetworkClient,
    server_addr: SocketAddr,
    table: Option<Table>,
    slot: Option<PlayerSlot>,
    room: Option<RoomStatus>,
    buffer: SnapshotBuffer,
    playback: Playback,
    sounds: SoundDetector,
    mode: ControllerMode,
    bot: Option<Bot>,
    pending_shot: Option<u32>,
    next_sequence: u32,
    stats: DebugStats,
    last_frame_ms: f64,
    last_status_ms: f64,
    finished: bool,
}

impl App {
    pub fn new(config: ClientConfig, server_addr: SocketAddr, bot: Option<Bot>) -> io::Result<Self> {
        let buffer = SnapshotBuffer::new(config.interpolation.clone());
        let network = NetworkClient::new(config)?;
        let now = network.now_ms();
        Ok(Self {
            network,
            server_addr,
            table: None,
            slot: None,
            room: None,
            buffer,
            playback: Playback::new(),
            sounds: SoundDetector::new(),
            mode: ControllerMode::Connecting,
            bot,
            pending_shot: None,
            next_sequence: 1,
            stats: DebugStats::new(),
            last_frame_ms: now,
            last_status_ms: now,
            finished: false,
        })
    }

    pub fn network_mut(&mut self) -> &mut NetworkClient {
        &mut self.network
    }

    pub fn start(&mut self) -> io::Result<()> {
        self.network.connect(self.server_addr)
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn shutdown(&mut self) {
        if self.network.is_connected() {
            if let Err(err) = self.network.send(ClientMessage::LeaveRoom) {
                debug!("could not send leave: {}", err);
            }
        }
        self.network.disconnect();
    }

    pub fn frame(&mut self) -> io::Result<()> {
        let now = self.network.now_ms();
        let dt = now - self.last_frame_ms;
        self.last_frame_ms = now;

        self.network.update()?;
        let events: Vec<_> = self.network.drain_events().collect();
        for event in events {
            self.handle_event(event, now)?;
        }

        self.buffer.update(now, dt);
        if let Some(table) = self.table.as_mut() {
            let settled = self.playback.update(table, &mut self.buffer, dt);

            let mut cues = self.sounds.detect(table, now);
            cues.extend(server_cues(&self.buffer.take_outcomes()));
            for cue in cues {
                play(cue);
            }

            if settled {
                let (my_turn, ball_in_hand) = self.turn();
                self.apply(ControllerEvent::Stationary {
                    my_turn,
                    ball_in_hand,
                });
            }
        }

        self.drive_bot(now)?;

        self.stats.record_frame(dt);
        if now - self.last_status_ms >= STATUS_INTERVAL_MS {
            self.last_status_ms = now;
            self.log_status();
        }
        Ok(())
    }

    fn handle_event(&mut self, event: NetworkEvent, now: f64) -> io::Result<()> {
        match event {
            NetworkEvent::Connected { client_id } => {
                info!("Connected as client {}, joining room", client_id);
                let config = self.network.config();
                let join = ClientMessage::JoinRoom {
                    room_id: config.room_id,
                    player_name: config.player_name.clone(),
                };
                self.network.send(join)?;
            }
            NetworkEvent::Denied { reason } => {
                warn!("Server refused connection: {}", reason);
                self.teardown();
                self.finished = true;
            }
            NetworkEvent::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.teardown();
                self.finished = true;
            }
            NetworkEvent::Message(message) => self.handle_message(message, now)?,
        }
        Ok(())
    }

    fn handle_message(&mut self, message: ServerMessage, now: f64) -> io::Result<()> {
        debug!("<- {}", message.name());
        match message {
            ServerMessage::Welcome(welcome) => self.handle_welcome(welcome),
            ServerMessage::Snapshot(snapshot) => self.handle_snapshot(snapshot, now)?,
            ServerMessage::ShotAccepted {
                sequence,
                server_tick,
                shooter,
                ..
            } => {
                if self.playback.is_stale_shot(server_tick) {
                    debug!("ignoring resent acceptance of a settled shot (tick {})", server_tick);
                    return Ok(());
                }
                let mine = Some(shooter) == self.slot;
                if mine && self.pending_shot != Some(sequence) {
                    debug!("accepted shot {} was not the one in flight", sequence);
                }
                self.pending_shot = None;
                self.buffer.reset();
                self.sounds.reset();
                if !mine || self.playback.is_idle() {
                    self.playback.watch();
                }
                self.apply(ControllerEvent::ShotAccepted { mine });
            }
            ServerMessage::ShotRejected { sequence, reason } => {
                warn!("Request {} rejected: {}", sequence, reason);
                if self.pending_shot == Some(sequence) {
                    self.pending_shot = None;
                    if let Some(table) = self.table.as_mut() {
                        self.playback.cancel(table);
                    }
                    self.apply(ControllerEvent::ShotRejected);
                }
            }
            ServerMessage::BallPlaced { pos, player } => {
                if let Some(table) = self.table.as_mut() {
                    self.playback.place_cue(table, from_array(pos));
                }
                if Some(player) == self.slot {
                    self.apply(ControllerEvent::BallPlaced);
                }
            }
            ServerMessage::Stationary {
                final_state,
                turn_result,
            } => {
                info!("Shot finished: {}", turn_result.message);
                if let Err(err) = self.buffer.push(final_state.clone(), self.network.clock(), now) {
                    debug!("final state not buffered: {}", err);
                }
                self.stats.record_snapshot(now);
                self.playback.finish(final_state);
            }
            ServerMessage::RoomStatus(status) => {
                self.room = Some(status);
                if !self.mode.is_shot_running() {
                    let (my_turn, ball_in_hand) = self.turn();
                    self.apply(ControllerEvent::Turn {
                        playing: self.is_playing(),
                        my_turn,
                        ball_in_hand,
                    });
                }
            }
            ServerMessage::GameOver { winner, reason } => {
                match winner {
                    Some(slot) if Some(slot) == self.slot => info!("You win: {}", reason),
                    Some(_) => info!("You lose: {}", reason),
                    None => info!("Game over: {}", reason),
                }
                self.apply(ControllerEvent::GameOver);
                self.finished = true;
            }
            ServerMessage::JoinDenied { reason } => {
                warn!("Could not join a room: {}", reason);
                self.finished = true;
            }
        }
        Ok(())
    }

    fn handle_welcome(&mut self, welcome: Welcome) {
        info!(
            "Seated in room {} slot {} ({} rules)",
            welcome.room_id, welcome.player_slot, welcome.status.rules
        );
        let mut table = mirror_table(&welcome.initial_state, self.network.config());
        self.playback.load(&mut table, &welcome.initial_state);
        self.table = Some(table);
        self.slot = Some(welcome.player_slot);
        self.buffer.reset();
        self.sounds.reset();
        self.pending_shot = None;

        self.room = Some(welcome.status);
        let (my_turn, ball_in_hand) = self.turn();
        self.apply(ControllerEvent::Turn {
            playing: self.is_playing(),
            my_turn,
            ball_in_hand,
        });
        if self.room.as_ref().is_some_and(|room| room.simulating) {
            self.playback.watch();
            self.apply(ControllerEvent::ShotAccepted { mine: false });
        }
    }

    fn handle_snapshot(&mut self, snapshot: TableSnapshot, now: f64) -> io::Result<()> {
        let Some(table) = self.table.as_mut() else {
            return Ok(());
        };
        self.stats.record_snapshot(now);

        if self.playback.is_idle() && snapshot.is_full && snapshot.is_stationary {
            self.playback.load(table, &snapshot);
            return Ok(());
        }
        if let Err(SnapshotError::MissingBaseline { baseline_tick }) =
            self.buffer.push(snapshot, self.network.clock(), now)
        {
            debug!("no baseline for tick {}, requesting full state", baseline_tick);
            self.network.send(ClientMessage::RequestState)?;
        }
        Ok(())
    }

    fn drive_bot(&mut self, now: f64) -> io::Result<()> {
        let (Some(bot), Some(table)) = (self.bot.as_mut(), self.table.as_ref()) else {
            return Ok(());
        };
        let acting = matches!(self.mode, ControllerMode::Aim | ControllerMode::PlaceBall)
            && self.pending_shot.is_none();
        if !acting {
            bot.idle();
            return Ok(());
        }
        if !bot.poll(now) {
            return Ok(());
        }

        if self.mode == ControllerMode::PlaceBall {
            let pos = bot.choose_placement(table);
            let sequence = self.take_sequence();
            self.network.send(ClientMessage::PlaceBall {
                pos: to_array(pos),
                sequence,
            })?;
        } else if let Some(aim) = bot.choose_shot(table) {
            self.submit_shot(aim)?;
        }
        Ok(())
    }

    pub fn submit_shot(&mut self, aim: AimState) -> io::Result<()> {
        if self.table.is_none() || self.mode != ControllerMode::Aim {
            return Ok(());
        }
        let sequence = self.take_sequence();
        self.network.send(ClientMessage::Hit { aim, sequence })?;
        info!("Shooting: angle {:.3} power {:.2}", aim.angle, aim.power);
        self.pending_shot = Some(sequence);
        if let Some(table) = self.table.as_ref() {
            self.playback.start_visual(table, &aim);
        }
        self.apply(ControllerEvent::ShotSubmitted);
        Ok(())
    }

    fn take_sequence(&mut self) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        sequence
    }

    fn apply(&mut self, event: ControllerEvent) {
        let next = self.mode.transition(event);
        if next != self.mode {
            debug!("{:?} -> {:?} on {:?}", self.mode, next, event);
            self.mode = next;
        }
    }

    fn turn(&self) -> (bool, bool) {
        match &self.room {
            Some(room) => (
                Some(room.current_player) == self.slot,
                room.ball_in_hand,
            ),
            None => (false, false),
        }
    }

    fn is_playing(&self) -> bool {
        self.room
            .as_ref()
            .is_some_and(|room| room.state == RoomState::Playing)
    }

    fn teardown(&mut self) {
        self.table = None;
        self.slot = None;
        self.room = None;
        self.pending_shot = None;
        self.buffer.reset();
        self.sounds.reset();
        self.playback = Playback::new();
        self.apply(ControllerEvent::Disconnected);
    }

    fn log_status(&self) {
        let interpolation = self.buffer.stats();
        let network = self.network.stats();
        info!(
            "{:?} | rtt {:.0}ms jitter {:.1}ms | buffer {} health {:.2} dropped {} | {:.0} fps {:.1} snapshots/s | sent {} recv {} dropped {}",
            self.mode,
            self.network.clock().rtt_ms(),
            self.network.clock().jitter_ms(),
            interpolation.buffered,
            interpolation.health,
            interpolation.dropped,
            self.stats.fps(),
            self.stats.snapshot_rate(),
            network.packets_sent,
            network.packets_received,
            network.packets_dropped,
        );
    }
}

/// Builds the local table the server's balls are mirrored into.
fn mirror_table(state: &TableSnapshot, config: &ClientConfig) -> Table {
    let params = PhysicsParams::default();
    let geometry = config.table.geometry(params.ball_radius);
    let balls = state
        .balls
        .iter()
        .map(|snapshot| {
            let ball = Ball::new(u32::from(snapshot.id), snapshot.position());
            match snapshot.number {
                Some(number) => ball.with_number(number),
                None => ball,
            }
        })
        .collect();
    Table::new(balls, geometry, params)
}

fn play(cue: SoundCue) {
    match cue {
        SoundCue::Strike { speed } => debug!("sound: cue strike {:.2}", speed),
        SoundCue::Collision { a, b, speed } => debug!("sound: balls {} and {} {:.2}", a, b, speed),
        SoundCue::Cushion { ball, speed } => debug!("sound: ball {} cushion {:.2}", ball, speed),
        SoundCue::Pot { ball, speed } => info!("Ball {} potted ({:.2} m/s)", ball, speed),
    }
}
