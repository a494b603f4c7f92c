use std::time::Duration;

use glam::DVec3;
use log::{debug, error, info};

use super::{
    PlayerSlot, Recipient, RoomError, RoomId, RoomMessage, RoomPlayer, RoomSettings, RoomState,
};
use crate::math::to_array;
use crate::net::{PlayerInfo, RoomStatus, ServerMessage, Welcome};
use crate::physics::{AimState, BallState, Outcome, Table};
use crate::rules::{GameState, Rules, TurnResult, rules_by_name};
use crate::simulation::FixedTimestep;
use crate::snapshot::{DeltaEncoder, TableSnapshot};

const CUE: u32 = 0;

/// One table and the players seated at it. The room owns the only
/// authoritative simulation of its table.
pub struct GameRoom {
    id: RoomId,
    settings: RoomSettings,
    state: RoomState,
    players: Vec<Option<RoomPlayer>>,
    table: Table,
    rules: Box<dyn Rules>,
    game: GameState,
    timestep: FixedTimestep,
    tick: u32,
    simulating: bool,
    shooter: Option<PlayerSlot>,
    shot_outcomes: Vec<Outcome>,
    unsent_outcomes: Vec<Outcome>,
    encoder: DeltaEncoder,
    since_broadcast: Duration,
    ball_in_hand: bool,
    behind_head_string: bool,
    reconnect_remaining: Option<Duration>,
    waiting_for: Duration,
    winner: Option<PlayerSlot>,
    server_time_ms: u64,
    outbox: Vec<RoomMessage>,
}

impl GameRoom {
    pub fn new(id: RoomId, settings: RoomSettings) -> Result<Self, RoomError> {
        let rules = rules_by_name(&settings.rules)
            .ok_or_else(|| RoomError::UnknownRules(settings.rules.clone()))?;
        Ok(Self::with_rules(id, settings, rules))
    }

    pub fn with_rules(id: RoomId, settings: RoomSettings, rules: Box<dyn Rules>) -> Self {
        let geometry = settings.table.geometry(settings.physics.ball_radius);
        let table = Table::new(rules.rack(&geometry), geometry, settings.physics)
            .with_cushion_model(settings.cushion_model);
        let seats = settings.seats.clamp(1, 2) as usize;
        Self {
            id,
            state: RoomState::Waiting,
            players: vec![None; seats],
            table,
            rules,
            game: GameState::default(),
            timestep: FixedTimestep::new(settings.tick_rate),
            tick: 0,
            simulating: false,
            shooter: None,
            shot_outcomes: Vec::new(),
            unsent_outcomes: Vec::new(),
            encoder: DeltaEncoder::new(settings.delta),
            since_broadcast: Duration::ZERO,
            ball_in_hand: true,
            behind_head_string: true,
            reconnect_remaining: None,
            waiting_for: Duration::ZERO,
            winner: None,
            server_time_ms: 0,
            outbox: Vec::new(),
            settings,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    pub fn game_state(&self) -> &GameState {
        &self.game
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        self.winner
    }

    pub fn ball_in_hand(&self) -> bool {
        self.ball_in_hand
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&RoomPlayer> {
        self.players.get(slot as usize).and_then(Option::as_ref)
    }

    pub fn player_count(&self) -> usize {
        self.players.iter().flatten().count()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().flatten().filter(|p| p.connected).count()
    }

    pub fn has_open_seat(&self) -> bool {
        self.state == RoomState::Waiting && self.players.iter().any(Option::is_none)
    }

    /// A disconnected seat held under `name`.
    pub fn can_rejoin(&self, name: &str) -> bool {
        self.state != RoomState::Finished
            && self
                .players
                .iter()
                .flatten()
                .any(|p| !p.connected && p.name == name)
    }

    /// Finished rooms and rooms nobody sits in can be dropped.
    pub fn is_closed(&self) -> bool {
        match self.state {
            RoomState::Finished => self.connected_count() == 0,
            _ => self.player_count() == 0,
        }
    }

    pub fn drain_messages(&mut self) -> Vec<RoomMessage> {
        std::mem::take(&mut self.outbox)
    }

    fn other(&self, slot: PlayerSlot) -> PlayerSlot {
        if self.players.len() == 1 { slot } else { 1 - slot }
    }

    fn push(&mut self, recipient: Recipient, message: ServerMessage) {
        self.outbox.push(RoomMessage { recipient, message });
    }

    pub fn status(&self) -> RoomStatus {
        RoomStatus {
            room_id: self.id,
            state: self.state,
            rules: self.rules.name().to_string(),
            players: self
                .players
                .iter()
                .enumerate()
                .filter_map(|(slot, player)| {
                    player.as_ref().map(|p| PlayerInfo {
                        slot: slot as PlayerSlot,
                        name: p.name.clone(),
                        connected: p.connected,
                    })
                })
                .collect(),
            current_player: self.game.current_player,
            shot_count: self.game.shot_count,
            ball_in_hand: self.ball_in_hand,
            behind_head_string: self.behind_head_string,
            simulating: self.simulating,
            reconnect_remaining_ms: self
                .reconnect_remaining
                .map(|d| d.as_millis().min(u128::from(u32::MAX)) as u32),
        }
    }

    fn broadcast_status(&mut self) {
        let status = self.status();
        self.push(Recipient::All, ServerMessage::RoomStatus(status));
    }

    fn full_snapshot(&self) -> TableSnapshot {
        TableSnapshot::capture(&self.table, self.tick, self.server_time_ms)
    }

    /// Seats a player, or returns a disconnected player to their seat.
    pub fn join(&mut self, name: &str) -> Result<PlayerSlot, RoomError> {
        let rejoining = self
            .players
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| !p.connected && p.name == name));

        let slot = match rejoining {
            Some(index) if self.state != RoomState::Finished => {
                if let Some(player) = self.players[index].as_mut() {
                    player.connected = true;
                }
                info!("room {}: {} rejoined seat {}", self.id, name, index);
                index
            }
            _ => {
                if self.state != RoomState::Waiting {
                    return Err(RoomError::RoomFull);
                }
                let index = self
                    .players
                    .iter()
                    .position(Option::is_none)
                    .ok_or(RoomError::RoomFull)?;
                self.players[index] = Some(RoomPlayer {
                    name: name.to_string(),
                    connected: true,
                });
                info!("room {}: {} took seat {}", self.id, name, index);
                index
            }
        };
        let slot = slot as PlayerSlot;

        if self.state == RoomState::Waiting && self.players.iter().all(Option::is_some) {
            self.state = RoomState::Playing;
            info!("room {}: game started", self.id);
        }
        if self.state == RoomState::Paused && self.connected_count() == self.players.len() {
            self.state = RoomState::Playing;
            self.reconnect_remaining = None;
            info!("room {}: resumed", self.id);
        }

        let welcome = Welcome {
            room_id: self.id,
            player_slot: slot,
            server_time_ms: self.server_time_ms,
            initial_state: self.full_snapshot(),
            status: self.status(),
        };
        self.push(Recipient::Player(slot), ServerMessage::Welcome(welcome));
        self.broadcast_status();
        Ok(slot)
    }

    /// Connection lost. Mid-game the room pauses and holds the seat open.
    pub fn disconnect(&mut self, slot: PlayerSlot) {
        match self.state {
            RoomState::Waiting => {
                if let Some(seat) = self.players.get_mut(slot as usize) {
                    *seat = None;
                }
            }
            RoomState::Playing | RoomState::Paused => {
                if let Some(Some(player)) = self.players.get_mut(slot as usize) {
                    player.connected = false;
                }
                if self.state == RoomState::Playing {
                    self.state = RoomState::Paused;
                    self.reconnect_remaining = Some(self.settings.reconnect_window);
                    info!("room {}: paused waiting for seat {}", self.id, slot);
                }
            }
            RoomState::Finished => {
                if let Some(Some(player)) = self.players.get_mut(slot as usize) {
                    player.connected = false;
                }
            }
        }
        self.broadcast_status();
    }

    /// Deliberate exit. Leaving a game in progress concedes it.
    pub fn leave(&mut self, slot: PlayerSlot) {
        match self.state {
            RoomState::Playing | RoomState::Paused => {
                if let Some(Some(player)) = self.players.get_mut(slot as usize) {
                    player.connected = false;
                }
                let winner = (self.players.len() > 1).then(|| self.other(slot));
                self.finish(winner, format!("player {slot} left the game"));
            }
            _ => self.disconnect(slot),
        }
    }

    fn validate_turn(&self, slot: PlayerSlot) -> Result<(), RoomError> {
        match self.state {
            RoomState::Playing => {}
            RoomState::Paused => return Err(RoomError::Paused),
            RoomState::Waiting | RoomState::Finished => return Err(RoomError::NotPlaying),
        }
        if self.simulating {
            return Err(RoomError::ShotInProgress);
        }
        if slot != self.game.current_player {
            return Err(RoomError::NotYourTurn);
        }
        Ok(())
    }

    pub fn handle_hit(
        &mut self,
        slot: PlayerSlot,
        aim: AimState,
        sequence: u32,
    ) -> Result<(), RoomError> {
        self.validate_turn(slot)?;
        if !aim.is_valid(self.settings.max_power) {
            return Err(RoomError::InvalidShot("aim out of range"));
        }
        if !self.table.cue_ball().is_some_and(|cue| cue.on_table()) {
            return Err(RoomError::InvalidShot("cue ball is not on the table"));
        }

        self.table.hit(&aim)?;
        self.simulating = true;
        self.shooter = Some(slot);
        self.ball_in_hand = false;
        self.behind_head_string = false;
        self.shot_outcomes.clear();
        self.unsent_outcomes.clear();
        let hit = self.table.drain_outcomes();
        self.shot_outcomes.extend_from_slice(&hit);
        self.unsent_outcomes.extend(hit);
        self.timestep.reset();
        self.encoder.reset();
        debug!("room {}: seat {} hit {:?}", self.id, slot, aim);

        self.push(
            Recipient::All,
            ServerMessage::ShotAccepted {
                sequence,
                server_tick: self.tick,
                shooter: slot,
                aim,
            },
        );
        self.broadcast_snapshot();
        Ok(())
    }

    pub fn handle_place_ball(
        &mut self,
        slot: PlayerSlot,
        pos: [f32; 3],
        sequence: u32,
    ) -> Result<(), RoomError> {
        self.validate_turn(slot)?;
        if !self.ball_in_hand {
            return Err(RoomError::NotBallInHand);
        }
        let [x, y, _] = pos;
        if !x.is_finite() || !y.is_finite() {
            return Err(RoomError::InvalidPlacement("position is not a number"));
        }
        let target = DVec3::new(f64::from(x), f64::from(y), 0.0);
        let geometry = self.table.geometry();
        if !geometry.within_cushions(target) {
            return Err(RoomError::InvalidPlacement("off the playing surface"));
        }
        if self.behind_head_string && target.x > geometry.head_spot().x {
            return Err(RoomError::InvalidPlacement("must be behind the head string"));
        }
        if self.table.overlaps_any(target, Some(CUE)) {
            return Err(RoomError::InvalidPlacement("overlaps another ball"));
        }

        self.table.place_ball(CUE, target)?;
        let placed = self
            .table
            .cue_ball()
            .map(|cue| to_array(cue.pos))
            .unwrap_or(pos);
        debug!("room {}: seat {} placed cue ball (seq {})", self.id, slot, sequence);
        self.push(
            Recipient::All,
            ServerMessage::BallPlaced {
                pos: placed,
                player: slot,
            },
        );
        Ok(())
    }

    /// Sends the requester a full snapshot and restarts delta encoding so
    /// every client gets a fresh baseline.
    pub fn handle_request_state(&mut self, slot: PlayerSlot) {
        let mut snapshot = self.full_snapshot();
        snapshot.is_stationary = !self.simulating;
        self.push(Recipient::Player(slot), ServerMessage::Snapshot(snapshot));
        self.encoder.reset();
    }

    pub fn update(&mut self, delta: Duration, server_time_ms: u64) {
        self.server_time_ms = server_time_ms;
        match self.state {
            RoomState::Waiting if self.player_count() > 0 => {
                self.waiting_for += delta;
                if self.waiting_for >= self.settings.waiting_timeout {
                    self.finish(None, String::from("no opponent joined"));
                }
            }
            RoomState::Paused => {
                let remaining = self
                    .reconnect_remaining
                    .unwrap_or_default()
                    .saturating_sub(delta);
                self.reconnect_remaining = Some(remaining);
                if remaining.is_zero() {
                    self.forfeit_absent();
                }
            }
            _ => {}
        }

        if self.simulating {
            self.simulate(delta);
        }
    }

    fn forfeit_absent(&mut self) {
        let absent = self
            .players
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| !p.connected))
            .map(|slot| slot as PlayerSlot);
        let winner = absent
            .filter(|_| self.players.len() > 1)
            .map(|slot| self.other(slot))
            .filter(|&slot| self.player(slot).is_some_and(|p| p.connected));
        self.finish(winner, String::from("opponent failed to reconnect"));
    }

    fn finish(&mut self, winner: Option<PlayerSlot>, reason: String) {
        info!("room {}: game over ({reason})", self.id);
        self.state = RoomState::Finished;
        self.winner = winner;
        self.reconnect_remaining = None;
        self.push(Recipient::All, ServerMessage::GameOver { winner, reason });
        self.broadcast_status();
    }

    fn simulate(&mut self, delta: Duration) {
        self.timestep.accumulate(delta);
        let dt = self.timestep.dt();
        while self.timestep.consume_tick() {
            let advanced = self.table.advance(dt);
            self.tick = self.tick.wrapping_add(1);
            let outcomes = self.table.drain_outcomes();
            self.shot_outcomes.extend_from_slice(&outcomes);
            self.unsent_outcomes.extend(outcomes);

            if let Err(e) = advanced {
                error!("room {}: {e}, ending the shot", self.id);
                self.table.halt_all();
                self.finish_shot(Some(e.to_string()));
                return;
            }
            if self.table.all_stationary() {
                self.finish_shot(None);
                return;
            }
        }

        self.since_broadcast += delta;
        let hz = if self.table.max_speed() > self.settings.fast_speed_threshold {
            self.settings.fast_broadcast_hz
        } else {
            self.settings.slow_broadcast_hz
        };
        if self.since_broadcast.as_secs_f64() * f64::from(hz.max(1)) >= 1.0 {
            self.broadcast_snapshot();
        }
    }

    fn broadcast_snapshot(&mut self) {
        self.since_broadcast = Duration::ZERO;
        let mut snapshot = self.full_snapshot();
        snapshot.outcomes = std::mem::take(&mut self.unsent_outcomes);
        let force_full = self.encoder.baseline().is_none();
        let snapshot = self.encoder.encode(snapshot, force_full);
        self.push(Recipient::All, ServerMessage::Snapshot(snapshot));
    }

    /// Judges the shot and sends its final state. A `defect` skips the
    /// rules: the shooter is charged a foul carrying the physics error.
    fn finish_shot(&mut self, defect: Option<String>) {
        self.simulating = false;
        self.timestep.reset();
        let shooter = self.shooter.take().unwrap_or(self.game.current_player);
        let outcomes = std::mem::take(&mut self.shot_outcomes);
        self.unsent_outcomes.clear();

        let result = match defect {
            Some(message) => TurnResult {
                fouled: true,
                ball_in_hand: true,
                message,
                ..Default::default()
            },
            None => {
                let resting = self.full_snapshot();
                self.rules
                    .process_shot(&mut self.table, &self.game, &resting, &outcomes, shooter)
            }
        };
        debug!("room {}: {}", self.id, result.message);
        let winner = self.apply_turn_result(&result, shooter);

        let mut final_state = self.full_snapshot();
        final_state.outcomes = outcomes;
        final_state.is_stationary = true;
        self.encoder.reset();
        self.push(
            Recipient::All,
            ServerMessage::Stationary {
                final_state,
                turn_result: result,
            },
        );

        match winner {
            Some(winner) => self.finish(Some(winner), format!("player {winner} wins")),
            None => self.broadcast_status(),
        }
    }

    fn apply_turn_result(&mut self, result: &TurnResult, shooter: PlayerSlot) -> Option<PlayerSlot> {
        self.game.shot_count += 1;
        self.game.break_shot = false;
        self.ball_in_hand = result.ball_in_hand;
        self.behind_head_string = result.behind_head_string;
        if result.player_wins {
            return Some(shooter);
        }
        if result.player_loses {
            return Some(self.other(shooter));
        }
        if result.fouled || !result.continues_turn {
            self.game.current_player = self.other(shooter);
        }
        // a cue ball left in a pocket means the next player must place it
        if self
            .table
            .cue_ball()
            .is_some_and(|cue| cue.state == BallState::InPocket)
        {
            self.ball_in_hand = true;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Ball, Rack, TableGeometry};
    use crate::rules::PracticeRules;

    const STEP: Duration = Duration::from_millis(10);

    fn two_player_room() -> GameRoom {
        let mut room = GameRoom::new(1, RoomSettings::default()).unwrap();
        assert_eq!(room.join("ann").unwrap(), 0);
        assert_eq!(room.join("bob").unwrap(), 1);
        room.drain_messages();
        room
    }

    fn run_until_rest(room: &mut GameRoom) -> Vec<RoomMessage> {
        let mut messages = Vec::new();
        let mut now = 0;
        for _ in 0..12_000 {
            now += 10;
            room.update(STEP, now);
            messages.extend(room.drain_messages());
            if !room.is_simulating() {
                break;
            }
        }
        messages
    }

    #[test]
    fn second_player_starts_the_game() {
        let mut room = GameRoom::new(1, RoomSettings::default()).unwrap();
        room.join("ann").unwrap();
        assert_eq!(room.state(), RoomState::Waiting);
        room.join("bob").unwrap();
        assert_eq!(room.state(), RoomState::Playing);
        assert_eq!(room.join("cat"), Err(RoomError::RoomFull));
        let welcomes = room
            .drain_messages()
            .into_iter()
            .filter(|m| matches!(m.message, ServerMessage::Welcome(_)))
            .count();
        assert_eq!(welcomes, 2);
    }

    #[test]
    fn hit_is_rejected_out_of_turn() {
        let mut room = two_player_room();
        let aim = AimState::new(0.0, 3.0);
        assert_eq!(room.handle_hit(1, aim, 1), Err(RoomError::NotYourTurn));
        room.handle_hit(0, aim, 2).unwrap();
        assert_eq!(room.handle_hit(0, aim, 3), Err(RoomError::ShotInProgress));
    }

    #[test]
    fn invalid_aim_is_rejected() {
        let mut room = two_player_room();
        assert!(matches!(
            room.handle_hit(0, AimState::new(0.0, 100.0), 1),
            Err(RoomError::InvalidShot(_))
        ));
        assert!(!room.is_simulating());
    }

    #[test]
    fn shot_runs_to_rest_and_reports() {
        let mut room = two_player_room();
        room.handle_hit(0, AimState::new(0.0, 5.0), 1).unwrap();
        let first = room.drain_messages();
        assert!(matches!(first[0].message, ServerMessage::ShotAccepted { sequence: 1, .. }));
        match &first[1].message {
            ServerMessage::Snapshot(snapshot) => {
                assert!(snapshot.is_full);
                assert!(matches!(snapshot.outcomes[0], Outcome::Hit { .. }));
            }
            other => panic!("expected snapshot, got {}", other.name()),
        }

        let messages = run_until_rest(&mut room);
        assert!(!room.is_simulating());
        assert!(room.table().all_stationary());

        let snapshots: Vec<&TableSnapshot> = messages
            .iter()
            .filter_map(|m| match &m.message {
                ServerMessage::Snapshot(s) => Some(s),
                _ => None,
            })
            .collect();
        assert!(snapshots.len() > 5);
        assert!(snapshots.windows(2).all(|w| w[0].server_tick < w[1].server_tick));

        let stationary = messages
            .iter()
            .find_map(|m| match &m.message {
                ServerMessage::Stationary { final_state, .. } => Some(final_state),
                _ => None,
            })
            .expect("stationary message");
        assert!(stationary.is_full && stationary.is_stationary);
        assert_eq!(room.game_state().shot_count, 1);
    }

    fn stationary_of(messages: &[RoomMessage]) -> (&TableSnapshot, &TurnResult) {
        messages
            .iter()
            .find_map(|m| match &m.message {
                ServerMessage::Stationary {
                    final_state,
                    turn_result,
                } => Some((final_state, turn_result)),
                _ => None,
            })
            .expect("stationary message")
    }

    #[test]
    fn final_state_lists_every_outcome_of_the_shot() {
        let mut room = two_player_room();
        room.handle_hit(0, AimState::new(0.0, 5.0), 1).unwrap();
        let mut messages = room.drain_messages();
        messages.extend(run_until_rest(&mut room));

        let broadcast: Vec<Outcome> = messages
            .iter()
            .filter_map(|m| match &m.message {
                ServerMessage::Snapshot(s) => Some(s.outcomes.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        let (final_state, _) = stationary_of(&messages);
        assert!(matches!(final_state.outcomes[0], Outcome::Hit { .. }));
        assert!(final_state.outcomes.len() >= broadcast.len());
        assert_eq!(final_state.outcomes[..broadcast.len()], broadcast[..]);
    }

    fn overlapping_pair(geometry: &TableGeometry) -> Vec<Ball> {
        let head = geometry.head_spot();
        vec![
            Ball::new(0, head),
            Ball::new(1, head + DVec3::new(geometry.ball_radius, 0.0, 0.0)).with_number(1),
        ]
    }

    #[test]
    fn runaway_collisions_end_the_shot_as_a_foul() {
        let mut room = GameRoom::with_rules(
            3,
            RoomSettings::default(),
            Box::new(PracticeRules::with_rack(overlapping_pair)),
        );
        room.join("ann").unwrap();
        room.join("bob").unwrap();
        room.drain_messages();

        room.handle_hit(0, AimState::new(0.0, 2.0), 1).unwrap();
        let messages = run_until_rest(&mut room);
        assert!(!room.is_simulating());
        assert!(room.table().all_stationary());

        let (final_state, result) = stationary_of(&messages);
        assert!(final_state.is_stationary);
        assert!(result.fouled);
        assert!(result.message.contains("did not settle"));
        assert!(
            !messages
                .iter()
                .any(|m| matches!(m.message, ServerMessage::GameOver { .. }))
        );
        assert_eq!(room.state(), RoomState::Playing);
        assert_eq!(room.game_state().current_player, 1);
        assert!(room.ball_in_hand());
    }

    #[test]
    fn paused_room_rejects_hits_and_forfeits() {
        let mut room = two_player_room();
        room.disconnect(1);
        assert_eq!(room.state(), RoomState::Paused);
        assert_eq!(room.handle_hit(0, AimState::new(0.0, 2.0), 1), Err(RoomError::Paused));

        room.update(Duration::from_secs(30), 30_000);
        assert_eq!(room.state(), RoomState::Paused);
        room.update(Duration::from_secs(31), 61_000);
        assert_eq!(room.state(), RoomState::Finished);
        assert_eq!(room.winner(), Some(0));
    }

    #[test]
    fn rejoin_by_name_resumes() {
        let mut room = two_player_room();
        room.disconnect(0);
        assert!(room.can_rejoin("ann"));
        assert_eq!(room.join("ann").unwrap(), 0);
        assert_eq!(room.state(), RoomState::Playing);
        assert_eq!(room.status().reconnect_remaining_ms, None);
    }

    #[test]
    fn placement_rules() {
        let mut room = two_player_room();
        let geometry = room.table().geometry().clone();
        let behind = geometry.head_spot() + DVec3::new(-0.1, 0.05, 0.0);
        let in_front = geometry.head_spot() + DVec3::new(0.2, 0.0, 0.0);
        let foot = geometry.foot_spot();

        assert!(matches!(
            room.handle_place_ball(0, to_array(in_front), 1),
            Err(RoomError::InvalidPlacement(_))
        ));
        assert!(matches!(
            room.handle_place_ball(0, [10.0, 0.0, 0.0], 2),
            Err(RoomError::InvalidPlacement(_))
        ));
        room.handle_place_ball(0, to_array(behind), 3).unwrap();
        assert_eq!(room.handle_place_ball(1, to_array(behind), 4), Err(RoomError::NotYourTurn));

        room.behind_head_string = false;
        assert!(matches!(
            room.handle_place_ball(0, to_array(foot), 5),
            Err(RoomError::InvalidPlacement(_))
        ));
    }

    #[test]
    fn solo_room_keeps_the_turn() {
        let settings = RoomSettings {
            seats: 1,
            ..Default::default()
        };
        let mut room = GameRoom::with_rules(
            5,
            settings,
            Box::new(PracticeRules::with_rack(Rack::practice_pair)),
        );
        room.join("solo").unwrap();
        assert_eq!(room.state(), RoomState::Playing);
        room.handle_hit(0, AimState::new(std::f32::consts::FRAC_PI_2, 1.0), 1)
            .unwrap();
        run_until_rest(&mut room);
        assert_eq!(room.game_state().current_player, 0);
        assert!(room.ball_in_hand());
    }

    #[test]
    fn waiting_room_times_out() {
        let mut room = GameRoom::new(2, RoomSettings::default()).unwrap();
        room.join("ann").unwrap();
        room.update(Duration::from_secs(301), 301_000);
        assert_eq!(room.state(), RoomState::Finished);
        assert_eq!(room.winner(), None);
    }
}
