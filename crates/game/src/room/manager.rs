use std::collections::HashMap;
use std::time::Duration;

use log::info;

use super::{GameRoom, PlayerSlot, RoomError, RoomId, RoomMessage, RoomSettings};

/// All live rooms on a server. Rooms are created on first join and dropped
/// once nobody is left in them.
pub struct RoomManager {
    rooms: HashMap<RoomId, GameRoom>,
    next_id: RoomId,
    settings: RoomSettings,
    max_rooms: usize,
}

impl RoomManager {
    pub fn new(settings: RoomSettings, max_rooms: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            next_id: 1,
            settings,
            max_rooms,
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, id: RoomId) -> Option<&GameRoom> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut GameRoom> {
        self.rooms.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameRoom> {
        self.rooms.values()
    }

    fn create(&mut self, id: RoomId) -> Result<&mut GameRoom, RoomError> {
        if self.rooms.len() >= self.max_rooms {
            return Err(RoomError::TooManyRooms);
        }
        let room = GameRoom::new(id, self.settings.clone())?;
        self.next_id = self.next_id.max(id + 1);
        info!("created room {id}");
        Ok(self.rooms.entry(id).or_insert(room))
    }

    /// Seats `name` in the requested room, creating it if needed. Without a
    /// room id a held seat under the same name wins, then any open seat,
    /// then a fresh room.
    pub fn join(
        &mut self,
        requested: Option<RoomId>,
        name: &str,
    ) -> Result<(RoomId, PlayerSlot), RoomError> {
        let id = match requested {
            Some(id) => id,
            None => {
                let held = self.rooms.values().find(|room| room.can_rejoin(name));
                let open = || self.rooms.values().find(|room| room.has_open_seat());
                match held.or_else(open) {
                    Some(room) => room.id(),
                    None => self.next_id,
                }
            }
        };
        let room = match self.rooms.contains_key(&id) {
            true => self.rooms.get_mut(&id).ok_or(RoomError::UnknownRoom(id))?,
            false => self.create(id)?,
        };
        let slot = room.join(name)?;
        Ok((id, slot))
    }

    pub fn disconnect(&mut self, id: RoomId, slot: PlayerSlot) {
        if let Some(room) = self.rooms.get_mut(&id) {
            room.disconnect(slot);
        }
    }

    pub fn leave(&mut self, id: RoomId, slot: PlayerSlot) {
        if let Some(room) = self.rooms.get_mut(&id) {
            room.leave(slot);
        }
    }

    pub fn update(&mut self, delta: Duration, server_time_ms: u64) {
        for room in self.rooms.values_mut() {
            room.update(delta, server_time_ms);
        }
    }

    pub fn drain_messages(&mut self) -> Vec<(RoomId, RoomMessage)> {
        let mut messages = Vec::new();
        for room in self.rooms.values_mut() {
            let id = room.id();
            messages.extend(room.drain_messages().into_iter().map(|m| (id, m)));
        }
        messages
    }

    /// Removes closed rooms, returning their ids.
    pub fn cleanup(&mut self) -> Vec<RoomId> {
        let closed: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.is_closed())
            .map(GameRoom::id)
            .collect();
        for id in &closed {
            self.rooms.remove(id);
            info!("closed room {id}");
        }
        closed
    }

    pub fn simulating_count(&self) -> usize {
        self.rooms.values().filter(|room| room.is_simulating()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomState;

    #[test]
    fn players_pair_up() {
        let mut manager = RoomManager::new(RoomSettings::default(), 8);
        let (first, slot_a) = manager.join(None, "ann").unwrap();
        let (second, slot_b) = manager.join(None, "bob").unwrap();
        assert_eq!(first, second);
        assert_eq!((slot_a, slot_b), (0, 1));
        let (third, _) = manager.join(None, "cat").unwrap();
        assert_ne!(third, first);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn named_room_is_created_on_demand() {
        let mut manager = RoomManager::new(RoomSettings::default(), 8);
        let (id, _) = manager.join(Some(42), "ann").unwrap();
        assert_eq!(id, 42);
        let (next, _) = manager.join(Some(7), "bob").unwrap();
        assert_eq!(next, 7);
        let (fresh, _) = manager.join(None, "cat").unwrap();
        assert!(fresh == 42 || fresh == 7);
    }

    #[test]
    fn disconnected_player_returns_to_their_seat() {
        let mut manager = RoomManager::new(RoomSettings::default(), 8);
        let (id, _) = manager.join(None, "ann").unwrap();
        manager.join(None, "bob").unwrap();
        manager.disconnect(id, 1);
        assert_eq!(manager.get(id).map(GameRoom::state), Some(RoomState::Paused));
        assert_eq!(manager.join(None, "bob").unwrap(), (id, 1));
        assert_eq!(manager.get(id).map(GameRoom::state), Some(RoomState::Playing));
    }

    #[test]
    fn room_limit_is_enforced() {
        let mut manager = RoomManager::new(RoomSettings::default(), 1);
        manager.join(Some(1), "ann").unwrap();
        assert_eq!(manager.join(Some(2), "bob"), Err(RoomError::TooManyRooms));
    }

    #[test]
    fn empty_rooms_are_cleaned_up() {
        let mut manager = RoomManager::new(RoomSettings::default(), 8);
        let (id, slot) = manager.join(None, "ann").unwrap();
        manager.disconnect(id, slot);
        assert_eq!(manager.cleanup(), vec![id]);
        assert!(manager.is_empty());
    }
}
