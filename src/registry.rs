use crate::game::constants::{ROOM_ID_ALPHABET, ROOM_ID_LENGTH};
use crate::game::room::{now_millis, Room};
use crate::protocol::RoomListing;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Owned store of live rooms. Holding the registry in app state (rather
/// than a global) keeps independent registries possible in tests.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    fn generate_room_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id: String = (0..ROOM_ID_LENGTH)
                .map(|_| ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())] as char)
                .collect();
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn create_room(&self, public: bool) -> Arc<Room> {
        let id = self.generate_room_id();
        let room = Arc::new(Room::new(id.clone(), public));
        self.rooms.insert(id.clone(), room.clone());
        tracing::info!(room_id = %id, public, "room created");
        room
    }

    /// Room ids are case-insensitive on the way in.
    pub fn find(&self, room_id: &str) -> Option<Arc<Room>> {
        let id = room_id.trim().to_uppercase();
        self.rooms.get(&id).map(|entry| entry.clone())
    }

    pub fn remove_room(&self, room_id: &str) {
        if self.rooms.remove(room_id).is_some() {
            tracing::info!(room_id, "room torn down");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn snapshot_rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    /// One pass advancing every room by a fixed step. Rooms never observe
    /// each other's state.
    pub async fn tick_all(&self, now: i64, dt: f64) {
        for room in self.snapshot_rooms() {
            room.tick(now, dt).await;
        }
    }

    /// One pass publishing state outward. Rooms emptied by stale-session
    /// eviction are torn down here.
    pub async fn broadcast_all(&self, now: i64) {
        for room in self.snapshot_rooms() {
            if room.broadcast(now).await {
                self.remove_room(room.id());
            }
        }
    }

    pub async fn list_public(&self) -> Vec<RoomListing> {
        let mut listings = Vec::new();
        for room in self.snapshot_rooms() {
            if room.is_public() {
                listings.push(room.listing().await);
            }
        }
        listings
    }
}

/// The two periodic schedules driving all rooms: simulation ticks and
/// outward broadcasts. Rate changes cancel and reschedule the affected task.
pub struct SimulationLoops {
    registry: Arc<RoomRegistry>,
    tick_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    broadcast_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SimulationLoops {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self {
            registry,
            tick_task: std::sync::Mutex::new(None),
            broadcast_task: std::sync::Mutex::new(None),
        }
    }

    pub fn start(&self, tick_hz: u32, broadcast_hz: u32) {
        self.set_tick_rate(tick_hz);
        self.set_broadcast_rate(broadcast_hz);
    }

    pub fn set_tick_rate(&self, hz: u32) {
        let hz = hz.clamp(1, 240);
        let registry = Arc::clone(&self.registry);
        let task = tokio::spawn(async move {
            let dt = 1.0 / hz as f64;
            let period = std::time::Duration::from_millis((1000 / hz as u64).max(1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                registry.tick_all(now_millis(), dt).await;
            }
        });
        let mut slot = self.tick_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        tracing::info!(hz, "tick loop scheduled");
    }

    pub fn set_broadcast_rate(&self, hz: u32) {
        let hz = hz.clamp(1, 240);
        let registry = Arc::clone(&self.registry);
        let task = tokio::spawn(async move {
            let period = std::time::Duration::from_millis((1000 / hz as u64).max(1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                registry.broadcast_all(now_millis()).await;
            }
        });
        let mut slot = self.broadcast_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        tracing::info!(hz, "broadcast loop scheduled");
    }

    /// Idempotent; safe to call repeatedly.
    pub fn stop(&self) {
        for slot in [&self.tick_task, &self.broadcast_task] {
            let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

impl Drop for SimulationLoops {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::room::PlayerProfile;
    use tokio::sync::mpsc;

    fn profile(id: &str) -> PlayerProfile {
        PlayerProfile {
            id: id.to_string(),
            name: format!("Player-{id}"),
            color: "hsl(120, 70%, 50%)".to_string(),
            glyph: "\u{1f642}".to_string(),
        }
    }

    #[test]
    fn room_ids_use_the_unambiguous_alphabet() {
        let registry = RoomRegistry::new();
        for _ in 0..50 {
            let room = registry.create_room(false);
            let id = room.id();
            assert_eq!(id.len(), ROOM_ID_LENGTH);
            assert!(id.bytes().all(|b| ROOM_ID_ALPHABET.contains(&b)));
            for forbidden in [b'0', b'O', b'1', b'I', b'L'] {
                assert!(!id.as_bytes().contains(&forbidden));
            }
        }
        assert_eq!(registry.room_count(), 50);
    }

    #[test]
    fn find_is_case_insensitive_and_misses_unknown_ids() {
        let registry = RoomRegistry::new();
        let room = registry.create_room(false);
        let lower = room.id().to_lowercase();
        assert!(registry.find(&lower).is_some());
        assert!(registry.find("ZZZZZZZZ").is_none());
    }

    #[tokio::test]
    async fn empty_rooms_are_torn_down_after_broadcast() {
        let registry = RoomRegistry::new();
        let room = registry.create_room(true);
        let room_id = room.id().to_string();

        let (tx, rx) = mpsc::unbounded_channel();
        room.join(profile("p1"), tx, 1_000).await;
        drop(rx);

        // The dropped receiver makes the session stale; the broadcast pass
        // evicts it and the registry removes the emptied room.
        registry.broadcast_all(2_000).await;
        assert!(registry.find(&room_id).is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn public_listing_only_includes_public_rooms() {
        let registry = RoomRegistry::new();
        let public = registry.create_room(true);
        let _private = registry.create_room(false);

        let (tx, _rx) = mpsc::unbounded_channel();
        public.join(profile("p1"), tx, 1_000).await;

        let listings = registry.list_public().await;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].room_id, public.id());
        assert_eq!(listings[0].player_count, 1);
        assert!(!listings[0].round_running);
    }
}
