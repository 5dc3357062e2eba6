use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use super::clock::Clock;
use super::room::{Room, RoomCode};

/// Storage backend behind the [`RoomRegistry`].
pub trait RoomStore: Send {
    fn load(&self, code: &RoomCode) -> Option<Room>;
    fn store(&mut self, room: Room);
    fn codes(&self) -> Vec<RoomCode>;
}

/// Process-lifetime in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    rooms: HashMap<RoomCode, Room>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryRoomStore {
    fn load(&self, code: &RoomCode) -> Option<Room> {
        self.rooms.get(code).cloned()
    }

    fn store(&mut self, room: Room) {
        self.rooms.insert(room.code.clone(), room);
    }

    fn codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }
}

/// Room code to room mapping. Rooms appear on first reference and are never
/// deleted.
pub struct RoomRegistry<S: RoomStore = MemoryRoomStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: RoomStore> RoomRegistry<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the room for `code`, creating and storing an empty one first if
    /// the code has never been seen.
    pub fn get_or_create(&mut self, code: &RoomCode) -> Room {
        if let Some(room) = self.store.load(code) {
            return room;
        }

        let room = Room::new(code.clone(), self.clock.now());
        self.store.store(room.clone());
        tracing::info!(room_code = %code, "Room created");
        room
    }

    /// Upserts `room`. Safe to call after any mutation.
    pub fn save(&mut self, room: Room) {
        self.store.store(room);
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.store.load(code).is_some()
    }

    /// All known rooms, ordered by code.
    pub fn rooms(&self) -> Vec<Room> {
        let mut codes = self.store.codes();
        codes.sort();
        codes.iter().filter_map(|code| self.store.load(code)).collect()
    }

    /// Creates a room under a freshly generated, unused code.
    pub fn create_with_generated_code(&mut self, description: Option<String>) -> Room {
        let mut rng = rand::thread_rng();
        let code = loop {
            let candidate = generate_room_code(&mut rng);
            if !self.contains(&candidate) {
                break candidate;
            }
        };

        let room = Room::new(code, self.clock.now()).with_description(description);
        self.store.store(room.clone());
        tracing::info!(room_code = %room.code, description = %room.description, "Room created with generated code");
        room
    }
}

/// Letter, digit, letter. e.g. `A7K`.
pub fn generate_room_code<R: Rng>(rng: &mut R) -> RoomCode {
    let first = random_letter(rng);
    let digit = char::from(b'0' + rng.gen_range(0..10u8));
    let last = random_letter(rng);
    RoomCode(format!("{first}{digit}{last}"))
}

fn random_letter<R: Rng>(rng: &mut R) -> char {
    const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    LETTERS[rng.gen_range(0..LETTERS.len())] as char
}
