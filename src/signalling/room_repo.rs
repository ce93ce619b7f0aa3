//! Registry of the rooms currently served by this process.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
    time::Duration,
};

use crate::{
    catalog::Catalog, prelude::*, proto::Code, signalling::room::Room,
    utils::Timer,
};

/// Registry of active rooms keyed by their [`Code`].
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct RoomRepository(Arc<Inner>);

struct Inner {
    /// Active rooms. A room absent from the map is unreachable for new
    /// connections but may still be draining its sockets.
    rooms: Mutex<HashMap<Code, Arc<Room>>>,

    /// Avatar pool shared by all rooms.
    catalog: Arc<Catalog>,

    /// How long a room that never gets a member is kept around.
    idle_timeout: Duration,
}

impl RoomRepository {
    /// Creates a new empty [`RoomRepository`].
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, idle_timeout: Duration) -> Self {
        Self(Arc::new(Inner {
            rooms: Mutex::new(HashMap::new()),
            catalog,
            idle_timeout,
        }))
    }

    /// Returns the room registered under `code`, creating and registering
    /// a new one if absent.
    ///
    /// Lookup is stable: any two codes with equal entry sequences yield
    /// the same room instance.
    pub fn get_room(&self, code: &Code) -> Arc<Room> {
        let mut rooms = self.0.rooms.lock().unwrap();
        if let Some(room) = rooms.get(code) {
            return Arc::clone(room);
        }
        let room = self.create_room(code);
        rooms.insert(code.clone(), Arc::clone(&room));
        room
    }

    /// Builds a room and arms its two independent removal guards: the
    /// one-shot `empty` notification and the idle reaper countdown.
    ///
    /// Either guard removes the room at most once; both re-validate the
    /// registry entry by identity, so a guard surviving past its room can
    /// never remove a successor registered under the same code.
    fn create_room(&self, code: &Code) -> Arc<Room> {
        let room =
            Arc::new(Room::new(code.clone(), Arc::clone(&self.0.catalog)));

        let registry = Arc::downgrade(&self.0);
        let this = Arc::downgrade(&room);
        let key = code.clone();
        room.set_on_empty(Box::new(move || {
            Self::remove_room(&registry, &key, &this);
        }));

        let registry = Arc::downgrade(&self.0);
        let this = Arc::downgrade(&room);
        let key = code.clone();
        room.set_reaper(Timer::new(self.0.idle_timeout, move || {
            let still_empty =
                this.upgrade().map_or(false, |room| room.is_empty());
            if still_empty {
                Self::remove_room(&registry, &key, &this);
            }
        }));

        info!("Created room {}", room.code());
        room
    }

    /// Unregisters and closes the given room, provided the registry still
    /// maps `code` to that very instance.
    fn remove_room(registry: &Weak<Inner>, code: &Code, room: &Weak<Room>) {
        let (registry, room) = match (registry.upgrade(), room.upgrade()) {
            (Some(registry), Some(room)) => (registry, room),
            _ => return,
        };
        let removed = {
            let mut rooms = registry.rooms.lock().unwrap();
            match rooms.get(code) {
                Some(active) if Arc::ptr_eq(active, &room) => {
                    rooms.remove(code)
                }
                _ => None,
            }
        };
        if let Some(room) = removed {
            if let Some(reaper) = room.take_reaper() {
                reaper.cancel();
            }
            room.close();
            info!("Removed room {}", room.code());
        }
    }

    /// Closes every registered room so all of their fetch streams
    /// terminate. Rooms are left in the registry to drain.
    pub fn cleanup(&self) {
        let rooms: Vec<_> =
            self.0.rooms.lock().unwrap().values().cloned().collect();
        for room in rooms {
            room.close();
        }
    }

    #[cfg(test)]
    fn contains(&self, code: &Code) -> bool {
        self.0.rooms.lock().unwrap().contains_key(code)
    }
}
