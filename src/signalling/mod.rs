//! Room coordination: membership, avatar allocation, message fan-out and
//! room lifecycle.

pub mod room;
pub mod room_repo;

pub use self::{
    room::{Fetch, Room, RoomError},
    room_repo::RoomRepository,
};
