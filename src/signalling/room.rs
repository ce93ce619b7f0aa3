//! In-memory coordination unit grouping the users of one room code.

use std::{
    collections::{HashMap, HashSet},
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use derive_more::Display;
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    Stream,
};
use rand::{seq::SliceRandom as _, Rng as _};

use crate::{
    catalog::Catalog,
    prelude::*,
    proto::{Avatar, Code, Emoji, Envelope, Session, User, UserId},
    utils::Timer,
};

/// Errors returned by [`Room`] operations.
#[derive(Debug, Display)]
pub enum RoomError {
    /// Avatar pool is exhausted: every catalog emoji is already held by a
    /// member of this room.
    #[display(fmt = "No free avatar emoji left")]
    NotEnoughResources,

    /// Referenced user is not a member of this room.
    #[display(fmt = "Unknown user: {}", _0)]
    UnknownUser(UserId),

    /// A member exists without an outbound queue. Members and queues are
    /// always updated together, so this can only mean corrupted state.
    #[display(fmt = "Outbound queue is gone for user: {}", _0)]
    QueueMissing(UserId),

    /// The user's outbound queue was already handed out by a previous
    /// [`Room::fetch`] call.
    #[display(fmt = "Outbound queue already consumed for user: {}", _0)]
    AlreadyFetched(UserId),
}

impl std::error::Error for RoomError {}

/// Callback consumed once when the last user leaves the room.
type OnEmpty = Box<dyn FnOnce() + Send>;

/// Item of a user's outbound queue. `None` is the end-of-stream sentinel:
/// once it is enqueued the queue is never written to again.
type QueueItem = Option<Envelope>;

/// Outbound queue of one member. The receiving half is handed out (at
/// most once) by [`Room::fetch`].
struct Queue {
    tx: UnboundedSender<QueueItem>,
    rx: Option<UnboundedReceiver<QueueItem>>,
}

impl Queue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded();
        Self { tx, rx: Some(rx) }
    }

    /// Enqueues an item, discarding the error of a receiver that is
    /// already gone.
    fn push(&self, item: QueueItem) {
        drop(self.tx.unbounded_send(item));
    }
}

/// Membership state of a [`Room`]. Guarded by one mutex so avatar
/// allocation, user insertion and broadcasts stay atomic with respect to
/// each other.
#[derive(Default)]
struct Members {
    users: HashMap<UserId, User>,
    queues: HashMap<UserId, Queue>,
}

impl Members {
    /// Enqueues one copy of `envelope` to every member except `skip`.
    fn broadcast_except(&self, skip: &UserId, envelope: &Envelope) {
        for (id, queue) in &self.queues {
            if id != skip {
                queue.push(Some(envelope.clone()));
            }
        }
    }
}

/// Room: membership, avatar allocation, per-user outbound queues and
/// signaling relay.
///
/// All rooms share one read-only avatar [`Catalog`]; everything else is
/// owned by the room and serialized behind its own lock.
pub struct Room {
    /// Code this room was created under. Identity and logging only; never
    /// used for membership logic.
    code: Code,

    /// Avatar pool to draw from.
    catalog: Arc<Catalog>,

    /// Current members and their outbound queues.
    members: Mutex<Members>,

    /// One-shot notification fired when the user count drops to zero.
    on_empty: Mutex<Option<OnEmpty>>,

    /// Idle countdown armed at creation, cancelled on removal.
    reaper: Mutex<Option<Timer>>,
}

impl Room {
    /// Creates a new empty [`Room`] for the given code.
    #[must_use]
    pub fn new(code: Code, catalog: Arc<Catalog>) -> Self {
        Self {
            code,
            catalog,
            members: Mutex::new(Members::default()),
            on_empty: Mutex::new(None),
            reaper: Mutex::new(None),
        }
    }

    /// Code this room is registered under.
    #[must_use]
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Indicates whether this room currently has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.lock().unwrap().users.is_empty()
    }

    /// Installs the one-shot callback fired when the last user leaves.
    pub(crate) fn set_on_empty(&self, notify: OnEmpty) {
        self.on_empty.lock().unwrap().replace(notify);
    }

    /// Hands the idle reaper countdown to this room for safekeeping.
    pub(crate) fn set_reaper(&self, reaper: Timer) {
        self.reaper.lock().unwrap().replace(reaper);
    }

    /// Takes the idle reaper countdown back, if still present.
    pub(crate) fn take_reaper(&self) -> Option<Timer> {
        self.reaper.lock().unwrap().take()
    }

    /// Draws a random avatar emoji from the catalog minus the ids already
    /// held by current members.
    fn pick_emoji(&self, members: &Members) -> Result<Emoji, RoomError> {
        let used: HashSet<&str> = members
            .users
            .values()
            .map(|user| user.avatar.emoji.id.as_str())
            .collect();
        let free: Vec<&String> = self
            .catalog
            .ids()
            .iter()
            .filter(|id| !used.contains(id.as_str()))
            .collect();
        let picked = free
            .choose(&mut rand::thread_rng())
            .ok_or(RoomError::NotEnoughResources)?;
        Ok(Emoji { id: (*picked).clone() })
    }

    /// Mints a new [`User`] with a fresh random id and a unique avatar.
    fn create_user(&self, members: &Members) -> Result<User, RoomError> {
        let id = UserId(format!("{:032x}", rand::thread_rng().gen::<u128>()));
        let avatar = Avatar { emoji: self.pick_emoji(members)? };
        Ok(User { id, avatar })
    }

    /// Admits a new user into the room.
    ///
    /// Returns the newcomer together with a snapshot of the members that
    /// were present before them. The snapshot is taken before insertion
    /// and the `connected` broadcast happens after it, so the newcomer
    /// never receives its own `connected` envelope and every existing
    /// member sees the newcomer exactly once.
    ///
    /// # Errors
    ///
    /// Errors with [`RoomError::NotEnoughResources`] when every catalog
    /// emoji is already held by a member.
    pub fn connect(&self) -> Result<(User, Vec<User>), RoomError> {
        let mut members = self.members.lock().unwrap();
        let user = self.create_user(&members)?;
        let other_users: Vec<User> = members.users.values().cloned().collect();
        members.users.insert(user.id.clone(), user.clone());
        members.queues.insert(user.id.clone(), Queue::new());
        members.broadcast_except(
            &user.id,
            &Envelope::Connected { user: user.clone() },
        );
        info!(
            "[room {}] {} joined as {}",
            self.code, user.id, user.avatar.emoji,
        );
        Ok((user, other_users))
    }

    /// Removes a user from the room, dropping whatever was still queued
    /// for them, and tells the remaining members.
    ///
    /// A no-op for ids that are not current members, so racing teardown
    /// paths may call it freely. Fires the `empty` notification exactly
    /// once when the last user leaves.
    pub fn disconnect(&self, user_id: &UserId) {
        let on_empty = {
            let mut members = self.members.lock().unwrap();
            if members.users.remove(user_id).is_none() {
                return;
            }
            members.queues.remove(user_id);
            members.broadcast_except(
                user_id,
                &Envelope::Disconnected { user: user_id.clone() },
            );
            if members.users.is_empty() {
                self.on_empty.lock().unwrap().take()
            } else {
                None
            }
        };
        debug!("[room {}] {} left", self.code, user_id);
        if let Some(notify) = on_empty {
            notify();
        }
    }

    /// Enqueues an `offer` envelope onto the target user's queue, with
    /// `from` attributed as the sender.
    ///
    /// # Errors
    ///
    /// Errors if either id is not a current member.
    pub fn make_offer(
        &self,
        from: &UserId,
        to: &UserId,
        session: Session,
    ) -> Result<(), RoomError> {
        self.send_signal(from, to, |from_user, to_user| Envelope::Offer {
            from_user,
            to_user,
            session,
        })
    }

    /// Enqueues an `answer` envelope onto the target user's queue, with
    /// `from` attributed as the sender.
    ///
    /// # Errors
    ///
    /// Errors if either id is not a current member.
    pub fn make_answer(
        &self,
        from: &UserId,
        to: &UserId,
        session: Session,
    ) -> Result<(), RoomError> {
        self.send_signal(from, to, |from_user, to_user| Envelope::Answer {
            from_user,
            to_user,
            session,
        })
    }

    /// Validates that both ends of a signaling exchange are members and
    /// enqueues the built envelope for the target.
    fn send_signal<F>(
        &self,
        from: &UserId,
        to: &UserId,
        build: F,
    ) -> Result<(), RoomError>
    where
        F: FnOnce(UserId, UserId) -> Envelope,
    {
        let members = self.members.lock().unwrap();
        if !members.users.contains_key(from) {
            return Err(RoomError::UnknownUser(from.clone()));
        }
        if !members.users.contains_key(to) {
            return Err(RoomError::UnknownUser(to.clone()));
        }
        let queue = members
            .queues
            .get(to)
            .ok_or_else(|| RoomError::QueueMissing(to.clone()))?;
        queue.push(Some(build(from.clone(), to.clone())));
        Ok(())
    }

    /// Enqueues the end-of-stream sentinel on every queue so all pending
    /// [`Room::fetch`] streams terminate.
    ///
    /// Members are NOT removed and the `empty` notification does not
    /// fire; each member's own teardown still runs [`Room::disconnect`].
    pub fn close(&self) {
        let members = self.members.lock().unwrap();
        for queue in members.queues.values() {
            queue.push(None);
        }
    }

    /// Takes the user's outbound queue as a lazy finite stream of
    /// envelopes, terminated by [`Room::close`] or by the user's removal.
    ///
    /// # Errors
    ///
    /// Errors if the user is not a member, or if their queue was already
    /// fetched (the stream is not restartable).
    pub fn fetch(&self, user_id: &UserId) -> Result<Fetch, RoomError> {
        let mut members = self.members.lock().unwrap();
        let queue = members
            .queues
            .get_mut(user_id)
            .ok_or_else(|| RoomError::UnknownUser(user_id.clone()))?;
        queue
            .rx
            .take()
            .map(Fetch)
            .ok_or_else(|| RoomError::AlreadyFetched(user_id.clone()))
    }
}

/// Lazy, finite, non-restartable stream of the envelopes addressed to one
/// user.
///
/// Ends when the end-of-stream sentinel arrives or when the sending side
/// of the queue is dropped (the user was removed from the room).
pub struct Fetch(UnboundedReceiver<QueueItem>);

impl Stream for Fetch {
    type Item = Envelope;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.0).poll_next(cx) {
            Poll::Ready(Some(Some(envelope))) => Poll::Ready(Some(envelope)),
            Poll::Ready(Some(None)) | Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
