use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::cleanup::CleanupScheduler;
use super::connctx::ConnCtx;
use super::docstore::{DocumentStore, SharedDoc};
use super::roommeta::RoomMetadataStore;
use super::sessionlock::SessionLocks;

/// Result of attaching a connection to a room.
#[derive(Debug)]
pub struct Joined {
    pub member_count: usize,
    pub doc: Arc<SharedDoc>,
}

/// Drives the room lifecycle: connections join and leave rooms, and a room
/// that stays empty for `cleanup_delay` has its document and metadata disposed.
///
/// Rooms go Active -> Draining (empty, cleanup armed) -> Active again on a
/// rejoin, or Disposed once the cleanup fires. A join after disposal starts
/// a brand new room with an empty document.
#[derive(Clone)]
pub struct ColabHub {
    rooms: Arc<RoomMetadataStore>,
    docs: Arc<DocumentStore>,
    cleanup: Arc<CleanupScheduler>,
    locks: Arc<SessionLocks>,
    cleanup_delay: Duration,
}

impl ColabHub {
    pub fn new(cleanup_delay: Duration) -> Self {
        Self {
            rooms: Arc::new(RoomMetadataStore::new()),
            docs: Arc::new(DocumentStore::new()),
            cleanup: Arc::new(CleanupScheduler::new()),
            locks: Arc::new(SessionLocks::new()),
            cleanup_delay,
        }
    }

    pub fn rooms(&self) -> &RoomMetadataStore {
        &self.rooms
    }

    pub fn docs(&self) -> &DocumentStore {
        &self.docs
    }

    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    pub fn cleanup_delay(&self) -> Duration {
        self.cleanup_delay
    }

    /// Attach a connection to its room, creating the room and its document
    /// on first use. Any pending cleanup for the room is cancelled.
    pub fn join(&self, conn: &ConnCtx) -> Joined {
        let room = conn.room.as_str();
        self.locks.with_session(room, || {
            self.rooms.ensure(room);
            let member_count = self.rooms.join(room, conn.id);
            let doc = self.docs.get_or_create(room);
            self.cleanup.cancel(room);
            info!("User {} connected to room \"{}\"", conn.id, room);
            info!("Room \"{}\" now has {} user(s)", room, member_count);
            Joined { member_count, doc }
        })
    }

    /// Detach a connection. When the room becomes empty a cleanup is armed.
    /// Returns `None` if the room was already disposed.
    pub fn leave(&self, conn: &ConnCtx) -> Option<usize> {
        let room = conn.room.as_str();
        self.locks.with_session(room, || {
            let member_count = self.rooms.leave(room, conn.id)?;
            info!("Room \"{}\" now has {} user(s)", room, member_count);
            if member_count == 0 {
                info!("Room \"{}\" is now empty, scheduling cleanup", room);
                let hub = self.clone();
                self.cleanup.schedule(room, self.cleanup_delay, move |name, generation| {
                    hub.on_cleanup_fire(&name, generation);
                });
            }
            Some(member_count)
        })
    }

    /// Record activity in a room without changing its membership.
    pub fn touch(&self, room: &str) {
        self.rooms.touch(room);
    }

    /// Dispose the room if the firing task is still the armed one and the room
    /// is still empty. Returns whether the room was disposed.
    pub(crate) fn on_cleanup_fire(&self, room: &str, generation: u64) -> bool {
        let disposed = self.locks.with_session(room, || {
            if !self.cleanup.complete(room, generation) {
                debug!("Stale cleanup for room \"{}\" ignored", room);
                return false;
            }
            if !self.rooms.is_empty(room) {
                debug!("Room \"{}\" is in use again, cleanup discarded", room);
                return false;
            }
            info!("Cleaning up empty room \"{}\" after inactivity", room);
            self.docs.dispose(room);
            self.rooms.dispose(room);
            true
        });
        if disposed {
            self.locks.prune(room);
            info!("Room \"{}\" has been cleaned up and removed from memory", room);
        }
        disposed
    }
}
