use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::{debug, info};

use super::connctx::ConnId;

/// Bookkeeping for one live room.
#[derive(Clone, Debug)]
pub struct Session {
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    members: HashSet<ConnId>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_activity_at: now,
            members: HashSet::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Read-only copy of a session, handed out to the API.
#[derive(Clone, Debug)]
pub struct RoomSnapshot {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub member_count: usize,
}

/// Owns the [`Session`] record of every room that has been joined and not yet disposed.
///
/// Records live in a sharded map, so rooms do not contend with each other.
/// Sequencing of several operations on one room is the caller's job (see `SessionLocks`).
#[derive(Default)]
pub struct RoomMetadataStore {
    sessions: DashMap<String, Session>,
}

impl RoomMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the session record if it does not exist yet.
    pub fn ensure(&self, name: &str) {
        if let Entry::Vacant(entry) = self.sessions.entry(name.to_string()) {
            entry.insert(Session::new());
            info!("Room \"{}\" metadata initialized", name);
        }
    }

    /// Bump the activity timestamp. Never creates a session.
    pub fn touch(&self, name: &str) {
        if let Some(mut session) = self.sessions.get_mut(name) {
            session.last_activity_at = Utc::now();
        }
    }

    /// Add a member and return the new member count.
    ///
    /// Call [`ensure`](Self::ensure) first; joining an unknown room reports zero members.
    pub fn join(&self, name: &str, conn_id: ConnId) -> usize {
        match self.sessions.get_mut(name) {
            Some(mut session) => {
                session.members.insert(conn_id);
                session.last_activity_at = Utc::now();
                session.member_count()
            }
            None => 0,
        }
    }

    /// Remove a member. `None` means the room is unknown, which happens when a
    /// leave races a disposal and is not an error.
    pub fn leave(&self, name: &str, conn_id: ConnId) -> Option<usize> {
        let Some(mut session) = self.sessions.get_mut(name) else {
            debug!("Leave of connection {} for unknown room \"{}\"", conn_id, name);
            return None;
        };
        session.members.remove(&conn_id);
        session.last_activity_at = Utc::now();
        Some(session.member_count())
    }

    /// True when the room has no members or does not exist at all.
    pub fn is_empty(&self, name: &str) -> bool {
        self.sessions
            .get(name)
            .map_or(true, |session| session.members.is_empty())
    }

    pub fn dispose(&self, name: &str) -> bool {
        self.sessions.remove(name).is_some()
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<RoomSnapshot> {
        self.sessions.get(name).map(|session| snapshot_of(name, &session))
    }

    pub fn snapshot(&self) -> Vec<RoomSnapshot> {
        let mut rooms: Vec<RoomSnapshot> = self
            .sessions
            .iter()
            .map(|entry| snapshot_of(entry.key(), entry.value()))
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }

    pub fn room_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.iter().map(|entry| entry.member_count()).sum()
    }
}

fn snapshot_of(name: &str, session: &Session) -> RoomSnapshot {
    RoomSnapshot {
        name: name.to_string(),
        created_at: session.created_at,
        last_activity_at: session.last_activity_at,
        member_count: session.member_count(),
    }
}
