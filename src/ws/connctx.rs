use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

pub type ConnId = u64;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique connection identifier.
pub fn next_conn_id() -> ConnId {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub id: ConnId,
    pub room: String,
    pub remote: Option<SocketAddr>,
}

impl ConnCtx {
    pub fn new(room: String, remote: Option<SocketAddr>) -> Self {
        Self {
            id: next_conn_id(),
            room,
            remote,
        }
    }
}

/// Resolve the room name addressed by a request path.
///
/// The trailing segment of the path names the room. An empty segment (no path,
/// or a trailing slash) or one carrying control characters falls back to
/// `default_room`.
pub fn resolve_room_name(path: &str, default_room: &str) -> String {
    let segment = path.rsplit('/').next().unwrap_or("");
    if segment.is_empty() || segment.chars().any(char::is_control) {
        return default_room.to_string();
    }
    segment.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_segment_names_the_room() {
        assert_eq!(resolve_room_name("/roomA", "default"), "roomA");
        assert_eq!(resolve_room_name("/org/docs/roomB", "default"), "roomB");
    }

    #[test]
    fn missing_or_empty_segment_uses_default() {
        assert_eq!(resolve_room_name("/", "default"), "default");
        assert_eq!(resolve_room_name("", "default"), "default");
        assert_eq!(resolve_room_name("/roomA/", "lobby"), "lobby");
        assert_eq!(resolve_room_name("/bad\u{7}name", "default"), "default");
    }

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnCtx::new("r".to_string(), None);
        let b = ConnCtx::new("r".to_string(), None);
        assert_ne!(a.id, b.id);
    }
}
