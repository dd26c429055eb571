use loro::LoroDoc;
use moka::sync::Cache;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::models::BroadcastMessage;

/// Capacity of the per-room relay channel. A receiver that falls further
/// behind than this gets a fresh snapshot instead of the missed messages.
const RELAY_CAPACITY: usize = 256;

/// The shared document of one room.
///
/// Every connection attached to a room holds the same `Arc<SharedDoc>`.
/// Besides the Loro document it owns the relay channel the sync loop uses to
/// fan messages out to the other members.
pub struct SharedDoc {
    room: String,
    doc: LoroDoc,
    relay: Mutex<Option<broadcast::Sender<BroadcastMessage>>>,
    released: AtomicBool,
}

impl SharedDoc {
    pub fn new(room: &str) -> Self {
        let (relay, _rx) = broadcast::channel::<BroadcastMessage>(RELAY_CAPACITY);
        Self {
            room: room.to_string(),
            doc: LoroDoc::new(),
            relay: Mutex::new(Some(relay)),
            released: AtomicBool::new(false),
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn doc(&self) -> &LoroDoc {
        &self.doc
    }

    /// Import an update produced by a peer.
    pub fn apply_update(&self, delta: &[u8]) -> Result<(), String> {
        self.doc
            .import(delta)
            .map(|_| ())
            .map_err(|e| format!("Failed to import update into room '{}': {}", self.room, e))
    }

    /// Export the full document state.
    pub fn snapshot(&self) -> Result<Vec<u8>, String> {
        self.doc
            .export(loro::ExportMode::Snapshot)
            .map_err(|e| format!("Failed to export room '{}': {}", self.room, e))
    }

    /// Listen to messages relayed in this room. `None` once released.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<BroadcastMessage>> {
        self.relay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(broadcast::Sender::subscribe)
    }

    /// Relay a message to every subscriber. Returns how many received it.
    pub fn publish(&self, msg: BroadcastMessage) -> usize {
        let relay = self.relay.lock().unwrap_or_else(PoisonError::into_inner);
        match relay.as_ref() {
            Some(tx) => tx.send(msg).unwrap_or(0),
            None => 0,
        }
    }

    /// Close the relay channel so every attached sync loop stops listening.
    /// Returns `false` if the handle was already released.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        let relay = self.relay.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(relay);
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SharedDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDoc")
            .field("room", &self.room)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Owns the live [`SharedDoc`] of every room.
pub struct DocumentStore {
    docs: Cache<String, Arc<SharedDoc>>,
    released_total: AtomicU64,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Documents are only removed through [`dispose`](Self::dispose), so the
    /// cache is built without capacity or expiry.
    pub fn new() -> Self {
        Self {
            docs: Cache::builder().build(),
            released_total: AtomicU64::new(0),
        }
    }

    /// Return the room's document, creating an empty one if needed.
    /// Concurrent callers for the same name all get the same handle.
    pub fn get_or_create(&self, name: &str) -> Arc<SharedDoc> {
        self.docs.get_with(name.to_string(), || {
            info!("Document \"{}\" created", name);
            Arc::new(SharedDoc::new(name))
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<SharedDoc>> {
        self.docs.get(name)
    }

    /// Release and forget the room's document. No-op if there is none.
    pub fn dispose(&self, name: &str) -> bool {
        match self.docs.remove(name) {
            Some(doc) => {
                if doc.release() {
                    self.released_total.fetch_add(1, Ordering::Relaxed);
                }
                info!("Document \"{}\" disposed", name);
                true
            }
            None => {
                debug!("No document to dispose for room \"{}\"", name);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.docs.iter().count()
    }

    pub fn released_total(&self) -> u64 {
        self.released_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_yields_the_same_handle() {
        let store = DocumentStore::new();
        let a = store.get_or_create("roomA");
        let b = store.get_or_create("roomA");
        let other = store.get_or_create("roomB");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn concurrent_creation_never_duplicates() {
        let store = DocumentStore::new();
        let handles: Vec<Arc<SharedDoc>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.get_or_create("busy")))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn dispose_releases_once_and_tolerates_repeats() {
        let store = DocumentStore::new();
        let doc = store.get_or_create("roomA");
        let mut rx = doc.subscribe().unwrap();

        assert!(store.dispose("roomA"));
        assert!(doc.is_released());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ));
        assert!(doc.subscribe().is_none());

        assert!(!store.dispose("roomA"));
        assert!(!store.dispose("never-created"));
        assert_eq!(store.released_total(), 1);
        assert!(store.get("roomA").is_none());
    }

    #[test]
    fn recreated_document_is_fresh() {
        let store = DocumentStore::new();
        let first = store.get_or_create("roomB");
        first.doc().get_text("text").insert(0, "hello").unwrap();
        first.doc().commit();
        store.dispose("roomB");

        let second = store.get_or_create("roomB");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.doc().get_text("text").to_string(), "");
    }

    #[test]
    fn updates_flow_between_documents() {
        let source = LoroDoc::new();
        source.get_text("text").insert(0, "shared").unwrap();
        source.commit();
        let update = source.export(loro::ExportMode::all_updates()).unwrap();

        let shared = SharedDoc::new("roomC");
        shared.apply_update(&update).unwrap();
        assert_eq!(shared.doc().get_text("text").to_string(), "shared");
        assert!(shared.apply_update(b"not a loro update").is_err());

        let snapshot = shared.snapshot().unwrap();
        let copy = LoroDoc::new();
        copy.import(&snapshot).unwrap();
        assert_eq!(copy.get_text("text").to_string(), "shared");
    }

    #[test]
    fn publish_reaches_subscribers() {
        let shared = SharedDoc::new("roomD");
        assert_eq!(shared.publish(BroadcastMessage { sender_id: 1, content: "x".into() }), 0);
        let mut rx = shared.subscribe().unwrap();
        assert_eq!(shared.publish(BroadcastMessage { sender_id: 1, content: "y".into() }), 1);
        assert_eq!(rx.try_recv().unwrap().content, "y");
    }
}
