use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One lock per room name.
///
/// Join, leave and cleanup for a room run under that room's lock so they
/// cannot interleave, while other rooms proceed independently. The table is
/// sharded and only touched to look an entry up.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let entry = self.locks.entry(name.to_string()).or_default();
        Arc::clone(entry.value())
    }

    /// Run `f` while holding the lock of room `name`.
    pub fn with_session<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Drop the entry for `name` unless someone else still holds or waits on it.
    pub fn prune(&self, name: &str) -> bool {
        self.locks
            .remove_if(name, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn same_room_is_serialized() {
        let locks = SessionLocks::new();
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    locks.with_session("roomA", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn different_rooms_do_not_block_each_other() {
        let locks = SessionLocks::new();
        let nested = locks.with_session("roomA", || locks.with_session("roomB", || 7));
        assert_eq!(nested, 7);
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn prune_skips_entries_in_use() {
        let locks = SessionLocks::new();
        locks.with_session("roomA", || {
            assert!(!locks.prune("roomA"));
        });
        assert!(locks.prune("roomA"));
        assert!(!locks.prune("roomA"));
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn held_room_does_not_stall_other_threads() {
        let locks = SessionLocks::new();
        locks.with_session("roomA", || {
            let done = std::thread::scope(|s| {
                s.spawn(|| locks.with_session("roomB", || locks.prune("roomC")))
                    .join()
                    .unwrap()
            });
            assert!(!done);
            assert!(!locks.prune("roomA"));
        });
        assert!(locks.prune("roomB"));
    }
}
