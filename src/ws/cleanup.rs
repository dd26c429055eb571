use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info};

struct ArmedTask {
    generation: u64,
    handle: AbortHandle,
}

/// Deferred, cancellable disposal tasks, at most one per room.
///
/// A task that wakes up does not act on its own: the `on_fire` callback has to
/// claim it with [`complete`](Self::complete), which only succeeds while the
/// task is still the one armed for its room. Cancelling or re-arming after the
/// timer elapsed therefore still wins.
#[derive(Default)]
pub struct CleanupScheduler {
    tasks: DashMap<String, ArmedTask>,
    next_generation: AtomicU64,
}

impl CleanupScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `on_fire(name, generation)` to run after `delay`, replacing any
    /// task already armed for `name`. Must be called inside a tokio runtime.
    ///
    /// Delays past the timer's horizon are clamped to a far-future deadline.
    pub fn schedule<F>(&self, name: &str, delay: Duration, on_fire: F) -> u64
    where
        F: FnOnce(String, u64) + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let timer = tokio::time::sleep(delay);
        let room = name.to_string();

        // Hold the entry so a zero delay cannot fire before the task is registered.
        let entry = self.tasks.entry(name.to_string());
        let handle = tokio::spawn(async move {
            timer.await;
            on_fire(room, generation);
        });
        let armed = ArmedTask {
            generation,
            handle: handle.abort_handle(),
        };
        let previous = match entry {
            Entry::Occupied(mut occupied) => Some(occupied.insert(armed)),
            Entry::Vacant(vacant) => {
                vacant.insert(armed);
                None
            }
        };

        if let Some(previous) = previous {
            previous.handle.abort();
            debug!("Replaced cleanup timer for room \"{}\"", name);
        }
        info!("Scheduled cleanup for room \"{}\" in {} seconds", name, delay.as_secs());
        generation
    }

    /// Cancel the armed task for `name`, if any.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some((_, task)) => {
                task.handle.abort();
                info!("Cancelled cleanup timer for room \"{}\"", name);
                true
            }
            None => false,
        }
    }

    /// Claim a fired task. Returns `true` and forgets the task only if
    /// `generation` is still armed for `name`.
    pub fn complete(&self, name: &str, generation: u64) -> bool {
        self.tasks
            .remove_if(name, |_, task| task.generation == generation)
            .is_some()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    #[cfg(test)]
    pub fn armed_generation(&self, name: &str) -> Option<u64> {
        self.tasks.get(name).map(|task| task.generation)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<(String, u64)>>>, impl Fn() -> Box<dyn FnOnce(String, u64) + Send>) {
        let fired: Arc<Mutex<Vec<(String, u64)>>> = Arc::default();
        let sink = fired.clone();
        let make = move || {
            let sink = sink.clone();
            Box::new(move |name: String, generation: u64| {
                sink.lock().unwrap().push((name, generation));
            }) as Box<dyn FnOnce(String, u64) + Send>
        };
        (fired, make)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn fires_after_the_delay() {
        let scheduler = CleanupScheduler::new();
        let (fired, make) = recorder();
        let generation = scheduler.schedule("roomA", Duration::from_secs(300), make());

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert!(scheduler.is_pending("roomA"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*fired.lock().unwrap(), vec![("roomA".to_string(), generation)]);
        assert!(scheduler.complete("roomA", generation));
        assert!(!scheduler.is_pending("roomA"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn cancelled_task_never_fires() {
        let scheduler = CleanupScheduler::new();
        let (fired, make) = recorder();
        scheduler.schedule("roomA", Duration::from_secs(60), make());

        assert!(scheduler.cancel("roomA"));
        assert!(!scheduler.cancel("roomA"));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn rescheduling_replaces_the_previous_task() {
        let scheduler = CleanupScheduler::new();
        let (fired, make) = recorder();
        let first = scheduler.schedule("roomA", Duration::from_secs(60), make());
        tokio::time::sleep(Duration::from_secs(30)).await;
        let second = scheduler.schedule("roomA", Duration::from_secs(60), make());
        assert_ne!(first, second);
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(*fired.lock().unwrap(), vec![("roomA".to_string(), second)]);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stale_generation_cannot_complete() {
        let scheduler = CleanupScheduler::new();
        let (_fired, make) = recorder();
        let stale = scheduler.schedule("roomA", Duration::from_secs(60), make());
        let current = scheduler.schedule("roomA", Duration::from_secs(60), make());

        assert!(!scheduler.complete("roomA", stale));
        assert_eq!(scheduler.armed_generation("roomA"), Some(current));
        assert!(!scheduler.complete("roomB", current));
        assert!(scheduler.complete("roomA", current));
        assert!(!scheduler.complete("roomA", current));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn huge_delay_is_armed_without_overflow() {
        let scheduler = CleanupScheduler::new();
        let (fired, make) = recorder();
        let generation = scheduler.schedule("roomA", Duration::from_secs(u64::MAX), make());
        assert_eq!(scheduler.armed_generation("roomA"), Some(generation));

        tokio::time::sleep(Duration::from_secs(30 * 24 * 60 * 60)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert!(scheduler.cancel("roomA"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn zero_delay_fires_on_the_next_tick() {
        let scheduler = CleanupScheduler::new();
        let (fired, make) = recorder();
        let generation = scheduler.schedule("roomA", Duration::ZERO, make());
        assert!(scheduler.is_pending("roomA"));
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*fired.lock().unwrap(), vec![("roomA".to_string(), generation)]);
    }
}
