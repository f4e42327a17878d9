use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::{Action, Store};

type Tasks = Arc<Mutex<HashMap<u64, JoinHandle<()>>>>;

/// Delayed state transitions owned by a session.
///
/// Each scheduled action runs on its own task. Dropping the scheduler, or
/// calling [`Scheduler::cancel_all`], aborts whatever has not fired yet.
#[derive(Debug)]
pub struct Scheduler {
    store: Store,
    tasks: Tasks,
    next_id: AtomicU64,
}

fn lock(tasks: &Tasks) -> MutexGuard<'_, HashMap<u64, JoinHandle<()>>> {
    tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Scheduler {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Dispatch `action` once `delay` has elapsed. Must be called inside a runtime.
    pub fn schedule(&self, delay: Duration, action: Action) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let store = self.store.clone();
        let tasks = self.tasks.clone();

        // held across spawn so the task cannot deregister before it is registered
        let mut registered = lock(&self.tasks);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.dispatch(action);
            lock(&tasks).remove(&id);
        });
        registered.insert(id, handle);
        id
    }

    pub fn cancel(&self, id: u64) -> bool {
        match lock(&self.tasks).remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<JoinHandle<()>> = lock(&self.tasks).drain().map(|(_, h)| h).collect();
        if !drained.is_empty() {
            debug!("Cancelling {} scheduled transitions", drained.len());
        }
        for handle in drained {
            handle.abort();
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
