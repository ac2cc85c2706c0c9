//! External collaborators: the job facade and the model store
//!. Both are minimal reference implementations sufficient
//! to exercise the Driver's cancellation-polling and
//! publish-then-unlock discipline; a real deployment backs these with
//! its scheduler and persistence layer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Cooperative job control: `start`/`update` report progress,
/// `is_running` is polled between phases, `cancel` requests a stop,
/// `done` marks terminal completion.
pub struct Job<T> {
    total_work: AtomicU64,
    completed_work: AtomicU64,
    running: AtomicBool,
    done: AtomicBool,
    error: Mutex<Option<String>>,
    result: Mutex<Option<T>>,
}

impl<T> Job<T> {
    pub fn start(total_work: u64) -> Arc<Self> {
        Arc::new(Self {
            total_work: AtomicU64::new(total_work),
            completed_work: AtomicU64::new(0),
            running: AtomicBool::new(true),
            done: AtomicBool::new(false),
            error: Mutex::new(None),
            result: Mutex::new(None),
        })
    }

    pub fn update(&self, units: u64) {
        self.completed_work.fetch_add(units, Ordering::Relaxed);
    }

    pub fn progress(&self) -> (u64, u64) {
        (
            self.completed_work.load(Ordering::Relaxed),
            self.total_work.load(Ordering::Relaxed),
        )
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Request a cooperative stop. `error` is attached if this was a
    /// failure rather than a plain cancellation.
    pub fn cancel(&self, error: Option<String>) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(e) = error {
            *self.error.lock().expect("job error lock") = Some(e);
        }
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().expect("job error lock").clone()
    }

    /// Publish the final (or latest intermediate) result.
    pub fn publish(&self, value: T) {
        *self.result.lock().expect("job result lock") = Some(value);
    }

    pub fn done(&self) {
        self.done.store(true, Ordering::Relaxed);
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Relaxed)
    }
}

impl<T: Clone> Job<T> {
    /// Snapshot the most recently published result, if any.
    pub fn snapshot(&self) -> Option<T> {
        self.result.lock().expect("job result lock").clone()
    }
}

/// Minimal write-lock/update/unlock surface over a single model key,
/// standing in for a real model persistence layer.
#[derive(Default)]
pub struct ModelStore<T> {
    locked: Mutex<Option<T>>,
}

impl<T: Clone> ModelStore<T> {
    pub fn new() -> Self {
        Self {
            locked: Mutex::new(None),
        }
    }

    /// Acquire the write lock for `key` by installing an initial
    /// value. Real stores key on an id; this reference store holds
    /// exactly one slot since the Driver only ever trains one model at
    /// a time.
    pub fn lock(&self, initial: T) {
        *self.locked.lock().expect("model store lock") = Some(initial);
    }

    pub fn update(&self, value: T) {
        *self.locked.lock().expect("model store lock") = Some(value);
    }

    pub fn unlock(&self) -> Option<T> {
        self.locked.lock().expect("model store lock").take()
    }

    pub fn peek(&self) -> Option<T> {
        self.locked.lock().expect("model store lock").clone()
    }
}
