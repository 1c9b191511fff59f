//! Counting semaphore
//!
//! Blocking permits over a parking_lot `Mutex` + `Condvar`. A closed
//! semaphore still hands out remaining permits, then refuses further waiters.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct State {
    permits: usize,
    closed: bool,
}

/// Counting semaphore with cooperative close
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `permits` permits
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Take one permit, blocking until one is available.
    ///
    /// Returns `false` once the semaphore is closed and drained.
    pub fn acquire(&self) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.permits > 0 {
                state.permits -= 1;
                return true;
            }
            if state.closed {
                return false;
            }
            self.available.wait(&mut state);
        }
    }

    /// Return one permit and wake a waiter
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Wake every waiter; acquire fails once permits run out
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Current number of free permits
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }
}
