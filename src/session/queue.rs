//! Registration ring buffer
//!
//! `K` reusable slots holding raw handshakes. One producer (the registrar)
//! owns the write index; consumers share the read index under a mutex.
//!
//! - `free`:   permits = empty slots, taken by the producer
//! - `filled`: permits = pending handshakes, taken by consumers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::HANDSHAKE_SIZE;
use crate::sync::Semaphore;

/// Raw handshake message
pub type Handshake = [u8; HANDSHAKE_SIZE];

/// Bounded queue of pending handshakes
pub struct RegistrationQueue {
    slots: Box<[Mutex<Handshake>]>,
    free: Semaphore,
    filled: Semaphore,
    write_index: AtomicUsize,
    read_index: Mutex<usize>,
    closed: AtomicBool,
}

impl RegistrationQueue {
    /// Queue with `capacity` slots (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| Mutex::new([0u8; HANDSHAKE_SIZE])).collect(),
            free: Semaphore::new(capacity),
            filled: Semaphore::new(0),
            write_index: AtomicUsize::new(0),
            read_index: Mutex::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Handshakes waiting for a worker
    pub fn pending(&self) -> usize {
        self.filled.available_permits()
    }

    /// Wait for a free slot, then let `fill` write a handshake into it.
    ///
    /// Single producer only. Returns `Ok(false)` once the queue is closed.
    /// If `fill` fails the slot stays free and the error is returned.
    pub fn push_with<F>(&self, fill: F) -> Result<bool>
    where
        F: FnOnce(&mut Handshake) -> Result<()>,
    {
        if self.closed.load(Ordering::Acquire) || !self.free.acquire() {
            return Ok(false);
        }

        let index = self.write_index.load(Ordering::Relaxed);
        let filled = fill(&mut *self.slots[index].lock());
        if let Err(e) = filled {
            self.free.release();
            return Err(e);
        }

        self.write_index
            .store((index + 1) % self.slots.len(), Ordering::Relaxed);
        self.filled.release();
        Ok(true)
    }

    /// Enqueue a handshake that is already in memory
    pub fn push(&self, handshake: Handshake) -> bool {
        self.push_with(|slot| {
            *slot = handshake;
            Ok(())
        })
        .unwrap_or(false)
    }

    /// Wait for the next handshake.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<Handshake> {
        if !self.filled.acquire() {
            return None;
        }

        let handshake = {
            let mut read_index = self.read_index.lock();
            let handshake = *self.slots[*read_index].lock();
            *read_index = (*read_index + 1) % self.slots.len();
            handshake
        };
        self.free.release();
        Some(handshake)
    }

    /// Stop accepting handshakes and wake every waiter.
    ///
    /// Handshakes already queued are still handed out.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.free.close();
        self.filled.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
