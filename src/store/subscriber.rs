//! Key records and their subscriber sets
//!
//! Subscription state lives inside the record, so it is guarded by the
//! owning bucket's lock. Deleting a record drops its subscribers with it.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{KvsError, Result};

/// Identity of a notification sink (one per session notify channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

/// Receiver of change notifications for subscribed keys
pub trait NotificationSink: Send + Sync {
    /// Stable identity, used for duplicate detection and unsubscribe
    fn id(&self) -> SinkId;

    /// Push a `(key, value)` change
    fn notify(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Bounded set of subscribers of one key
pub struct SubscriberSet {
    sinks: Vec<Arc<dyn NotificationSink>>,
    capacity: usize,
}

impl SubscriberSet {
    /// Create an empty set holding at most `capacity` sinks
    pub fn new(capacity: usize) -> Self {
        Self {
            sinks: Vec::new(),
            capacity,
        }
    }

    /// Add a sink; duplicates and overflow are reported
    pub fn add(&mut self, sink: Arc<dyn NotificationSink>) -> Result<()> {
        if self.contains(sink.id()) {
            return Err(KvsError::AlreadySubscribed);
        }
        if self.sinks.len() >= self.capacity {
            return Err(KvsError::SubscriberLimit);
        }
        self.sinks.push(sink);
        Ok(())
    }

    /// Remove the sink with the given id
    pub fn remove(&mut self, id: SinkId) -> Result<()> {
        let before = self.sinks.len();
        self.sinks.retain(|s| s.id() != id);
        if self.sinks.len() == before {
            return Err(KvsError::NotSubscribed);
        }
        Ok(())
    }

    pub fn contains(&self, id: SinkId) -> bool {
        self.sinks.iter().any(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver `(key, value)` to every sink, best effort.
    ///
    /// Returns how many sinks accepted the notification.
    pub fn notify(&self, key: &str, value: &str) -> usize {
        let mut delivered = 0;
        for sink in &self.sinks {
            match sink.notify(key, value) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Notification of {} to {} failed: {}", key, sink.id(), e);
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<SinkId> = self.sinks.iter().map(|s| s.id()).collect();
        f.debug_struct("SubscriberSet")
            .field("sinks", &ids)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// A stored value plus the sinks watching it
#[derive(Debug)]
pub struct KeyRecord {
    pub value: String,
    pub subscribers: SubscriberSet,
}

impl KeyRecord {
    pub fn new(value: String, max_subscribers: usize) -> Self {
        Self {
            value,
            subscribers: SubscriberSet::new(max_subscribers),
        }
    }
}
