//! Bucket table
//!
//! Fixed array of buckets keyed by first character, each behind its own
//! `RwLock`, plus one global `RwLock` for whole-table views.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{KvsError, Result};

use super::hash::{bucket_index, TABLE_SIZE};
use super::subscriber::{KeyRecord, NotificationSink, SinkId};

/// Records whose keys share a first character, ordered by key
pub type Bucket = BTreeMap<String, KeyRecord>;

/// The storage engine's hash table
///
/// ## Concurrency:
/// - `global`: read-held by write/delete batches, write-held by `dump`
/// - `buckets`: write-held by batches that mutate them and by (un)subscribe,
///   read-held by read batches and `snapshot`
/// - Bucket locks are always taken in ascending index order
pub struct BucketTable {
    global: RwLock<()>,
    buckets: Vec<RwLock<Bucket>>,
    max_subscribers: usize,
}

impl BucketTable {
    /// Create an empty table; each key accepts up to `max_subscribers` sinks
    pub fn new(max_subscribers: usize) -> Self {
        Self {
            global: RwLock::new(()),
            buckets: (0..TABLE_SIZE).map(|_| RwLock::new(Bucket::new())).collect(),
            max_subscribers,
        }
    }

    /// Bucket index of `key`, `None` if the key is not addressable
    pub fn hash(key: &str) -> Option<usize> {
        bucket_index(key)
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Write every pair, notifying subscribers of each written key.
    ///
    /// Returns the keys that could not be stored (no bucket for them).
    pub fn write_batch(&self, pairs: &[(String, String)]) -> Vec<String> {
        let _global = self.global.read();
        let mut guards = self.lock_write(pairs.iter().map(|(k, _)| k.as_str()));

        let mut rejected = Vec::new();
        for (key, value) in pairs {
            let bucket = match bucket_index(key) {
                Some(index) => guards[index].as_mut(),
                None => None,
            };
            let Some(bucket) = bucket else {
                rejected.push(key.clone());
                continue;
            };

            let record = bucket
                .entry(key.clone())
                .or_insert_with(|| KeyRecord::new(String::new(), self.max_subscribers));
            record.value.clone_from(value);
            record.subscribers.notify(key, &record.value);
        }
        rejected
    }

    /// Look up every key. Missing or unaddressable keys yield `None`.
    pub fn read_batch(&self, keys: &[String]) -> Vec<(String, Option<String>)> {
        let guards = self.lock_read(keys.iter().map(String::as_str));

        keys.iter()
            .map(|key| {
                let value = bucket_index(key)
                    .and_then(|i| guards[i].as_ref())
                    .and_then(|bucket| bucket.get(key))
                    .map(|record| record.value.clone());
                (key.clone(), value)
            })
            .collect()
    }

    /// Delete every key, dropping their subscribers.
    ///
    /// Returns the keys that were not present.
    pub fn delete_batch(&self, keys: &[String]) -> Vec<String> {
        let _global = self.global.read();
        let mut guards = self.lock_write(keys.iter().map(String::as_str));

        let mut missing = Vec::new();
        for key in keys {
            let removed = match bucket_index(key) {
                Some(index) => guards[index].as_mut().and_then(|bucket| bucket.remove(key)),
                None => None,
            };
            if removed.is_none() {
                missing.push(key.clone());
            }
        }
        missing
    }

    // =========================================================================
    // Single-Key Operations
    // =========================================================================

    /// Store `value` under `key`
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        let rejected = self.write_batch(&[(key.to_string(), value.to_string())]);
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(KvsError::KeyNotFound)
        }
    }

    /// Current value of `key`
    pub fn read(&self, key: &str) -> Result<String> {
        self.read_batch(&[key.to_string()])
            .pop()
            .and_then(|(_, value)| value)
            .ok_or(KvsError::KeyNotFound)
    }

    /// Remove `key` and its subscribers
    pub fn delete(&self, key: &str) -> Result<()> {
        if self.delete_batch(&[key.to_string()]).is_empty() {
            Ok(())
        } else {
            Err(KvsError::KeyNotFound)
        }
    }

    // =========================================================================
    // Whole-Table Views
    // =========================================================================

    /// Every pair, in bucket order then key order.
    ///
    /// Holds the global lock exclusively, so no write or delete batch is
    /// ever observed half applied.
    pub fn dump(&self) -> Vec<(String, String)> {
        let _global = self.global.write();
        let mut pairs = Vec::new();
        for bucket in &self.buckets {
            Self::collect(&bucket.read(), &mut pairs);
        }
        pairs
    }

    /// Copy of every pair taken with all bucket read locks held at once.
    ///
    /// Does not touch the global lock: readers keep going, writers wait only
    /// for the duration of the copy.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let guards: Vec<RwLockReadGuard<'_, Bucket>> =
            self.buckets.iter().map(|bucket| bucket.read()).collect();
        let mut pairs = Vec::new();
        for bucket in &guards {
            Self::collect(bucket, &mut pairs);
        }
        pairs
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        let _global = self.global.write();
        self.buckets.iter().map(|bucket| bucket.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register `sink` for changes to an existing `key`
    pub fn subscribe(&self, key: &str, sink: Arc<dyn NotificationSink>) -> Result<()> {
        let index = bucket_index(key).ok_or(KvsError::KeyNotFound)?;
        let mut bucket = self.buckets[index].write();
        let record = bucket.get_mut(key).ok_or(KvsError::KeyNotFound)?;
        record.subscribers.add(sink)
    }

    /// Stop delivering changes of `key` to the sink `id`
    pub fn unsubscribe(&self, key: &str, id: SinkId) -> Result<()> {
        let index = bucket_index(key).ok_or(KvsError::KeyNotFound)?;
        let mut bucket = self.buckets[index].write();
        let record = bucket.get_mut(key).ok_or(KvsError::KeyNotFound)?;
        record.subscribers.remove(id)
    }

    /// Remove sink `id` from every key. Returns how many keys it watched.
    pub fn drop_subscriber(&self, id: SinkId) -> usize {
        let mut dropped = 0;
        for bucket in &self.buckets {
            let mut bucket = bucket.write();
            for record in bucket.values_mut() {
                if record.subscribers.remove(id).is_ok() {
                    dropped += 1;
                }
            }
        }
        dropped
    }

    /// Number of sinks subscribed to `key`
    pub fn subscriber_count(&self, key: &str) -> Result<usize> {
        let index = bucket_index(key).ok_or(KvsError::KeyNotFound)?;
        let bucket = self.buckets[index].read();
        let record = bucket.get(key).ok_or(KvsError::KeyNotFound)?;
        Ok(record.subscribers.len())
    }

    // =========================================================================
    // Lock Helpers
    // =========================================================================

    /// Distinct bucket indices touched by `keys`, ascending
    fn touched<'k>(keys: impl Iterator<Item = &'k str>) -> BTreeSet<usize> {
        keys.filter_map(bucket_index).collect()
    }

    /// Write-lock the buckets of `keys` in ascending order, indexed by bucket
    fn lock_write<'k>(
        &self,
        keys: impl Iterator<Item = &'k str>,
    ) -> Vec<Option<RwLockWriteGuard<'_, Bucket>>> {
        let mut guards: Vec<Option<RwLockWriteGuard<'_, Bucket>>> =
            (0..TABLE_SIZE).map(|_| None).collect();
        for index in Self::touched(keys) {
            guards[index] = Some(self.buckets[index].write());
        }
        guards
    }

    /// Read-lock the buckets of `keys` in ascending order, indexed by bucket
    fn lock_read<'k>(
        &self,
        keys: impl Iterator<Item = &'k str>,
    ) -> Vec<Option<RwLockReadGuard<'_, Bucket>>> {
        let mut guards: Vec<Option<RwLockReadGuard<'_, Bucket>>> =
            (0..TABLE_SIZE).map(|_| None).collect();
        for index in Self::touched(keys) {
            guards[index] = Some(self.buckets[index].read());
        }
        guards
    }

    fn collect(bucket: &Bucket, out: &mut Vec<(String, String)>) {
        out.extend(
            bucket
                .iter()
                .map(|(key, record)| (key.clone(), record.value.clone())),
        );
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self::new(8)
    }
}
