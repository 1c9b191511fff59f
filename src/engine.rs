//! Engine Module
//!
//! The store object shared by every worker.
//!
//! ## Responsibilities
//! - Own the bucket table and its subscriber registry
//! - Own the backup snapshotter and its in-flight limit
//! - Provide one construction point and one teardown point

use std::path::PathBuf;

use crate::backup::BackupSnapshotter;
use crate::config::Config;
use crate::error::Result;
use crate::store::BucketTable;

/// The key-value store
///
/// ## Concurrency Model: Two-Level Locking
///
/// - **Batches** (write/delete): global lock shared, touched buckets exclusive
/// - **Reads**: touched buckets shared, no global lock
/// - **Dump**: global lock exclusive
/// - **Backup**: every bucket shared for the length of a copy, then the
///   copy is written by a background thread
///
/// Job workers and session workers hold an `Arc<Engine>` and go through the
/// same table, so batch and interactive traffic interleave consistently.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Bucketed key space (internal per-bucket RwLocks)
    table: BucketTable,

    /// Background backup writers
    backups: BackupSnapshotter,
}

impl Engine {
    /// Create an empty store
    pub fn new(config: Config) -> Self {
        let table = BucketTable::new(config.max_subscribers);
        let backups = BackupSnapshotter::new(config.max_backups);
        tracing::debug!(
            "Engine ready: max_backups={}, max_subscribers={}",
            config.max_backups,
            config.max_subscribers
        );
        Self {
            config,
            table,
            backups,
        }
    }

    /// The bucket table
    pub fn table(&self) -> &BucketTable {
        &self.table
    }

    /// Start a backup of the current contents into `path`.
    ///
    /// Blocks while `max_backups` backups are already running, then only for
    /// as long as it takes to copy the table.
    pub fn backup(&self, path: PathBuf) -> Result<()> {
        self.backups.start(&self.table, path)
    }

    /// The backup snapshotter
    pub fn backups(&self) -> &BackupSnapshotter {
        &self.backups
    }

    /// Wait for every in-flight backup. Returns how many were waited on.
    pub fn shutdown(&self) -> usize {
        let waited = self.backups.wait_all();
        if waited > 0 {
            tracing::info!("Waited for {} in-flight backup(s)", waited);
        }
        waited
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
