//! Snapshot backups
//!
//! A backup copies the table while holding every bucket read lock, releases
//! the locks, and hands the copy to a background thread that writes it out.
//! Writers stall only for the copy, never for the file I/O.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::job::output::write_pairs;
use crate::store::BucketTable;

/// Count of running backups plus a condvar signalled when one finishes
#[derive(Default)]
struct InFlight {
    running: Mutex<usize>,
    finished: Condvar,
}

/// Bounded pool of background backup writers
pub struct BackupSnapshotter {
    max_in_flight: usize,
    in_flight: Arc<InFlight>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackupSnapshotter {
    /// Allow at most `max_in_flight` backups at once (at least 1)
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
            in_flight: Arc::new(InFlight::default()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot `table` and write it to `path` in the background.
    ///
    /// Blocks until a backup slot is free.
    pub fn start(&self, table: &BucketTable, path: PathBuf) -> Result<()> {
        self.reap();

        {
            let mut running = self.in_flight.running.lock();
            while *running >= self.max_in_flight {
                self.in_flight.finished.wait(&mut running);
            }
            *running += 1;
        }

        let pairs = table.snapshot();
        let in_flight = Arc::clone(&self.in_flight);

        let spawned = thread::Builder::new()
            .name("backup".to_string())
            .spawn(move || {
                match write_backup(&path, &pairs) {
                    Ok(()) => tracing::info!(
                        "Backup written to {} ({} pairs)",
                        path.display(),
                        pairs.len()
                    ),
                    Err(e) => tracing::error!("Backup to {} failed: {}", path.display(), e),
                }
                *in_flight.running.lock() -= 1;
                in_flight.finished.notify_one();
            });

        match spawned {
            Ok(handle) => {
                self.handles.lock().push(handle);
                Ok(())
            }
            Err(e) => {
                *self.in_flight.running.lock() -= 1;
                self.in_flight.finished.notify_one();
                Err(e.into())
            }
        }
    }

    /// Number of backups still writing
    pub fn in_flight(&self) -> usize {
        *self.in_flight.running.lock()
    }

    /// Join backups that already finished, without blocking.
    ///
    /// Returns how many were reaped.
    pub fn reap(&self) -> usize {
        let mut handles = self.handles.lock();
        let (done, running): (Vec<_>, Vec<_>) =
            handles.drain(..).partition(|handle| handle.is_finished());
        *handles = running;
        drop(handles);

        let reaped = done.len();
        for handle in done {
            if handle.join().is_err() {
                tracing::error!("Backup thread panicked");
            }
        }
        reaped
    }

    /// Block until every backup has finished. Returns how many were joined.
    pub fn wait_all(&self) -> usize {
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        let waited = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Backup thread panicked");
            }
        }
        waited
    }
}

fn write_backup(path: &Path, pairs: &[(String, String)]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_pairs(&mut writer, pairs)?;
    writer.flush()?;
    Ok(())
}
