//! Session worker pool
//!
//! Fixed set of workers, each taking one handshake at a time from the
//! registration queue and serving that session until it disconnects.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Sender;

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::decode_handshake;
use crate::server::ServerEvent;

use super::queue::RegistrationQueue;
use super::session::Session;

/// Workers serving client sessions
pub struct SessionWorkerPool {
    queue: Arc<RegistrationQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl SessionWorkerPool {
    /// Start `count` workers on `queue`.
    ///
    /// A broken channel inside a session is reported on `events` as
    /// `ServerEvent::Fatal`; the worker then moves on to the next handshake.
    pub fn spawn(
        count: usize,
        queue: Arc<RegistrationQueue>,
        engine: Arc<Engine>,
        events: Sender<ServerEvent>,
    ) -> Result<Self> {
        let mut workers = Vec::with_capacity(count);
        for id in 0..count.max(1) {
            let queue = Arc::clone(&queue);
            let engine = Arc::clone(&engine);
            let events = events.clone();
            let handle = thread::Builder::new()
                .name(format!("session-{}", id))
                .spawn(move || worker_loop(id, &queue, engine, &events))?;
            workers.push(handle);
        }
        Ok(Self { queue, workers })
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue and wait for every worker to finish its current session
    pub fn shutdown(self) {
        self.queue.close();
        for worker in self.workers {
            if worker.join().is_err() {
                tracing::error!("Session worker panicked");
            }
        }
    }
}

fn worker_loop(id: usize, queue: &RegistrationQueue, engine: Arc<Engine>, events: &Sender<ServerEvent>) {
    while let Some(handshake) = queue.pop() {
        let paths = match decode_handshake(&handshake) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!("Session worker {}: bad handshake: {}", id, e);
                continue;
            }
        };

        tracing::debug!(
            "Session worker {}: connecting {}",
            id,
            paths.request.display()
        );

        let session = match Session::open(&paths, Arc::clone(&engine)) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(
                    "Session worker {}: cannot open channels of {}: {}",
                    id,
                    paths.request.display(),
                    e
                );
                continue;
            }
        };

        if let Err(e) = session.run() {
            tracing::error!("Session worker {}: {}", id, e);
            let _ = events.send(ServerEvent::Fatal(e));
        }
    }
    tracing::trace!("Session worker {} exiting", id);
}
