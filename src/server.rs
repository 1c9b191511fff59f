//! Server
//!
//! Wires the registrar, the session workers and the job workers around one
//! shared engine.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KvsError, Result};
use crate::job::{discover_jobs, JobQueue, JobWorkerPool};
use crate::session::{
    create_fifo, open_registration, remove_fifo, RegistrationQueue, Registrar, SessionWorkerPool,
};

/// Something the serving loop must react to
#[derive(Debug)]
pub enum ServerEvent {
    /// A transport broke; the whole server stops
    Fatal(KvsError),

    /// Orderly stop requested
    Shutdown,
}

/// Cloneable handle that asks a running server to stop
#[derive(Clone)]
pub struct ShutdownHandle {
    events: Sender<ServerEvent>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.events.send(ServerEvent::Shutdown);
    }
}

/// bucketkv server
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    events_tx: Sender<ServerEvent>,
    events_rx: Receiver<ServerEvent>,
}

impl Server {
    /// Create a server with a fresh engine
    pub fn new(config: Config) -> Self {
        let engine = Arc::new(Engine::new(config.clone()));
        let (events_tx, events_rx) = channel::unbounded();
        Self {
            config,
            engine,
            events_tx,
            events_rx,
        }
    }

    /// The shared engine
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            events: self.events_tx.clone(),
        }
    }

    /// Serve until shutdown or a fatal transport error.
    ///
    /// 1. Create the registration FIFO and start the registrar
    /// 2. Start the session workers
    /// 3. Run every job in `jobs_dir` to completion
    /// 4. Keep serving sessions until told to stop
    /// 5. Drain sessions and wait for in-flight backups
    pub fn run(&self) -> Result<()> {
        let register_path = &self.config.register_path;
        create_fifo(register_path)?;
        let register = open_registration(register_path)?;
        tracing::info!("Listening for sessions on {}", register_path.display());

        let queue = Arc::new(RegistrationQueue::new(self.config.max_sessions));

        // The registrar blocks on reads of a channel nobody closes; it is
        // left detached and ends with the process.
        let registrar_events = self.events_tx.clone();
        let registrar = Registrar::new(Arc::clone(&queue));
        let _listener = std::thread::Builder::new()
            .name("registrar".to_string())
            .spawn(move || {
                if let Err(e) = registrar.listen(register) {
                    tracing::error!("Registrar failed: {}", e);
                    let _ = registrar_events.send(ServerEvent::Fatal(e));
                }
            })?;

        let sessions = SessionWorkerPool::spawn(
            self.config.max_sessions,
            Arc::clone(&queue),
            Arc::clone(&self.engine),
            self.events_tx.clone(),
        )?;
        tracing::info!("{} session workers started", sessions.size());

        self.run_jobs();

        let outcome = match self.events_rx.recv() {
            Ok(ServerEvent::Fatal(e)) => Err(e),
            Ok(ServerEvent::Shutdown) | Err(_) => Ok(()),
        };

        match outcome {
            Ok(()) => {
                tracing::info!("Shutting down: draining sessions");
                sessions.shutdown();
            }
            // Sessions may be stuck on broken channels; do not wait for them
            Err(ref e) => tracing::error!("Fatal: {}", e),
        }

        self.engine.shutdown();
        if let Err(e) = remove_fifo(register_path) {
            tracing::warn!("Could not remove {}: {}", register_path.display(), e);
        }
        outcome
    }

    /// Run the batch jobs found in `jobs_dir`, if any
    fn run_jobs(&self) {
        let jobs = match discover_jobs(&self.config.jobs_dir) {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(
                    "Cannot read jobs directory {}: {}",
                    self.config.jobs_dir.display(),
                    e
                );
                return;
            }
        };

        let queue = JobQueue::new(jobs);
        tracing::info!(
            "Running {} job(s) on {} thread(s)",
            queue.len(),
            self.config.max_job_threads
        );

        let report = JobWorkerPool::new(self.config.max_job_threads, &self.config.output_dir)
            .run(&self.engine, &queue);
        tracing::info!(
            "Jobs done: {} completed, {} skipped, {} commands, {} invalid, {} backups",
            report.completed,
            report.failed,
            report.stats.commands,
            report.stats.invalid,
            report.stats.backups
        );
    }
}
