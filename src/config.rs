//! Configuration for bucketkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a bucketkv server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Batch Configuration
    // -------------------------------------------------------------------------
    /// Directory scanned for `*.job` command scripts
    pub jobs_dir: PathBuf,

    /// Directory receiving `.out` results and `.bck` backups
    /// Layout:
    ///   {output_dir}/
    ///     ├── {job}.out        (one per job file)
    ///     └── {job}-{n}.bck    (one per BACKUP command)
    pub output_dir: PathBuf,

    /// Number of job worker threads
    pub max_job_threads: usize,

    // -------------------------------------------------------------------------
    // Backup Configuration
    // -------------------------------------------------------------------------
    /// Max backups serializing at the same time
    pub max_backups: usize,

    // -------------------------------------------------------------------------
    // Session Configuration
    // -------------------------------------------------------------------------
    /// Well-known FIFO where clients send their handshake
    pub register_path: PathBuf,

    /// Registration ring slots, and number of session workers
    pub max_sessions: usize,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Max subscribers a single key accepts
    pub max_subscribers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs_dir: PathBuf::from("./jobs"),
            output_dir: PathBuf::from("./jobs"),
            max_job_threads: 4,
            max_backups: 1,
            register_path: PathBuf::from("/tmp/bucketkv_register"),
            max_sessions: 8,
            max_subscribers: 8,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    output_dir_set: bool,
}

impl ConfigBuilder {
    /// Set the jobs directory (output directory follows it unless set explicitly)
    pub fn jobs_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.jobs_dir = path.into();
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self.output_dir_set = true;
        self
    }

    /// Set the number of job worker threads
    pub fn max_job_threads(mut self, count: usize) -> Self {
        self.config.max_job_threads = count;
        self
    }

    /// Set the number of concurrent backups
    pub fn max_backups(mut self, count: usize) -> Self {
        self.config.max_backups = count;
        self
    }

    /// Set the registration FIFO path
    pub fn register_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.register_path = path.into();
        self
    }

    /// Set the registration ring size / session worker count
    pub fn max_sessions(mut self, count: usize) -> Self {
        self.config.max_sessions = count;
        self
    }

    /// Set the per-key subscriber capacity
    pub fn max_subscribers(mut self, count: usize) -> Self {
        self.config.max_subscribers = count;
        self
    }

    /// Finish the config. Counts are clamped to at least 1.
    pub fn build(mut self) -> Config {
        if !self.output_dir_set {
            self.config.output_dir = self.config.jobs_dir.clone();
        }
        self.config.max_job_threads = self.config.max_job_threads.max(1);
        self.config.max_backups = self.config.max_backups.max(1);
        self.config.max_sessions = self.config.max_sessions.max(1);
        self.config.max_subscribers = self.config.max_subscribers.max(1);
        self.config
    }
}
