//! Job worker pool
//!
//! A fixed number of workers share one cursor over the discovered job
//! files. Each claim is `lock, read-and-increment, unlock`, so every job is
//! run by exactly one worker and workers exit once the list is exhausted.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::error::Result;

use super::runner::{process_job_file, JobStats};

/// List every `*.job` file in `dir`, sorted by name
pub fn discover_jobs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut jobs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_job = path.extension().map(|ext| ext == "job").unwrap_or(false);
        if is_job && path.is_file() {
            jobs.push(path);
        }
    }
    jobs.sort();
    Ok(jobs)
}

/// Job files plus the shared claim cursor
pub struct JobQueue {
    jobs: Vec<PathBuf>,
    cursor: Mutex<usize>,
}

impl JobQueue {
    pub fn new(jobs: Vec<PathBuf>) -> Self {
        Self {
            jobs,
            cursor: Mutex::new(0),
        }
    }

    /// Claim the next unprocessed job
    pub fn claim(&self) -> Option<&Path> {
        let mut cursor = self.cursor.lock();
        let job = self.jobs.get(*cursor)?;
        *cursor += 1;
        Some(job)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Totals across all jobs of one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    /// Jobs run to completion
    pub completed: usize,

    /// Jobs skipped because their files could not be read or written
    pub failed: usize,

    /// Summed per-job counters
    pub stats: JobStats,
}

impl JobReport {
    fn merge(&mut self, other: JobReport) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.stats.commands += other.stats.commands;
        self.stats.invalid += other.stats.invalid;
        self.stats.backups += other.stats.backups;
    }
}

/// Fixed pool of job workers
pub struct JobWorkerPool {
    threads: usize,
    output_dir: PathBuf,
}

impl JobWorkerPool {
    /// `threads` workers writing into `output_dir`
    pub fn new(threads: usize, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            threads: threads.max(1),
            output_dir: output_dir.into(),
        }
    }

    /// Drain `queue`, blocking until every worker has exited
    pub fn run(&self, engine: &Engine, queue: &JobQueue) -> JobReport {
        let mut report = JobReport::default();

        thread::scope(|scope| {
            let workers: Vec<_> = (0..self.threads)
                .map(|id| scope.spawn(move || self.worker(id, engine, queue)))
                .collect();

            for worker in workers {
                match worker.join() {
                    Ok(partial) => report.merge(partial),
                    Err(_) => tracing::error!("Job worker panicked"),
                }
            }
        });

        report
    }

    fn worker(&self, id: usize, engine: &Engine, queue: &JobQueue) -> JobReport {
        let mut report = JobReport::default();
        while let Some(job) = queue.claim() {
            tracing::trace!("Job worker {} claimed {}", id, job.display());
            match process_job_file(engine, job, &self.output_dir) {
                Ok(stats) => {
                    report.completed += 1;
                    report.stats.commands += stats.commands;
                    report.stats.invalid += stats.invalid;
                    report.stats.backups += stats.backups;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Skipping job {}: {}", job.display(), e);
                }
            }
        }
        report
    }
}
