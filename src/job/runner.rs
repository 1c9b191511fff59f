//! Job runner
//!
//! Executes the commands of one job script against the engine and writes
//! their results to the job's output.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use crate::engine::Engine;
use crate::error::{KvsError, Result};

use super::output::{write_delete_missing, write_pairs, write_read_result};
use super::parser::{parse_line, Command, HELP_TEXT};

/// Counters for one job
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobStats {
    /// Commands executed (blank lines excluded)
    pub commands: usize,

    /// Lines rejected by the parser
    pub invalid: usize,

    /// Backups started
    pub backups: usize,
}

/// Runs the commands of a single job
pub struct JobRunner<'e> {
    engine: &'e Engine,

    /// Base name of the job, used to name backups
    job_name: String,

    /// Where backups are written
    output_dir: PathBuf,

    stats: JobStats,
}

impl<'e> JobRunner<'e> {
    pub fn new(engine: &'e Engine, job_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            job_name: job_name.into(),
            output_dir: output_dir.into(),
            stats: JobStats::default(),
        }
    }

    /// Run every line of `input`, writing results to `output`.
    ///
    /// Invalid lines are logged and skipped. I/O failures end the job.
    pub fn run<R: BufRead, W: Write>(mut self, input: R, output: &mut W) -> Result<JobStats> {
        for (number, line) in input.lines().enumerate() {
            let line = line?;
            match parse_line(&line) {
                Ok(Command::Empty) => {}
                Ok(command) => {
                    self.execute(command, output)?;
                    self.stats.commands += 1;
                }
                Err(e) => {
                    self.stats.invalid += 1;
                    tracing::warn!(
                        "{}:{}: Invalid command. See HELP for usage ({})",
                        self.job_name,
                        number + 1,
                        e
                    );
                }
            }
        }
        output.flush()?;
        Ok(self.stats)
    }

    /// Execute a single command
    pub fn execute<W: Write>(&mut self, command: Command, output: &mut W) -> Result<()> {
        let table = self.engine.table();
        match command {
            Command::Write(mut pairs) => {
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                for key in table.write_batch(&pairs) {
                    tracing::warn!("{}: failed to write key {:?}", self.job_name, key);
                }
            }
            Command::Read(mut keys) => {
                keys.sort();
                write_read_result(output, &table.read_batch(&keys))?;
            }
            Command::Delete(mut keys) => {
                keys.sort();
                write_delete_missing(output, &table.delete_batch(&keys))?;
            }
            Command::Show => write_pairs(output, &table.dump())?,
            Command::Wait(delay) => {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
            Command::Backup => {
                self.stats.backups += 1;
                let path = self
                    .output_dir
                    .join(format!("{}-{}.bck", self.job_name, self.stats.backups));
                self.engine.backup(path)?;
            }
            Command::Help => output.write_all(HELP_TEXT.as_bytes())?,
            Command::Empty => {}
        }
        Ok(())
    }
}

/// Run the job at `input_path`, writing `<output_dir>/<stem>.out`
pub fn process_job_file(engine: &Engine, input_path: &Path, output_dir: &Path) -> Result<JobStats> {
    let job_name = input_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| KvsError::Config(format!("Bad job file name: {}", input_path.display())))?;

    let input = BufReader::new(File::open(input_path)?);
    let output_path = output_dir.join(format!("{}.out", job_name));
    let mut output = BufWriter::new(File::create(&output_path)?);

    tracing::debug!("Running job {} -> {}", input_path.display(), output_path.display());
    JobRunner::new(engine, job_name, output_dir).run(input, &mut output)
}
