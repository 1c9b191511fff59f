//! Job Module
//!
//! Batch mode: a directory of `.job` command scripts, each run by exactly one
//! worker and producing one `.out` file with the same base name.
//!
//! ## Command Language
//! ```text
//! WRITE [(key,value)(key2,value2)]
//! READ [key,key2]
//! DELETE [key,key2]
//! SHOW
//! WAIT <delay_ms>
//! BACKUP
//! HELP
//! ```

mod parser;
mod pool;
mod runner;

pub mod output;

pub use parser::{parse_line, Command, HELP_TEXT, MAX_BATCH_SIZE};
pub(crate) use parser::{parse_key_list, split_verb};
pub use pool::{discover_jobs, JobQueue, JobReport, JobWorkerPool};
pub use runner::{process_job_file, JobRunner, JobStats};
