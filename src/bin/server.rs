//! bucketkv Server Binary
//!
//! Runs the batch jobs of a directory and serves FIFO client sessions.

use bucketkv::{Config, Server};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// bucketkv Server
#[derive(Parser, Debug)]
#[command(name = "bucketkv-server")]
#[command(about = "Concurrent in-memory key-value store")]
#[command(version)]
struct Args {
    /// Directory holding the .job files
    jobs_dir: String,

    /// Maximum concurrent backups
    max_backups: usize,

    /// Job worker threads
    max_threads: usize,

    /// Registration FIFO path
    register_fifo: String,

    /// Output directory (defaults to the jobs directory)
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Registration slots and session workers
    #[arg(short = 's', long, default_value = "8")]
    max_sessions: usize,

    /// Subscribers allowed per key
    #[arg(short = 'k', long, default_value = "8")]
    max_subscribers: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bucketkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("bucketkv Server v{}", bucketkv::VERSION);
    tracing::info!("Jobs directory: {}", args.jobs_dir);
    tracing::info!("Registration FIFO: {}", args.register_fifo);

    // Build config from args
    let mut builder = Config::builder()
        .jobs_dir(&args.jobs_dir)
        .max_backups(args.max_backups)
        .max_job_threads(args.max_threads)
        .register_path(&args.register_fifo)
        .max_sessions(args.max_sessions)
        .max_subscribers(args.max_subscribers);
    if let Some(output_dir) = &args.output_dir {
        builder = builder.output_dir(output_dir);
    }
    let config = builder.build();

    let server = Server::new(config);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
