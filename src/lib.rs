//! # bucketkv
//!
//! A concurrent in-memory key-value store with:
//! - Per-bucket reader/writer locks plus one global lock for whole-table views
//! - Batch jobs run by a fixed worker pool
//! - Snapshot backups written in the background
//! - Named-pipe client sessions with per-key change notifications
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐              ┌─────────────────────────────┐
//! │   *.job directory    │              │   registration FIFO         │
//! └──────────┬───────────┘              └──────────────┬──────────────┘
//!            │                                         │
//! ┌──────────▼───────────┐              ┌──────────────▼──────────────┐
//! │    JobWorkerPool     │              │ Registrar → RegistrationQueue│
//! │ (shared job cursor)  │              │      → SessionWorkerPool     │
//! └──────────┬───────────┘              └──────────────┬──────────────┘
//!            │                                         │
//!            └──────────────────┬──────────────────────┘
//!                               ▼
//!                  ┌─────────────────────────┐      ┌──────────────────┐
//!                  │         Engine          │─────►│BackupSnapshotter │
//!                  │  BucketTable (36 RwLock │      │ (background copy │
//!                  │  buckets + global lock) │      │   writers)       │
//!                  └─────────────────────────┘      └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod sync;

pub mod store;
pub mod backup;
pub mod engine;
pub mod protocol;
pub mod session;
pub mod job;
pub mod client;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvsError, Result};
pub use config::Config;
pub use engine::Engine;
pub use server::{Server, ShutdownHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bucketkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
