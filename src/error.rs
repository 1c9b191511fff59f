//! Error types for bucketkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using KvsError
pub type Result<T> = std::result::Result<T, KvsError>;

/// Unified error type for bucketkv operations
#[derive(Debug, Error)]
pub enum KvsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// Key is absent, or its first character maps to no bucket
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Subscription Errors
    // -------------------------------------------------------------------------
    #[error("Sink is already subscribed to this key")]
    AlreadySubscribed,

    #[error("Subscriber limit reached for this key")]
    SubscriberLimit,

    #[error("Sink is not subscribed to this key")]
    NotSubscribed,

    // -------------------------------------------------------------------------
    // Command / Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Control channel could not be written; the transport itself is broken
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Server rejected {op}: status {status:?}")]
    Rejected { op: &'static str, status: char },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
