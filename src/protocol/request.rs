//! Session messages
//!
//! Typed forms of the handshake, requests and replies.

use std::path::PathBuf;

use super::OpCode;

/// Channel triplet identifying one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    /// Client writes requests here
    pub request: PathBuf,

    /// Server writes the connect acknowledgement here
    pub response: PathBuf,

    /// Server writes replies and notifications here
    pub notify: PathBuf,
}

impl SessionPaths {
    pub fn new(
        request: impl Into<PathBuf>,
        response: impl Into<PathBuf>,
        notify: impl Into<PathBuf>,
    ) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
            notify: notify.into(),
        }
    }
}

/// A request read from the request channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// End the session
    Disconnect,

    /// Watch a key
    Subscribe { key: String },

    /// Stop watching a key
    Unsubscribe { key: String },
}

impl Request {
    pub fn op_code(&self) -> OpCode {
        match self {
            Request::Disconnect => OpCode::Disconnect,
            Request::Subscribe { .. } => OpCode::Subscribe,
            Request::Unsubscribe { .. } => OpCode::Unsubscribe,
        }
    }
}

/// Two-byte answer to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub op: OpCode,
    pub status: u8,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.status == super::STATUS_OK
    }
}
