//! Client session
//!
//! One client's lifetime from handshake to disconnect.

use std::io::{self, BufReader, Read, Write};
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{KvsError, Result};
use crate::protocol::{
    decode_request, encode_reply, read_request_frame, write_frame, OpCode, Request, SessionPaths,
    CONNECT_ACK, STATUS_FAILED, STATUS_OK,
};
use crate::store::NotificationSink;

use super::channel::{open_reader, open_writer};
use super::sink::ChannelSink;

/// Protocol state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Channels open, acknowledgement not yet sent
    Handshake,

    /// Serving requests
    Active,

    /// Disconnected; channels are released when the session drops
    Closed,
}

/// A connected client
pub struct Session {
    /// Request channel path, for logging
    label: String,

    state: SessionState,

    request: Box<dyn Read + Send>,

    response: Box<dyn Write + Send>,

    /// Replies and notifications; shared with the keys this session watches
    notify: Arc<ChannelSink>,

    engine: Arc<Engine>,
}

impl Session {
    /// Open the client's channels: response, then request, then notify.
    ///
    /// The client opens the opposite ends in the same order, otherwise both
    /// sides would block forever on their first open.
    pub fn open(paths: &SessionPaths, engine: Arc<Engine>) -> Result<Self> {
        let response = open_writer(&paths.response)?;
        let request = open_reader(&paths.request)?;
        let notify = open_writer(&paths.notify)?;

        Ok(Self::from_channels(
            paths.request.display().to_string(),
            BufReader::new(request),
            response,
            notify,
            engine,
        ))
    }

    /// Build a session over already-open channels
    pub fn from_channels(
        label: impl Into<String>,
        request: impl Read + Send + 'static,
        response: impl Write + Send + 'static,
        notify: impl Write + Send + 'static,
        engine: Arc<Engine>,
    ) -> Self {
        Self {
            label: label.into(),
            state: SessionState::Handshake,
            request: Box::new(request),
            response: Box::new(response),
            notify: Arc::new(ChannelSink::new(notify)),
            engine,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Acknowledge the connection and serve requests until disconnect.
    ///
    /// A closed request channel counts as a disconnect. Errors returned from
    /// here mean a channel is broken, not that the client misbehaved.
    pub fn run(mut self) -> Result<()> {
        write_frame(&mut self.response, &CONNECT_ACK)
            .map_err(|e| KvsError::Channel(format!("{}: connect ack failed: {}", self.label, e)))?;
        self.state = SessionState::Active;
        tracing::debug!("Session {} active", self.label);

        let served = self.serve();
        self.close();
        served
    }

    fn serve(&mut self) -> Result<()> {
        while self.state == SessionState::Active {
            let frame = match read_request_frame(&mut self.request) {
                Ok(frame) => frame,
                Err(ref e) if is_disconnect(e) => {
                    tracing::debug!("Session {}: request channel closed", self.label);
                    break;
                }
                Err(e) => {
                    return Err(KvsError::Channel(format!(
                        "{}: request channel failed: {}",
                        self.label, e
                    )))
                }
            };

            match decode_request(&frame) {
                Ok(request) => {
                    tracing::trace!("Session {}: {:?}", self.label, request);
                    self.dispatch(request)?;
                }
                Err(e) => self.reject(frame[0], e)?,
            }
        }
        Ok(())
    }

    /// Answer a request that failed to decode.
    ///
    /// SUBSCRIBE and UNSUBSCRIBE always get a status, so a bad key is
    /// refused with `'1'`. Unknown op codes are only logged.
    fn reject(&self, op: u8, error: KvsError) -> Result<()> {
        tracing::warn!("Session {}: {}", self.label, error);
        match OpCode::try_from(op) {
            Ok(op @ (OpCode::Subscribe | OpCode::Unsubscribe)) => self.reply(op, STATUS_FAILED),
            _ => Ok(()),
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<()> {
        let table = self.engine.table();
        let op = request.op_code();

        let outcome = match request {
            Request::Disconnect => {
                self.state = SessionState::Closed;
                Ok(())
            }
            Request::Subscribe { key } => table.subscribe(&key, self.notify.clone()),
            Request::Unsubscribe { key } => table.unsubscribe(&key, self.notify.id()),
        };

        let status = match outcome {
            Ok(()) => STATUS_OK,
            Err(e) => {
                tracing::debug!("Session {}: {} refused: {}", self.label, op.name(), e);
                STATUS_FAILED
            }
        };

        self.reply(op, status)
    }

    fn reply(&self, op: OpCode, status: u8) -> Result<()> {
        self.notify.send(&encode_reply(op, status)).map_err(|e| {
            KvsError::Channel(format!("{}: {} reply failed: {}", self.label, op.name(), e))
        })
    }

    /// Leave the session and drop every subscription it still holds
    fn close(&mut self) {
        self.state = SessionState::Closed;
        let dropped = self.engine.table().drop_subscriber(self.notify.id());
        tracing::debug!(
            "Session {} closed ({} subscription(s) dropped)",
            self.label,
            dropped
        );
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
    )
}
