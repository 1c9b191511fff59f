//! Client Module
//!
//! Client side of the session protocol.
//!
//! ## Connection sequence
//! 1. Create the request, response and notify FIFOs
//! 2. Send the handshake on the server's registration FIFO
//! 3. Open response (read), request (write), notify (read), the same order
//!    the server opens the opposite ends
//! 4. Read the `'1' '0'` acknowledgement from the response channel
//!
//! A reader thread splits the notify channel: a frame starting with a
//! request op code is a 2-byte reply, anything else is a notification.

mod command;

pub use command::{parse_client_line, ClientCommand};

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{KvsError, Result};
use crate::protocol::{
    decode_notification, decode_reply, encode_handshake, encode_request, write_frame, OpCode,
    Reply, Request, SessionPaths, CONNECT_ACK, NOTIFICATION_SIZE, REPLY_SIZE,
};
use crate::session::{create_fifo, open_reader, open_writer, remove_fifo};

/// A `(key, value)` change pushed by the server
pub type Notification = (String, String);

/// Connected session
pub struct Client {
    paths: SessionPaths,
    request: File,
    _response: File,
    replies: Receiver<Reply>,
    notifications: Receiver<Notification>,
    reader: Option<JoinHandle<()>>,
}

impl Client {
    /// Register with the server listening on `register_path`
    pub fn connect(register_path: &Path, paths: SessionPaths) -> Result<Self> {
        let handshake = encode_handshake(&paths)?;

        create_fifo(&paths.request)?;
        create_fifo(&paths.response)?;
        create_fifo(&paths.notify)?;

        {
            let mut register = open_writer(register_path)?;
            write_frame(&mut register, &handshake)?;
        }

        let mut response = open_reader(&paths.response)?;
        let request = open_writer(&paths.request)?;
        let notify = open_reader(&paths.notify)?;

        let mut ack = [0u8; REPLY_SIZE];
        response.read_exact(&mut ack)?;
        if ack != CONNECT_ACK {
            return Err(KvsError::Rejected {
                op: OpCode::Connect.name(),
                status: ack[1] as char,
            });
        }

        let (reply_tx, replies) = channel::unbounded();
        let (notification_tx, notifications) = channel::unbounded();
        let reader = thread::Builder::new()
            .name("notify-reader".to_string())
            .spawn(move || read_notify_channel(notify, reply_tx, notification_tx))?;

        tracing::debug!("Connected as {}", paths.request.display());
        Ok(Self {
            paths,
            request,
            _response: response,
            replies,
            notifications,
            reader: Some(reader),
        })
    }

    /// Watch `key` for changes
    pub fn subscribe(&mut self, key: &str) -> Result<()> {
        self.call(Request::Subscribe {
            key: key.to_string(),
        })
    }

    /// Stop watching `key`
    pub fn unsubscribe(&mut self, key: &str) -> Result<()> {
        self.call(Request::Unsubscribe {
            key: key.to_string(),
        })
    }

    /// Notifications received so far and from now on
    pub fn notifications(&self) -> &Receiver<Notification> {
        &self.notifications
    }

    /// End the session and remove the FIFOs
    pub fn disconnect(mut self) -> Result<()> {
        let acknowledged = self.call(Request::Disconnect);

        let Client {
            paths,
            request,
            _response,
            reader,
            ..
        } = self;
        drop(request);
        drop(_response);
        if let Some(reader) = reader {
            if reader.join().is_err() {
                tracing::error!("Notify reader panicked");
            }
        }

        for path in [&paths.request, &paths.response, &paths.notify] {
            remove_fifo(path)?;
        }
        acknowledged
    }

    /// Send a request and wait for its reply
    fn call(&mut self, request: Request) -> Result<()> {
        let op = request.op_code();
        write_frame(&mut self.request, &encode_request(&request)?)?;

        let reply = self
            .replies
            .recv()
            .map_err(|_| KvsError::Channel("notify channel closed".to_string()))?;
        if reply.op != op {
            return Err(KvsError::Protocol(format!(
                "Expected {} reply, got {}",
                op.name(),
                reply.op.name()
            )));
        }
        if !reply.is_ok() {
            return Err(KvsError::Rejected {
                op: op.name(),
                status: reply.status as char,
            });
        }
        Ok(())
    }
}

/// Demultiplex the notify channel until the server closes it
fn read_notify_channel(mut notify: File, replies: Sender<Reply>, notifications: Sender<Notification>) {
    loop {
        let mut frame = [0u8; NOTIFICATION_SIZE];
        if let Err(e) = notify.read_exact(&mut frame[..1]) {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                tracing::warn!("Notify channel read failed: {}", e);
            }
            return;
        }

        let is_reply = matches!(
            OpCode::try_from(frame[0]),
            Ok(OpCode::Disconnect | OpCode::Subscribe | OpCode::Unsubscribe)
        );
        let len = if is_reply { REPLY_SIZE } else { NOTIFICATION_SIZE };

        if let Err(e) = notify.read_exact(&mut frame[1..len]) {
            tracing::warn!("Notify channel closed mid-frame: {}", e);
            return;
        }

        let delivered = if is_reply {
            decode_reply(&frame[..len]).map(|reply| replies.send(reply).is_ok())
        } else {
            decode_notification(&frame).map(|pair| notifications.send(pair).is_ok())
        };
        match delivered {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => tracing::warn!("Bad frame on notify channel: {}", e),
        }
    }
}
