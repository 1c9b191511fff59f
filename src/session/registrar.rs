//! Registrar
//!
//! Listener thread that moves handshakes from the registration channel into
//! the `RegistrationQueue`, one slot at a time.

use std::io::{self, Read};
use std::sync::Arc;

use crate::error::{KvsError, Result};
use crate::protocol::read_handshake;

use super::queue::RegistrationQueue;

/// Owner of the queue's write side
pub struct Registrar {
    queue: Arc<RegistrationQueue>,
}

impl Registrar {
    pub fn new(queue: Arc<RegistrationQueue>) -> Self {
        Self { queue }
    }

    /// Read handshakes from `reader` until it closes or the queue does.
    ///
    /// Waits for a free slot before reading each message, so a full queue
    /// leaves further handshakes sitting in the channel.
    pub fn listen<R: Read>(&self, mut reader: R) -> Result<()> {
        loop {
            let pushed = self.queue.push_with(|slot| {
                *slot = read_handshake(&mut reader)?;
                Ok(())
            });

            match pushed {
                Ok(true) => tracing::trace!("Handshake queued ({} pending)", self.queue.pending()),
                Ok(false) => {
                    tracing::debug!("Registration queue closed, registrar stopping");
                    return Ok(());
                }
                Err(KvsError::Io(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    tracing::info!("Registration channel closed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }
}
