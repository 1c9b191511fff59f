//! Notify-channel sink
//!
//! The notify channel carries both request replies and unsolicited
//! notifications, so writes are serialized by a mutex and always whole frames.

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::{encode_notification, write_frame};
use crate::store::{NotificationSink, SinkId};

/// Writer end of a session's notify channel
pub struct ChannelSink {
    id: SinkId,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ChannelSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            id: SinkId::next(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Write one frame and flush
    pub fn send(&self, frame: &[u8]) -> Result<()> {
        write_frame(&mut *self.writer.lock(), frame)
    }
}

impl NotificationSink for ChannelSink {
    fn id(&self) -> SinkId {
        self.id
    }

    fn notify(&self, key: &str, value: &str) -> io::Result<()> {
        let frame = encode_notification(key, value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        let mut writer = self.writer.lock();
        writer.write_all(&frame)?;
        writer.flush()
    }
}
