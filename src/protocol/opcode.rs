//! Op code definitions

use crate::error::KvsError;

/// Single-byte discriminator of a protocol message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Connect = 0x01,
    Disconnect = 0x02,
    Subscribe = 0x03,
    Unsubscribe = 0x04,
}

impl OpCode {
    /// Name used in logs and errors
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Connect => "connect",
            OpCode::Disconnect => "disconnect",
            OpCode::Subscribe => "subscribe",
            OpCode::Unsubscribe => "unsubscribe",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = KvsError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(OpCode::Connect),
            0x02 => Ok(OpCode::Disconnect),
            0x03 => Ok(OpCode::Subscribe),
            0x04 => Ok(OpCode::Unsubscribe),
            _ => Err(KvsError::Protocol(format!("Unknown op code: 0x{:02x}", byte))),
        }
    }
}
