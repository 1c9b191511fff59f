//! Protocol Module
//!
//! Fixed-width binary framing for client sessions. Every session uses three
//! byte-stream channels (request, response, notify) announced in a handshake
//! sent on the server's registration channel.
//!
//! ## Handshake (registration channel, 121 bytes)
//! ```text
//! ┌──────────┬────────────────┬────────────────┬────────────────┐
//! │ Op (1)=1 │ req path (40)  │ resp path (40) │ notif path (40)│
//! └──────────┴────────────────┴────────────────┴────────────────┘
//! ```
//! The text form `1|req|resp|notif`, NUL padded to 121 bytes, is accepted too.
//!
//! ### Request (request channel, 42 bytes)
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │  Op (1)  │   key (41, NUL padded)      │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Op Codes
//! - 0x01: CONNECT      - handshake only
//! - 0x02: DISCONNECT   - no payload
//! - 0x03: SUBSCRIBE    - key
//! - 0x04: UNSUBSCRIBE  - key
//!
//! ### Replies
//! - connect ack on the response channel: `'1' '0'`
//! - everything else on the notify channel: `Op (1) | status (1)`,
//!   status `'0'` on success, `'1'` otherwise
//!
//! ### Notification (notify channel, 82 bytes, unsolicited)
//! ```text
//! ┌─────────────────────────┬─────────────────────────┐
//! │  key (41, NUL padded)   │  value (41, NUL padded) │
//! └─────────────────────────┴─────────────────────────┘
//! ```

mod codec;
mod opcode;
mod request;

pub use codec::{
    decode_handshake, decode_notification, decode_reply, decode_request, encode_handshake,
    encode_handshake_text, encode_notification, encode_reply, encode_request, read_handshake,
    read_request_frame, write_frame,
};
pub use opcode::OpCode;
pub use request::{Reply, Request, SessionPaths};

/// Longest key or value, in bytes
pub const MAX_STRING_SIZE: usize = 40;

/// Width of a key or value field on the wire (string + NUL)
pub const FIELD_SIZE: usize = MAX_STRING_SIZE + 1;

/// Width of each channel path in a handshake
pub const MAX_PIPE_PATH_LENGTH: usize = 40;

/// Handshake message size
pub const HANDSHAKE_SIZE: usize = 1 + 3 * MAX_PIPE_PATH_LENGTH;

/// Request message size
pub const REQUEST_SIZE: usize = 1 + FIELD_SIZE;

/// Reply message size
pub const REPLY_SIZE: usize = 2;

/// Notification message size
pub const NOTIFICATION_SIZE: usize = 2 * FIELD_SIZE;

/// Reply status: success
pub const STATUS_OK: u8 = b'0';

/// Reply status: failure
pub const STATUS_FAILED: u8 = b'1';

/// Connect acknowledgement written on the response channel
pub const CONNECT_ACK: [u8; REPLY_SIZE] = [b'1', STATUS_OK];
