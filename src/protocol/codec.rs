//! Protocol codec
//!
//! Encoding and decoding functions for the fixed-width session protocol.
//! Strings travel as NUL-padded fields; decoding stops at the first NUL.

use std::ffi::OsStr;
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{KvsError, Result};

use super::{
    OpCode, Reply, Request, SessionPaths, FIELD_SIZE, HANDSHAKE_SIZE, MAX_PIPE_PATH_LENGTH,
    MAX_STRING_SIZE, NOTIFICATION_SIZE, REPLY_SIZE, REQUEST_SIZE,
};

// =============================================================================
// Field Helpers
// =============================================================================

/// Append `bytes` NUL-padded to `width`; `max` bounds the payload itself
fn put_field(buf: &mut BytesMut, bytes: &[u8], width: usize, max: usize, what: &str) -> Result<()> {
    if bytes.len() > max {
        return Err(KvsError::Protocol(format!(
            "{} too long: {} bytes (max {})",
            what,
            bytes.len(),
            max
        )));
    }
    buf.put_slice(bytes);
    buf.put_bytes(0, width - bytes.len());
    Ok(())
}

/// Bytes of a field up to its first NUL
fn field(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

fn field_string(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(field(bytes).to_vec())
        .map_err(|_| KvsError::Protocol(format!("{} is not valid UTF-8", what)))
}

fn field_path(bytes: &[u8], what: &str) -> Result<PathBuf> {
    let raw = field(bytes);
    if raw.is_empty() {
        return Err(KvsError::Protocol(format!("Handshake: empty {} path", what)));
    }
    Ok(PathBuf::from(OsStr::from_bytes(raw)))
}

fn path_bytes(path: &Path) -> &[u8] {
    path.as_os_str().as_bytes()
}

// =============================================================================
// Handshake Encoding/Decoding
// =============================================================================

/// Encode a binary handshake
///
/// Format: op (1) + request path (40) + response path (40) + notify path (40)
pub fn encode_handshake(paths: &SessionPaths) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(HANDSHAKE_SIZE);
    buf.put_u8(OpCode::Connect as u8);
    for (path, what) in [
        (&paths.request, "request path"),
        (&paths.response, "response path"),
        (&paths.notify, "notify path"),
    ] {
        put_field(
            &mut buf,
            path_bytes(path),
            MAX_PIPE_PATH_LENGTH,
            MAX_PIPE_PATH_LENGTH,
            what,
        )?;
    }
    Ok(buf.freeze())
}

/// Encode the pipe-delimited text handshake, padded to the binary size
pub fn encode_handshake_text(paths: &SessionPaths) -> Result<Bytes> {
    let mut text = Vec::with_capacity(HANDSHAKE_SIZE);
    text.extend_from_slice(b"1");
    for path in [&paths.request, &paths.response, &paths.notify] {
        text.push(b'|');
        text.extend_from_slice(path_bytes(path));
    }

    let mut buf = BytesMut::with_capacity(HANDSHAKE_SIZE);
    put_field(&mut buf, &text, HANDSHAKE_SIZE, HANDSHAKE_SIZE, "text handshake")?;
    Ok(buf.freeze())
}

/// Decode a handshake in either encoding
pub fn decode_handshake(bytes: &[u8]) -> Result<SessionPaths> {
    match bytes.first().copied() {
        Some(op) if op == OpCode::Connect as u8 => decode_binary_handshake(bytes),
        Some(b'1') => decode_text_handshake(bytes),
        Some(op) => Err(KvsError::Protocol(format!(
            "Handshake: unexpected op code 0x{:02x}",
            op
        ))),
        None => Err(KvsError::Protocol("Handshake: empty message".to_string())),
    }
}

fn decode_binary_handshake(bytes: &[u8]) -> Result<SessionPaths> {
    if bytes.len() < HANDSHAKE_SIZE {
        return Err(KvsError::Protocol(format!(
            "Incomplete handshake: expected {} bytes, got {}",
            HANDSHAKE_SIZE,
            bytes.len()
        )));
    }

    let body = &bytes[1..HANDSHAKE_SIZE];
    let mut fields = body.chunks_exact(MAX_PIPE_PATH_LENGTH);
    let mut next = |what: &str| match fields.next() {
        Some(chunk) => field_path(chunk, what),
        None => Err(KvsError::Protocol("Handshake: missing path".to_string())),
    };

    Ok(SessionPaths {
        request: next("request")?,
        response: next("response")?,
        notify: next("notify")?,
    })
}

fn decode_text_handshake(bytes: &[u8]) -> Result<SessionPaths> {
    let text = field(bytes);
    let parts: Vec<&[u8]> = text.split(|&b| b == b'|').collect();
    if parts.len() != 4 || parts[0] != b"1" {
        return Err(KvsError::Protocol(format!(
            "Malformed text handshake: {:?}",
            String::from_utf8_lossy(text)
        )));
    }

    Ok(SessionPaths {
        request: field_path(parts[1], "request")?,
        response: field_path(parts[2], "response")?,
        notify: field_path(parts[3], "notify")?,
    })
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request
///
/// Format: op (1) + key (41, NUL padded; all NUL for DISCONNECT)
pub fn encode_request(request: &Request) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(REQUEST_SIZE);
    buf.put_u8(request.op_code() as u8);

    let key: &[u8] = match request {
        Request::Disconnect => &[],
        Request::Subscribe { key } | Request::Unsubscribe { key } => key.as_bytes(),
    };
    put_field(&mut buf, key, FIELD_SIZE, MAX_STRING_SIZE, "key")?;
    Ok(buf.freeze())
}

/// Decode a request
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    if bytes.len() < REQUEST_SIZE {
        return Err(KvsError::Protocol(format!(
            "Incomplete request: expected {} bytes, got {}",
            REQUEST_SIZE,
            bytes.len()
        )));
    }

    let payload = &bytes[1..REQUEST_SIZE];
    match OpCode::try_from(bytes[0])? {
        OpCode::Disconnect => Ok(Request::Disconnect),
        OpCode::Subscribe => Ok(Request::Subscribe {
            key: decode_key(payload)?,
        }),
        OpCode::Unsubscribe => Ok(Request::Unsubscribe {
            key: decode_key(payload)?,
        }),
        OpCode::Connect => Err(KvsError::Protocol(
            "CONNECT is only valid on the registration channel".to_string(),
        )),
    }
}

fn decode_key(payload: &[u8]) -> Result<String> {
    let key = field_string(payload, "key")?;
    if key.is_empty() {
        return Err(KvsError::Protocol("Request: empty key".to_string()));
    }
    Ok(key)
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply: op (1) + status (1)
pub fn encode_reply(op: OpCode, status: u8) -> [u8; REPLY_SIZE] {
    [op as u8, status]
}

/// Decode a reply
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    if bytes.len() < REPLY_SIZE {
        return Err(KvsError::Protocol(format!(
            "Incomplete reply: expected {} bytes, got {}",
            REPLY_SIZE,
            bytes.len()
        )));
    }
    Ok(Reply {
        op: OpCode::try_from(bytes[0])?,
        status: bytes[1],
    })
}

// =============================================================================
// Notification Encoding/Decoding
// =============================================================================

/// Encode a notification: key (41) + value (41)
pub fn encode_notification(key: &str, value: &str) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(NOTIFICATION_SIZE);
    put_field(&mut buf, key.as_bytes(), FIELD_SIZE, MAX_STRING_SIZE, "key")?;
    put_field(&mut buf, value.as_bytes(), FIELD_SIZE, MAX_STRING_SIZE, "value")?;
    Ok(buf.freeze())
}

/// Decode a notification into `(key, value)`
pub fn decode_notification(bytes: &[u8]) -> Result<(String, String)> {
    if bytes.len() < NOTIFICATION_SIZE {
        return Err(KvsError::Protocol(format!(
            "Incomplete notification: expected {} bytes, got {}",
            NOTIFICATION_SIZE,
            bytes.len()
        )));
    }
    let key = field_string(&bytes[..FIELD_SIZE], "key")?;
    let value = field_string(&bytes[FIELD_SIZE..NOTIFICATION_SIZE], "value")?;
    Ok((key, value))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one handshake from the registration channel
///
/// Blocks until a full message arrives or the channel closes
pub fn read_handshake<R: Read>(reader: &mut R) -> Result<[u8; HANDSHAKE_SIZE]> {
    let mut message = [0u8; HANDSHAKE_SIZE];
    reader.read_exact(&mut message)?;
    Ok(message)
}

/// Read one raw request frame; decode it with `decode_request`
///
/// A closed channel surfaces as `io::ErrorKind::UnexpectedEof`
pub fn read_request_frame<R: Read>(reader: &mut R) -> io::Result<[u8; REQUEST_SIZE]> {
    let mut message = [0u8; REQUEST_SIZE];
    reader.read_exact(&mut message)?;
    Ok(message)
}

/// Write a whole frame and flush
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}
