//! Tests for the session protocol codec
//!
//! These tests verify:
//! - Frame sizes and padding
//! - Both handshake encodings
//! - Request validation
//! - Reply and notification layout

use std::io::Cursor;

use bucketkv::error::KvsError;
use bucketkv::protocol::{
    decode_handshake, decode_notification, decode_reply, decode_request, encode_handshake,
    encode_handshake_text, encode_notification, encode_reply, encode_request, read_handshake,
    read_request_frame,
    OpCode, Request, SessionPaths, FIELD_SIZE, HANDSHAKE_SIZE, NOTIFICATION_SIZE, REPLY_SIZE,
    REQUEST_SIZE, STATUS_FAILED, STATUS_OK,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_paths() -> SessionPaths {
    SessionPaths::new("/tmp/req1", "/tmp/resp1", "/tmp/notif1")
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[test]
fn test_binary_handshake_layout() {
    let frame = encode_handshake(&sample_paths()).unwrap();

    assert_eq!(frame.len(), HANDSHAKE_SIZE);
    assert_eq!(frame[0], OpCode::Connect as u8);
    assert_eq!(&frame[1..10], b"/tmp/req1");
    assert_eq!(frame[10], 0);
    assert_eq!(&frame[41..51], b"/tmp/resp1");
    assert_eq!(&frame[81..92], b"/tmp/notif1");

    assert_eq!(decode_handshake(&frame).unwrap(), sample_paths());
}

#[test]
fn test_text_handshake_accepted() {
    let frame = encode_handshake_text(&sample_paths()).unwrap();

    assert_eq!(frame.len(), HANDSHAKE_SIZE);
    assert!(frame.starts_with(b"1|/tmp/req1|/tmp/resp1|/tmp/notif1\0"));
    assert_eq!(decode_handshake(&frame).unwrap(), sample_paths());
}

#[test]
fn test_handshake_path_too_long() {
    let long = format!("/tmp/{}", "p".repeat(40));
    let paths = SessionPaths::new(long, "/tmp/resp", "/tmp/notif");

    assert!(matches!(
        encode_handshake(&paths),
        Err(KvsError::Protocol(_))
    ));
}

#[test]
fn test_handshake_rejects_bad_messages() {
    let mut frame = encode_handshake(&sample_paths()).unwrap().to_vec();

    // Truncated
    assert!(decode_handshake(&frame[..50]).is_err());

    // Wrong op code
    frame[0] = OpCode::Subscribe as u8;
    assert!(decode_handshake(&frame).is_err());

    // Empty notify path
    let mut frame = encode_handshake(&sample_paths()).unwrap().to_vec();
    frame[81..].fill(0);
    assert!(decode_handshake(&frame).is_err());

    // Text form with a missing field
    let mut text = b"1|/tmp/a|/tmp/b".to_vec();
    text.resize(HANDSHAKE_SIZE, 0);
    assert!(decode_handshake(&text).is_err());
}

// =============================================================================
// Request Tests
// =============================================================================

#[test]
fn test_subscribe_request_layout() {
    let request = Request::Subscribe {
        key: "temp".to_string(),
    };
    let frame = encode_request(&request).unwrap();

    assert_eq!(frame.len(), REQUEST_SIZE);
    assert_eq!(frame[0], 3);
    assert_eq!(&frame[1..5], b"temp");
    assert!(frame[5..].iter().all(|&b| b == 0));
    assert_eq!(decode_request(&frame).unwrap(), request);
}

#[test]
fn test_disconnect_request_has_empty_key() {
    let frame = encode_request(&Request::Disconnect).unwrap();

    assert_eq!(frame[0], 2);
    assert!(frame[1..].iter().all(|&b| b == 0));
    assert_eq!(decode_request(&frame).unwrap(), Request::Disconnect);
}

#[test]
fn test_key_of_max_length_fits() {
    let key = "k".repeat(40);
    let request = Request::Unsubscribe { key: key.clone() };
    let frame = encode_request(&request).unwrap();

    assert_eq!(frame[REQUEST_SIZE - 1], 0);
    assert_eq!(decode_request(&frame).unwrap(), request);

    let too_long = Request::Subscribe { key: "k".repeat(41) };
    assert!(encode_request(&too_long).is_err());
}

#[test]
fn test_decode_request_errors() {
    let mut frame = [0u8; REQUEST_SIZE];

    // Unknown op code
    frame[0] = 9;
    assert!(matches!(decode_request(&frame), Err(KvsError::Protocol(_))));

    // CONNECT is only valid as a handshake
    frame[0] = OpCode::Connect as u8;
    assert!(matches!(decode_request(&frame), Err(KvsError::Protocol(_))));

    // SUBSCRIBE without a key
    frame[0] = OpCode::Subscribe as u8;
    assert!(matches!(decode_request(&frame), Err(KvsError::Protocol(_))));

    // Short frame
    assert!(decode_request(&frame[..10]).is_err());
}

#[test]
fn test_read_request_frame_eof() {
    let mut empty = Cursor::new(Vec::new());

    let err = read_request_frame(&mut empty).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn test_read_request_sequence() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&encode_request(&Request::Subscribe { key: "a".to_string() }).unwrap());
    stream.extend_from_slice(&encode_request(&Request::Disconnect).unwrap());
    let mut cursor = Cursor::new(stream);

    let first = read_request_frame(&mut cursor).unwrap();
    assert_eq!(
        decode_request(&first).unwrap(),
        Request::Subscribe { key: "a".to_string() }
    );
    let second = read_request_frame(&mut cursor).unwrap();
    assert_eq!(decode_request(&second).unwrap(), Request::Disconnect);
}

#[test]
fn test_read_handshake_from_stream() {
    let frame = encode_handshake(&sample_paths()).unwrap();
    let mut cursor = Cursor::new(frame.to_vec());

    let message = read_handshake(&mut cursor).unwrap();
    assert_eq!(decode_handshake(&message).unwrap(), sample_paths());
    assert!(read_handshake(&mut cursor).is_err());
}

#[test]
fn test_bad_subscribe_key_is_protocol_error() {
    let mut frame = [0u8; REQUEST_SIZE];
    frame[0] = OpCode::Subscribe as u8;
    frame[1] = 0xff;

    assert!(matches!(decode_request(&frame), Err(KvsError::Protocol(_))));
}

// =============================================================================
// Reply / Notification Tests
// =============================================================================

#[test]
fn test_reply_encoding() {
    let ok = encode_reply(OpCode::Subscribe, STATUS_OK);
    assert_eq!(ok, [3, b'0']);
    assert_eq!(ok.len(), REPLY_SIZE);

    let reply = decode_reply(&ok).unwrap();
    assert_eq!(reply.op, OpCode::Subscribe);
    assert!(reply.is_ok());

    let failed = decode_reply(&encode_reply(OpCode::Unsubscribe, STATUS_FAILED)).unwrap();
    assert!(!failed.is_ok());
}

#[test]
fn test_notification_layout() {
    let frame = encode_notification("temp", "21").unwrap();

    assert_eq!(frame.len(), NOTIFICATION_SIZE);
    assert_eq!(&frame[..4], b"temp");
    assert_eq!(&frame[FIELD_SIZE..FIELD_SIZE + 2], b"21");
    assert_eq!(
        decode_notification(&frame).unwrap(),
        ("temp".to_string(), "21".to_string())
    );
}

#[test]
fn test_notification_value_too_long() {
    assert!(encode_notification("k", &"v".repeat(41)).is_err());
}
