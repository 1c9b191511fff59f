//! Tests for sessions and registration
//!
//! These tests verify:
//! - Session replies for subscribe / unsubscribe / disconnect
//! - Notifications reach a subscribed session
//! - EOF on the request channel closes the session and drops its subscriptions
//! - Broken notify channels surface as channel errors
//! - Registration queue backpressure and close semantics

use std::io::{self, Cursor, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bucketkv::config::Config;
use bucketkv::engine::Engine;
use bucketkv::error::KvsError;
use bucketkv::protocol::{
    encode_handshake, encode_notification, encode_request, Request, SessionPaths, CONNECT_ACK,
    HANDSHAKE_SIZE, REQUEST_SIZE,
};
use bucketkv::session::{RegistrationQueue, Registrar, Session, SessionState};
use bucketkv::sync::Semaphore;
use parking_lot::Mutex;

// =============================================================================
// Helper Functions
// =============================================================================

/// Writer whose bytes stay inspectable after it is moved into a session
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn bytes(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer whose reader has gone away
struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader gone"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn setup_engine() -> Arc<Engine> {
    let engine = Arc::new(Engine::new(Config::default()));
    engine.table().write("temp", "20").unwrap();
    engine
}

fn requests(items: &[Request]) -> Cursor<Vec<u8>> {
    let mut stream = Vec::new();
    for request in items {
        stream.extend_from_slice(&encode_request(request).unwrap());
    }
    Cursor::new(stream)
}

fn subscribe(key: &str) -> Request {
    Request::Subscribe {
        key: key.to_string(),
    }
}

fn unsubscribe(key: &str) -> Request {
    Request::Unsubscribe {
        key: key.to_string(),
    }
}

fn handshake(id: usize) -> [u8; HANDSHAKE_SIZE] {
    let paths = SessionPaths::new(
        format!("/tmp/req{}", id),
        format!("/tmp/resp{}", id),
        format!("/tmp/notif{}", id),
    );
    let mut message = [0u8; HANDSHAKE_SIZE];
    message.copy_from_slice(&encode_handshake(&paths).unwrap());
    message
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_session_replies() {
    let engine = setup_engine();
    let response = SharedBuffer::default();
    let notify = SharedBuffer::default();

    let session = Session::from_channels(
        "test",
        requests(&[
            subscribe("temp"),
            subscribe("temp"),
            subscribe("missing"),
            unsubscribe("temp"),
            unsubscribe("temp"),
            Request::Disconnect,
        ]),
        response.clone(),
        notify.clone(),
        Arc::clone(&engine),
    );
    assert_eq!(session.state(), SessionState::Handshake);

    session.run().unwrap();

    assert_eq!(response.bytes(), CONNECT_ACK.to_vec());
    assert_eq!(
        notify.bytes(),
        vec![3, b'0', 3, b'1', 3, b'1', 4, b'0', 4, b'1', 2, b'0']
    );
}

#[test]
fn test_requests_after_disconnect_are_ignored() {
    let engine = setup_engine();
    let notify = SharedBuffer::default();

    Session::from_channels(
        "test",
        requests(&[Request::Disconnect, subscribe("temp")]),
        SharedBuffer::default(),
        notify.clone(),
        Arc::clone(&engine),
    )
    .run()
    .unwrap();

    assert_eq!(notify.bytes(), vec![2, b'0']);
    assert_eq!(engine.table().subscriber_count("temp").unwrap(), 0);
}

#[test]
fn test_eof_closes_session_and_drops_subscriptions() {
    let engine = setup_engine();
    engine.table().write("other", "1").unwrap();

    Session::from_channels(
        "test",
        requests(&[subscribe("temp"), subscribe("other")]),
        SharedBuffer::default(),
        SharedBuffer::default(),
        Arc::clone(&engine),
    )
    .run()
    .unwrap();

    assert_eq!(engine.table().subscriber_count("temp").unwrap(), 0);
    assert_eq!(engine.table().subscriber_count("other").unwrap(), 0);
}

#[test]
fn test_malformed_request_keeps_session_open() {
    let engine = setup_engine();
    let notify = SharedBuffer::default();

    let mut stream = vec![9u8; REQUEST_SIZE];
    stream.extend_from_slice(&encode_request(&Request::Disconnect).unwrap());

    Session::from_channels(
        "test",
        Cursor::new(stream),
        SharedBuffer::default(),
        notify.clone(),
        engine,
    )
    .run()
    .unwrap();

    assert_eq!(notify.bytes(), vec![2, b'0']);
}

#[test]
fn test_undecodable_key_is_refused() {
    let engine = setup_engine();
    let notify = SharedBuffer::default();

    let mut empty_key = vec![0u8; REQUEST_SIZE];
    empty_key[0] = 3;
    let mut invalid_utf8 = vec![0u8; REQUEST_SIZE];
    invalid_utf8[0] = 3;
    invalid_utf8[1] = 0xff;
    let mut empty_unsubscribe = vec![0u8; REQUEST_SIZE];
    empty_unsubscribe[0] = 4;

    let mut stream = Vec::new();
    stream.extend_from_slice(&empty_key);
    stream.extend_from_slice(&invalid_utf8);
    stream.extend_from_slice(&empty_unsubscribe);
    stream.extend_from_slice(&encode_request(&Request::Disconnect).unwrap());

    Session::from_channels(
        "test",
        Cursor::new(stream),
        SharedBuffer::default(),
        notify.clone(),
        engine,
    )
    .run()
    .unwrap();

    assert_eq!(notify.bytes(), vec![3, b'1', 3, b'1', 4, b'1', 2, b'0']);
}

#[test]
fn test_broken_notify_channel_is_channel_error() {
    let engine = setup_engine();

    let result = Session::from_channels(
        "test",
        requests(&[subscribe("temp")]),
        SharedBuffer::default(),
        ClosedPipe,
        Arc::clone(&engine),
    )
    .run();

    assert!(matches!(result, Err(KvsError::Channel(_))));
    assert_eq!(engine.table().subscriber_count("temp").unwrap(), 0);
}

#[test]
fn test_broken_response_channel_is_channel_error() {
    let result = Session::from_channels(
        "test",
        requests(&[]),
        ClosedPipe,
        SharedBuffer::default(),
        setup_engine(),
    )
    .run();

    assert!(matches!(result, Err(KvsError::Channel(_))));
}

#[test]
fn test_subscribed_session_receives_notifications() {
    let engine = setup_engine();
    let notify = SharedBuffer::default();
    let (mut client, server) = UnixStream::pair().unwrap();

    let session = Session::from_channels(
        "test",
        server,
        SharedBuffer::default(),
        notify.clone(),
        Arc::clone(&engine),
    );
    let handle = thread::spawn(move || session.run());

    client
        .write_all(&encode_request(&subscribe("temp")).unwrap())
        .unwrap();
    // Wait for the subscribe reply so it precedes the notifications
    while notify.bytes().len() < 2 {
        thread::sleep(Duration::from_millis(5));
    }

    engine.table().write("temp", "21").unwrap();
    engine.table().write("temp", "22").unwrap();

    client
        .write_all(&encode_request(&Request::Disconnect).unwrap())
        .unwrap();
    handle.join().unwrap().unwrap();

    let mut expected = vec![3, b'0'];
    expected.extend_from_slice(&encode_notification("temp", "21").unwrap());
    expected.extend_from_slice(&encode_notification("temp", "22").unwrap());
    expected.extend_from_slice(&[2, b'0']);
    assert_eq!(notify.bytes(), expected);
}

// =============================================================================
// Registration Queue Tests
// =============================================================================

#[test]
fn test_queue_is_fifo() {
    let queue = RegistrationQueue::new(4);

    assert!(queue.push(handshake(1)));
    assert!(queue.push(handshake(2)));
    assert_eq!(queue.pending(), 2);

    assert_eq!(queue.pop().unwrap(), handshake(1));
    assert_eq!(queue.pop().unwrap(), handshake(2));
    assert_eq!(queue.pending(), 0);
}

#[test]
fn test_queue_wraps_around() {
    let queue = RegistrationQueue::new(2);

    for id in 0..7 {
        assert!(queue.push(handshake(id)));
        assert_eq!(queue.pop().unwrap(), handshake(id));
    }
}

#[test]
fn test_full_queue_blocks_producer() {
    let queue = Arc::new(RegistrationQueue::new(2));
    queue.push(handshake(1));
    queue.push(handshake(2));

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.push(handshake(3)))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!producer.is_finished());

    assert_eq!(queue.pop().unwrap(), handshake(1));
    assert!(producer.join().unwrap());
    assert_eq!(queue.pop().unwrap(), handshake(2));
    assert_eq!(queue.pop().unwrap(), handshake(3));
}

#[test]
fn test_close_drains_then_stops() {
    let queue = Arc::new(RegistrationQueue::new(2));
    queue.push(handshake(1));

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut popped = Vec::new();
            while let Some(message) = queue.pop() {
                popped.push(message);
            }
            popped
        })
    };
    thread::sleep(Duration::from_millis(20));
    queue.close();

    assert_eq!(consumer.join().unwrap(), vec![handshake(1)]);
    assert!(queue.is_closed());
    assert!(!queue.push(handshake(2)));
}

#[test]
fn test_registrar_reads_until_eof() {
    let queue = Arc::new(RegistrationQueue::new(4));
    let mut channel = Vec::new();
    channel.extend_from_slice(&handshake(1));
    channel.extend_from_slice(&handshake(2));
    // Partial trailing message is discarded
    channel.extend_from_slice(&handshake(3)[..30]);

    Registrar::new(Arc::clone(&queue))
        .listen(Cursor::new(channel))
        .unwrap();

    assert_eq!(queue.pending(), 2);
    assert_eq!(queue.pop().unwrap(), handshake(1));
    assert_eq!(queue.pop().unwrap(), handshake(2));
}

#[test]
fn test_registrar_stops_when_queue_closes() {
    let queue = Arc::new(RegistrationQueue::new(1));
    let (mut client, server) = UnixStream::pair().unwrap();
    client.write_all(&handshake(1)).unwrap();

    let listener = {
        let registrar = Registrar::new(Arc::clone(&queue));
        thread::spawn(move || registrar.listen(server))
    };
    while queue.pending() == 0 {
        thread::sleep(Duration::from_millis(5));
    }

    // Registrar now waits for a free slot
    queue.close();
    listener.join().unwrap().unwrap();
    drop(client);
}

// =============================================================================
// Semaphore Tests
// =============================================================================

#[test]
fn test_semaphore_counts_permits() {
    let semaphore = Semaphore::new(2);

    assert!(semaphore.acquire());
    assert!(semaphore.acquire());
    assert_eq!(semaphore.available_permits(), 0);

    semaphore.release();
    assert_eq!(semaphore.available_permits(), 1);
}

#[test]
fn test_closed_semaphore_releases_waiters() {
    let semaphore = Arc::new(Semaphore::new(0));

    let waiter = {
        let semaphore = Arc::clone(&semaphore);
        thread::spawn(move || semaphore.acquire())
    };
    thread::sleep(Duration::from_millis(20));
    semaphore.close();

    assert!(!waiter.join().unwrap());
}
