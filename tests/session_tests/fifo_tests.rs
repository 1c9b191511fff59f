//! End-to-end tests over real named pipes
//!
//! These tests verify:
//! - A client can register, subscribe and receive notifications
//! - Rejected requests come back as errors without ending the session
//! - A handshake naming missing channels does not affect other clients
//! - Shutdown stops the server and removes the registration FIFO

use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bucketkv::client::Client;
use bucketkv::config::Config;
use bucketkv::engine::Engine;
use bucketkv::error::{KvsError, Result};
use bucketkv::protocol::{encode_handshake, write_frame, SessionPaths};
use bucketkv::session::{create_fifo, open_writer};
use bucketkv::{Server, ShutdownHandle};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const TIMEOUT: Duration = Duration::from_secs(5);

struct RunningServer {
    register: PathBuf,
    engine: Arc<Engine>,
    shutdown: ShutdownHandle,
    handle: JoinHandle<Result<()>>,
}

impl RunningServer {
    fn stop(self) -> Result<()> {
        self.shutdown.shutdown();
        self.handle.join().unwrap()
    }
}

/// Temp dir under /tmp so FIFO paths stay within the handshake field width
fn short_temp_dir() -> TempDir {
    TempDir::new_in("/tmp").unwrap()
}

fn start_server(dir: &Path) -> RunningServer {
    let register = dir.join("reg");
    let config = Config::builder()
        .jobs_dir(dir)
        .register_path(&register)
        .max_sessions(2)
        .build();

    let server = Server::new(config);
    let engine = Arc::clone(server.engine());
    let shutdown = server.shutdown_handle();
    let handle = thread::spawn(move || server.run());

    wait_until(|| register.exists());
    RunningServer {
        register,
        engine,
        shutdown,
        handle,
    }
}

fn client_paths(dir: &Path, id: &str) -> SessionPaths {
    SessionPaths::new(
        dir.join(format!("req{}", id)),
        dir.join(format!("resp{}", id)),
        dir.join(format!("notif{}", id)),
    )
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let start = std::time::Instant::now();
    while !condition() {
        assert!(start.elapsed() < TIMEOUT, "timed out waiting");
        thread::sleep(Duration::from_millis(5));
    }
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_subscribe_and_receive_notification() {
    let temp_dir = short_temp_dir();
    let server = start_server(temp_dir.path());
    server.engine.table().write("temp", "20").unwrap();

    let mut client = Client::connect(&server.register, client_paths(temp_dir.path(), "1")).unwrap();
    client.subscribe("temp").unwrap();

    server.engine.table().write("temp", "21").unwrap();
    let notification = client.notifications().recv_timeout(TIMEOUT).unwrap();
    assert_eq!(notification, ("temp".to_string(), "21".to_string()));

    client.unsubscribe("temp").unwrap();
    client.disconnect().unwrap();

    server.stop().unwrap();
}

#[test]
fn test_rejected_requests_keep_session() {
    let temp_dir = short_temp_dir();
    let server = start_server(temp_dir.path());
    server.engine.table().write("a", "1").unwrap();

    let mut client = Client::connect(&server.register, client_paths(temp_dir.path(), "1")).unwrap();

    assert!(matches!(
        client.subscribe("missing"),
        Err(KvsError::Rejected { .. })
    ));
    assert!(matches!(
        client.unsubscribe("a"),
        Err(KvsError::Rejected { .. })
    ));
    client.subscribe("a").unwrap();
    assert!(matches!(
        client.subscribe("a"),
        Err(KvsError::Rejected { .. })
    ));

    client.disconnect().unwrap();
    let table = server.engine.table();
    wait_until(|| table.subscriber_count("a").unwrap() == 0);

    server.stop().unwrap();
}

#[test]
fn test_two_clients_fan_out() {
    let temp_dir = short_temp_dir();
    let server = start_server(temp_dir.path());
    server.engine.table().write("k", "0").unwrap();

    let mut first = Client::connect(&server.register, client_paths(temp_dir.path(), "1")).unwrap();
    let mut second = Client::connect(&server.register, client_paths(temp_dir.path(), "2")).unwrap();
    first.subscribe("k").unwrap();
    second.subscribe("k").unwrap();

    server.engine.table().write("k", "1").unwrap();

    for client in [&first, &second] {
        assert_eq!(
            client.notifications().recv_timeout(TIMEOUT).unwrap(),
            ("k".to_string(), "1".to_string())
        );
        assert!(client.notifications().try_recv().is_err());
    }

    first.disconnect().unwrap();
    second.disconnect().unwrap();
    server.stop().unwrap();
}

#[test]
fn test_bad_handshake_does_not_block_others() {
    let temp_dir = short_temp_dir();
    let server = start_server(temp_dir.path());

    // Channels named in this handshake were never created
    let ghost = client_paths(temp_dir.path(), "9");
    {
        let mut register = open_writer(&server.register).unwrap();
        write_frame(&mut register, &encode_handshake(&ghost).unwrap()).unwrap();
    }

    let client = Client::connect(&server.register, client_paths(temp_dir.path(), "1")).unwrap();
    client.disconnect().unwrap();

    server.stop().unwrap();
}

#[test]
fn test_shutdown_runs_jobs_and_removes_fifo() {
    let temp_dir = short_temp_dir();
    std::fs::write(temp_dir.path().join("load.job"), "WRITE [(x,1)]\nREAD [x]\n").unwrap();

    let server = start_server(temp_dir.path());
    let register = server.register.clone();
    let engine = Arc::clone(&server.engine);
    server.stop().unwrap();

    assert!(!register.exists());
    assert_eq!(engine.table().read("x").unwrap(), "1");
    let output = std::fs::read_to_string(temp_dir.path().join("load.out")).unwrap();
    assert_eq!(output, "[(x,1)]\n");
}

#[test]
fn test_create_fifo_replaces_stale_file() {
    let temp_dir = short_temp_dir();
    let path = temp_dir.path().join("stale");
    std::fs::write(&path, "leftover").unwrap();

    create_fifo(&path).unwrap();

    assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());
}
