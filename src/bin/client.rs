//! bucketkv Client Binary
//!
//! Reads SUBSCRIBE / UNSUBSCRIBE / DELAY / DISCONNECT commands from stdin and
//! prints every notification as `(key,value)`.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use bucketkv::client::{parse_client_line, Client, ClientCommand};
use bucketkv::protocol::SessionPaths;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// bucketkv Client
#[derive(Parser, Debug)]
#[command(name = "bucketkv-client")]
#[command(about = "Subscribe to key changes on a bucketkv server")]
#[command(version)]
struct Args {
    /// Unique id, appended to this client's FIFO names
    client_id: String,

    /// Server registration FIFO
    register_fifo: PathBuf,

    /// Directory for this client's FIFOs
    #[arg(short, long, default_value = "/tmp")]
    fifo_dir: PathBuf,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();
    let paths = SessionPaths::new(
        args.fifo_dir.join(format!("req{}", args.client_id)),
        args.fifo_dir.join(format!("resp{}", args.client_id)),
        args.fifo_dir.join(format!("notif{}", args.client_id)),
    );

    let mut client = match Client::connect(&args.register_fifo, paths) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to connect to the server: {}", e);
            std::process::exit(1);
        }
    };

    let notifications = client.notifications().clone();
    thread::spawn(move || {
        for (key, value) in notifications.iter() {
            println!("({},{})", key, value);
        }
    });

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("stdin: {}", e);
                break;
            }
        };

        let command = match parse_client_line(&line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Invalid command ({})", e);
                continue;
            }
        };

        let outcome = match command {
            ClientCommand::Subscribe(key) => client.subscribe(&key),
            ClientCommand::Unsubscribe(key) => client.unsubscribe(&key),
            ClientCommand::Delay(delay) => {
                thread::sleep(delay);
                Ok(())
            }
            ClientCommand::Disconnect => break,
            ClientCommand::Empty => Ok(()),
        };
        if let Err(e) = outcome {
            tracing::warn!("{}", e);
        }
    }

    match client.disconnect() {
        Ok(()) => println!("Disconnected from server"),
        Err(e) => {
            tracing::error!("Failed to disconnect: {}", e);
            std::process::exit(1);
        }
    }
}
