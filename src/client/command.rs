//! Client command parser
//!
//! ```text
//! SUBSCRIBE [key]
//! UNSUBSCRIBE [key]
//! DELAY <delay_ms>
//! DISCONNECT
//! ```

use std::time::Duration;

use crate::error::{KvsError, Result};
use crate::job::{parse_key_list, split_verb};

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Subscribe(String),
    Unsubscribe(String),
    Delay(Duration),
    Disconnect,
    /// Blank line or comment
    Empty,
}

/// Parse one line of client input
pub fn parse_client_line(line: &str) -> Result<ClientCommand> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(ClientCommand::Empty);
    }

    let (verb, rest) = split_verb(line);

    match verb {
        "SUBSCRIBE" => single_key(rest).map(ClientCommand::Subscribe),
        "UNSUBSCRIBE" => single_key(rest).map(ClientCommand::Unsubscribe),
        "DELAY" => rest
            .parse::<u64>()
            .map(|ms| ClientCommand::Delay(Duration::from_millis(ms)))
            .map_err(|_| KvsError::Parse(format!("DELAY expects a delay in ms, got {:?}", rest))),
        "DISCONNECT" if rest.is_empty() => Ok(ClientCommand::Disconnect),
        _ => Err(KvsError::Parse(format!("Unknown command: {}", line))),
    }
}

fn single_key(rest: &str) -> Result<String> {
    let mut keys = parse_key_list(rest)?;
    match keys.len() {
        1 => Ok(keys.remove(0)),
        n => Err(KvsError::Parse(format!("Expected one key, got {}", n))),
    }
}
