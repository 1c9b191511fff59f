//! Command parser
//!
//! Turns one line of a job script into a typed `Command`.

use std::time::Duration;

use crate::error::{KvsError, Result};
use crate::protocol::MAX_STRING_SIZE;

/// Most pairs or keys accepted in one batch
pub const MAX_BATCH_SIZE: usize = 256;

/// Characters that delimit batch syntax and may not appear in keys or values
const STRUCTURAL: &[char] = &['[', ']', '(', ')', ','];

/// Usage text emitted by `HELP`
pub const HELP_TEXT: &str = "Available commands:
  WRITE [(key,value),(key2,value2),...]
  READ [key,key2,...]
  DELETE [key,key2,...]
  SHOW
  WAIT <delay_ms>
  BACKUP
  HELP
";

/// A parsed job command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store pairs
    Write(Vec<(String, String)>),

    /// Look up keys
    Read(Vec<String>),

    /// Remove keys
    Delete(Vec<String>),

    /// Dump the whole table
    Show,

    /// Sleep without holding any lock
    Wait(Duration),

    /// Snapshot the table into a numbered backup file
    Backup,

    /// Print usage
    Help,

    /// Blank line or comment
    Empty,
}

/// Parse one line
pub fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Command::Empty);
    }

    let (verb, rest) = split_verb(line);

    match verb {
        "WRITE" => parse_pairs(rest).map(Command::Write),
        "READ" => parse_key_list(rest).map(Command::Read),
        "DELETE" => parse_key_list(rest).map(Command::Delete),
        "SHOW" => no_arguments(verb, rest, Command::Show),
        "BACKUP" => no_arguments(verb, rest, Command::Backup),
        "HELP" => no_arguments(verb, rest, Command::Help),
        "WAIT" => parse_wait(rest),
        _ => Err(KvsError::Parse(format!("Unknown command: {}", verb))),
    }
}

/// Split a line into its verb and the trimmed rest.
///
/// The verb ends at the first whitespace or `[`, so `READ[a]` reads as
/// `READ [a]`.
pub(crate) fn split_verb(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(line.len());
    (&line[..end], line[end..].trim())
}

fn no_arguments(verb: &str, rest: &str, command: Command) -> Result<Command> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(KvsError::Parse(format!("{} takes no arguments", verb)))
    }
}

fn parse_wait(rest: &str) -> Result<Command> {
    rest.parse::<u64>()
        .map(|ms| Command::Wait(Duration::from_millis(ms)))
        .map_err(|_| KvsError::Parse(format!("WAIT expects a delay in ms, got {:?}", rest)))
}

/// Contents between the outer `[` and `]`
fn bracketed(rest: &str) -> Result<&str> {
    rest.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .ok_or_else(|| KvsError::Parse(format!("Expected [...], got {:?}", rest)))
}

fn token(raw: &str) -> Result<String> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(KvsError::Parse("Empty key or value".to_string()));
    }
    if token.len() > MAX_STRING_SIZE {
        return Err(KvsError::Parse(format!(
            "{:?} is longer than {} bytes",
            token, MAX_STRING_SIZE
        )));
    }
    if token.contains(STRUCTURAL) {
        return Err(KvsError::Parse(format!("{:?} contains a reserved character", token)));
    }
    Ok(token.to_string())
}

fn check_batch_size(len: usize) -> Result<()> {
    match len {
        0 => Err(KvsError::Parse("Empty batch".to_string())),
        n if n > MAX_BATCH_SIZE => Err(KvsError::Parse(format!(
            "Batch of {} exceeds {} entries",
            n, MAX_BATCH_SIZE
        ))),
        _ => Ok(()),
    }
}

/// `[k1,k2,...]`
pub(crate) fn parse_key_list(rest: &str) -> Result<Vec<String>> {
    let keys = bracketed(rest)?
        .split(',')
        .map(token)
        .collect::<Result<Vec<_>>>()?;
    check_batch_size(keys.len())?;
    Ok(keys)
}

/// `[(k1,v1)(k2,v2)]`, tuples optionally separated by commas or spaces
fn parse_pairs(rest: &str) -> Result<Vec<(String, String)>> {
    let mut remaining = bracketed(rest)?;
    let mut pairs = Vec::new();

    loop {
        remaining = remaining.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if remaining.is_empty() {
            break;
        }

        let body = remaining
            .strip_prefix('(')
            .ok_or_else(|| KvsError::Parse(format!("Expected '(' at {:?}", remaining)))?;
        let close = body
            .find(')')
            .ok_or_else(|| KvsError::Parse("Unterminated pair".to_string()))?;

        let (key, value) = body[..close]
            .split_once(',')
            .ok_or_else(|| KvsError::Parse(format!("Pair without value: {:?}", &body[..close])))?;
        pairs.push((token(key)?, token(value)?));

        remaining = &body[close + 1..];
    }

    check_batch_size(pairs.len())?;
    Ok(pairs)
}
