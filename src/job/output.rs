//! Output formatting
//!
//! - read batches:   `[(k,v)(k2,KVSERROR)]\n`
//! - delete batches: `[(k,KVSMISSING)]\n`, only when something was missing
//! - dumps/backups:  one `(k, v)\n` line per pair

use std::io::{self, Write};

/// Token written in place of a value that could not be read
pub const READ_MISSING: &str = "KVSERROR";

/// Token written for a key that could not be deleted
pub const DELETE_MISSING: &str = "KVSMISSING";

/// Write the result of a read batch
pub fn write_read_result<W: Write>(out: &mut W, results: &[(String, Option<String>)]) -> io::Result<()> {
    out.write_all(b"[")?;
    for (key, value) in results {
        write!(out, "({},{})", key, value.as_deref().unwrap_or(READ_MISSING))?;
    }
    out.write_all(b"]\n")
}

/// Write the keys a delete batch could not find; nothing when all were found
pub fn write_delete_missing<W: Write>(out: &mut W, missing: &[String]) -> io::Result<()> {
    if missing.is_empty() {
        return Ok(());
    }
    out.write_all(b"[")?;
    for key in missing {
        write!(out, "({},{})", key, DELETE_MISSING)?;
    }
    out.write_all(b"]\n")
}

/// Write a dump, one pair per line
pub fn write_pairs<W: Write>(out: &mut W, pairs: &[(String, String)]) -> io::Result<()> {
    for (key, value) in pairs {
        writeln!(out, "({}, {})", key, value)?;
    }
    Ok(())
}
