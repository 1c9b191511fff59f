//! Named-pipe channels
//!
//! Opening a FIFO blocks until the other end opens it too, so both sides
//! must open a session's three channels in the same order.

use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::{KvsError, Result};

/// Create a FIFO at `path`, replacing whatever was there
pub fn create_fifo(path: &Path) -> Result<()> {
    remove_fifo(path)?;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| KvsError::Config(format!("FIFO path contains NUL: {}", path.display())))?;

    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o640) };
    if rc != 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(())
}

/// Remove the FIFO at `path`; a missing file is not an error
pub fn remove_fifo(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Open the write end (blocks until a reader shows up)
pub fn open_writer(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().write(true).open(path)?)
}

/// Open the read end (blocks until a writer shows up)
pub fn open_reader(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().read(true).open(path)?)
}

/// Open the registration FIFO for reading.
///
/// Opened read-write so the server holds a writer of its own: the open does
/// not block and the listener never sees EOF when clients come and go.
pub fn open_registration(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().read(true).write(true).open(path)?)
}
