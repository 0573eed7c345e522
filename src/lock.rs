//! File locking and atomic writes for the local store
//!
//! Two `tb` processes may run against the same data directory (a shell and
//! the board UI, say). Every read-modify-write of the local entries holds an
//! exclusive `fs2` lock on one lock file, and every entry is replaced with
//! write-temp-then-rename so readers never see a half-written snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const LOCK_RETRY_INTERVAL_MS: u64 = 25;

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // Windows reports sharing/lock violations as raw OS errors.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

/// Exclusive lock on the data directory, released on drop
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Acquire the lock, retrying until `timeout_ms` elapses.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(FileLock { file }),
                Err(err) if is_lock_contended(&err) && Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_INTERVAL_MS));
                }
                Err(err) if is_lock_contended(&err) => {
                    tracing::warn!(path = %path.display(), timeout_ms, "data directory lock timed out");
                    return Err(Error::LockFailed(path.to_path_buf()));
                }
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Replace `path` with `data` via a temp file in the same directory.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    let temp_path = path.with_file_name(format!(".{name}.{}.tmp", ulid::Ulid::new()));

    let written = File::create(&temp_path).and_then(|mut temp_file| {
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        drop(temp_file);
        fs::rename(&temp_path, path)
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::Io(err));
    }
    Ok(())
}
