//! Single-instance lock capability.
//!
//! The lifecycle controller consumes this through the [`InstanceLock`] trait
//! only: `is_locked` and `release` on every termination path, `acquire` once
//! at startup. Releasing more than once is safe; only the first call after a
//! successful acquire does anything.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mutual exclusion between sniffer instances.
pub trait InstanceLock: Send + Sync {
    /// Take the lock. Fails if another instance already holds it.
    fn acquire(&self) -> Result<(), LockError>;

    /// Give the lock back. Safe to call repeatedly and without holding it.
    fn release(&self);

    /// Whether this handle currently holds the lock.
    fn is_locked(&self) -> bool;
}

/// Pid-file based lock under the data directory.
///
/// A second instance sees the file and refuses to start; the pid inside is
/// there for a human cleaning up after a crash.
pub struct FileLock {
    path: PathBuf,
    held: AtomicBool,
}

impl FileLock {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            held: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl InstanceLock for FileLock {
    fn acquire(&self) -> Result<(), LockError> {
        if self.held.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| LockError::Io(e.to_string()))?;
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                let _ = write!(file, "{}", std::process::id());
                self.held.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(LockError::AlreadyLocked(self.path.clone()))
            }
            Err(e) => Err(LockError::Io(e.to_string())),
        }
    }

    fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            let _ = fs::remove_file(&self.path);
        }
    }

    fn is_locked(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lock acquisition errors.
#[derive(Debug)]
pub enum LockError {
    /// Another instance holds the lock file
    AlreadyLocked(PathBuf),
    Io(String),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::AlreadyLocked(path) => {
                write!(f, "another instance is running (lock file {path:?})")
            }
            LockError::Io(e) => write!(f, "lock file error: {e}"),
        }
    }
}

impl std::error::Error for LockError {}
