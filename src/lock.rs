//! Advisory lock serialising runs that share one credentials file.
//!
//! Held from before the stores are read until the run finishes, so two runs cannot
//! interleave their loads and saves. Processes that ignore the lock are not stopped.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock without waiting; a concurrent holder makes this fail.
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_err = |reason: String| Error::Lock {
            path: path.to_path_buf(),
            reason,
        };

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| lock_err(e.to_string()))?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(lock_err("another login is already running".to_string()));
            }
            Err(TryLockError::Error(e)) => return Err(lock_err(e.to_string())),
        }
        debug!("Acquired {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if self.file.unlock().is_ok() {
            debug!("Released {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_holder_is_refused_until_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".lock");

        let first = RunLock::acquire(&path).unwrap();
        assert!(matches!(RunLock::acquire(&path), Err(Error::Lock { .. })));

        drop(first);
        assert!(RunLock::acquire(&path).is_ok());
    }
}
