//! Single-instance guard for long polling: two pollers on one token fight over updates.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("failed to open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("another instance already holds {0}")]
    AlreadyRunning(PathBuf),
}

/// Held for the lifetime of the process; the OS releases the lock when the file is closed.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Non-blocking exclusive lock on `path`.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let open_err = |source| LockError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(open_err)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(open_err)?;

        file.try_lock_exclusive()
            .map_err(|_| LockError::AlreadyRunning(path.to_path_buf()))?;

        // Record the owner pid for whoever finds the file later. Best effort.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_holder_is_refused_until_first_drops() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bot.lock");

        let first = InstanceLock::acquire(&path).unwrap();
        assert_eq!(first.path(), path.as_path());
        match InstanceLock::acquire(&path) {
            Err(LockError::AlreadyRunning(p)) => assert_eq!(p, path),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }

        drop(first);
        assert!(InstanceLock::acquire(&path).is_ok());
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/run/bot.lock");
        let lock = InstanceLock::acquire(&path).unwrap();
        let pid = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
    }
}
