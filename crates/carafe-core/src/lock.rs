//! Exclusive per-environment install locks.
//!
//! The install transaction (stage, populate, swap, link) must be the only
//! writer for a given environment. A lock file created with `create_new`
//! gives that exclusivity; a second invocation targeting the same
//! environment fails fast instead of corrupting state.

use std::io::Write;
use std::path::{Path, PathBuf};

use carafe_schema::AppName;
use thiserror::Error;

/// Errors from lock acquisition.
#[derive(Error, Debug)]
pub enum LockError {
    /// Another install for this environment is already running.
    #[error("another install of '{name}' is in progress (lock held at {path})")]
    Held {
        /// Application whose environment is locked.
        name: AppName,
        /// The lock file path, for diagnostics and manual cleanup.
        path: PathBuf,
    },

    /// Filesystem failure while creating the lock.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An exclusive install lock, released on drop.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    /// Acquire the lock for one application's environment at the standard
    /// location under the carafe home.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Held`] if the lock file already exists, or an
    /// I/O error if it cannot be created.
    pub fn acquire(name: &AppName) -> Result<Self, LockError> {
        Self::acquire_at(name, crate::lock_path(name))
    }

    /// Acquire the lock at an explicit path.
    ///
    /// # Errors
    ///
    /// Same as [`InstallLock::acquire`].
    pub fn acquire_at(name: &AppName, path: PathBuf) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                // PID recorded for diagnosing stale locks after a crash.
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(LockError::Held {
                name: name.clone(),
                path,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove install lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_fast_and_drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let name = AppName::new("pixeldojo-mcp");
        let lock_file = dir.path().join("pixeldojo-mcp.lock");

        let lock = InstallLock::acquire_at(&name, lock_file.clone()).unwrap();
        assert!(lock.path().exists());

        assert!(matches!(
            InstallLock::acquire_at(&name, lock_file.clone()),
            Err(LockError::Held { .. })
        ));

        drop(lock);
        assert!(!lock_file.exists());
        assert!(InstallLock::acquire_at(&name, lock_file).is_ok());
    }
}
