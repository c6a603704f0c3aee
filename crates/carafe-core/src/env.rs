//! Isolated environment construction.
//!
//! An environment is a private virtualenv: its own interpreter reference and
//! an empty site-packages that never reads from or writes to the host's
//! global package namespace. Builders only ever write into staging paths;
//! the public environment location is populated by atomic rename in the
//! installer.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

/// Errors from locating the base interpreter or building an environment.
#[derive(Error, Debug)]
pub enum EnvError {
    /// No usable Python interpreter on the host.
    #[error("no python3 interpreter found on PATH (set CARAFE_PYTHON to override)")]
    InterpreterNotFound,

    /// The target location cannot be created or written.
    #[error("environment location not writable: {path}")]
    NotWritable {
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// `python -m venv` exited unsuccessfully.
    #[error("virtualenv creation failed ({status}): {stderr}")]
    VenvFailed {
        /// Exit status of the venv invocation.
        status: std::process::ExitStatus,
        /// Captured stderr.
        stderr: String,
    },

    /// `pip install` exited unsuccessfully for one archive.
    #[error("pip install of {what} failed: {stderr}")]
    PipFailed {
        /// Which archive was being installed.
        what: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Other filesystem or process failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locate the base interpreter used to seed new environments.
///
/// `CARAFE_PYTHON` overrides discovery; otherwise `python3` (then `python`)
/// is resolved on `PATH`.
///
/// # Errors
///
/// Returns [`EnvError::InterpreterNotFound`] when nothing usable exists.
pub fn base_interpreter() -> Result<PathBuf, EnvError> {
    if let Ok(val) = std::env::var("CARAFE_PYTHON") {
        return Ok(PathBuf::from(val));
    }
    which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|_| EnvError::InterpreterNotFound)
}

/// A private virtualenv rooted at one directory.
#[derive(Debug, Clone)]
pub struct Environment {
    root: PathBuf,
}

impl Environment {
    /// Wrap an existing (or future) environment location.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The environment's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the environment's executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// The environment's own interpreter.
    pub fn python(&self) -> PathBuf {
        self.bin_dir().join("python")
    }

    /// Path of a named entry point inside the environment.
    pub fn entry_point(&self, name: &str) -> PathBuf {
        self.bin_dir().join(name)
    }

    /// Whether the environment has an interpreter (i.e. venv creation
    /// completed at some point).
    pub fn is_provisioned(&self) -> bool {
        self.python().exists()
    }

    /// Create a fresh, empty environment at `root` using the base
    /// interpreter. Any prior contents at `root` are cleared by `--clear`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError`] if the interpreter is missing, the location is
    /// not writable, or venv creation fails.
    pub async fn create(root: &Path) -> Result<Self, EnvError> {
        let base = base_interpreter()?;

        if let Some(parent) = root.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| EnvError::NotWritable {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tracing::debug!(root = %root.display(), base = %base.display(), "creating virtualenv");
        let output = Command::new(&base)
            .arg("-m")
            .arg("venv")
            .arg("--clear")
            .arg(root)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(EnvError::VenvFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let env = Self::at(root);
        if !env.is_provisioned() {
            return Err(EnvError::VenvFailed {
                status: output.status,
                stderr: "venv reported success but produced no interpreter".to_string(),
            });
        }
        Ok(env)
    }

    /// Install one unpacked project into this environment's private
    /// namespace.
    ///
    /// `--no-deps --no-index` keeps pip fully offline: nothing is resolved,
    /// nothing is pulled from the host or the network. Every dependency must
    /// arrive as a pinned resource of its own.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::PipFailed`] with pip's stderr when the install
    /// exits non-zero.
    pub async fn pip_install(&self, project_dir: &Path, what: &str) -> Result<(), EnvError> {
        let output = Command::new(self.python())
            .arg("-m")
            .arg("pip")
            .arg("install")
            .arg("--no-deps")
            .arg("--no-index")
            .arg("--no-build-isolation")
            .arg("--quiet")
            .arg(project_dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(EnvError::PipFailed {
                what: what.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
