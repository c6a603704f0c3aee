//! Domain-specific errors for install operations.
//!
//! One variant per failure stage, so a caller (and the exit message) can
//! always tell which stage gave out and for which resource. Notably,
//! `Verification` is kept apart from everything else: it means the install
//! itself committed but the application is broken.

use std::path::PathBuf;

use thiserror::Error;

use carafe_core::env::EnvError;
use carafe_core::io::extract::ExtractError;
use carafe_core::io::fetch::FetchError;
use carafe_core::lock::LockError;
use carafe_core::receipt::ReceiptError;
use carafe_core::resolver::ResolveError;
use carafe_core::smoke::SmokeError;
use carafe_schema::RecipeError;

#[derive(Error, Debug)]
pub enum InstallError {
    /// The recipe is malformed; raised before any network access.
    #[error("invalid recipe {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: RecipeError,
    },

    /// Fetching an archive failed (transport or HTTP status).
    #[error("fetch of '{resource}' failed: {source}")]
    Network {
        resource: String,
        #[source]
        source: FetchError,
    },

    /// Fetched bytes did not match the pinned digest. Always fatal.
    #[error("integrity check failed for '{resource}': expected {expected}, computed {actual}")]
    Integrity {
        resource: String,
        expected: String,
        actual: String,
    },

    /// Resource `requires` edges could not be ordered.
    #[error("dependency resolution failed: {0}")]
    Dependency(#[from] ResolveError),

    /// The isolated environment could not be built or populated.
    #[error("environment setup failed: {0}")]
    Environment(#[from] EnvError),

    /// A verified archive could not be unpacked.
    #[error("unpack of '{resource}' failed: {source}")]
    Extract {
        resource: String,
        #[source]
        source: ExtractError,
    },

    /// Another install of the same application is in progress.
    #[error(transparent)]
    Locked(#[from] LockError),

    /// The environment committed but the promised entry point is missing.
    #[error("entry point '{name}' not found in environment after install")]
    EntryPointMissing { name: String },

    /// The install receipt could not be read or written.
    #[error("receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    /// Installed but broken: the post-install check failed.
    #[error("post-install check of '{name}' failed: {source}")]
    Verification {
        name: String,
        #[source]
        source: SmokeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Wrap a fetch failure, promoting digest mismatches to `Integrity`.
    pub fn from_fetch(resource: &str, err: FetchError) -> Self {
        match err {
            FetchError::DigestMismatch { expected, actual } => Self::Integrity {
                resource: resource.to_string(),
                expected,
                actual,
            },
            other => Self::Network {
                resource: resource.to_string(),
                source: other,
            },
        }
    }

    /// The pipeline stage this error belongs to, for exit messages.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Network { .. } => "fetch",
            Self::Integrity { .. } => "verify",
            Self::Dependency(_) => "resolve",
            Self::Environment(_) => "environment",
            Self::Extract { .. }
            | Self::Locked(_)
            | Self::EntryPointMissing { .. }
            | Self::Receipt(_)
            | Self::Io(_) => "install",
            Self::Verification { .. } => "check",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_mismatch_becomes_integrity_error() {
        let err = InstallError::from_fetch(
            "pydantic",
            FetchError::DigestMismatch {
                expected: "aa".repeat(32),
                actual: "bb".repeat(32),
            },
        );
        match &err {
            InstallError::Integrity {
                resource,
                expected,
                actual,
            } => {
                assert_eq!(resource, "pydantic");
                // Both digests must appear in the user-facing message.
                let msg = err.to_string();
                assert!(msg.contains(expected));
                assert!(msg.contains(actual));
                assert!(msg.contains("pydantic"));
            }
            other => panic!("expected integrity error, got {other}"),
        }
        assert_eq!(err.stage(), "verify");
    }

    #[test]
    fn stages_cover_the_pipeline() {
        let io = InstallError::Io(std::io::Error::other("x"));
        assert_eq!(io.stage(), "install");
    }
}
