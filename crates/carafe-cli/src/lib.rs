//! carafe - recipe-driven installer CLI
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Installs Python command-line applications from pinned recipes into
//! isolated virtualenvs.
//!
//! # Overview
//!
//! A recipe names one application archive and a set of pinned dependency
//! archives, each with a SHA-256 digest. `carafe install` fetches and
//! verifies every archive, builds a private virtualenv, installs the
//! dependencies in order and then the application, links the entry point
//! into `~/.carafe/bin`, and smoke-tests the result.
//!
//! # Architecture
//!
//! - **Typestate Pattern**: The install flow uses `LoadedRecipe` →
//!   `FetchedRecipe` → `InstalledApp` to enforce correct ordering at
//!   compile time; archives cannot be installed before verification.
//! - **Transactional installs**: Environments are staged under `tmp/` and
//!   renamed into place; a failure never leaves a half-populated
//!   environment at the public path.
//! - **Newtypes**: `AppName`, `ResourceName`, and `Sha256Digest` provide
//!   type-safe identifiers with validation at the parse boundary.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.carafe/
//! ├── bin/        # Entry-point symlinks on PATH
//! ├── envs/       # One virtualenv per application (+ receipt.json)
//! ├── cache/      # Verified archives, keyed by digest
//! ├── tmp/        # Staging area (same volume as envs)
//! └── logs/
//! ```

pub mod cmd;
pub mod ops;
pub mod ui;

pub use carafe_core::paths::*;
pub use carafe_core::{NullReporter, Reporter, USER_AGENT};
pub use carafe_schema::{AppName, Recipe};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "carafe")]
#[command(author, version, about = "carafe - pour pinned Python tools into isolated environments")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install applications from recipe files
    Install {
        /// Recipe file(s) to install
        #[arg(required = true)]
        recipes: Vec<PathBuf>,
    },
    /// Remove installed applications
    Remove {
        /// Application name(s)
        #[arg(required = true)]
        names: Vec<String>,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// List installed applications
    List,
    /// Show details of an installed application
    Info {
        /// Application name
        name: String,
    },
    /// Validate recipe files without touching the network
    Check {
        /// Recipe file(s) to validate
        #[arg(required = true)]
        recipes: Vec<PathBuf>,
    },
    /// Re-run the post-install check of an installed application
    Test {
        /// Application name
        name: String,
    },
    /// Compute SHA256 digests of files (for recipe authoring)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove staging leftovers and unreferenced cached archives
    Clean,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
