//! Install receipts.
//!
//! Every committed environment carries a `receipt.json` describing exactly
//! what was installed: the application, the digests of every archive that
//! went in, the exposed entry points, and the smoke-test parameters. The
//! receipt is what makes reinstalls idempotent and `list`/`info`/`remove`
//! possible without a separate database.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use carafe_schema::{AppName, Recipe, Version};

/// File name of the receipt inside an environment root.
pub const RECEIPT_FILE: &str = "receipt.json";

/// Errors reading or writing a receipt.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The receipt file is not valid JSON for this schema.
    #[error("malformed receipt: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Digest record for one installed archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// Resource name, or the application name for the primary archive.
    pub name: String,
    /// Verified SHA-256 digest.
    pub sha256: String,
}

/// Smoke-test parameters, persisted so `carafe test` can re-run the check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Arguments passed to the entry point.
    pub args: Vec<String>,
    /// Substring expected in the combined output.
    pub expect: String,
}

/// The persisted outcome of one successful install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Application name.
    pub name: AppName,
    /// Installed version.
    pub version: Version,
    /// Short description, carried over from the recipe.
    #[serde(default)]
    pub description: String,
    /// Project homepage.
    #[serde(default)]
    pub homepage: String,
    /// SPDX license identifier.
    #[serde(default)]
    pub license: String,
    /// Entry points linked into the host bin directory.
    pub bin: Vec<String>,
    /// Every archive installed, with its verified digest. The primary
    /// archive is listed first.
    pub archives: Vec<ArchiveRecord>,
    /// Smoke-test parameters.
    pub check: CheckRecord,
    /// RFC 3339 timestamp of the install.
    pub installed_at: String,
}

impl Receipt {
    /// Build a receipt for a recipe about to be committed.
    pub fn for_recipe(recipe: &Recipe) -> Self {
        let mut archives = vec![ArchiveRecord {
            name: recipe.package.name.to_string(),
            sha256: recipe.package.sha256.to_string(),
        }];
        archives.extend(recipe.resources.iter().map(|r| ArchiveRecord {
            name: r.name.to_string(),
            sha256: r.sha256.to_string(),
        }));

        Self {
            name: recipe.package.name.clone(),
            version: recipe.package.version.clone(),
            description: recipe.package.description.clone(),
            homepage: recipe.package.homepage.clone(),
            license: recipe.package.license.clone(),
            bin: recipe.entry_points(),
            archives,
            check: CheckRecord {
                args: recipe.check.args.clone(),
                expect: recipe
                    .check
                    .effective_expect(&recipe.package.name)
                    .to_string(),
            },
            installed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Load the receipt from an environment root, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError`] for unreadable or malformed receipt files;
    /// `Ok(None)` when the environment has no receipt (not installed, or a
    /// failed install that never committed).
    pub fn load(env_root: &Path) -> Result<Option<Self>, ReceiptError> {
        let path = env_root.join(RECEIPT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the receipt into an environment root.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Io`] if the file cannot be written.
    pub fn write(&self, env_root: &Path) -> Result<(), ReceiptError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(env_root.join(RECEIPT_FILE), content)?;
        Ok(())
    }

    /// Whether this receipt records exactly the archive set a recipe pins.
    /// A match means a re-install would be a no-op.
    pub fn matches_recipe(&self, recipe: &Recipe) -> bool {
        Self::for_recipe(recipe).archives == self.archives
    }
}
