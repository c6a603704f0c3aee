//! TOML recipe parsing and validation.
//!
//! A recipe pins one application and its dependency archives:
//!
//! ```toml
//! [package]
//! name = "pixeldojo-mcp"
//! version = "0.1.0"
//! url = "https://github.com/mariussil/pixeldojo-mcp-server/archive/refs/tags/v0.1.0.tar.gz"
//! sha256 = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
//!
//! [[resource]]
//! name = "aiohttp"
//! url = "https://files.pythonhosted.org/packages/.../aiohttp-3.9.5.tar.gz"
//! sha256 = "02271f722e7a1f965cef05cb502ae5981c51a9d5e41dfc39a1bac1c276d52220"
//!
//! [check]
//! args = ["--help"]
//! expect = "pixeldojo-mcp"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::digest::Sha256Digest;
use crate::types::{AppName, ResourceName, Version};

/// Errors that can occur when loading or validating a recipe.
///
/// All of these are raised before any network access: a malformed recipe
/// never reaches the fetcher.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// An I/O error occurred while reading a recipe file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized into a valid recipe.
    /// Digest validation failures surface here too, since digests are
    /// checked at deserialization time.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required field (package name or an entry URL) is empty.
    #[error("empty field: {0}")]
    EmptyField(String),

    /// A download URL is malformed or uses an unsupported scheme.
    #[error("invalid URL for {entry}: '{url}' (expected http(s))")]
    InvalidUrl {
        /// Which recipe entry carries the URL.
        entry: String,
        /// The offending URL.
        url: String,
    },

    /// Two resources share the same name.
    #[error("duplicate resource '{0}'")]
    DuplicateResource(ResourceName),

    /// A `requires` edge names a resource that is not declared.
    #[error("resource '{resource}' requires undeclared resource '{requires}'")]
    UnknownRequirement {
        /// Resource carrying the bad edge.
        resource: ResourceName,
        /// The missing requirement.
        requires: ResourceName,
    },

    /// A resource lists itself as a requirement.
    #[error("resource '{0}' requires itself")]
    SelfRequirement(ResourceName),
}

/// Metadata and source location of the application itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Unique name; also the environment directory and default entry point.
    pub name: AppName,
    /// Pinned release version.
    pub version: Version,
    /// Short human-readable summary.
    #[serde(default)]
    pub description: String,
    /// URL of the project's homepage.
    #[serde(default)]
    pub homepage: String,
    /// Download URL for the application's source archive.
    pub url: String,
    /// Expected SHA-256 digest of the source archive.
    pub sha256: Sha256Digest,
    /// SPDX license identifier.
    #[serde(default)]
    pub license: String,
}

/// One pinned dependency archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Name, unique within the recipe.
    pub name: ResourceName,
    /// Download URL for the archive.
    pub url: String,
    /// Expected SHA-256 digest of the archive.
    pub sha256: Sha256Digest,
    /// Resources that must be installed before this one.
    #[serde(default)]
    pub requires: Vec<ResourceName>,
}

/// Entry points to expose on the host `PATH` after install.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallSpec {
    /// Executables to link from the environment (defaults to the app name).
    #[serde(default)]
    pub bin: Option<Vec<String>>,
}

impl InstallSpec {
    /// Returns the effective list of entry points, falling back to the
    /// application name when none are configured.
    pub fn effective_bin(&self, app: &AppName) -> Vec<String> {
        match &self.bin {
            Some(bins) if !bins.is_empty() => bins.clone(),
            _ => vec![app.to_string()],
        }
    }
}

/// Post-install smoke test description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSpec {
    /// Arguments passed to the entry point.
    #[serde(default = "default_check_args")]
    pub args: Vec<String>,
    /// Substring the combined output must contain (defaults to the app name).
    #[serde(default)]
    pub expect: Option<String>,
}

fn default_check_args() -> Vec<String> {
    vec!["--help".to_string()]
}

impl Default for CheckSpec {
    fn default() -> Self {
        Self {
            args: default_check_args(),
            expect: None,
        }
    }
}

impl CheckSpec {
    /// Returns the substring expected in the check output.
    pub fn effective_expect<'a>(&'a self, app: &'a AppName) -> &'a str {
        self.expect.as_deref().unwrap_or(app.as_str())
    }
}

/// Complete recipe: the application, its pinned resources, entry points,
/// and the smoke test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// The application to install.
    pub package: PackageSpec,
    /// Pinned dependency archives, in declaration order.
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceSpec>,
    /// Entry-point configuration.
    #[serde(default)]
    pub install: InstallSpec,
    /// Smoke test configuration.
    #[serde(default)]
    pub check: CheckSpec,
}

impl Recipe {
    /// Parse a recipe from a TOML file on disk and validate it.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Io` if the file cannot be read, or any of the
    /// parse/validation errors from [`Recipe::parse`].
    pub fn from_file(path: &Path) -> Result<Self, RecipeError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a recipe from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Parse` if the TOML content is invalid (including
    /// malformed digests), or a validation error for structural problems.
    pub fn parse(content: &str) -> Result<Self, RecipeError> {
        let recipe: Self = toml::from_str(content)?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Check structural invariants that serde cannot express.
    ///
    /// Runs before any network access: unique non-empty resource names,
    /// well-formed http(s) URLs, and `requires` edges pointing at declared
    /// resources.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`RecipeError`].
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.package.name.is_empty() {
            return Err(RecipeError::EmptyField("package.name".to_string()));
        }
        validate_url("package", &self.package.url)?;

        let mut seen: HashSet<&str> = HashSet::new();
        for resource in &self.resources {
            if resource.name.is_empty() {
                return Err(RecipeError::EmptyField("resource.name".to_string()));
            }
            if !seen.insert(resource.name.as_str()) {
                return Err(RecipeError::DuplicateResource(resource.name.clone()));
            }
            validate_url(&format!("resource '{}'", resource.name), &resource.url)?;
        }

        for resource in &self.resources {
            for dep in &resource.requires {
                if dep == &resource.name {
                    return Err(RecipeError::SelfRequirement(resource.name.clone()));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(RecipeError::UnknownRequirement {
                        resource: resource.name.clone(),
                        requires: dep.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Entry points this recipe exposes on the host `PATH`.
    pub fn entry_points(&self) -> Vec<String> {
        self.install.effective_bin(&self.package.name)
    }
}

fn validate_url(entry: &str, url: &str) -> Result<(), RecipeError> {
    if url.is_empty() {
        return Err(RecipeError::EmptyField(format!("{entry} url")));
    }
    let scheme_ok = url.starts_with("https://") || url.starts_with("http://");
    if !scheme_ok || url.splitn(3, '/').nth(2).is_none_or(str::is_empty) {
        return Err(RecipeError::InvalidUrl {
            entry: entry.to_string(),
            url: url.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"
[package]
name = "pixeldojo-mcp"
version = "0.1.0"
description = "MCP server for PixelDojo AI image generation API"
homepage = "https://github.com/mariussil/pixeldojo-mcp-server"
url = "https://github.com/mariussil/pixeldojo-mcp-server/archive/refs/tags/v0.1.0.tar.gz"
sha256 = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
license = "MIT"

[[resource]]
name = "aiohttp"
url = "https://files.pythonhosted.org/packages/d6/12/aiohttp-3.9.5.tar.gz"
sha256 = "02271f722e7a1f965cef05cb502ae5981c51a9d5e41dfc39a1bac1c276d52220"

[[resource]]
name = "pydantic"
url = "https://files.pythonhosted.org/packages/1b/1c/pydantic-2.7.0.tar.gz"
sha256 = "3ce13a558736b0804223a82499ad3848d9367561932876aaef98d5be6d2ab211"

[[resource]]
name = "mcp"
url = "https://files.pythonhosted.org/packages/d4/91/mcp-1.8.0.tar.gz"
sha256 = "2d6775a3a9f57d4e0e0a88d48e7a5baaf62f0c78c10857d92cd63cb12a15c86c"
requires = ["pydantic"]
"#;

    #[test]
    fn parses_full_recipe() {
        let recipe = Recipe::parse(RECIPE).unwrap();
        assert_eq!(recipe.package.name.as_str(), "pixeldojo-mcp");
        assert_eq!(recipe.resources.len(), 3);
        assert_eq!(recipe.resources[2].requires.len(), 1);
        assert_eq!(recipe.check.args, vec!["--help"]);
        assert_eq!(
            recipe.check.effective_expect(&recipe.package.name),
            "pixeldojo-mcp"
        );
        assert_eq!(recipe.entry_points(), vec!["pixeldojo-mcp".to_string()]);
    }

    #[test]
    fn rejects_placeholder_digest() {
        let bad = RECIPE.replace(
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
            "PLACEHOLDER_SHA256_CHECKSUM",
        );
        assert!(matches!(Recipe::parse(&bad), Err(RecipeError::Parse(_))));
    }

    #[test]
    fn rejects_duplicate_resource() {
        let dup = RECIPE.replace("name = \"pydantic\"", "name = \"aiohttp\"");
        assert!(matches!(
            Recipe::parse(&dup),
            Err(RecipeError::DuplicateResource(name)) if name.as_str() == "aiohttp"
        ));
    }

    #[test]
    fn rejects_unknown_requirement() {
        let bad = RECIPE.replace("requires = [\"pydantic\"]", "requires = [\"httpx\"]");
        assert!(matches!(
            Recipe::parse(&bad),
            Err(RecipeError::UnknownRequirement { requires, .. }) if requires.as_str() == "httpx"
        ));
    }

    #[test]
    fn rejects_non_http_url() {
        let bad = RECIPE.replace(
            "https://files.pythonhosted.org/packages/d6/12/aiohttp-3.9.5.tar.gz",
            "ftp://files.pythonhosted.org/aiohttp-3.9.5.tar.gz",
        );
        assert!(matches!(
            Recipe::parse(&bad),
            Err(RecipeError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn custom_bin_overrides_default_entry_point() {
        let custom = format!("{RECIPE}\n[install]\nbin = [\"pixeldojo\"]\n");
        let recipe = Recipe::parse(&custom).unwrap();
        assert_eq!(recipe.entry_points(), vec!["pixeldojo".to_string()]);
    }
}
