//! Installation Flow Typestate Pattern
//!
//! Models the install pipeline as a series of explicit state transitions:
//!
//! ```text
//! LoadedRecipe --[fetch()]--> FetchedRecipe --[install()]--> InstalledApp
//! ```
//!
//! This enforces at compile-time that nothing can be installed before every
//! archive has been fetched and digest-verified, and that the smoke check
//! only runs against a committed environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::ops::{Context, InstallError};
use carafe_core::io::fetch::FetchRequest;
use carafe_core::smoke;
use carafe_schema::{AppName, Recipe};

/// Concurrent archive fetches per recipe. Fetches are independent and
/// individually verified, so parallelism is safe; installs are not.
const FETCH_PARALLELISM: usize = 4;

/// State 1: A recipe that has been parsed and validated.
///
/// No network access has happened yet; every construction-time invariant
/// (unique resources, well-formed URLs, real digests) already holds.
#[derive(Debug)]
pub struct LoadedRecipe {
    /// The validated recipe.
    pub recipe: Recipe,
    /// Where the recipe was loaded from, for error messages.
    pub source: PathBuf,
}

/// One archive that has been fetched and digest-verified into the cache.
#[derive(Debug, Clone)]
pub struct VerifiedArchive {
    /// Display name (resource name, or the application name).
    pub name: String,
    /// Source URL, used for archive-format detection.
    pub url: String,
    /// Cache location of the verified bytes.
    pub path: PathBuf,
}

/// State 2: All archives fetched and verified, in install order.
#[derive(Debug)]
pub struct FetchedRecipe {
    /// The validated recipe.
    pub recipe: Recipe,
    /// Dependency archives, topologically ordered.
    pub resources: Vec<VerifiedArchive>,
    /// The application's own archive.
    pub package: VerifiedArchive,
}

/// State 3: The environment is committed and entry points are linked.
#[derive(Debug)]
pub struct InstalledApp {
    /// Application name.
    pub name: AppName,
    /// Entry-point symlinks created on the host.
    pub entry_points: Vec<PathBuf>,
    /// Whether a previous environment was replaced.
    pub replaced: bool,
    check_args: Vec<String>,
    check_expect: String,
}

impl LoadedRecipe {
    /// Parse and validate a recipe file.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Config`] for unreadable, unparsable, or
    /// structurally invalid recipes.
    pub fn load(path: &Path) -> Result<Self, InstallError> {
        let recipe = Recipe::from_file(path).map_err(|source| InstallError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            recipe,
            source: path.to_path_buf(),
        })
    }

    /// Fetch and verify every archive the recipe pins.
    ///
    /// Resources are ordered first (cheap, offline), then fetched with
    /// bounded parallelism. Each archive lands in the cache under its
    /// digest, so identical pins across recipes share storage.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Dependency`] for unorderable `requires`
    /// edges, [`InstallError::Integrity`] for digest mismatches (naming the
    /// resource), or [`InstallError::Network`] for fetch failures.
    pub async fn fetch(self, ctx: &Context) -> Result<FetchedRecipe, InstallError> {
        let order = carafe_core::resolver::install_order(&self.recipe.resources)?;

        ctx.reporter.section("Fetching");

        let semaphore = Arc::new(Semaphore::new(FETCH_PARALLELISM));
        let mut set: JoinSet<Result<(usize, VerifiedArchive), InstallError>> = JoinSet::new();

        // Index 0 is the package archive; resources follow shifted by one.
        let mut jobs: Vec<(String, String, String)> = Vec::with_capacity(self.recipe.resources.len() + 1);
        jobs.push((
            self.recipe.package.name.to_string(),
            self.recipe.package.url.clone(),
            self.recipe.package.sha256.to_string(),
        ));
        for resource in &self.recipe.resources {
            jobs.push((
                resource.name.to_string(),
                resource.url.clone(),
                resource.sha256.to_string(),
            ));
        }

        for (index, (name, url, sha)) in jobs.into_iter().enumerate() {
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| InstallError::Io(std::io::Error::other("semaphore closed")))?;

                // The cache key is the expected digest itself, so a cache
                // entry is only ever reused for a matching pin.
                let dest = carafe_core::cache_path().join(&sha);
                let expected = carafe_schema::Sha256Digest::new(sha)
                    .map_err(|e| InstallError::Io(std::io::Error::other(e.to_string())))?;

                FetchRequest::new(&ctx.client, &name, &url, &dest, &expected, &ctx.reporter)
                    .execute()
                    .await
                    .map_err(|e| InstallError::from_fetch(&name, e))?;

                Ok((index, VerifiedArchive { name, url, path: dest }))
            });
        }

        let mut fetched: Vec<Option<VerifiedArchive>> =
            vec![None; self.recipe.resources.len() + 1];
        while let Some(res) = set.join_next().await {
            let (index, archive) =
                res.map_err(|e| InstallError::Io(std::io::Error::other(e)))??;
            fetched[index] = Some(archive);
        }

        let mut archives: Vec<VerifiedArchive> = fetched
            .into_iter()
            .map(|a| a.ok_or_else(|| InstallError::Io(std::io::Error::other("fetch task lost"))))
            .collect::<Result<_, _>>()?;

        let package = archives.remove(0);
        // Reorder the verified resources into install order.
        let resources = order.into_iter().map(|i| archives[i].clone()).collect();

        Ok(FetchedRecipe {
            recipe: self.recipe,
            resources,
            package,
        })
    }
}

impl FetchedRecipe {
    /// Install every verified archive into a fresh isolated environment and
    /// commit it. See [`crate::ops::install::perform_install`] for the
    /// transaction itself.
    ///
    /// # Errors
    ///
    /// Propagates environment, unpack, lock, and commit failures.
    pub async fn install(self, ctx: &Context) -> Result<InstalledApp, InstallError> {
        crate::ops::install::perform_install(self, ctx).await
    }
}

impl InstalledApp {
    /// Build the final state; used by the installer once the environment is
    /// committed.
    pub(crate) fn new(
        recipe: &Recipe,
        entry_points: Vec<PathBuf>,
        replaced: bool,
    ) -> Self {
        Self {
            name: recipe.package.name.clone(),
            check_args: recipe.check.args.clone(),
            check_expect: recipe
                .check
                .effective_expect(&recipe.package.name)
                .to_string(),
            entry_points,
            replaced,
        }
    }

    /// Run the post-install smoke check against the first entry point.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Verification`]; the install itself has
    /// already committed when this is reached.
    pub async fn check(&self) -> Result<String, InstallError> {
        let Some(entry) = self.entry_points.first().cloned() else {
            return Ok(String::new());
        };
        let args = self.check_args.clone();
        let expect = self.check_expect.clone();

        let result = tokio::task::spawn_blocking(move || {
            smoke::run_check(&entry, &args, &expect, smoke::DEFAULT_TIMEOUT)
        })
        .await
        .map_err(|e| InstallError::Io(std::io::Error::other(e)))?;

        result.map_err(|source| InstallError::Verification {
            name: self.name.to_string(),
            source,
        })
    }
}
