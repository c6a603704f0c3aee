//! Application installation operations.
//!
//! This module provides the core installation logic for carafe, including:
//!
//! - Validating recipes up front, before any network access
//! - Fetching and digest-verifying archives into the cache
//! - Building and populating a staged environment
//! - Committing it atomically and linking entry points into `~/.carafe/bin`
//!
//! The main entry point is [`install_recipes`], which handles the full
//! workflow including the already-installed fast path and the post-install
//! check.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::Reporter;
use crate::ops::flow::{FetchedRecipe, InstalledApp, LoadedRecipe, VerifiedArchive};
use crate::ops::{Context, InstallError};
use carafe_core::env::Environment;
use carafe_core::io::extract;
use carafe_core::lock::InstallLock;
use carafe_core::receipt::Receipt;
use carafe_core::relocate;
use carafe_schema::{AppName, Recipe};

/// Validates, fetches, installs, and checks a set of recipes.
///
/// All recipes are parsed and validated before the first byte is fetched,
/// so a malformed recipe cannot abort a half-finished batch. Failures in
/// one recipe do not stop the others; the first error is returned at the
/// end so the process still exits non-zero.
///
/// # Errors
///
/// Returns the first [`InstallError`] encountered, after attempting every
/// recipe.
pub async fn install_recipes(
    ctx: &Context,
    paths: &[PathBuf],
    dry_run: bool,
) -> Result<(), InstallError> {
    // Phase 1: validation. No network, no filesystem mutation.
    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        loaded.push(LoadedRecipe::load(path)?);
    }

    let start_time = Instant::now();
    let mut names = Vec::with_capacity(loaded.len());
    let mut installed = 0usize;
    let mut first_err: Option<InstallError> = None;

    for item in loaded {
        let name = item.recipe.package.name.clone();
        names.push(name.clone());

        if is_current(&item.recipe) {
            ctx.reporter.done(&name, "already installed");
            continue;
        }

        if dry_run {
            ctx.reporter.info(&format!(
                "would install {name} {} ({} resources)",
                item.recipe.package.version,
                item.recipe.resources.len()
            ));
            continue;
        }

        match run_pipeline(item, ctx).await {
            Ok(()) => installed += 1,
            Err(e) => {
                ctx.reporter
                    .failed(&name, &format!("{} stage: {e}", e.stage()));
                first_err.get_or_insert(e);
            }
        }
    }

    if installed > 0 {
        ctx.reporter
            .summary(installed, "install", start_time.elapsed().as_secs_f64());
    }

    perform_ux_checks(&names, &ctx.reporter);

    first_err.map_or(Ok(()), Err)
}

async fn run_pipeline(item: LoadedRecipe, ctx: &Context) -> Result<(), InstallError> {
    let name = item.recipe.package.name.clone();
    let app = item.fetch(ctx).await?.install(ctx).await?;

    ctx.reporter.checking(&name);
    app.check().await?;

    ctx.reporter.done(&name, "installed");
    Ok(())
}

/// Whether an existing environment already satisfies this recipe: the
/// receipt pins the same archive set and every entry point link exists.
/// Anything unreadable or stale simply triggers a clean reinstall.
fn is_current(recipe: &Recipe) -> bool {
    let env_root = carafe_core::env_path(&recipe.package.name);
    let Ok(Some(receipt)) = Receipt::load(&env_root) else {
        return false;
    };
    receipt.matches_recipe(recipe)
        && receipt
            .bin
            .iter()
            .all(|bin| carafe_core::bin_path().join(bin).is_symlink())
}

/// Executes the install transaction for one fetched recipe.
///
/// The environment is built and populated entirely inside a staging temp
/// directory on the same volume as the final location. Only a fully
/// populated environment (receipt included) is swapped into place; on any
/// failure the staging directory is dropped and a previously installed
/// environment is left exactly as it was.
pub(crate) async fn perform_install(
    fetched: FetchedRecipe,
    ctx: &Context,
) -> Result<InstalledApp, InstallError> {
    let recipe = &fetched.recipe;
    let name = recipe.package.name.clone();

    // Serialize writers for this environment; a held lock fails fast.
    let _lock = InstallLock::acquire(&name)?;

    let tmp = carafe_core::tmp_path();
    tokio::fs::create_dir_all(&tmp).await?;
    let staging = tempfile::Builder::new()
        .prefix("carafe-")
        .tempdir_in(&tmp)?;

    ctx.reporter.building_env(&name);
    let env = Environment::create(&staging.path().join("env")).await?;

    // Dependencies first (already in topological order), then the app.
    for archive in &fetched.resources {
        install_archive(&env, archive, &name, ctx, staging.path()).await?;
    }
    install_archive(&env, &fetched.package, &name, ctx, staging.path()).await?;

    let bins = recipe.entry_points();
    for bin in &bins {
        if !env.entry_point(bin).is_file() {
            return Err(InstallError::EntryPointMissing { name: bin.clone() });
        }
    }

    // The receipt is written before the swap: a committed environment is
    // always self-describing, an uncommitted one is invisible.
    Receipt::for_recipe(recipe).write(env.root())?;

    let final_root = carafe_core::env_path(&name);
    let replaced = commit_env(env.root(), &final_root, staging.path())?;
    relocate::rebase_scripts(&final_root, env.root(), &final_root)?;

    let entry_points = link_entry_points(&bins, &final_root, &carafe_core::bin_path())?;

    Ok(InstalledApp::new(recipe, entry_points, replaced))
}

async fn install_archive(
    env: &Environment,
    archive: &VerifiedArchive,
    app: &AppName,
    ctx: &Context,
    staging: &Path,
) -> Result<(), InstallError> {
    ctx.reporter.installing(app, &archive.name);

    let unpack_dir = staging.join("src").join(&archive.name);
    let project = extract::unpack_sdist(&archive.path, &archive.url, &unpack_dir)
        .await
        .map_err(|source| InstallError::Extract {
            resource: archive.name.clone(),
            source,
        })?;

    env.pip_install(&project, &archive.name).await?;
    Ok(())
}

/// Swap the staged environment into its final location, preserving any
/// previously installed environment until the swap has succeeded.
fn commit_env(staged: &Path, final_root: &Path, staging: &Path) -> Result<bool, InstallError> {
    if let Some(parent) = final_root.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let previous = staging.join("previous-env");
    let replaced = final_root.exists();
    if replaced {
        std::fs::rename(final_root, &previous)?;
    }

    if let Err(e) = std::fs::rename(staged, final_root) {
        if replaced {
            // Put the old environment back; the failed install must not
            // leave the application uninstalled.
            let _ = std::fs::rename(&previous, final_root);
        }
        return Err(InstallError::Io(std::io::Error::new(
            e.kind(),
            "could not move staged environment into place; \
             carafe requires envs and tmp on the same volume",
        )));
    }

    // The displaced environment is inside the staging dir and goes away
    // with it.
    Ok(replaced)
}

/// Link entry points from the committed environment into the host bin
/// directory, replacing stale links but never duplicating them.
fn link_entry_points(
    bins: &[String],
    env_root: &Path,
    bin_dir: &Path,
) -> Result<Vec<PathBuf>, InstallError> {
    std::fs::create_dir_all(bin_dir)?;

    let mut created = Vec::with_capacity(bins.len());
    for bin in bins {
        let source = env_root.join("bin").join(bin);
        let target = bin_dir.join(bin);

        if target.exists() || target.is_symlink() {
            std::fs::remove_file(&target)?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(&source, &target)?;
        #[cfg(not(unix))]
        std::fs::hard_link(&source, &target)?;

        created.push(target);
    }
    Ok(created)
}

/// Warn when the bin directory is missing from `PATH` or an entry point is
/// shadowed by another executable.
pub fn perform_ux_checks(names: &[AppName], reporter: &impl Reporter) {
    let path_env = std::env::var_os("PATH").unwrap_or_default();
    let bin_dir = carafe_core::bin_path();
    let is_in_path = std::env::split_paths(&path_env).any(|p| p == bin_dir);

    if !is_in_path {
        reporter.warning(&format!("{} is not in your PATH.", bin_dir.display()));
        reporter.info(&format!(
            "Add this to your shell profile: export PATH=\"{}:$PATH\"",
            bin_dir.display()
        ));
    }

    for name in names {
        if let Ok(path) = which::which(name.as_str()) {
            if !path.starts_with(&bin_dir) {
                reporter.warning(&format!(
                    "'{name}' is shadowed by another executable at {}",
                    path.display()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_env(root: &Path, marker: &str) {
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin/app"), marker).unwrap();
    }

    #[test]
    fn commit_moves_fresh_env_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("tmp/stage");
        let staged = staging.join("env");
        seed_env(&staged, "v1");

        let final_root = dir.path().join("envs/app");
        let replaced = commit_env(&staged, &final_root, &staging).unwrap();

        assert!(!replaced);
        assert!(!staged.exists());
        assert_eq!(
            std::fs::read_to_string(final_root.join("bin/app")).unwrap(),
            "v1"
        );
    }

    #[test]
    fn commit_replaces_prior_env_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let final_root = dir.path().join("envs/app");
        seed_env(&final_root, "old");

        let staging = dir.path().join("tmp/stage");
        let staged = staging.join("env");
        seed_env(&staged, "new");

        let replaced = commit_env(&staged, &final_root, &staging).unwrap();
        assert!(replaced);
        assert_eq!(
            std::fs::read_to_string(final_root.join("bin/app")).unwrap(),
            "new"
        );
        // The displaced environment is parked inside staging until the
        // staging dir is dropped.
        assert_eq!(
            std::fs::read_to_string(staging.join("previous-env/bin/app")).unwrap(),
            "old"
        );
    }

    #[cfg(unix)]
    #[test]
    fn linking_twice_replaces_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let env_root = dir.path().join("envs/app");
        seed_env(&env_root, "v1");
        let bin_dir = dir.path().join("bin");

        let bins = vec!["app".to_string()];
        let first = link_entry_points(&bins, &env_root, &bin_dir).unwrap();
        let second = link_entry_points(&bins, &env_root, &bin_dir).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(&bin_dir).unwrap().count(), 1);
        let target = std::fs::read_link(&first[0]).unwrap();
        assert!(target.starts_with(&env_root));
    }
}
