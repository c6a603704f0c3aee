//! Application removal.
//!
//! Removal is the inverse of the install commit: entry-point links that
//! point into the environment are deleted first, then the environment
//! directory itself. The install lock is taken so a removal cannot race a
//! concurrent install of the same application.

use crate::Reporter;
use crate::ops::InstallError;
use carafe_core::lock::InstallLock;
use carafe_core::receipt::Receipt;
use carafe_schema::AppName;

/// Remove installed applications by name.
///
/// Unknown names are reported but do not abort the batch.
///
/// # Errors
///
/// Returns the first hard failure (lock, filesystem) after attempting all
/// names.
pub fn remove_apps(
    reporter: &impl Reporter,
    names: &[String],
    dry_run: bool,
) -> Result<(), InstallError> {
    let mut removed = 0usize;
    let mut first_err: Option<InstallError> = None;

    for raw in names {
        let name = AppName::new(raw);
        match remove_one(reporter, &name, dry_run) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => {
                reporter.failed(&name, &e.to_string());
                first_err.get_or_insert(e);
            }
        }
    }

    if removed > 0 && !dry_run {
        reporter.success(&format!("Removed {removed} application(s)."));
    }

    first_err.map_or(Ok(()), Err)
}

fn remove_one(
    reporter: &impl Reporter,
    name: &AppName,
    dry_run: bool,
) -> Result<bool, InstallError> {
    let env_root = carafe_core::env_path(name);
    if !env_root.exists() {
        reporter.failed(name, "not installed");
        return Ok(false);
    }

    // A missing or corrupt receipt still allows removal; the bin scan
    // below only follows links that resolve into this environment.
    let receipt = Receipt::load(&env_root).ok().flatten();
    reporter.removing(name);

    if dry_run {
        reporter.done(name, "(dry run)");
        return Ok(true);
    }

    let _lock = InstallLock::acquire(name)?;

    let bins = receipt.map_or_else(|| vec![name.to_string()], |r| r.bin);
    for bin in bins {
        let link = carafe_core::bin_path().join(&bin);
        let points_here =
            std::fs::read_link(&link).is_ok_and(|target| target.starts_with(&env_root));
        if points_here {
            std::fs::remove_file(&link)?;
        }
    }

    std::fs::remove_dir_all(&env_root)?;
    reporter.done(name, "removed");
    Ok(true)
}
