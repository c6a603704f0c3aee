//! Clean command (garbage collection)

use std::collections::HashSet;

use anyhow::Result;

use crate::ui::ConsoleReporter;
use carafe_core::Reporter;
use carafe_core::receipt::Receipt;

/// Remove staging leftovers and cached archives no receipt references.
pub fn clean(dry_run: bool, quiet: bool) -> Result<()> {
    let output = ConsoleReporter::new(quiet);

    // Staging leftovers survive only after a crash mid-install.
    let tmp = carafe_core::tmp_path();
    if tmp.exists() {
        output.info("Removing staging leftovers...");
        if !dry_run {
            std::fs::remove_dir_all(&tmp)?;
        }
    }

    // Locks from crashed installs block future ones; clean is the explicit
    // recovery path.
    let envs = carafe_core::envs_path();
    if envs.exists() {
        for entry in std::fs::read_dir(&envs)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "lock") {
                output.info(&format!("Removing stale lock {}", path.display()));
                if !dry_run {
                    std::fs::remove_file(&path)?;
                }
            }
        }
    }

    let referenced = referenced_digests()?;
    let cache = carafe_core::cache_path();
    let mut dropped = 0usize;
    if cache.exists() {
        for entry in std::fs::read_dir(&cache)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if referenced.contains(&name) {
                continue;
            }
            if !dry_run {
                std::fs::remove_file(entry.path())?;
            }
            dropped += 1;
        }
    }

    if dropped > 0 {
        output.info(&format!("Dropped {dropped} unreferenced cached archive(s)."));
    }
    output.success("System is clean.");
    Ok(())
}

/// Digests still pinned by an installed application's receipt.
fn referenced_digests() -> Result<HashSet<String>> {
    let mut referenced = HashSet::new();
    let envs = carafe_core::envs_path();
    if !envs.exists() {
        return Ok(referenced);
    }
    for entry in std::fs::read_dir(&envs)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(receipt) = Receipt::load(&entry.path()).ok().flatten() {
            referenced.extend(receipt.archives.into_iter().map(|a| a.sha256));
        }
    }
    Ok(referenced)
}
