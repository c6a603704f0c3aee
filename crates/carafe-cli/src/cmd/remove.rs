//! Remove command

use std::io::Write;

use anyhow::Result;

use crate::ops;
use crate::ui::ConsoleReporter;

/// Remove installed applications.
pub fn remove(names: &[String], yes: bool, dry_run: bool, quiet: bool) -> Result<()> {
    if !yes && !dry_run && !confirm(names)? {
        println!("Aborted.");
        return Ok(());
    }

    let reporter = ConsoleReporter::new(quiet);
    ops::remove::remove_apps(&reporter, names, dry_run).map_err(Into::into)
}

fn confirm(names: &[String]) -> Result<bool> {
    print!("Remove {}? [y/N] ", names.join(", "));
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
