//! Check command (offline recipe validation)

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use carafe_core::resolver;
use carafe_schema::Recipe;

/// Validate recipe files without touching the network.
///
/// Parses each recipe, enforces every construction-time invariant, and
/// resolves the resource install order, reporting it for review.
pub fn check(recipes: &[PathBuf]) -> Result<()> {
    let mut failures = 0usize;

    for path in recipes {
        match check_one(path) {
            Ok(()) => {}
            Err(e) => {
                eprintln!("   FAIL: {}: {e}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} recipe(s) failed validation");
    }
    Ok(())
}

fn check_one(path: &Path) -> Result<()> {
    let recipe = Recipe::from_file(path)?;
    let order = resolver::install_order(&recipe.resources)?;

    println!(
        "   OK: {} {} ({} resources)",
        recipe.package.name,
        recipe.package.version,
        recipe.resources.len()
    );
    if !order.is_empty() {
        let names: Vec<&str> = order
            .iter()
            .map(|&i| recipe.resources[i].name.as_str())
            .collect();
        println!("       install order: {}", names.join(" -> "));
    }
    Ok(())
}
