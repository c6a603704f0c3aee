//! Install command

use std::path::PathBuf;

use anyhow::Result;

use crate::ops::{self, Context};

/// Install applications from recipe files.
pub async fn install(recipes: &[PathBuf], dry_run: bool, quiet: bool) -> Result<()> {
    let ctx = Context::new(quiet)?;
    ops::install::install_recipes(&ctx, recipes, dry_run)
        .await
        .map_err(Into::into)
}
