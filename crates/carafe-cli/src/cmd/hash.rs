//! Hash command

use std::path::PathBuf;

use anyhow::Result;

use carafe_core::io::fetch::sha256_file;

/// Compute SHA256 digests of files (for recipe authoring).
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest = sha256_file(file)?;
        println!("{} {}", digest, file.display());
    }
    Ok(())
}
