//! Info command

use anyhow::{Result, bail};

use carafe_core::receipt::Receipt;
use carafe_schema::AppName;

/// Show details of an installed application.
pub fn info(name: &str) -> Result<()> {
    let app = AppName::new(name);
    let env_root = carafe_core::env_path(&app);

    let Some(receipt) = Receipt::load(&env_root)? else {
        bail!("'{app}' is not installed");
    };

    println!("{} {}", receipt.name, receipt.version);
    if !receipt.description.is_empty() {
        println!("  {}", receipt.description);
    }
    if !receipt.homepage.is_empty() {
        println!("  homepage:    {}", receipt.homepage);
    }
    if !receipt.license.is_empty() {
        println!("  license:     {}", receipt.license);
    }
    println!("  environment: {}", env_root.display());
    println!("  installed:   {}", receipt.installed_at);
    println!(
        "  entry points: {}",
        receipt
            .bin
            .iter()
            .map(|b| carafe_core::bin_path().join(b).display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!("  archives:");
    for archive in &receipt.archives {
        println!("    {}  {}", archive.sha256, archive.name);
    }

    Ok(())
}
