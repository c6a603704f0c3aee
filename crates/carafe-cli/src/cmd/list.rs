//! List command

use anyhow::Result;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use carafe_core::receipt::Receipt;

/// List installed applications from their receipts.
pub fn list() -> Result<()> {
    let envs = carafe_core::envs_path();
    if !envs.exists() {
        println!("No applications installed.");
        return Ok(());
    }

    let mut rows = Vec::new();
    for entry in std::fs::read_dir(&envs)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(receipt) = Receipt::load(&entry.path()).ok().flatten() else {
            continue;
        };
        let size = dir_size(&entry.path());
        rows.push((receipt, size));
    }

    if rows.is_empty() {
        println!("No applications installed.");
        return Ok(());
    }

    rows.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["NAME", "VERSION", "ENTRY POINTS", "SIZE", "INSTALLED"]);

    for (receipt, size) in rows {
        table.add_row(vec![
            receipt.name.to_string(),
            receipt.version.to_string(),
            receipt.bin.join(", "),
            human_size(size),
            receipt
                .installed_at
                .split('T')
                .next()
                .unwrap_or(&receipt.installed_at)
                .to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn dir_size(path: &std::path::Path) -> u64 {
    walkdir::WalkDir::new(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(std::fs::Metadata::is_file)
        .map(|m| m.len())
        .sum()
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
