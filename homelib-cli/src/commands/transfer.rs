//! Archive export and import commands

use super::Catalog;
use anyhow::{Context, Result};
use homelib_core::Transfer;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

/// Export the whole catalog to a single-file archive
pub fn export(catalog: &Catalog, dest: &Path) -> Result<()> {
    let pb = spinner("Exporting catalog...")?;
    let progress = |done: usize, total: usize| {
        pb.set_message(format!("Exporting catalog... {}/{}", done, total));
    };

    let result = Transfer::new(&catalog.store, &catalog.assets)
        .with_progress(&progress)
        .export(dest);
    pb.finish_and_clear();

    let summary = result.with_context(|| format!("Export to {} failed", dest.display()))?;

    println!(
        "Exported {} books and {} images to {}",
        summary.books,
        summary.assets,
        summary.path.display()
    );
    for title in &summary.missing_assets {
        println!("  Cover not found for '{}', exported without it", title);
    }
    Ok(())
}

/// Import books from an archive, skipping ones already catalogued
pub fn import(catalog: &Catalog, src: &Path, json: bool) -> Result<()> {
    let pb = spinner("Importing catalog...")?;
    let progress = |done: usize, total: usize| {
        pb.set_message(format!("Importing catalog... {}/{}", done, total));
    };

    let result = Transfer::new(&catalog.store, &catalog.assets)
        .with_progress(&progress)
        .import(src);
    pb.finish_and_clear();

    let report = result.with_context(|| format!("Import from {} failed", src.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Import complete:");
    println!("  Imported: {}", report.success_count);
    println!("  Skipped:  {}", report.skip_count());
    println!("  Errors:   {}", report.error_count());

    if report.has_skipped() {
        println!("\nSkipped (already in catalog):");
        for line in &report.skipped {
            println!("  {}", line);
        }
    }
    if report.has_errors() {
        println!("\nErrors:");
        for line in &report.errors {
            println!("  {}", line);
        }
    }
    Ok(())
}
