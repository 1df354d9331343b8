//! `sharpgen generate`.

use std::path::Path;

use anyhow::Result;
use sharpgen_generate::{GenerateOptions, Generator};

pub fn run(project: &Path, config: Option<&Path>, no_incremental: bool, json: bool) -> Result<()> {
    let options = GenerateOptions {
        project_root: project.to_path_buf(),
        config: config.map(Path::to_path_buf),
        incremental: no_incremental.then_some(false),
    };
    let generator = Generator::open(&options)?;
    let report = generator.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("No enabled modules; nothing generated.");
        return Ok(());
    }
    println!(
        "{} module(s): {} regenerated, {} up to date.",
        report.modules.len(),
        report.regenerated.len(),
        report.skipped.len()
    );
    println!(
        "  Output: {}",
        generator.project().output_root().display()
    );
    println!("  Files written: {}", report.files_written.len());
    if !report.files_removed.is_empty() {
        println!("  Files removed: {}", report.files_removed.len());
    }
    if !report.diagnostics.is_empty() {
        println!("  Diagnostics:   {}", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("    {diagnostic}");
        }
    }
    Ok(())
}
