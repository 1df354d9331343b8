//! `sharpgen modules` and `sharpgen deps`.

use std::path::Path;

use anyhow::{bail, Result};
use sharpgen_generate::Project;

/// Enabled modules in build order with their direct dependencies.
pub fn list(root: &Path, config: Option<&Path>) -> Result<()> {
    let project = Project::open(root, config)?;
    if project.graph.is_empty() {
        println!("No enabled modules.");
        return Ok(());
    }

    let width = project.graph.order().iter().map(String::len).max().unwrap_or(0);
    println!("{:<width$}  {:>4}  {}", "MODULE", "RANK", "DEPENDS ON");
    for name in project.graph.order() {
        let rank = project.graph.rank_of(name).unwrap_or(0);
        let deps = project.graph.direct_dependencies(name).join(", ");
        println!("{name:<width$}  {rank:>4}  {deps}");
    }
    Ok(())
}

/// Transitive dependencies and dependents of one module.
pub fn deps(root: &Path, config: Option<&Path>, module: &str) -> Result<()> {
    let project = Project::open(root, config)?;
    if !project.graph.contains(module) {
        if project.store.contains(module) {
            bail!("module '{module}' is disabled");
        }
        bail!("unknown module '{module}'");
    }

    let dependencies = project.graph.transitive_dependencies(module);
    let dependents = project.graph.transitive_dependents(module);
    println!("{module}");
    println!("  Depends on:    {}", joined(&dependencies));
    println!("  Depended on by: {}", joined(&dependents));
    Ok(())
}

fn joined(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
