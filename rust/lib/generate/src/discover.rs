//! Input discovery and module membership.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use sharpgen_modules::ModuleStore;
use sharpgen_parser::frontend::{is_ast_json, is_source_file};
use sharpgen_parser::AST_JSON_SUFFIX;
use tracing::debug;

/// One input file found under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Project-relative, `/`-separated.
    pub rel: String,
}

impl SourceFile {
    /// The header path membership patterns are matched against. A
    /// serialized unit stands for the header it was dumped from.
    pub fn header_rel(&self) -> &str {
        self.rel.strip_suffix(AST_JSON_SUFFIX).unwrap_or(&self.rel)
    }
}

pub fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Every header and serialized unit under `root`, sorted by relative path.
/// Hidden directories and the directories in `skip` are not entered.
/// When a header has a serialized unit next to it, only the unit is kept.
pub fn discover_sources(root: &Path, skip: &[PathBuf]) -> Vec<SourceFile> {
    let mut found = Vec::new();
    walk(root, root, skip, &mut found);
    found.sort_by(|a, b| a.rel.cmp(&b.rel));

    let dumped: BTreeSet<String> = found
        .iter()
        .filter(|f| is_ast_json(&f.path))
        .map(|f| f.header_rel().to_string())
        .collect();
    found.retain(|f| is_ast_json(&f.path) || !dumped.contains(&f.rel));
    debug!(root = %root.display(), files = found.len(), "sources discovered");
    found
}

fn walk(root: &Path, dir: &Path, skip: &[PathBuf], found: &mut Vec<SourceFile>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "directory not readable");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && !skip.iter().any(|s| *s == path) {
                walk(root, &path, skip, found);
            }
        } else if file_type.is_file() && is_source_file(&path) {
            found.push(SourceFile {
                rel: relative_key(root, &path),
                path,
            });
        }
    }
}

/// Sources claimed by each enabled module, keyed by module name. A source
/// may belong to several modules.
pub fn assign<'a>(store: &ModuleStore, sources: &'a [SourceFile]) -> BTreeMap<String, Vec<&'a SourceFile>> {
    let mut members: BTreeMap<String, Vec<&SourceFile>> = store
        .enabled()
        .map(|m| (m.name.clone(), Vec::new()))
        .collect();
    for source in sources {
        for module in store.matching_modules(source.header_rel()) {
            if let Some(list) = members.get_mut(module) {
                list.push(source);
            }
        }
    }
    for (module, list) in &members {
        debug!(module = %module, headers = list.len(), "module membership");
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpgen_ir::ModuleDescriptor;
    use sharpgen_modules::MembershipPolicy;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn walks_headers_and_skips_hidden_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Gems/A/Include/A.h");
        touch(root, "Gems/A/Include/B.hpp");
        touch(root, "Gems/A/Source/A.cpp");
        touch(root, ".git/x.h");
        touch(root, "Generated/Old.h");
        touch(root, "Gems/A/gem.json");

        let sources = discover_sources(root, &[root.join("Generated")]);
        let rels: Vec<_> = sources.iter().map(|s| s.rel.as_str()).collect();
        assert_eq!(rels, vec!["Gems/A/Include/A.h", "Gems/A/Include/B.hpp"]);
    }

    #[test]
    fn serialized_unit_replaces_its_header() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Inc/A.h");
        touch(root, "Inc/A.h.ast.json");
        touch(root, "Inc/B.h");

        let sources = discover_sources(root, &[]);
        let rels: Vec<_> = sources.iter().map(|s| s.rel.as_str()).collect();
        assert_eq!(rels, vec!["Inc/A.h.ast.json", "Inc/B.h"]);
        assert_eq!(sources[0].header_rel(), "Inc/A.h");
    }

    #[test]
    fn assignment_follows_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Gems/A/Include/A.h");
        touch(root, "Gems/A/Include/Private/Hidden.h");
        touch(root, "Gems/B/Include/B.h");
        touch(root, "Shared/Common.h");

        let mut store = ModuleStore::new(MembershipPolicy::Strict);
        store.insert(
            ModuleDescriptor::new("A")
                .with_include("Gems/A/**/*.h")
                .with_include("Shared/*.h")
                .with_exclude("**/Private/**"),
        );
        store.insert(ModuleDescriptor::new("B").with_include("Gems/B/**/*.h").with_include("Shared/*.h"));
        store.insert(ModuleDescriptor::new("Empty"));
        store.insert(ModuleDescriptor::new("Off").with_include("**/*.h").disabled());

        let sources = discover_sources(root, &[]);
        let members = assign(&store, &sources);
        let rels = |m: &str| members[m].iter().map(|s| s.rel.as_str()).collect::<Vec<_>>();
        assert_eq!(rels("A"), vec!["Gems/A/Include/A.h", "Shared/Common.h"]);
        assert_eq!(rels("B"), vec!["Gems/B/Include/B.h", "Shared/Common.h"]);
        assert!(rels("Empty").is_empty());
        assert!(!members.contains_key("Off"));
    }
}
