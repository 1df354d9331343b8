//! `gem.json` manifests.
//!
//! Only the fields that affect generation are read: name, version and
//! dependencies. Dependencies are either plain strings or objects with a
//! `name` field.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sharpgen_ir::ModuleDescriptor;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GemError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed gem manifest {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GemManifest {
    #[serde(default)]
    pub gem_name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    dependencies: Vec<GemDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum GemDependency {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
    Other(serde_json::Value),
}

impl GemManifest {
    pub fn load(path: &Path) -> Result<Self, GemError> {
        let text = fs::read_to_string(path).map_err(|source| GemError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| GemError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Dependency names in declaration order; unnamed entries are dropped.
    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter_map(|d| match d {
                GemDependency::Name(n) => Some(n.as_str()),
                GemDependency::Object { name } => name.as_deref(),
                GemDependency::Other(_) => None,
            })
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Merge into a descriptor: dependencies are appended after the
    /// configured ones, the version fills in only when given.
    pub fn apply_to(&self, module: &mut ModuleDescriptor) {
        for dep in self.dependency_names() {
            if module.add_dependency(dep) {
                debug!(module = %module.name, dependency = dep, "dependency from gem.json");
            }
        }
        if let Some(version) = self.version.as_deref().filter(|v| !v.is_empty()) {
            module.version = version.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_dependency_forms() {
        let gem = GemManifest::parse(
            r#"{
                "gem_name": "Physics",
                "version": "2.1.0",
                "dependencies": ["AzCore", {"name": "Atom"}, {"optional": true}, 7, ""]
            }"#,
        )
        .unwrap();
        assert_eq!(gem.gem_name.as_deref(), Some("Physics"));
        assert_eq!(gem.dependency_names(), vec!["AzCore", "Atom"]);
    }

    #[test]
    fn apply_merges_after_configured() {
        let gem = GemManifest::parse(r#"{"version":"3.0.0","dependencies":["B","A"]}"#).unwrap();
        let mut module = ModuleDescriptor::new("Gem").with_dependency("A");
        gem.apply_to(&mut module);
        assert_eq!(module.dependencies, vec!["A", "B"]);
        assert_eq!(module.version, "3.0.0");
    }

    #[test]
    fn missing_fields_are_fine() {
        let gem = GemManifest::parse("{}").unwrap();
        let mut module = ModuleDescriptor::new("Gem");
        gem.apply_to(&mut module);
        assert!(module.dependencies.is_empty());
        assert_eq!(module.version, sharpgen_ir::DEFAULT_MODULE_VERSION);
    }

    #[test]
    fn load_reports_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gem.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(GemManifest::load(&path), Err(GemError::Malformed { .. })));
        assert!(matches!(
            GemManifest::load(&dir.path().join("missing.json")),
            Err(GemError::Io { .. })
        ));
    }
}
