//! Module IR: logical output modules ("gems").

use serde::{Deserialize, Serialize};

/// Default version for modules that do not declare one.
pub const DEFAULT_MODULE_VERSION: &str = "1.0.0";

/// One logical output module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module name (e.g. `ExampleGem`).
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_version")]
    pub version: String,

    /// Names of modules this one depends on. Ordered, no duplicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Header globs relative to the project root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub overrides: ModuleOverrides,
}

/// Per-module overrides of global settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOverrides {
    /// Namespace used instead of `<root>.<module>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Preprocessor defines added to the global list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_export_marker: Option<bool>,
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    DEFAULT_MODULE_VERSION.to_string()
}

impl ModuleDescriptor {
    /// An enabled module with no dependencies or patterns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            version: default_version(),
            dependencies: vec![],
            include: vec![],
            exclude: vec![],
            overrides: ModuleOverrides::default(),
        }
    }

    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.add_dependency(dep);
        self
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Append a dependency unless it is already listed.
    /// Returns `true` when the name was added.
    pub fn add_dependency(&mut self, dep: impl Into<String>) -> bool {
        let dep = dep.into();
        if dep.is_empty() || self.dependencies.contains(&dep) {
            return false;
        }
        self.dependencies.push(dep);
        true
    }

    pub fn declares_dependency(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }
}
