//! Generator configuration.
//!
//! Read from `sharpgen.toml` in the project root (a `.json` file is parsed
//! as JSON instead). Every field has a default, so a partial document or no
//! document at all still yields a usable configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sharpgen_ir::{ModuleDescriptor, ModuleOverrides, TypeTable};
use sharpgen_modules::{MembershipPolicy, ModuleStore};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Config file looked up in the project root when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "sharpgen.toml";

/// How the configuration document was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    Loaded,
    /// No file; built-in defaults.
    Missing,
    /// Unreadable or unparsable; built-in defaults.
    Malformed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub global: GlobalSettings,

    /// Native → C# mappings added to the canonical type table.
    pub types: BTreeMap<String, String>,

    pub modules: BTreeMap<String, ModuleSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// Root C# namespace.
    pub namespace: String,
    /// Output root, relative to the project root.
    pub output_dir: PathBuf,
    /// Per-module directory template; `{module}` is substituted.
    pub module_dir: String,
    /// Manifest file name template; `{module}` is substituted.
    pub manifest_name: String,
    pub solution_name: String,
    pub include_paths: Vec<PathBuf>,
    /// `NAME` or `NAME=VALUE`.
    pub defines: Vec<String>,
    pub verbose: bool,
    pub incremental: bool,
    /// Relative to the project root.
    pub cache_file: PathBuf,
    pub require_export_marker: bool,
    pub export_macros: Vec<String>,
    pub target_framework: String,
    pub core_assembly: String,
    pub core_assembly_path: String,
    /// Namespace exported by the core assembly.
    pub core_namespace: String,
    pub membership: MembershipPolicy,
    pub generate_documentation: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            namespace: "O3DE.Generated".to_string(),
            output_dir: PathBuf::from("Generated/CSharp"),
            module_dir: "{module}".to_string(),
            manifest_name: "{module}.csproj".to_string(),
            solution_name: "O3DE.Generated".to_string(),
            include_paths: vec![],
            defines: vec![],
            verbose: false,
            incremental: true,
            cache_file: PathBuf::from(".sharpgen/cache.json"),
            require_export_marker: false,
            export_macros: vec!["O3DE_EXPORT_CSHARP".to_string()],
            target_framework: "net8.0".to_string(),
            core_assembly: "O3DE.Sharp.Core".to_string(),
            core_assembly_path: "$(O3DESharpCorePath)/O3DE.Sharp.Core.dll".to_string(),
            core_namespace: "O3DE.Core".to_string(),
            membership: MembershipPolicy::Strict,
            generate_documentation: true,
        }
    }
}

/// One `[modules.<name>]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSettings {
    pub enabled: bool,
    pub version: Option<String>,
    pub dependencies: Vec<String>,
    /// `gem.json` to read dependencies and version from, relative to the
    /// project root.
    pub gem_json: Option<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub namespace: Option<String>,
    pub defines: Vec<String>,
    pub require_export_marker: Option<bool>,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            version: None,
            dependencies: vec![],
            gem_json: None,
            include: vec![],
            exclude: vec![],
            namespace: None,
            defines: vec![],
            require_export_marker: None,
        }
    }
}

/// Global settings with one module's overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub namespace: String,
    pub defines: Vec<String>,
    pub require_export_marker: bool,
}

impl GeneratorConfig {
    /// Load from `path`, falling back to defaults when the file is missing
    /// or malformed. Never fails.
    pub fn load(path: &Path) -> (Self, ConfigStatus) {
        if !path.is_file() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return (Self::default(), ConfigStatus::Missing);
        }
        match Self::read(path) {
            Ok(config) => {
                info!(path = %path.display(), modules = config.modules.len(), "configuration loaded");
                (config, ConfigStatus::Loaded)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed configuration, using defaults");
                (Self::default(), ConfigStatus::Malformed(e.to_string()))
            }
        }
    }

    /// Read and parse, surfacing every failure.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_toml(&text)
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The canonical table extended with `[types]`.
    pub fn type_table(&self) -> TypeTable {
        let mut table = TypeTable::canonical();
        for (native, target) in &self.types {
            table.register(native, target);
        }
        table
    }

    /// Descriptors as configured, before any `gem.json` is merged.
    pub fn module_descriptors(&self) -> Vec<ModuleDescriptor> {
        self.modules
            .iter()
            .map(|(name, settings)| settings.to_descriptor(name))
            .collect()
    }

    pub fn module_store(&self) -> ModuleStore {
        let mut store = ModuleStore::new(self.global.membership);
        for module in self.module_descriptors() {
            store.insert(module);
        }
        store
    }

    pub fn effective(&self, module: &ModuleDescriptor) -> EffectiveSettings {
        let overrides = &module.overrides;
        let namespace = overrides
            .namespace
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.global.namespace, module.name));
        let mut defines = self.global.defines.clone();
        for d in &overrides.defines {
            if !defines.contains(d) {
                defines.push(d.clone());
            }
        }
        EffectiveSettings {
            namespace,
            defines,
            require_export_marker: overrides
                .require_export_marker
                .unwrap_or(self.global.require_export_marker),
        }
    }
}

impl ModuleSettings {
    pub fn to_descriptor(&self, name: &str) -> ModuleDescriptor {
        let mut module = ModuleDescriptor::new(name);
        module.enabled = self.enabled;
        if let Some(version) = self.version.as_deref().filter(|v| !v.is_empty()) {
            module.version = version.to_string();
        }
        for dep in &self.dependencies {
            module.add_dependency(dep.as_str());
        }
        module.include = self.include.clone();
        module.exclude = self.exclude.clone();
        module.overrides = ModuleOverrides {
            namespace: self.namespace.clone(),
            defines: self.defines.clone(),
            require_export_marker: self.require_export_marker,
        };
        module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[global]
namespace = "Game.Bindings"
defines = ["AZ_PLATFORM_LINUX"]
require_export_marker = false
membership = "permissive"

[types]
"MyLib::Handle" = "ulong"

[modules.ExampleGem]
dependencies = ["AzCore", "AzCore"]
include = ["Gems/ExampleGem/**/*.h"]
exclude = ["**/Private/**"]
namespace = "Example"
defines = ["EXAMPLE_EXPORTS", "AZ_PLATFORM_LINUX"]
require_export_marker = true

[modules.AzCore]
version = "2.0.0"

[modules.Legacy]
enabled = false
"#;

    #[test]
    fn parses_full_document() {
        let config = GeneratorConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.global.namespace, "Game.Bindings");
        assert_eq!(config.global.membership, MembershipPolicy::Permissive);
        // Unspecified fields keep their defaults.
        assert!(config.global.incremental);
        assert_eq!(config.global.target_framework, "net8.0");
        assert_eq!(config.modules.len(), 3);

        let store = config.module_store();
        assert_eq!(store.policy(), MembershipPolicy::Permissive);
        let gem = store.get("ExampleGem").unwrap();
        assert_eq!(gem.dependencies, vec!["AzCore"]);
        assert_eq!(store.get("AzCore").unwrap().version, "2.0.0");
        assert!(!store.is_enabled("Legacy"));
    }

    #[test]
    fn effective_settings_apply_overrides() {
        let config = GeneratorConfig::from_toml(SAMPLE).unwrap();
        let store = config.module_store();

        let gem = config.effective(store.get("ExampleGem").unwrap());
        assert_eq!(gem.namespace, "Example");
        assert_eq!(gem.defines, vec!["AZ_PLATFORM_LINUX", "EXAMPLE_EXPORTS"]);
        assert!(gem.require_export_marker);

        let core = config.effective(store.get("AzCore").unwrap());
        assert_eq!(core.namespace, "Game.Bindings.AzCore");
        assert!(!core.require_export_marker);
    }

    #[test]
    fn type_extensions_are_registered() {
        let config = GeneratorConfig::from_toml(SAMPLE).unwrap();
        let table = config.type_table();
        let ty = table.normalize("MyLib::Handle");
        assert_eq!(ty.target, "ulong");
        assert!(!ty.requires_marshaling);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, status) = GeneratorConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE));
        assert_eq!(status, ConfigStatus::Missing);
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[global\nnamespace = ").unwrap();
        let (config, status) = GeneratorConfig::load(&path);
        assert!(matches!(status, ConfigStatus::Malformed(_)));
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn json_documents_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharpgen.json");
        fs::write(
            &path,
            r#"{"global": {"namespace": "Json.Ns"}, "modules": {"A": {"include": ["A/*.h"]}}}"#,
        )
        .unwrap();
        let (config, status) = GeneratorConfig::load(&path);
        assert_eq!(status, ConfigStatus::Loaded);
        assert_eq!(config.global.namespace, "Json.Ns");
        assert_eq!(config.modules["A"].include, vec!["A/*.h"]);
        assert!(config.modules["A"].enabled);
    }
}
