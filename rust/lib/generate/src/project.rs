//! A project tree with its configuration, module store and module graph.

use std::path::{Path, PathBuf};

use sharpgen_core::{ConfigStatus, Diagnostic, DiagnosticKind, GeneratorConfig, DEFAULT_CONFIG_FILE};
use sharpgen_modules::{GemError, GemManifest, ModuleGraph, ModuleStore};
use tracing::{error, info};

use crate::error::GenerateError;

#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: GeneratorConfig,
    pub store: ModuleStore,
    pub graph: ModuleGraph,
    /// Recovered problems met while opening.
    pub diagnostics: Vec<Diagnostic>,
}

impl Project {
    /// Load the configuration (`config` or `<root>/sharpgen.toml`), merge
    /// `gem.json` manifests and resolve the module graph. Only a dependency
    /// cycle fails.
    pub fn open(root: &Path, config: Option<&Path>) -> Result<Self, GenerateError> {
        let config_path = match config {
            Some(path) => root.join(path),
            None => root.join(DEFAULT_CONFIG_FILE),
        };
        let (config, status) = GeneratorConfig::load(&config_path);
        let mut diagnostics = Vec::new();
        if let ConfigStatus::Malformed(reason) = status {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::ConfigLoadFailure,
                    config_path.display().to_string(),
                    format!("{reason}; using defaults"),
                )
                .emit(),
            );
        }
        Self::with_config(root, config, diagnostics)
    }

    /// Like [`Project::open`] with an already loaded configuration.
    pub fn with_config(
        root: &Path,
        config: GeneratorConfig,
        mut diagnostics: Vec<Diagnostic>,
    ) -> Result<Self, GenerateError> {
        let store = build_store(root, &config, &mut diagnostics);
        let graph = match ModuleGraph::build(&store) {
            Ok(graph) => graph,
            Err(e) => {
                error!(kind = %DiagnosticKind::CyclicModuleDependency, "{e}");
                return Err(e.into());
            }
        };
        for unresolved in graph.unresolved() {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnresolvedDependency,
                    unresolved.module.clone(),
                    format!(
                        "dependency '{}' dropped: {}",
                        unresolved.dependency, unresolved.reason
                    ),
                )
                .emit(),
            );
        }
        info!(
            modules = graph.len(),
            ranks = graph.ranks().len(),
            "module graph resolved"
        );
        Ok(Self {
            root: root.to_path_buf(),
            config,
            store,
            graph,
            diagnostics,
        })
    }

    pub fn output_root(&self) -> PathBuf {
        self.root.join(&self.config.global.output_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.join(&self.config.global.cache_file)
    }

    pub fn include_paths(&self) -> Vec<PathBuf> {
        self.config
            .global
            .include_paths
            .iter()
            .map(|p| self.root.join(p))
            .collect()
    }
}

/// Configured modules with their `gem.json` merged in, plus `MissingFile`
/// diagnostics for literal includes that name nothing.
fn build_store(root: &Path, config: &GeneratorConfig, diagnostics: &mut Vec<Diagnostic>) -> ModuleStore {
    let mut store = ModuleStore::new(config.global.membership);
    for (name, settings) in &config.modules {
        let mut module = settings.to_descriptor(name);
        if let Some(gem_json) = &settings.gem_json {
            match GemManifest::load(&root.join(gem_json)) {
                Ok(gem) => gem.apply_to(&mut module),
                Err(GemError::Io { path, source }) => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::MissingFile,
                        path.display().to_string(),
                        format!("gem manifest of module '{name}' not readable: {source}"),
                    )
                    .emit(),
                ),
                Err(e @ GemError::Malformed { .. }) => diagnostics.push(
                    Diagnostic::new(DiagnosticKind::ConfigLoadFailure, name.clone(), e.to_string()).emit(),
                ),
            }
        }
        store.insert(module);
    }

    let enabled: Vec<String> = store.enabled().map(|m| m.name.clone()).collect();
    for name in enabled {
        for missing in store.missing_literal_includes(&name, root) {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::MissingFile,
                    missing.display().to_string(),
                    format!("configured header of module '{name}' not found"),
                )
                .emit(),
            );
        }
    }
    store
}
