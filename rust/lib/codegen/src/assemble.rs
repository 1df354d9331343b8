//! Output assembly.
//!
//! Modules are emitted rank by rank in dependency order. Modules within a
//! rank share no edges and are emitted concurrently; the next rank starts
//! only after every module of the current one has been written to the
//! sink, so a dependency's manifest always exists before a dependent
//! references it.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;

use sharpgen_ir::{Decl, DeclarationForest, TypeTable, DEFAULT_MODULE_VERSION};
use sharpgen_modules::ModuleGraph;
use tracing::{debug, info};

use crate::category::{classify, Category};
use crate::emit::{emit_module, ModuleContext};
use crate::error::AssembleError;
use crate::project::{project_file, solution_file, ManifestSpec};
use crate::settings::{relative_path, CodegenSettings};
use crate::GeneratedFile;

/// Everything the assembler needs for one module.
#[derive(Debug, Clone)]
pub struct ModuleInput {
    pub forest: DeclarationForest,
    pub namespace: String,
    pub version: String,
    /// False when the existing outputs are known to be current.
    pub regenerate: bool,
}

impl ModuleInput {
    pub fn new(forest: DeclarationForest, namespace: impl Into<String>) -> Self {
        Self {
            forest,
            namespace: namespace.into(),
            version: DEFAULT_MODULE_VERSION.to_string(),
            regenerate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleArtifacts {
    pub module: String,
    pub sources: Vec<GeneratedFile>,
    pub manifest: GeneratedFile,
}

impl ModuleArtifacts {
    /// Sources first, manifest last.
    pub fn files(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.sources.iter().chain(std::iter::once(&self.manifest))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedArtifacts {
    /// Emitted modules in build order.
    pub modules: Vec<ModuleArtifacts>,
    /// Modules left untouched, in build order.
    pub skipped: Vec<String>,
    pub solution: Option<GeneratedFile>,
}

impl GeneratedArtifacts {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.solution.is_none()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleArtifacts> {
        self.modules.iter().find(|m| m.module == name)
    }

    pub fn files(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.modules
            .iter()
            .flat_map(ModuleArtifacts::files)
            .chain(self.solution.iter())
    }
}

/// Destination of generated files. Shared by the workers of a rank.
pub trait ArtifactSink: Sync {
    fn write(&self, file: &GeneratedFile) -> Result<(), AssembleError>;
}

/// Keeps files in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> BTreeMap<String, String> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}

impl ArtifactSink for MemorySink {
    fn write(&self, file: &GeneratedFile) -> Result<(), AssembleError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.path.clone(), file.content.clone());
        Ok(())
    }
}

/// Type names a module's declarations contribute.
#[derive(Debug, Default)]
struct DeclaredTypes {
    all: BTreeSet<String>,
    entities: BTreeSet<String>,
}

impl DeclaredTypes {
    fn of(forest: &DeclarationForest) -> Self {
        let mut types = DeclaredTypes::default();
        for decl in forest.iter() {
            match decl {
                Decl::Class(c) => {
                    types.all.insert(c.name.clone());
                    if classify(c) == Category::Entities {
                        types.entities.insert(c.name.clone());
                    }
                }
                Decl::Enum(e) => {
                    types.all.insert(e.name.clone());
                }
                Decl::Function(_) => {}
            }
        }
        types
    }
}

/// Per-module view handed to a worker.
struct ModuleScope {
    imports: Vec<String>,
    known_types: BTreeSet<String>,
    entity_types: BTreeSet<String>,
}

pub struct Assembler<'a> {
    settings: &'a CodegenSettings,
    types: &'a TypeTable,
}

impl<'a> Assembler<'a> {
    pub fn new(settings: &'a CodegenSettings, types: &'a TypeTable) -> Self {
        Self { settings, types }
    }

    /// Emit every module of `graph` whose input asks for regeneration.
    /// Modules without an input are left alone like skipped ones.
    pub fn assemble(
        &self,
        inputs: BTreeMap<String, ModuleInput>,
        graph: &ModuleGraph,
        sink: &dyn ArtifactSink,
    ) -> Result<GeneratedArtifacts, AssembleError> {
        let declared: BTreeMap<&str, DeclaredTypes> = inputs
            .iter()
            .map(|(name, input)| (name.as_str(), DeclaredTypes::of(&input.forest)))
            .collect();
        let table_targets: BTreeSet<String> = self.types.iter().map(|(_, t)| t.to_string()).collect();

        let mut artifacts = GeneratedArtifacts::default();
        for (rank_index, rank) in graph.ranks().iter().enumerate() {
            let mut jobs: Vec<(&str, &ModuleInput)> = Vec::new();
            for name in rank {
                match inputs.get(name) {
                    Some(input) if input.regenerate => jobs.push((name.as_str(), input)),
                    _ => {
                        debug!(module = %name, "module unchanged, skipping");
                        artifacts.skipped.push(name.clone());
                    }
                }
            }

            let work = |&(name, input): &(&str, &ModuleInput)| -> Result<ModuleArtifacts, AssembleError> {
                let scope = self.scope_of(name, graph, &inputs, &declared, &table_targets);
                let module = self.build_module(name, input, &scope, graph);
                for file in module.files() {
                    sink.write(file)?;
                }
                info!(module = %name, files = module.sources.len() + 1, "module generated");
                Ok(module)
            };

            let results = run_rank(&jobs, |&(name, _)| name, &work);
            debug!(rank = rank_index, modules = jobs.len(), "rank complete");
            for result in results {
                artifacts.modules.push(result?);
            }
        }

        if !graph.is_empty() {
            let layout = &self.settings.layout;
            let projects: Vec<(String, String)> = graph
                .order()
                .iter()
                .map(|name| (name.clone(), layout.manifest_path(name)))
                .collect();
            let solution = GeneratedFile::new(layout.solution_path(), solution_file(&projects));
            sink.write(&solution)?;
            artifacts.solution = Some(solution);
        }
        Ok(artifacts)
    }

    fn scope_of(
        &self,
        name: &str,
        graph: &ModuleGraph,
        inputs: &BTreeMap<String, ModuleInput>,
        declared: &BTreeMap<&str, DeclaredTypes>,
        table_targets: &BTreeSet<String>,
    ) -> ModuleScope {
        let mut scope = ModuleScope {
            imports: vec![],
            known_types: table_targets.clone(),
            entity_types: BTreeSet::new(),
        };
        let visible = graph
            .transitive_dependencies(name)
            .into_iter()
            .chain(std::iter::once(name));
        for module in visible {
            if let Some(types) = declared.get(module) {
                scope.known_types.extend(types.all.iter().cloned());
                scope.entity_types.extend(types.entities.iter().cloned());
            }
            if module != name {
                if let Some(input) = inputs.get(module) {
                    scope.imports.push(input.namespace.clone());
                }
            }
        }
        scope
    }

    fn build_module(
        &self,
        name: &str,
        input: &ModuleInput,
        scope: &ModuleScope,
        graph: &ModuleGraph,
    ) -> ModuleArtifacts {
        let layout = &self.settings.layout;
        let ctx = ModuleContext {
            namespace: &input.namespace,
            imports: &scope.imports,
            core_namespace: &self.settings.core_namespace,
            known_types: &scope.known_types,
            entity_types: &scope.entity_types,
            generate_docs: self.settings.generate_docs,
        };
        let sources = emit_module(&ctx, &input.forest)
            .into_iter()
            .map(|(file, content)| GeneratedFile::new(layout.module_file(name, &file), content))
            .collect();

        let module_dir = layout.module_dir(name);
        let references: Vec<String> = graph
            .direct_dependencies(name)
            .iter()
            .map(|dep| relative_path(&module_dir, &layout.manifest_path(dep)))
            .collect();
        let manifest = GeneratedFile::new(
            layout.manifest_path(name),
            project_file(
                self.settings,
                &ManifestSpec {
                    module: name,
                    namespace: &input.namespace,
                    version: &input.version,
                    references: &references,
                },
            ),
        );

        ModuleArtifacts {
            module: name.to_string(),
            sources,
            manifest,
        }
    }
}

/// Run `work` for every job on a bounded set of scoped threads and return
/// the results in job order. Returns once every job has finished. A job
/// that panics yields `WorkerPanicked`; its worker moves on to the next job.
fn run_rank<J, T, F>(jobs: &[J], name_of: impl Fn(&J) -> &str + Sync, work: &F) -> Vec<Result<T, AssembleError>>
where
    J: Sync,
    T: Send,
    F: Fn(&J) -> Result<T, AssembleError> + Sync,
{
    let guarded = |job: &J| {
        panic::catch_unwind(AssertUnwindSafe(|| work(job)))
            .unwrap_or_else(|_| Err(AssembleError::WorkerPanicked(name_of(job).to_string())))
    };

    let workers = thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(jobs.len());
    if workers <= 1 {
        return jobs.iter().map(guarded).collect();
    }

    let queue = Mutex::new(jobs.iter().enumerate());
    let done: Mutex<Vec<(usize, Result<T, AssembleError>)>> = Mutex::new(Vec::with_capacity(jobs.len()));

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                let Some((index, job)) = next else {
                    break;
                };
                let result = guarded(job);
                done.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((index, result));
            });
        }
    });

    let mut done = done.into_inner().unwrap_or_else(PoisonError::into_inner);
    done.sort_by_key(|(index, _)| *index);
    done.into_iter().map(|(_, result)| result).collect()
}
