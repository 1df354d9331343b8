//! One generation run.
//!
//! Module fingerprints chain through the graph: each covers the generator
//! settings, the module's effective settings and headers, and the
//! fingerprints of its direct dependencies. A change anywhere below a
//! module therefore regenerates it. Only modules being regenerated and
//! their transitive dependencies are parsed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;

use sharpgen_cache::{fingerprint, fingerprint_file, module_key, Fingerprinter, IncrementalCache, LoadStatus};
use sharpgen_codegen::{Assembler, CodegenSettings, ModuleInput, OutputLayout};
use sharpgen_core::{Diagnostic, DiagnosticKind, EffectiveSettings, GeneratorConfig};
use sharpgen_ir::{DeclarationForest, TypeTable};
use sharpgen_parser::{extract, DispatchFrontEnd, FilterPolicy, FrontEnd, HeaderFrontEnd, ParseError};
use tracing::{debug, info, warn};

use crate::discover::{assign, discover_sources, relative_key, SourceFile};
use crate::error::GenerateError;
use crate::project::Project;
use crate::report::RunReport;
use crate::sink::DiskSink;

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub project_root: PathBuf,
    /// Relative to the project root; `sharpgen.toml` when absent.
    pub config: Option<PathBuf>,
    /// Overrides `global.incremental`.
    pub incremental: Option<bool>,
}

/// One header parsed on behalf of one module.
struct ParseJob<'a> {
    module: &'a str,
    source: &'a SourceFile,
    defines: &'a [String],
    policy: FilterPolicy,
}

/// `None` when the front end panicked.
type ParseOutcome = Option<Result<DeclarationForest, ParseError>>;

pub struct Generator {
    project: Project,
    incremental: bool,
    front_end: Box<dyn FrontEnd>,
}

impl Generator {
    pub fn new(project: Project) -> Self {
        let global = &project.config.global;
        let header = HeaderFrontEnd::new().with_export_macros(global.export_macros.iter().cloned());
        Self {
            incremental: global.incremental,
            front_end: Box::new(DispatchFrontEnd::new(header)),
            project,
        }
    }

    pub fn open(options: &GenerateOptions) -> Result<Self, GenerateError> {
        let project = Project::open(&options.project_root, options.config.as_deref())?;
        let mut generator = Self::new(project);
        if let Some(incremental) = options.incremental {
            generator.incremental = incremental;
        }
        Ok(generator)
    }

    pub fn incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Replace the front end headers are parsed with.
    pub fn with_front_end(mut self, front_end: Box<dyn FrontEnd>) -> Self {
        self.front_end = front_end;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn run(&self) -> Result<RunReport, GenerateError> {
        let project = &self.project;
        let config = &project.config;
        let graph = &project.graph;
        let mut report = RunReport {
            modules: graph.order().to_vec(),
            diagnostics: project.diagnostics.clone(),
            ..RunReport::default()
        };

        let output_root = project.output_root();
        let sources = discover_sources(&project.root, &[output_root.clone()]);
        let members = assign(&project.store, &sources);

        let mut cache = IncrementalCache::load(project.cache_path(), &project.root);
        if let LoadStatus::Failed(reason) = cache.status() {
            report.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::CacheLoadFailure,
                    cache.path().display().to_string(),
                    format!("{reason}; regenerating everything"),
                )
                .emit(),
            );
        }

        let effective: BTreeMap<&str, EffectiveSettings> = graph
            .order()
            .iter()
            .filter_map(|name| project.store.get(name))
            .map(|module| (module.name.as_str(), config.effective(module)))
            .collect();

        // ── Fingerprints and the regeneration decision ──

        let mut header_fps: BTreeMap<&str, String> = BTreeMap::new();
        for source in members.values().flatten() {
            header_fps
                .entry(source.rel.as_str())
                .or_insert_with(|| fingerprint_file(&source.path).unwrap_or_default());
        }

        let settings_fp = settings_fingerprint(config);
        let mut module_fps: BTreeMap<&str, String> = BTreeMap::new();
        for name in graph.order() {
            let Some(settings) = effective.get(name.as_str()) else {
                continue;
            };
            let version = project.store.get(name).map_or("", |m| m.version.as_str());
            let mut fp = Fingerprinter::new();
            fp.field("generator", &settings_fp)
                .field("namespace", &settings.namespace)
                .field("defines", &settings.defines.join("\n"))
                .field(
                    "require_export_marker",
                    if settings.require_export_marker { "true" } else { "false" },
                )
                .field("version", version);
            for dep in graph.direct_dependencies(name) {
                let dep_fp = module_fps.get(dep.as_str()).map_or("", String::as_str);
                fp.field(&format!("dependency:{dep}"), dep_fp);
            }
            for source in members.get(name).into_iter().flatten() {
                let header_fp = header_fps.get(source.rel.as_str()).map_or("", String::as_str);
                fp.field(&format!("header:{}", source.rel), header_fp);
            }
            module_fps.insert(name.as_str(), fp.finish());
        }

        let regenerate: BTreeSet<&str> = graph
            .order()
            .iter()
            .map(String::as_str)
            .filter(|name| {
                let key = module_key(name);
                let fp = module_fps.get(name).map_or("", String::as_str);
                !self.incremental || cache.should_regenerate_key(&key, fp) || !cache.outputs_intact(&key)
            })
            .collect();
        debug!(
            regenerate = regenerate.len(),
            modules = graph.len(),
            incremental = self.incremental,
            "regeneration decided"
        );

        // ── Parse (fan-out / fan-in) ──

        let mut to_parse: BTreeSet<&str> = BTreeSet::new();
        for name in &regenerate {
            to_parse.insert(*name);
            to_parse.extend(graph.transitive_dependencies(name));
        }
        let jobs: Vec<ParseJob<'_>> = to_parse
            .iter()
            .filter_map(|name| Some((*name, effective.get(name)?, members.get(*name)?)))
            .flat_map(|(module, settings, sources)| {
                sources.iter().map(move |&source| ParseJob {
                    module,
                    source,
                    defines: &settings.defines,
                    policy: FilterPolicy::new(settings.require_export_marker),
                })
            })
            .collect();

        let types = config.type_table();
        let include_paths = project.include_paths();
        let outcomes = self.parse_all(&jobs, &types, &include_paths);

        let mut forests: BTreeMap<&str, DeclarationForest> = BTreeMap::new();
        let mut parsed: BTreeMap<&str, (&Path, String)> = BTreeMap::new();
        let mut panicked: BTreeSet<&str> = BTreeSet::new();
        for (job, outcome) in jobs.iter().zip(outcomes) {
            let rel = job.source.rel.as_str();
            match outcome {
                Some(Ok(forest)) => {
                    debug!(file = rel, module = job.module, declarations = forest.len(), "parsed");
                    let forest_fp = fingerprint(&serde_json::to_vec(&forest).unwrap_or_default());
                    parsed.insert(rel, (job.source.path.as_path(), forest_fp));
                    forests.entry(job.module).or_default().merge(forest);
                }
                Some(Err(e)) => {
                    let kind = if e.is_not_found() {
                        DiagnosticKind::MissingFile
                    } else {
                        DiagnosticKind::ParseFailure
                    };
                    report
                        .diagnostics
                        .push(Diagnostic::new(kind, rel, format!("skipped: {e}")).emit());
                }
                None => {
                    panicked.insert(job.module);
                    report.diagnostics.push(
                        Diagnostic::new(DiagnosticKind::ParseFailure, rel, "skipped: front end panicked")
                            .emit(),
                    );
                }
            }
        }
        report.parsed_files = parsed.len();

        let mut unknown: BTreeSet<&str> = BTreeSet::new();
        for (module, forest) in &forests {
            for ty in forest.unknown_types() {
                unknown.insert(ty);
                report.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UnknownType,
                        ty,
                        format!("not in the type table; marshaled in module '{module}'"),
                    )
                    .emit(),
                );
            }
        }
        report.unknown_types = unknown.len();

        // ── Assemble ──

        let mut inputs: BTreeMap<String, ModuleInput> = BTreeMap::new();
        for name in graph.order() {
            let (Some(module), Some(settings)) = (project.store.get(name), effective.get(name.as_str())) else {
                continue;
            };
            inputs.insert(
                name.clone(),
                ModuleInput {
                    forest: forests.remove(name.as_str()).unwrap_or_default(),
                    namespace: settings.namespace.clone(),
                    version: module.version.clone(),
                    regenerate: regenerate.contains(name.as_str()),
                },
            );
        }

        let codegen = codegen_settings(config);
        let sink = DiskSink::new(&output_root);
        let artifacts = Assembler::new(&codegen, &types).assemble(inputs, graph, &sink)?;

        // ── Record ──

        for module in &artifacts.modules {
            let key = module_key(&module.module);
            if panicked.contains(module.module.as_str()) {
                // Output is incomplete; keep old files and rebuild next run.
                warn!(module = %module.module, "not cached: front end panicked on one of its headers");
                cache.forget(&key);
                continue;
            }
            let outputs: BTreeMap<String, String> = module
                .files()
                .map(|f| {
                    (
                        relative_key(&project.root, &output_root.join(&f.path)),
                        fingerprint(f.content.as_bytes()),
                    )
                })
                .collect();

            let stale: Vec<String> = cache
                .entry(&key)
                .map(|previous| {
                    previous
                        .outputs
                        .keys()
                        .filter(|p| !outputs.contains_key(*p))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for old in stale {
                let path = project.root.join(&old);
                if !path.starts_with(&output_root) || !path.is_file() {
                    continue;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(file = %old, "stale output removed");
                        report.files_removed.push(old);
                    }
                    Err(e) => warn!(file = %old, error = %e, "failed to remove stale output"),
                }
            }

            let fp = module_fps.get(module.module.as_str()).cloned().unwrap_or_default();
            cache.record_outputs(key, module.module.clone(), fp, outputs);
        }
        for (path, forest_fp) in parsed.values() {
            if let Err(e) = cache.record_generated(path, forest_fp.clone()) {
                warn!(error = %e, "failed to record header in cache");
            }
        }

        let live: BTreeSet<String> = graph
            .order()
            .iter()
            .map(|name| module_key(name))
            .chain(members.values().flatten().map(|s| s.rel.clone()))
            .collect();
        cache.prune(&live);
        if let Err(e) = cache.save() {
            warn!(path = %cache.path().display(), error = %e, "failed to save cache");
        }

        report.regenerated = artifacts.modules.iter().map(|m| m.module.clone()).collect();
        report.skipped = artifacts.skipped;
        report.files_written = sink.written();
        report.files_removed.sort();

        info!(
            modules = report.modules.len(),
            regenerated = report.regenerated.len(),
            skipped = report.skipped.len(),
            written = report.files_written.len(),
            diagnostics = report.diagnostics.len(),
            "generation complete"
        );
        Ok(report)
    }

    /// Parse and extract every job on a bounded set of scoped threads.
    /// Outcomes come back in job order. A panic in the front end is caught
    /// per job, so the worker carries on with the rest of the queue.
    fn parse_all(&self, jobs: &[ParseJob<'_>], types: &TypeTable, include_paths: &[PathBuf]) -> Vec<ParseOutcome> {
        let workers = thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(jobs.len());
        let queue = Mutex::new(jobs.iter().enumerate());
        let outcomes: Mutex<Vec<ParseOutcome>> = Mutex::new((0..jobs.len()).map(|_| None).collect());

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| loop {
                    let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                    let Some((index, job)) = next else {
                        break;
                    };
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.front_end
                            .parse(&job.source.path, include_paths, job.defines)
                            .map(|unit| extract(&unit, &job.policy, types))
                    }))
                    .ok();
                    outcomes.lock().unwrap_or_else(PoisonError::into_inner)[index] = outcome;
                });
            }
        });
        outcomes.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settings that shape the output. Flags that only affect how a run
/// behaves are left out.
fn settings_fingerprint(config: &GeneratorConfig) -> String {
    let mut global = config.global.clone();
    global.verbose = false;
    global.incremental = true;
    let mut fp = Fingerprinter::new();
    fp.field("sharpgen", env!("CARGO_PKG_VERSION"))
        .field("global", &serde_json::to_string(&global).unwrap_or_default())
        .field("types", &serde_json::to_string(&config.types).unwrap_or_default());
    fp.finish()
}

fn codegen_settings(config: &GeneratorConfig) -> CodegenSettings {
    let global = &config.global;
    CodegenSettings {
        target_framework: global.target_framework.clone(),
        core_assembly: global.core_assembly.clone(),
        core_assembly_path: global.core_assembly_path.clone(),
        core_namespace: global.core_namespace.clone(),
        layout: OutputLayout {
            module_dir: global.module_dir.clone(),
            manifest_name: global.manifest_name.clone(),
            solution_name: global.solution_name.clone(),
        },
        generate_docs: global.generate_documentation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_do_not_change_the_settings_fingerprint() {
        let mut config = GeneratorConfig::default();
        let base = settings_fingerprint(&config);
        config.global.verbose = true;
        config.global.incremental = false;
        assert_eq!(settings_fingerprint(&config), base);

        config.global.namespace = "Other".into();
        assert_ne!(settings_fingerprint(&config), base);
    }

    #[test]
    fn codegen_settings_follow_the_configuration() {
        let mut config = GeneratorConfig::default();
        config.global.module_dir = "Gems/{module}".into();
        config.global.generate_documentation = false;
        let settings = codegen_settings(&config);
        assert_eq!(settings.layout.manifest_path("Audio"), "Gems/Audio/Audio.csproj");
        assert!(!settings.generate_docs);
        assert_eq!(settings.core_namespace, "O3DE.Core");
    }
}
