//! Module dependency graph.
//!
//! Built once per run from the enabled modules of a [`ModuleStore`] and
//! immutable afterwards. Ordering uses Kahn's algorithm one frontier at a
//! time; each frontier is a rank whose members have no edges between them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::store::ModuleStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Modules on the cycle in edge order, starting at the smallest name.
    #[error("circular module dependency: {}", format_cycle(.cycle))]
    Cycle { cycle: Vec<String> },
}

fn format_cycle(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" -> ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    Unknown,
    Disabled,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::Unknown => f.write_str("unknown module"),
            UnresolvedReason::Disabled => f.write_str("disabled module"),
        }
    }
}

/// A declared dependency dropped from the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDependency {
    pub module: String,
    pub dependency: String,
    pub reason: UnresolvedReason,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    /// Direct dependencies per module, declaration order.
    dependencies: BTreeMap<String, Vec<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
    ranks: Vec<Vec<String>>,
    rank_of: BTreeMap<String, usize>,
    unresolved: Vec<UnresolvedDependency>,
}

impl ModuleGraph {
    pub fn build(store: &ModuleStore) -> Result<Self, GraphError> {
        let mut graph = ModuleGraph::default();

        for module in store.enabled() {
            let mut deps = Vec::new();
            for dep in &module.dependencies {
                if deps.contains(dep) {
                    continue;
                }
                let reason = match store.get(dep) {
                    Some(m) if m.enabled => {
                        deps.push(dep.clone());
                        continue;
                    }
                    Some(_) => UnresolvedReason::Disabled,
                    None => UnresolvedReason::Unknown,
                };
                warn!(module = %module.name, dependency = %dep, %reason, "dropping unresolved dependency");
                graph.unresolved.push(UnresolvedDependency {
                    module: module.name.clone(),
                    dependency: dep.clone(),
                    reason,
                });
            }
            graph.dependents.entry(module.name.clone()).or_default();
            for dep in &deps {
                graph
                    .dependents
                    .entry(dep.clone())
                    .or_default()
                    .insert(module.name.clone());
            }
            graph.dependencies.insert(module.name.clone(), deps);
        }

        graph.sort()?;
        debug!(modules = graph.order.len(), ranks = graph.ranks.len(), "module graph resolved");
        Ok(graph)
    }

    fn sort(&mut self) -> Result<(), GraphError> {
        let mut remaining: BTreeMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.len()))
            .collect();

        let mut frontier: Vec<String> = remaining
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(name, _)| name.to_string())
            .collect();

        while !frontier.is_empty() {
            let mut next = BTreeSet::new();
            for name in &frontier {
                remaining.remove(name.as_str());
                for dependent in self.dependents.get(name).into_iter().flatten() {
                    if let Some(n) = remaining.get_mut(dependent.as_str()) {
                        *n -= 1;
                        if *n == 0 {
                            next.insert(dependent.clone());
                        }
                    }
                }
            }
            let rank = self.ranks.len();
            for name in &frontier {
                self.rank_of.insert(name.clone(), rank);
                self.order.push(name.clone());
            }
            self.ranks.push(std::mem::take(&mut frontier));
            frontier = next.into_iter().collect();
        }

        if remaining.is_empty() {
            return Ok(());
        }
        let residual: BTreeSet<&str> = remaining.keys().copied().collect();
        Err(GraphError::Cycle {
            cycle: self.find_cycle(&residual),
        })
    }

    /// Every module Kahn could not emit still has a dependency among the
    /// residual set, so following those edges must revisit a module.
    fn find_cycle(&self, residual: &BTreeSet<&str>) -> Vec<String> {
        let Some(start) = residual.iter().next().copied() else {
            return vec![];
        };
        let mut path: Vec<&str> = vec![start];
        let mut current: &str = start;
        let mut closed = false;
        loop {
            let next = self
                .direct_dependencies(current)
                .iter()
                .map(String::as_str)
                .find(|d| residual.contains(d));
            let Some(next) = next else {
                // Unreachable for a residual set; report what was walked.
                break;
            };
            if let Some(pos) = path.iter().position(|p| *p == next) {
                path.drain(..pos);
                closed = true;
                break;
            }
            path.push(next);
            current = next;
        }

        debug_assert!(closed, "residual walk from '{start}' did not close a loop");

        let min = path
            .iter()
            .enumerate()
            .min_by_key(|(_, name)| **name)
            .map(|(i, _)| i)
            .unwrap_or(0);
        path.rotate_left(min);
        path.into_iter().map(str::to_string).collect()
    }

    /// Dependencies before dependents.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Kahn frontiers: modules in one rank are mutually independent.
    pub fn ranks(&self) -> &[Vec<String>] {
        &self.ranks
    }

    pub fn rank_of(&self, module: &str) -> Option<usize> {
        self.rank_of.get(module).copied()
    }

    pub fn contains(&self, module: &str) -> bool {
        self.dependencies.contains_key(module)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn unresolved(&self) -> &[UnresolvedDependency] {
        &self.unresolved
    }

    /// Resolved direct dependencies in declaration order.
    pub fn direct_dependencies(&self, module: &str) -> &[String] {
        self.dependencies.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_dependents(&self, module: &str) -> Vec<&str> {
        self.dependents
            .get(module)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All modules `module` depends on, in build order.
    pub fn transitive_dependencies(&self, module: &str) -> Vec<&str> {
        let seen = self.reach(module, |m| self.direct_dependencies(m).iter().map(String::as_str).collect());
        self.in_order(seen)
    }

    /// All modules depending on `module`, in build order.
    pub fn transitive_dependents(&self, module: &str) -> Vec<&str> {
        let seen = self.reach(module, |m| self.direct_dependents(m));
        self.in_order(seen)
    }

    /// Transitive: true when `module` needs `other` built first.
    pub fn depends_on(&self, module: &str, other: &str) -> bool {
        self.reach(module, |m| self.direct_dependencies(m).iter().map(String::as_str).collect())
            .contains(other)
    }

    pub fn depends_directly_on(&self, module: &str, other: &str) -> bool {
        self.direct_dependencies(module).iter().any(|d| d == other)
    }

    /// Depth-first reachability; the start node is not part of the result.
    fn reach<'a, F>(&'a self, start: &str, next: F) -> BTreeSet<&'a str>
    where
        F: Fn(&str) -> Vec<&'a str>,
    {
        let mut seen = BTreeSet::new();
        let mut stack = next(start);
        while let Some(name) = stack.pop() {
            if name == start || !seen.insert(name) {
                continue;
            }
            stack.extend(next(name));
        }
        seen
    }

    fn in_order<'a>(&'a self, set: BTreeSet<&str>) -> Vec<&'a str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|name| set.contains(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpgen_ir::ModuleDescriptor;

    fn store(modules: &[(&str, &[&str])]) -> ModuleStore {
        modules
            .iter()
            .map(|(name, deps)| {
                deps.iter()
                    .fold(ModuleDescriptor::new(*name), |m, d| m.with_dependency(*d))
            })
            .collect()
    }

    fn position(graph: &ModuleGraph, name: &str) -> usize {
        graph.order().iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn dependency_precedes_dependent() {
        let g = ModuleGraph::build(&store(&[
            ("A", &["B"]),
            ("B", &["C"]),
            ("C", &[]),
            ("D", &["B", "C"]),
        ]))
        .unwrap();
        for (from, to) in [("A", "B"), ("B", "C"), ("D", "B"), ("D", "C")] {
            assert!(position(&g, to) < position(&g, from), "{to} before {from}");
        }
        assert_eq!(g.ranks(), &[vec!["C"], vec!["B"], vec!["A", "D"]]);
        assert_eq!(g.rank_of("A"), Some(2));
    }

    #[test]
    fn independent_modules_share_a_rank() {
        let g = ModuleGraph::build(&store(&[("X", &[]), ("Y", &[]), ("Z", &["X"])])).unwrap();
        assert_eq!(g.ranks(), &[vec!["X", "Y"], vec!["Z"]]);
    }

    #[test]
    fn repeated_dependency_is_not_a_cycle() {
        let mut app = ModuleDescriptor::new("App");
        app.dependencies = vec!["Core".into(), "Core".into()];
        let store: ModuleStore = [app, ModuleDescriptor::new("Core")].into_iter().collect();

        let g = ModuleGraph::build(&store).unwrap();
        assert_eq!(g.order(), &["Core", "App"]);
        assert_eq!(g.direct_dependencies("App"), &["Core"]);
        assert_eq!(g.transitive_dependents("Core"), vec!["App"]);
    }

    #[test]
    fn two_module_cycle_names_both() {
        let err = ModuleGraph::build(&store(&[("A", &["B"]), ("B", &["A"])])).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle {
                cycle: vec!["A".into(), "B".into()]
            }
        );
        assert_eq!(err.to_string(), "circular module dependency: A -> B -> A");
    }

    #[test]
    fn cycle_excludes_modules_hanging_off_it() {
        // Tail depends on the cycle and Root is depended on by it; neither is on it.
        let err = ModuleGraph::build(&store(&[
            ("Root", &[]),
            ("P", &["Q", "Root"]),
            ("Q", &["R"]),
            ("R", &["P"]),
            ("Tail", &["P"]),
        ]))
        .unwrap_err();
        let GraphError::Cycle { cycle } = err;
        assert_eq!(cycle, vec!["P", "Q", "R"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = ModuleGraph::build(&store(&[("Solo", &["Solo"])])).unwrap_err();
        assert_eq!(err.to_string(), "circular module dependency: Solo -> Solo");
    }

    #[test]
    fn unresolved_dependencies_are_dropped() {
        let mut s = store(&[("A", &["Ghost", "Off", "B"]), ("B", &[])]);
        s.insert(ModuleDescriptor::new("Off").disabled());
        let g = ModuleGraph::build(&s).unwrap();

        assert_eq!(g.direct_dependencies("A"), &["B".to_string()]);
        assert!(!g.contains("Off"));
        let reasons: Vec<_> = g
            .unresolved()
            .iter()
            .map(|u| (u.dependency.as_str(), u.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![("Ghost", UnresolvedReason::Unknown), ("Off", UnresolvedReason::Disabled)]
        );
    }

    #[test]
    fn disabled_module_cannot_close_a_cycle() {
        let mut s = store(&[("A", &["B"])]);
        s.insert(ModuleDescriptor::new("B").with_dependency("A").disabled());
        let g = ModuleGraph::build(&s).unwrap();
        assert_eq!(g.order(), &["A".to_string()]);
    }

    #[test]
    fn transitive_queries() {
        let g = ModuleGraph::build(&store(&[
            ("App", &["Physics", "Audio"]),
            ("Physics", &["Core"]),
            ("Audio", &["Core"]),
            ("Core", &[]),
            ("Tools", &[]),
        ]))
        .unwrap();

        assert_eq!(g.transitive_dependencies("App"), vec!["Core", "Audio", "Physics"]);
        assert_eq!(g.transitive_dependents("Core"), vec!["Audio", "Physics", "App"]);
        assert!(g.transitive_dependencies("Tools").is_empty());
        assert!(g.transitive_dependents("App").is_empty());

        assert!(g.depends_on("App", "Core"));
        assert!(!g.depends_directly_on("App", "Core"));
        assert!(g.depends_directly_on("App", "Physics"));
        assert!(!g.depends_on("Core", "App"));
        assert!(!g.depends_on("Core", "Core"));
        assert_eq!(g.direct_dependents("Core"), vec!["Audio", "Physics"]);
    }

    #[test]
    fn empty_store_gives_empty_graph() {
        let g = ModuleGraph::build(&ModuleStore::default()).unwrap();
        assert!(g.is_empty());
        assert!(g.order().is_empty());
        assert!(g.ranks().is_empty());
    }
}
