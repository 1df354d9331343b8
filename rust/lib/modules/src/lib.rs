//! sharpgen modules
//!
//! - `store`: module descriptors keyed by name, header membership
//! - `glob`: include/exclude pattern matching
//! - `gem`: `gem.json` manifests (dependencies, version)
//! - `graph`: dependency graph, topological order, cycle detection

pub mod gem;
pub mod glob;
pub mod graph;
pub mod store;

pub use gem::{GemError, GemManifest};
pub use glob::Pattern;
pub use graph::{GraphError, ModuleGraph, UnresolvedDependency, UnresolvedReason};
pub use store::{MembershipPolicy, ModuleStore};
