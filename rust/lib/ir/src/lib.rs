//! sharpgen Intermediate Representation (IR)
//!
//! Dependency-free data structures shared between:
//! - parser (native headers → declaration forest)
//! - module resolver (module descriptors)
//! - codegen (declaration forest → C# sources and project manifests)
//!
//! Three layers:
//! 1. Types: normalized type descriptors + the canonical type table
//! 2. Decl: the declaration tree extracted from one or more headers
//! 3. Module: logical output module ("gem") descriptors

pub mod decl;
pub mod module;
pub mod types;

pub use decl::*;
pub use module::*;
pub use types::*;
