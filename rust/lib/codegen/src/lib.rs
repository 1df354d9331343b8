//! C# code generation.
//!
//! Turns per-module declaration forests into C# sources and project files:
//! - `naming`: C# identifiers, file names, XML escaping
//! - `category`: value types / entities / functions / enums / event buses
//! - `emit`: per-module `.cs` files and the native entry-point table
//! - `project`: `.csproj` manifests and the shared `.sln`
//! - `assemble`: module-by-module assembly in dependency order

pub mod assemble;
pub mod category;
pub mod emit;
pub mod error;
pub mod naming;
pub mod project;
pub mod settings;

pub use assemble::{
    ArtifactSink, Assembler, GeneratedArtifacts, MemorySink, ModuleArtifacts, ModuleInput,
};
pub use category::Category;
pub use error::AssembleError;
pub use settings::{CodegenSettings, OutputLayout};

/// One generated file. `path` is relative to the output root, `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}
