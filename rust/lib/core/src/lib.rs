//! Configuration document and diagnostic taxonomy shared by a generation run.

pub mod config;
pub mod error;

pub use config::{
    ConfigStatus, EffectiveSettings, GeneratorConfig, GlobalSettings, ModuleSettings,
    DEFAULT_CONFIG_FILE,
};
pub use error::{ConfigError, Diagnostic, DiagnosticKind};
