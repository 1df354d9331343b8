use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

// ── Diagnostics ─────────────────────────────────────────────────────
//
// Conditions a run recovers from. Each occurrence is logged when it is
// raised and kept in the run report; none of them stop generation.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DiagnosticKind {
    /// An input file could not be parsed; it was skipped.
    ParseFailure,
    /// A configured header does not exist.
    MissingFile,
    /// A native type is not in the type table; bindings marshal it.
    UnknownType,
    /// The configuration was malformed; defaults were used.
    ConfigLoadFailure,
    /// The cache could not be read; everything was regenerated.
    CacheLoadFailure,
    /// A dependency names a disabled or unknown module.
    UnresolvedDependency,
    CyclicModuleDependency,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::ParseFailure => "ParseFailure",
            DiagnosticKind::MissingFile => "MissingFile",
            DiagnosticKind::UnknownType => "UnknownType",
            DiagnosticKind::ConfigLoadFailure => "ConfigLoadFailure",
            DiagnosticKind::CacheLoadFailure => "CacheLoadFailure",
            DiagnosticKind::UnresolvedDependency => "UnresolvedDependency",
            DiagnosticKind::CyclicModuleDependency => "CyclicModuleDependency",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// File, module or type the diagnostic is about.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Log this occurrence and hand it back for collection.
    pub fn emit(self) -> Self {
        warn!(kind = %self.kind, subject = %self.subject, "{}", self.message);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.kind, self.subject, self.message)
    }
}

// ── ConfigError ─────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
