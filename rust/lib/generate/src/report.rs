use serde::Serialize;
use sharpgen_core::{Diagnostic, DiagnosticKind};

/// Outcome of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Enabled modules in build order.
    pub modules: Vec<String>,
    pub regenerated: Vec<String>,
    /// Modules whose outputs were already current.
    pub skipped: Vec<String>,
    /// Output-root relative paths whose content changed, sorted.
    pub files_written: Vec<String>,
    /// Stale outputs of regenerated modules that were deleted.
    pub files_removed: Vec<String>,
    pub parsed_files: usize,
    /// Distinct unknown native types over all parsed modules.
    pub unknown_types: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Nothing was enabled, so nothing was produced.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
