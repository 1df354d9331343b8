use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sharpgen_codegen::{ArtifactSink, AssembleError, GeneratedFile};
use tracing::debug;

/// Writes generated files under an output root. A file whose content is
/// already on disk is left untouched, so unchanged outputs keep their
/// modification times.
#[derive(Debug)]
pub struct DiskSink {
    root: PathBuf,
    written: Mutex<Vec<String>>,
}

impl DiskSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output-root relative paths actually written, sorted.
    pub fn written(&self) -> Vec<String> {
        let mut written = self
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        written.sort();
        written
    }
}

impl ArtifactSink for DiskSink {
    fn write(&self, file: &GeneratedFile) -> Result<(), AssembleError> {
        let path = self.root.join(&file.path);
        if fs::read(&path).is_ok_and(|current| current == file.content.as_bytes()) {
            debug!(file = %file.path, "unchanged");
            return Ok(());
        }
        let failed = |source| AssembleError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(failed)?;
        }
        fs::write(&path, &file.content).map_err(failed)?;
        debug!(file = %file.path, bytes = file.content.len(), "written");
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file.path.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiskSink::new(dir.path());
        let file = GeneratedFile::new("Gem/Gem.csproj", "<Project />\n");

        sink.write(&file).unwrap();
        sink.write(&file).unwrap();
        assert_eq!(sink.written(), vec!["Gem/Gem.csproj"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("Gem/Gem.csproj")).unwrap(),
            "<Project />\n"
        );

        sink.write(&GeneratedFile::new("Gem/Gem.csproj", "<Project/>\n")).unwrap();
        assert_eq!(sink.written().len(), 2);
    }

    #[test]
    fn write_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let sink = DiskSink::new(dir.path().join("blocker"));
        let err = sink.write(&GeneratedFile::new("A/A.cs", "x")).unwrap_err();
        assert!(matches!(err, AssembleError::Write { .. }));
        assert!(err.to_string().contains("A.cs") || err.to_string().contains("blocker"));
    }
}
