use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::fingerprint::{fingerprint_file, Fingerprinter};

/// On-disk format version. Any other value forces a full rebuild.
pub const CACHE_VERSION: u32 = 1;

const MODULE_KEY_PREFIX: &str = "module:";

/// Cache key of a module entry.
pub fn module_key(module: &str) -> String {
    format!("{MODULE_KEY_PREFIX}{module}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Project-relative path of the input, or the module name.
    pub input_path: String,

    pub content_fingerprint: String,

    /// Fingerprint over everything produced from the input.
    #[serde(default)]
    pub output_fingerprint: String,

    /// Produced files (project-relative) and their fingerprints.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,

    /// RFC 3339.
    pub generated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    /// No cache file yet.
    Missing,
    /// Unreadable, unparsable or from another version; everything is stale.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct IncrementalCache {
    path: PathBuf,
    root: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    status: LoadStatus,
}

impl IncrementalCache {
    /// Load the cache stored at `path`. Keys are made relative to `root`.
    /// Never fails: problems are reported through [`LoadStatus`].
    pub fn load(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let root = root.into();
        let (entries, status) = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<CacheFile>(&bytes) {
                Ok(file) if file.version == CACHE_VERSION => (file.entries, LoadStatus::Loaded),
                Ok(file) => (
                    BTreeMap::new(),
                    LoadStatus::Failed(format!(
                        "cache version {} (expected {CACHE_VERSION})",
                        file.version
                    )),
                ),
                Err(e) => (BTreeMap::new(), LoadStatus::Failed(e.to_string())),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (BTreeMap::new(), LoadStatus::Missing)
            }
            Err(e) => (BTreeMap::new(), LoadStatus::Failed(e.to_string())),
        };
        match &status {
            LoadStatus::Loaded => debug!(path = %path.display(), entries = entries.len(), "cache loaded"),
            LoadStatus::Missing => debug!(path = %path.display(), "no cache yet"),
            LoadStatus::Failed(reason) => {
                warn!(path = %path.display(), %reason, "cache unusable, rebuilding everything")
            }
        }
        Self {
            path,
            root,
            entries,
            status,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn load_failed(&self) -> bool {
        matches!(self.status, LoadStatus::Failed(_))
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Project-relative, `/`-separated key for a file.
    pub fn key_for(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.to_string_lossy().replace('\\', "/")
    }

    /// True unless the file's current content matches its stored entry.
    pub fn should_regenerate(&self, path: &Path) -> bool {
        match fingerprint_file(path) {
            Ok(fp) => self.should_regenerate_key(&self.key_for(path), &fp),
            Err(_) => true,
        }
    }

    pub fn should_regenerate_key(&self, key: &str, content_fingerprint: &str) -> bool {
        if self.load_failed() {
            return true;
        }
        self.entries
            .get(key)
            .map_or(true, |e| e.content_fingerprint != content_fingerprint)
    }

    /// Record a successful generation from a file, fingerprinting it now.
    pub fn record_generated(
        &mut self,
        path: &Path,
        output_fingerprint: impl Into<String>,
    ) -> Result<(), CacheError> {
        let content = fingerprint_file(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = self.key_for(path);
        self.record_key(key.clone(), key, content, output_fingerprint.into(), BTreeMap::new());
        Ok(())
    }

    /// Record a generation whose outputs are files; the output fingerprint
    /// is derived from the listed file fingerprints.
    pub fn record_outputs(
        &mut self,
        key: impl Into<String>,
        input: impl Into<String>,
        content_fingerprint: impl Into<String>,
        outputs: BTreeMap<String, String>,
    ) {
        let mut fp = Fingerprinter::new();
        for (path, digest) in &outputs {
            fp.field(path, digest);
        }
        let output_fingerprint = fp.finish();
        self.record_key(
            key.into(),
            input.into(),
            content_fingerprint.into(),
            output_fingerprint,
            outputs,
        );
    }

    fn record_key(
        &mut self,
        key: String,
        input_path: String,
        content_fingerprint: String,
        output_fingerprint: String,
        outputs: BTreeMap<String, String>,
    ) {
        self.entries.insert(
            key,
            CacheEntry {
                input_path,
                content_fingerprint,
                output_fingerprint,
                outputs,
                generated_at: chrono::Utc::now().to_rfc3339(),
            },
        );
    }

    /// Every output recorded under `key` still exists with the recorded
    /// content. False when there is no entry.
    pub fn outputs_intact(&self, key: &str) -> bool {
        let Some(entry) = self.entries.get(key) else {
            return false;
        };
        entry.outputs.iter().all(|(rel, digest)| {
            fingerprint_file(&self.root.join(rel)).is_ok_and(|fp| fp == *digest)
        })
    }

    /// Drop one entry so its unit regenerates next time.
    pub fn forget(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop entries whose keys are not in `live`. Returns how many went.
    pub fn prune(&mut self, live: &BTreeSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| live.contains(key));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "pruned stale cache entries");
        }
        removed
    }

    /// Write to a temporary file next to the cache, then rename over it.
    pub fn save(&self) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| CacheError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let file = CacheFile {
            version: CACHE_VERSION,
            entries: self.entries.clone(),
        };
        let data = serde_json::to_vec_pretty(&file)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "cache saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(".sharpgen/cache.json");
        (dir, cache)
    }

    #[test]
    fn missing_cache_regenerates_everything() {
        let (dir, cache_path) = project();
        let header = dir.path().join("A.h");
        fs::write(&header, "void A();").unwrap();

        let cache = IncrementalCache::load(&cache_path, dir.path());
        assert_eq!(cache.status(), &LoadStatus::Missing);
        assert!(cache.should_regenerate(&header));
    }

    #[test]
    fn recorded_file_is_fresh_until_edited() {
        let (dir, cache_path) = project();
        let header = dir.path().join("Gem/A.h");
        fs::create_dir_all(header.parent().unwrap()).unwrap();
        fs::write(&header, "void A();").unwrap();

        let mut cache = IncrementalCache::load(&cache_path, dir.path());
        cache.record_generated(&header, "forest").unwrap();
        assert!(!cache.should_regenerate(&header));
        assert_eq!(cache.entry("Gem/A.h").unwrap().input_path, "Gem/A.h");
        cache.save().unwrap();

        let reloaded = IncrementalCache::load(&cache_path, dir.path());
        assert_eq!(reloaded.status(), &LoadStatus::Loaded);
        assert!(!reloaded.should_regenerate(&header));

        fs::write(&header, "void A(int);").unwrap();
        assert!(reloaded.should_regenerate(&header));
    }

    #[test]
    fn forgotten_entry_regenerates() {
        let (dir, cache_path) = project();
        let header = dir.path().join("A.h");
        fs::write(&header, "void A();").unwrap();

        let mut cache = IncrementalCache::load(&cache_path, dir.path());
        cache.record_generated(&header, "forest").unwrap();
        assert!(cache.forget("A.h"));
        assert!(!cache.forget("A.h"));
        assert!(cache.should_regenerate(&header));
    }

    #[test]
    fn corrupt_cache_forces_rebuild() {
        let (dir, cache_path) = project();
        fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        fs::write(&cache_path, "{ truncated").unwrap();

        let cache = IncrementalCache::load(&cache_path, dir.path());
        assert!(cache.load_failed());
        assert!(cache.should_regenerate_key("anything", "fp"));
    }

    #[test]
    fn version_mismatch_forces_rebuild() {
        let (dir, cache_path) = project();
        fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        fs::write(&cache_path, r#"{"version": 99, "entries": {}}"#).unwrap();

        let cache = IncrementalCache::load(&cache_path, dir.path());
        assert!(matches!(cache.status(), LoadStatus::Failed(reason) if reason.contains("99")));
    }

    #[test]
    fn module_outputs_are_verified() {
        let (dir, cache_path) = project();
        let out = dir.path().join("Out/Gem.csproj");
        fs::create_dir_all(out.parent().unwrap()).unwrap();
        fs::write(&out, "<Project/>").unwrap();

        let mut cache = IncrementalCache::load(&cache_path, dir.path());
        let key = module_key("Gem");
        assert!(!cache.outputs_intact(&key));

        let outputs = BTreeMap::from([("Out/Gem.csproj".to_string(), fingerprint(b"<Project/>"))]);
        cache.record_outputs(&key, "Gem", "settings", outputs);
        assert!(!cache.should_regenerate_key(&key, "settings"));
        assert!(cache.should_regenerate_key(&key, "changed"));
        assert!(cache.outputs_intact(&key));

        fs::write(&out, "<Project>edited</Project>").unwrap();
        assert!(!cache.outputs_intact(&key));
        fs::remove_file(&out).unwrap();
        assert!(!cache.outputs_intact(&key));
    }

    #[test]
    fn prune_keeps_live_keys() {
        let (dir, cache_path) = project();
        let mut cache = IncrementalCache::load(&cache_path, dir.path());
        cache.record_outputs("a", "a", "1", BTreeMap::new());
        cache.record_outputs("b", "b", "2", BTreeMap::new());
        let live = BTreeSet::from(["a".to_string()]);
        assert_eq!(cache.prune(&live), 1);
        assert!(cache.entry("a").is_some());
        assert!(cache.entry("b").is_none());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let (dir, cache_path) = project();
        let cache = IncrementalCache::load(&cache_path, dir.path());
        cache.save().unwrap();
        assert!(cache_path.is_file());
        let names: Vec<_> = fs::read_dir(cache_path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("cache.json")]);
    }
}
