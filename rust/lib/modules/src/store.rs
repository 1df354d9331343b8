//! Module descriptor store.
//!
//! Keyed by module name. Iteration is always in name order so everything
//! derived from the store is deterministic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sharpgen_ir::ModuleDescriptor;

use crate::glob::Pattern;

/// What a module without include patterns claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipPolicy {
    /// No headers.
    #[default]
    Strict,
    /// Every discovered header.
    Permissive,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleStore {
    modules: BTreeMap<String, ModuleDescriptor>,
    policy: MembershipPolicy,
}

impl ModuleStore {
    pub fn new(policy: MembershipPolicy) -> Self {
        Self {
            modules: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> MembershipPolicy {
        self.policy
    }

    /// Insert or replace a descriptor; returns the previous one.
    pub fn insert(&mut self, module: ModuleDescriptor) -> Option<ModuleDescriptor> {
        self.modules.insert(module.name.clone(), module)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ModuleDescriptor> {
        self.modules.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.modules.get(name).is_some_and(|m| m.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values().filter(|m| m.enabled)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether a project-relative header path belongs to `module`.
    pub fn claims(&self, module: &ModuleDescriptor, rel_path: &str) -> bool {
        if module.exclude.iter().any(|p| Pattern::new(p).matches(rel_path)) {
            return false;
        }
        if module.include.is_empty() {
            return self.policy == MembershipPolicy::Permissive;
        }
        module.include.iter().any(|p| Pattern::new(p).matches(rel_path))
    }

    /// Enabled modules that claim the header, in name order.
    pub fn matching_modules(&self, rel_path: &str) -> Vec<&str> {
        self.enabled()
            .filter(|m| self.claims(m, rel_path))
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Literal include patterns of `module` that name no existing file
    /// under `root`.
    pub fn missing_literal_includes(&self, module: &str, root: &Path) -> Vec<PathBuf> {
        let Some(module) = self.modules.get(module) else {
            return vec![];
        };
        module
            .include
            .iter()
            .map(|p| Pattern::new(p))
            .filter(Pattern::is_literal)
            .map(|p| root.join(p.as_str()))
            .filter(|path| !path.is_file())
            .collect()
    }
}

impl FromIterator<ModuleDescriptor> for ModuleStore {
    fn from_iter<I: IntoIterator<Item = ModuleDescriptor>>(iter: I) -> Self {
        let mut store = ModuleStore::default();
        for module in iter {
            store.insert(module);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(policy: MembershipPolicy) -> ModuleStore {
        let mut s = ModuleStore::new(policy);
        s.insert(
            ModuleDescriptor::new("Physics")
                .with_include("Gems/Physics/**/*.h")
                .with_exclude("**/Private/**"),
        );
        s.insert(ModuleDescriptor::new("Audio").with_include("Gems/Audio/**/*.h").disabled());
        s.insert(ModuleDescriptor::new("Everything"));
        s
    }

    #[test]
    fn include_and_exclude() {
        let s = store(MembershipPolicy::Strict);
        assert_eq!(s.matching_modules("Gems/Physics/Include/Body.h"), vec!["Physics"]);
        assert!(s.matching_modules("Gems/Physics/Private/Impl.h").is_empty());
        // Audio is disabled.
        assert!(s.matching_modules("Gems/Audio/Include/Sound.h").is_empty());
    }

    #[test]
    fn patternless_module_follows_policy() {
        let strict = store(MembershipPolicy::Strict);
        assert!(strict.matching_modules("Other/Thing.h").is_empty());

        let permissive = store(MembershipPolicy::Permissive);
        assert_eq!(permissive.matching_modules("Other/Thing.h"), vec!["Everything"]);
        assert_eq!(
            permissive.matching_modules("Gems/Physics/Body.h"),
            vec!["Everything", "Physics"]
        );
    }

    #[test]
    fn enabled_iterates_in_name_order() {
        let s = store(MembershipPolicy::Strict);
        let names: Vec<_> = s.enabled().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Everything", "Physics"]);
        assert!(!s.is_enabled("Audio"));
        assert!(s.contains("Audio"));
    }

    #[test]
    fn missing_literal_includes_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Gem")).unwrap();
        std::fs::write(dir.path().join("Gem/Here.h"), "").unwrap();

        let s: ModuleStore = [ModuleDescriptor::new("Gem")
            .with_include("Gem/Here.h")
            .with_include("Gem/Gone.h")
            .with_include("Gem/*.h")]
        .into_iter()
        .collect();
        assert_eq!(
            s.missing_literal_includes("Gem", dir.path()),
            vec![dir.path().join("Gem/Gone.h")]
        );
        assert!(s.missing_literal_includes("Nope", dir.path()).is_empty());
    }
}
