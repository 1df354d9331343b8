//! Translation-unit boundary.
//!
//! A parsed header as a tree of cursors. Produced by a [`crate::FrontEnd`]
//! and consumed by [`crate::extract`]; serializable so an external dumper
//! can feed the extractor through `.ast.json` files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One parsed header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// The header this unit was parsed from.
    #[serde(default)]
    pub path: PathBuf,

    /// Headers pulled in by `#include`, resolved against the include paths.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<PathBuf>,

    #[serde(default)]
    pub cursors: Vec<Cursor>,
}

impl TranslationUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            includes: vec![],
            cursors: vec![],
        }
    }

    /// True when `file` names this unit's header. Cursors without a
    /// location are attributed to the unit.
    pub fn owns(&self, file: &Path) -> bool {
        file.as_os_str().is_empty() || file == self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorKind {
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    EnumConstant,
    Field,
    Method,
    Constructor,
    Destructor,
    Function,
    Parameter,
    Variable,
    Typedef,
    #[serde(other)]
    Other,
}

impl CursorKind {
    pub fn is_record(self) -> bool {
        matches!(self, CursorKind::Class | CursorKind::Struct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSpecifier {
    pub name: String,
    pub access: Access,
}

/// A declaration in the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub kind: CursorKind,

    /// Declared name (empty for anonymous namespaces, enums and parameters).
    #[serde(default)]
    pub spelling: String,

    /// Physical location. Empty means "inherit from the parent".
    #[serde(default)]
    pub file: PathBuf,

    #[serde(default)]
    pub line: u32,

    /// Member access; `None` outside records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,

    /// Field / parameter type, function return type, enum underlying type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_spelling: Option<String>,

    #[serde(default)]
    pub is_static: bool,

    /// `const` method, or top-level `const` field.
    #[serde(default)]
    pub is_const: bool,

    #[serde(default)]
    pub is_virtual: bool,

    #[serde(default)]
    pub is_pure: bool,

    /// Parameter default argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// Enumerator initializer expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<BaseSpecifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Cursor>,
}

impl Cursor {
    pub fn new(kind: CursorKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            file: PathBuf::new(),
            line: 0,
            access: None,
            annotations: vec![],
            type_spelling: None,
            is_static: false,
            is_const: false,
            is_virtual: false,
            is_pure: false,
            default_value: None,
            enum_value: None,
            doc: None,
            bases: vec![],
            children: vec![],
        }
    }

    pub fn with_type(mut self, spelling: impl Into<String>) -> Self {
        self.type_spelling = Some(spelling.into());
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn with_child(mut self, child: Cursor) -> Self {
        self.children.push(child);
        self
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }

    /// Public members are the only ones ever extracted; no access means
    /// the cursor is not a record member.
    pub fn is_accessible(&self) -> bool {
        matches!(self.access, None | Some(Access::Public))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kinds_deserialize_as_other() {
        let c: Cursor = serde_json::from_str(r#"{"kind":"using_directive","spelling":"x"}"#).unwrap();
        assert_eq!(c.kind, CursorKind::Other);
        assert!(c.children.is_empty());
    }

    #[test]
    fn ownership_defaults_to_unit() {
        let unit = TranslationUnit::new("Gem/Foo.h");
        assert!(unit.owns(Path::new("")));
        assert!(unit.owns(Path::new("Gem/Foo.h")));
        assert!(!unit.owns(Path::new("AzCore/Math/Vector3.h")));
    }
}
