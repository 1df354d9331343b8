//! Declaration IR: the forest extracted from native headers.
//!
//! A closed sum type over declaration kinds so consumers can match
//! exhaustively. Built by the extractor, handed by value to the assembler.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::TypeDescriptor;

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum Decl {
    Class(ClassDecl),
    Function(FunctionDecl),
    Enum(EnumDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Class(c) => &c.name,
            Decl::Function(f) => &f.name,
            Decl::Enum(e) => &e.name,
        }
    }

    /// Namespace path, `::`-joined outer to inner (empty at global scope).
    pub fn scope(&self) -> &str {
        match self {
            Decl::Class(c) => &c.scope,
            Decl::Function(f) => &f.scope,
            Decl::Enum(e) => &e.scope,
        }
    }

    pub fn source_file(&self) -> &Path {
        match self {
            Decl::Class(c) => &c.source_file,
            Decl::Function(f) => &f.source_file,
            Decl::Enum(e) => &e.source_file,
        }
    }

    /// `scope::name`, or just `name` at global scope.
    pub fn qualified_name(&self) -> String {
        qualify(self.scope(), self.name())
    }

    /// Every type descriptor referenced by this declaration.
    pub fn type_refs(&self) -> Vec<&TypeDescriptor> {
        let mut refs = Vec::new();
        match self {
            Decl::Class(c) => {
                for member in &c.members {
                    match member {
                        Member::Method(m) => {
                            refs.push(&m.return_type);
                            refs.extend(m.params.iter().map(|p| &p.ty));
                        }
                        Member::Property(p) => refs.push(&p.ty),
                    }
                }
            }
            Decl::Function(f) => {
                refs.push(&f.return_type);
                refs.extend(f.params.iter().map(|p| &p.ty));
            }
            Decl::Enum(e) => refs.push(&e.underlying),
        }
        refs
    }
}

pub fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}::{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Class,
    Struct,
}

/// A class or struct with its public members in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,

    pub kind: RecordKind,

    /// First public base class, as spelled in the header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    pub source_file: PathBuf,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, kind: RecordKind, source_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            scope: String::new(),
            kind,
            base: None,
            members: vec![],
            doc: None,
            source_file: source_file.into(),
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(m) => Some(m),
            Member::Property(_) => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Property(p) => Some(p),
            Member::Method(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum Member {
    Method(MethodDecl),
    Property(PropertyDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub return_type: TypeDescriptor,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Parameter>,

    #[serde(default)]
    pub is_static: bool,

    #[serde(default)]
    pub is_const: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// A non-static data member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub ty: TypeDescriptor,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// A free function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,

    pub return_type: TypeDescriptor,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Parameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    pub source_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeDescriptor,

    /// Default argument as spelled in the header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,

    /// Underlying integer type (`int` when not spelled).
    pub underlying: TypeDescriptor,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<EnumValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    pub source_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,

    /// Explicit value, when one was given (or could be evaluated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

/// Declarations extracted from one or more translation units, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationForest {
    #[serde(default)]
    pub decls: Vec<Decl>,
}

impl DeclarationForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decl: Decl) {
        self.decls.push(decl);
    }

    /// Append another forest, keeping its order after ours.
    pub fn merge(&mut self, other: DeclarationForest) {
        self.decls.extend(other.decls);
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decl> {
        self.decls.iter()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Class(c) => Some(c),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Enum(e) => Some(e),
            _ => None,
        })
    }

    /// Native spellings that needed marshaling (not found in the type table),
    /// deduplicated and sorted.
    pub fn unknown_types(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = self
            .decls
            .iter()
            .flat_map(|d| d.type_refs())
            .filter(|t| t.requires_marshaling)
            .map(|t| t.native.as_str())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen
    }
}

impl IntoIterator for DeclarationForest {
    type Item = Decl;
    type IntoIter = std::vec::IntoIter<Decl>;

    fn into_iter(self) -> Self::IntoIter {
        self.decls.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeclarationForest {
    type Item = &'a Decl;
    type IntoIter = std::slice::Iter<'a, Decl>;

    fn into_iter(self) -> Self::IntoIter {
        self.decls.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTable;

    fn sample_forest() -> DeclarationForest {
        let table = TypeTable::canonical();
        let mut class = ClassDecl::new("Mover", RecordKind::Class, "Movement.h");
        class.scope = "Game::Physics".into();
        class.members.push(Member::Method(MethodDecl {
            name: "Move".into(),
            return_type: table.normalize("void"),
            params: vec![Parameter {
                name: "delta".into(),
                ty: table.normalize("const AZ::Vector3&"),
                default_value: None,
            }],
            is_static: false,
            is_const: false,
            doc: None,
        }));
        class.members.push(Member::Property(PropertyDecl {
            name: "body".into(),
            ty: table.normalize("Physics::RigidBody*"),
            read_only: false,
            doc: None,
        }));

        let mut forest = DeclarationForest::new();
        forest.push(Decl::Class(class));
        forest.push(Decl::Enum(EnumDecl {
            name: "Mode".into(),
            scope: String::new(),
            underlying: table.normalize("int"),
            values: vec![EnumValue {
                name: "Walk".into(),
                value: Some(0),
            }],
            doc: None,
            source_file: "Movement.h".into(),
        }));
        forest
    }

    #[test]
    fn qualified_names() {
        let forest = sample_forest();
        assert_eq!(forest.decls[0].qualified_name(), "Game::Physics::Mover");
        assert_eq!(forest.decls[1].qualified_name(), "Mode");
    }

    #[test]
    fn members_split_by_kind() {
        let forest = sample_forest();
        let class = forest.classes().next().unwrap();
        assert_eq!(class.methods().count(), 1);
        assert_eq!(class.properties().count(), 1);
    }

    #[test]
    fn unknown_types_are_collected() {
        let forest = sample_forest();
        assert_eq!(forest.unknown_types(), vec!["Physics::RigidBody*"]);
    }

    #[test]
    fn merge_preserves_order() {
        let mut a = sample_forest();
        let b = sample_forest();
        a.merge(b);
        let names: Vec<_> = a.iter().map(Decl::name).collect();
        assert_eq!(names, vec!["Mover", "Mode", "Mover", "Mode"]);
    }

    #[test]
    fn serde_tags_declaration_kind() {
        let forest = sample_forest();
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json["decls"][0]["decl"], "class");
        assert_eq!(json["decls"][1]["decl"], "enum");
        let back: DeclarationForest = serde_json::from_value(json).unwrap();
        assert_eq!(back, forest);
    }
}
