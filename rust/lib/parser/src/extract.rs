//! Declaration extraction: translation unit → declaration forest.
//!
//! An explicit recursive walk that returns values. Two filters apply to
//! every candidate declaration and, separately, to every class member:
//! the export marker (when required) and access level (private and
//! protected are always dropped).

use std::collections::HashMap;

use sharpgen_ir::{
    ClassDecl, Decl, DeclarationForest, EnumDecl, EnumValue, FunctionDecl, Member, MethodDecl,
    Parameter, PropertyDecl, RecordKind, TypeDescriptor, TypeTable,
};
use tracing::debug;

use crate::ast::{Access, Cursor, CursorKind, TranslationUnit};
use crate::expr;
use crate::EXPORT_ANNOTATION;

/// Which otherwise-visible declarations are admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Only admit declarations carrying `marker`.
    pub require_export_marker: bool,
    pub marker: String,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            require_export_marker: false,
            marker: EXPORT_ANNOTATION.to_string(),
        }
    }
}

impl FilterPolicy {
    pub fn new(require_export_marker: bool) -> Self {
        Self {
            require_export_marker,
            ..Self::default()
        }
    }

    /// Export marker first, then access control. The marker never
    /// overrides access.
    pub fn admits(&self, cursor: &Cursor) -> bool {
        if self.require_export_marker && !cursor.has_annotation(&self.marker) {
            return false;
        }
        cursor.is_accessible()
    }
}

/// Extract every admitted declaration physically located in `unit`'s file.
pub fn extract(unit: &TranslationUnit, policy: &FilterPolicy, types: &TypeTable) -> DeclarationForest {
    let extractor = Extractor { unit, policy, types };
    DeclarationForest {
        decls: extractor.walk(&unit.cursors, &[]),
    }
}

struct Extractor<'a> {
    unit: &'a TranslationUnit,
    policy: &'a FilterPolicy,
    types: &'a TypeTable,
}

impl<'a> Extractor<'a> {
    fn walk(&self, cursors: &'a [Cursor], ancestors: &[&'a Cursor]) -> Vec<Decl> {
        let mut decls = Vec::new();
        for cursor in cursors {
            if !self.unit.owns(&cursor.file) {
                debug!(name = %cursor.spelling, file = %cursor.file.display(), "declared in another file, skipped");
                continue;
            }
            match cursor.kind {
                CursorKind::Namespace => {
                    let mut inner = ancestors.to_vec();
                    inner.push(cursor);
                    decls.extend(self.walk(&cursor.children, &inner));
                }
                CursorKind::Class | CursorKind::Struct | CursorKind::Function | CursorKind::Enum => {
                    if cursor.spelling.is_empty() {
                        debug!(line = cursor.line, "anonymous declaration skipped");
                        continue;
                    }
                    if !self.policy.admits(cursor) {
                        debug!(name = %cursor.spelling, "filtered out");
                        continue;
                    }
                    let scope = scope_path(ancestors);
                    decls.push(match cursor.kind {
                        CursorKind::Function => Decl::Function(self.function(cursor, scope)),
                        CursorKind::Enum => Decl::Enum(self.enumeration(cursor, scope)),
                        _ => Decl::Class(self.class(cursor, scope)),
                    });
                }
                _ => debug!(kind = ?cursor.kind, name = %cursor.spelling, "not a bindable declaration"),
            }
        }
        decls
    }

    fn normalize(&self, spelling: Option<&str>, fallback: &str) -> TypeDescriptor {
        self.types.normalize(spelling.unwrap_or(fallback))
    }

    fn class(&self, cursor: &Cursor, scope: String) -> ClassDecl {
        let kind = match cursor.kind {
            CursorKind::Struct => RecordKind::Struct,
            _ => RecordKind::Class,
        };
        let mut class = ClassDecl::new(cursor.spelling.as_str(), kind, self.unit.path.clone());
        class.scope = scope;
        class.doc = cursor.doc.clone();
        class.base = cursor
            .bases
            .iter()
            .find(|b| b.access == Access::Public)
            .map(|b| b.name.clone());

        for child in &cursor.children {
            if !self.unit.owns(&child.file) {
                continue;
            }
            if !self.policy.admits(child) {
                debug!(class = %cursor.spelling, member = %child.spelling, "member filtered out");
                continue;
            }
            match child.kind {
                CursorKind::Method if !child.spelling.starts_with("operator") => {
                    class.members.push(Member::Method(MethodDecl {
                        name: child.spelling.clone(),
                        return_type: self.normalize(child.type_spelling.as_deref(), "void"),
                        params: self.parameters(child),
                        is_static: child.is_static,
                        is_const: child.is_const,
                        doc: child.doc.clone(),
                    }));
                }
                CursorKind::Field if child.is_static => {
                    debug!(class = %cursor.spelling, field = %child.spelling, "static data member skipped");
                }
                CursorKind::Field => match child.type_spelling.as_deref() {
                    Some(ty) => class.members.push(Member::Property(PropertyDecl {
                        name: child.spelling.clone(),
                        ty: self.types.normalize(ty),
                        read_only: child.is_const,
                        doc: child.doc.clone(),
                    })),
                    None => debug!(field = %child.spelling, "field without a type skipped"),
                },
                CursorKind::Class | CursorKind::Struct | CursorKind::Enum | CursorKind::Union => {
                    debug!(class = %cursor.spelling, nested = %child.spelling, "nested type skipped");
                }
                _ => {}
            }
        }
        class
    }

    fn function(&self, cursor: &Cursor, scope: String) -> FunctionDecl {
        FunctionDecl {
            name: cursor.spelling.clone(),
            scope,
            return_type: self.normalize(cursor.type_spelling.as_deref(), "void"),
            params: self.parameters(cursor),
            doc: cursor.doc.clone(),
            source_file: self.unit.path.clone(),
        }
    }

    fn parameters(&self, cursor: &Cursor) -> Vec<Parameter> {
        cursor
            .children
            .iter()
            .filter(|c| c.kind == CursorKind::Parameter)
            .enumerate()
            .map(|(i, p)| Parameter {
                name: if p.spelling.is_empty() {
                    format!("arg{i}")
                } else {
                    p.spelling.clone()
                },
                ty: self.normalize(p.type_spelling.as_deref(), "void*"),
                default_value: p.default_value.clone(),
            })
            .collect()
    }

    fn enumeration(&self, cursor: &Cursor, scope: String) -> EnumDecl {
        let mut known: HashMap<String, i64> = HashMap::new();
        let mut next = Some(0i64);
        let mut values = Vec::new();

        for constant in cursor.children.iter().filter(|c| c.kind == CursorKind::EnumConstant) {
            let (explicit, current) = match constant.enum_value.as_deref() {
                Some(text) => {
                    let value = expr::evaluate(text, &|name| {
                        known
                            .get(name)
                            .or_else(|| name.rsplit("::").next().and_then(|last| known.get(last)))
                            .copied()
                    });
                    if value.is_none() {
                        debug!(enumeration = %cursor.spelling, constant = %constant.spelling, expr = text, "enumerator value not evaluated");
                    }
                    (value, value)
                }
                None => (None, next),
            };
            if let Some(v) = current {
                known.insert(constant.spelling.clone(), v);
            }
            next = current.and_then(|v| v.checked_add(1));
            values.push(EnumValue {
                name: constant.spelling.clone(),
                value: explicit,
            });
        }

        EnumDecl {
            name: cursor.spelling.clone(),
            scope,
            underlying: self.normalize(cursor.type_spelling.as_deref(), "int"),
            values,
            doc: cursor.doc.clone(),
            source_file: self.unit.path.clone(),
        }
    }
}

/// Namespace path of a declaration: innermost ancestors outward while they
/// are namespaces, joined outer to inner. Anonymous namespaces add nothing.
fn scope_path(ancestors: &[&Cursor]) -> String {
    let mut names: Vec<&str> = ancestors
        .iter()
        .rev()
        .take_while(|c| c.kind == CursorKind::Namespace)
        .filter(|c| !c.spelling.is_empty())
        .map(|c| c.spelling.as_str())
        .collect();
    names.reverse();
    names.join("::")
}
