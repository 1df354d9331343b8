//! Front ends: produce a [`TranslationUnit`] for one input file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::TranslationUnit;
use crate::error::ParseError;
use crate::header::HeaderParser;
use crate::preprocess::Preprocessor;
use crate::{lexer, DEFAULT_EXPORT_MACRO};

/// File-name suffix of serialized translation units.
pub const AST_JSON_SUFFIX: &str = ".ast.json";

/// Header extensions read by [`HeaderFrontEnd`].
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx"];

/// Parses one input file given the include paths and preprocessor defines
/// it should be read with.
pub trait FrontEnd: Send + Sync {
    fn parse(
        &self,
        path: &Path,
        include_paths: &[PathBuf],
        defines: &[String],
    ) -> Result<TranslationUnit, ParseError>;
}

/// True for files any built-in front end accepts.
pub fn is_source_file(path: &Path) -> bool {
    is_ast_json(path) || is_header(path)
}

pub fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.iter().any(|h| ext.eq_ignore_ascii_case(h)))
}

pub fn is_ast_json(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(AST_JSON_SUFFIX))
}

fn read_source(path: &Path) -> Result<String, ParseError> {
    if !path.is_file() {
        return Err(ParseError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

// ── HeaderFrontEnd ──────────────────────────────────────────────────

/// Built-in reader for C++ headers.
#[derive(Debug, Clone)]
pub struct HeaderFrontEnd {
    export_macros: Vec<String>,
}

impl Default for HeaderFrontEnd {
    fn default() -> Self {
        Self {
            export_macros: vec![DEFAULT_EXPORT_MACRO.to_string()],
        }
    }
}

impl HeaderFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the macros recognized as export markers.
    pub fn with_export_macros<I, S>(mut self, macros: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.export_macros = macros.into_iter().map(Into::into).collect();
        self
    }

    pub fn export_macros(&self) -> &[String] {
        &self.export_macros
    }

    /// Parse header text that is already in memory.
    pub fn parse_source(
        &self,
        path: &Path,
        source: &str,
        include_paths: &[PathBuf],
        defines: &[String],
    ) -> Result<TranslationUnit, ParseError> {
        let preprocessed = Preprocessor::new(defines)
            .run(source)
            .map_err(|e| ParseError::Preprocessor {
                path: path.to_path_buf(),
                line: e.line,
                message: e.message,
            })?;

        let tokens = lexer::tokenize(&preprocessed.text).map_err(|e| ParseError::Syntax {
            path: path.to_path_buf(),
            line: e.line,
            message: e.message,
        })?;

        let cursors = HeaderParser::new(&tokens, path.to_path_buf(), &self.export_macros)
            .parse()
            .map_err(|e| ParseError::Syntax {
                path: path.to_path_buf(),
                line: e.line,
                message: e.message,
            })?;

        let mut unit = TranslationUnit::new(path);
        for (target, quoted) in preprocessed.includes {
            match resolve_include(path, &target, quoted, include_paths) {
                Some(resolved) => unit.includes.push(resolved),
                None => debug!(header = %path.display(), include = %target, "include not resolved"),
            }
        }
        unit.cursors = cursors;
        Ok(unit)
    }
}

impl FrontEnd for HeaderFrontEnd {
    fn parse(
        &self,
        path: &Path,
        include_paths: &[PathBuf],
        defines: &[String],
    ) -> Result<TranslationUnit, ParseError> {
        let source = read_source(path)?;
        self.parse_source(path, &source, include_paths, defines)
    }
}

/// Quoted includes look next to the including file first.
fn resolve_include(
    from: &Path,
    target: &str,
    quoted: bool,
    include_paths: &[PathBuf],
) -> Option<PathBuf> {
    let local = quoted
        .then(|| from.parent().map(|dir| dir.join(target)))
        .flatten();
    local
        .into_iter()
        .chain(include_paths.iter().map(|dir| dir.join(target)))
        .find(|candidate| candidate.is_file())
}

// ── AstJsonFrontEnd ─────────────────────────────────────────────────

/// Reads `<header>.ast.json` files: a serialized [`TranslationUnit`].
#[derive(Debug, Clone, Default)]
pub struct AstJsonFrontEnd;

impl FrontEnd for AstJsonFrontEnd {
    fn parse(
        &self,
        path: &Path,
        _include_paths: &[PathBuf],
        _defines: &[String],
    ) -> Result<TranslationUnit, ParseError> {
        let source = read_source(path)?;
        let mut unit: TranslationUnit =
            serde_json::from_str(&source).map_err(|source| ParseError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        if unit.path.as_os_str().is_empty() {
            let name = path.to_string_lossy();
            unit.path = PathBuf::from(name.trim_end_matches(AST_JSON_SUFFIX));
        }
        Ok(unit)
    }
}

// ── DispatchFrontEnd ────────────────────────────────────────────────

/// Picks the front end from the file name.
#[derive(Debug, Clone, Default)]
pub struct DispatchFrontEnd {
    header: HeaderFrontEnd,
    ast: AstJsonFrontEnd,
}

impl DispatchFrontEnd {
    pub fn new(header: HeaderFrontEnd) -> Self {
        Self {
            header,
            ast: AstJsonFrontEnd,
        }
    }
}

impl FrontEnd for DispatchFrontEnd {
    fn parse(
        &self,
        path: &Path,
        include_paths: &[PathBuf],
        defines: &[String],
    ) -> Result<TranslationUnit, ParseError> {
        if is_ast_json(path) {
            self.ast.parse(path, include_paths, defines)
        } else {
            self.header.parse(path, include_paths, defines)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Cursor, CursorKind};

    #[test]
    fn file_classification() {
        assert!(is_header(Path::new("Gem/Include/Foo.h")));
        assert!(is_header(Path::new("Foo.HPP")));
        assert!(!is_header(Path::new("Foo.cpp")));
        assert!(is_ast_json(Path::new("Foo.h.ast.json")));
        assert!(is_source_file(Path::new("Foo.h.ast.json")));
        assert!(!is_source_file(Path::new("gem.json")));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = HeaderFrontEnd::new()
            .parse(Path::new("/nonexistent/Nope.h"), &[], &[])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn header_defines_select_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Api.h");
        fs::write(
            &path,
            "#pragma once\n#ifdef WITH_EXTRAS\nvoid Extra();\n#endif\nvoid Always();\n",
        )
        .unwrap();

        let fe = HeaderFrontEnd::new();
        let plain = fe.parse(&path, &[], &[]).unwrap();
        assert_eq!(plain.cursors.len(), 1);
        assert_eq!(plain.cursors[0].spelling, "Always");
        assert_eq!(plain.cursors[0].line, 5);

        let extras = fe.parse(&path, &[], &["WITH_EXTRAS".into()]).unwrap();
        assert_eq!(extras.cursors.len(), 2);
    }

    #[test]
    fn includes_resolve_against_include_paths() {
        let dir = tempfile::tempdir().unwrap();
        let inc = dir.path().join("include");
        fs::create_dir_all(inc.join("AzCore")).unwrap();
        fs::write(inc.join("AzCore/Base.h"), "").unwrap();
        fs::write(dir.path().join("Local.h"), "").unwrap();
        let path = dir.path().join("Api.h");
        fs::write(
            &path,
            "#include \"Local.h\"\n#include <AzCore/Base.h>\n#include <Missing.h>\n",
        )
        .unwrap();

        let unit = HeaderFrontEnd::new().parse(&path, &[inc.clone()], &[]).unwrap();
        assert_eq!(unit.includes, vec![dir.path().join("Local.h"), inc.join("AzCore/Base.h")]);
    }

    #[test]
    fn syntax_errors_carry_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken.h");
        fs::write(&path, "namespace A {\nclass B {\n").unwrap();
        let err = HeaderFrontEnd::new().parse(&path, &[], &[]).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }), "{err}");
    }

    #[test]
    fn ast_json_round_trips_through_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.h.ast.json");
        let mut unit = TranslationUnit::new("");
        unit.cursors.push(Cursor::new(CursorKind::Function, "Foo").with_type("void"));
        fs::write(&path, serde_json::to_string(&unit).unwrap()).unwrap();

        let parsed = DispatchFrontEnd::default().parse(&path, &[], &[]).unwrap();
        assert_eq!(parsed.path, dir.path().join("Foo.h"));
        assert_eq!(parsed.cursors, unit.cursors);
    }

    #[test]
    fn custom_export_macros() {
        let fe = HeaderFrontEnd::new().with_export_macros(["MYGEM_EXPORT"]);
        let unit = fe
            .parse_source(Path::new("X.h"), "MYGEM_EXPORT void Go();", &[], &[])
            .unwrap();
        assert!(unit.cursors[0].has_annotation(crate::EXPORT_ANNOTATION));
    }
}
