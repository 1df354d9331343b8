//! sharpgen parser
//!
//! Turns native headers into declaration forests:
//! - front ends (built-in header reader, serialized AST) → [`TranslationUnit`]
//! - extractor (visibility/export filtering + type normalization) → `DeclarationForest`

pub mod ast;
pub mod error;
pub mod expr;
pub mod extract;
pub mod frontend;
mod header;
mod lexer;
mod preprocess;

pub use ast::{Access, BaseSpecifier, Cursor, CursorKind, TranslationUnit};
pub use error::ParseError;
pub use extract::{extract, FilterPolicy};
pub use frontend::{AstJsonFrontEnd, DispatchFrontEnd, FrontEnd, HeaderFrontEnd, AST_JSON_SUFFIX};

/// Annotation carried by declarations marked for export.
pub const EXPORT_ANNOTATION: &str = "export_csharp";

/// Export macro recognized by default.
pub const DEFAULT_EXPORT_MACRO: &str = "O3DE_EXPORT_CSHARP";
