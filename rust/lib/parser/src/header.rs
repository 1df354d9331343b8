//! Recursive-descent reader for C++ header declarations.
//!
//! Recognizes the declaration shapes bindings are generated for and skips
//! everything else (templates, aliases, operators, constructors, function
//! bodies, macro invocations) without losing brace balance.

use std::path::PathBuf;

use tracing::debug;

use crate::ast::{Access, BaseSpecifier, Cursor, CursorKind};
use crate::lexer::{Token, TokenKind};
use crate::EXPORT_ANNOTATION;

#[derive(Debug)]
pub(crate) struct SyntaxError {
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    File,
    Namespace,
    /// `extern "C" { ... }`
    Linkage,
    /// Record body with its default member access.
    Record(Access),
}

impl Scope {
    fn is_braced(self) -> bool {
        self != Scope::File
    }
}

/// Result of looking at a `class`/`struct`/`union`/`enum` keyword.
enum TypeDefinition {
    Parsed(Cursor),
    /// Forward declaration, union or anonymous type: consumed, nothing to report.
    Consumed,
    /// The keyword starts an ordinary declaration (`struct Foo* p;`).
    NotDefinition,
}

#[derive(Default)]
struct Specifiers {
    is_static: bool,
    is_virtual: bool,
    is_constexpr: bool,
    is_friend: bool,
}

const SPECIFIERS: &[&str] = &[
    "static",
    "virtual",
    "inline",
    "constexpr",
    "consteval",
    "constinit",
    "explicit",
    "extern",
    "mutable",
    "thread_local",
    "friend",
    "__forceinline",
    "__inline",
];

/// Words that can end a type but never name a parameter.
const TYPE_KEYWORDS: &[&str] = &[
    "void", "bool", "char", "wchar_t", "char8_t", "char16_t", "char32_t", "short", "int", "long",
    "float", "double", "signed", "unsigned", "auto", "const", "volatile",
];

/// Qualifiers that cannot form a type on their own.
const QUALIFIERS: &[&str] = &["const", "volatile", "struct", "class", "enum", "typename"];

pub(crate) struct HeaderParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    file: PathBuf,
    export_macros: &'a [String],
    pending_doc: Option<String>,
    pending_annotations: Vec<String>,
}

impl<'a> HeaderParser<'a> {
    pub fn new(tokens: &'a [Token], file: PathBuf, export_macros: &'a [String]) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
            export_macros,
            pending_doc: None,
            pending_annotations: vec![],
        }
    }

    pub fn parse(mut self) -> Result<Vec<Cursor>, SyntaxError> {
        self.parse_scope(Scope::File)
    }

    // ── token helpers ───────────────────────────────────────────────

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_is(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, text: &str) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(t) if t.is(text) => {
                self.pos += 1;
                Ok(())
            }
            Some(t) => Err(self.error_at(t.line, format!("expected '{text}', found '{}'", t.text))),
            None => Err(self.eof(&format!("expected '{text}'"))),
        }
    }

    fn current_line(&self) -> u32 {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn error_at(&self, line: u32, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line,
            message: message.into(),
        }
    }

    fn eof(&self, context: &str) -> SyntaxError {
        self.error_at(
            self.current_line(),
            format!("unexpected end of file ({context})"),
        )
    }

    fn cursor(&self, kind: CursorKind, name: impl Into<String>, line: u32) -> Cursor {
        let mut cursor = Cursor::new(kind, name).in_file(self.file.clone());
        cursor.line = line;
        cursor
    }

    fn clear_pending(&mut self) {
        self.pending_doc = None;
        self.pending_annotations.clear();
    }

    fn is_export_macro(&self, tok: &Token) -> bool {
        tok.kind == TokenKind::Ident && self.export_macros.iter().any(|m| *m == tok.text)
    }

    // ── scopes ──────────────────────────────────────────────────────

    fn parse_scope(&mut self, scope: Scope) -> Result<Vec<Cursor>, SyntaxError> {
        let mut out = Vec::new();
        let mut access = match scope {
            Scope::Record(default) => Some(default),
            _ => None,
        };

        loop {
            let Some(tok) = self.peek() else {
                if scope.is_braced() {
                    return Err(self.eof("missing '}'"));
                }
                return Ok(out);
            };

            if tok.kind == TokenKind::Doc {
                self.pending_doc = Some(tok.text.clone());
                self.pos += 1;
                continue;
            }
            if tok.is("}") {
                if scope.is_braced() {
                    self.pos += 1;
                    return Ok(out);
                }
                return Err(self.error_at(tok.line, "unbalanced '}'"));
            }
            if tok.is(";") {
                self.pos += 1;
                self.clear_pending();
                continue;
            }
            if tok.is("{") {
                self.skip_balanced()?;
                self.clear_pending();
                continue;
            }
            if tok.is("[") && self.peek_at(1).is_some_and(|t| t.is("[")) {
                self.skip_balanced()?;
                continue;
            }

            if tok.kind == TokenKind::Ident {
                let next = self.peek_at(1);
                let next_is = |text: &str| next.is_some_and(|t| t.is(text));
                match tok.text.as_str() {
                    "public" | "protected" | "private"
                        if matches!(scope, Scope::Record(_)) && next_is(":") =>
                    {
                        access = Some(match tok.text.as_str() {
                            "public" => Access::Public,
                            "protected" => Access::Protected,
                            _ => Access::Private,
                        });
                        self.pos += 2;
                        self.clear_pending();
                        continue;
                    }
                    "namespace" => {
                        out.extend(self.parse_namespace()?);
                        continue;
                    }
                    "inline" if next_is("namespace") => {
                        self.pos += 1;
                        continue;
                    }
                    "extern" if next.is_some_and(|t| t.kind == TokenKind::Str) =>
                    {
                        self.pos += 2;
                        if self.peek_is("{") {
                            self.pos += 1;
                            out.extend(self.parse_scope(Scope::Linkage)?);
                        }
                        continue;
                    }
                    "template" => {
                        debug!(line = tok.line, "skipping template declaration");
                        self.skip_template_declaration()?;
                        continue;
                    }
                    "typedef" | "using" | "friend" | "static_assert" => {
                        debug!(line = tok.line, keyword = %tok.text, "skipping declaration");
                        self.skip_declaration()?;
                        continue;
                    }
                    "__attribute__" => {
                        let annotations = self.parse_gnu_attribute()?;
                        self.pending_annotations.extend(annotations);
                        continue;
                    }
                    _ => {}
                }

                if self.is_export_macro(tok) {
                    self.pos += 1;
                    self.skip_optional_parens()?;
                    self.pending_annotations.push(EXPORT_ANNOTATION.to_string());
                    continue;
                }
                if is_macro_name(&tok.text) && next_is("(") {
                    debug!(line = tok.line, name = %tok.text, "skipping macro invocation");
                    self.pos += 1;
                    self.skip_balanced()?;
                    if self.peek_is(";") {
                        self.pos += 1;
                    }
                    self.clear_pending();
                    continue;
                }
                if matches!(tok.text.as_str(), "class" | "struct" | "union" | "enum") {
                    match self.parse_type_definition()? {
                        TypeDefinition::Parsed(mut cursor) => {
                            if matches!(scope, Scope::Record(_)) {
                                cursor.access = access;
                            }
                            out.push(cursor);
                            continue;
                        }
                        TypeDefinition::Consumed => continue,
                        TypeDefinition::NotDefinition => {}
                    }
                }
            }

            for mut cursor in self.parse_declaration(scope)? {
                if matches!(scope, Scope::Record(_)) {
                    cursor.access = access;
                }
                out.push(cursor);
            }
        }
    }

    fn parse_namespace(&mut self) -> Result<Vec<Cursor>, SyntaxError> {
        let line = self.current_line();
        self.pos += 1;
        let mut names = Vec::new();
        while let Some(t) = self.peek() {
            if t.kind != TokenKind::Ident {
                break;
            }
            self.pos += 1;
            if t.text == "inline" {
                continue;
            }
            names.push(t.text.clone());
            if self.peek_is("::") {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.peek_is("=") {
            // namespace alias
            self.skip_declaration()?;
            return Ok(vec![]);
        }
        while self.peek_is("[") || self.peek_is("__attribute__") {
            if self.peek_is("[") {
                self.skip_balanced()?;
            } else {
                self.parse_gnu_attribute()?;
            }
        }
        self.expect("{")?;
        self.clear_pending();

        let mut inner = self.parse_scope(Scope::Namespace)?;
        if names.is_empty() {
            names.push(String::new());
        }
        for name in names.iter().rev() {
            let mut ns = self.cursor(CursorKind::Namespace, name.as_str(), line);
            ns.children = inner;
            inner = vec![ns];
        }
        Ok(inner)
    }

    // ── type definitions ────────────────────────────────────────────

    fn parse_type_definition(&mut self) -> Result<TypeDefinition, SyntaxError> {
        let start = self.pos;
        let Some(keyword) = self.bump() else {
            return Err(self.eof("type definition"));
        };
        let line = keyword.line;

        if keyword.text == "enum" {
            return self.parse_enum(start, line);
        }

        self.collect_decl_attributes()?;
        let name = self.parse_qualified_name();
        if self.peek_is("final") {
            self.pos += 1;
        }

        if name.is_empty() {
            if self.peek_is("{") {
                debug!(line, "skipping anonymous {}", keyword.text);
                self.skip_balanced()?;
                self.skip_declaration()?;
                return Ok(TypeDefinition::Consumed);
            }
            self.pos = start;
            return Ok(TypeDefinition::NotDefinition);
        }
        if self.peek_is(";") {
            self.pos += 1;
            self.clear_pending();
            return Ok(TypeDefinition::Consumed);
        }
        if self.peek_is("<") {
            debug!(line, name = %name, "skipping template specialization");
            self.skip_declaration()?;
            return Ok(TypeDefinition::Consumed);
        }
        if !(self.peek_is(":") || self.peek_is("{")) {
            self.pos = start;
            return Ok(TypeDefinition::NotDefinition);
        }

        if keyword.text == "union" {
            debug!(line, name = %name, "skipping union");
            self.skip_declaration()?;
            return Ok(TypeDefinition::Consumed);
        }

        let is_class = keyword.text == "class";
        let bases = if self.peek_is(":") {
            self.pos += 1;
            self.parse_base_clause(is_class)?
        } else {
            vec![]
        };
        self.expect("{")?;

        let doc = self.pending_doc.take();
        let annotations = std::mem::take(&mut self.pending_annotations);
        let default_access = if is_class { Access::Private } else { Access::Public };
        let children = self.parse_scope(Scope::Record(default_access))?;
        self.finish_type_declarators()?;

        let kind = if is_class { CursorKind::Class } else { CursorKind::Struct };
        let mut cursor = self.cursor(kind, name, line);
        cursor.doc = doc;
        cursor.annotations = annotations;
        cursor.bases = bases;
        cursor.children = children;
        Ok(TypeDefinition::Parsed(cursor))
    }

    fn parse_enum(&mut self, start: usize, line: u32) -> Result<TypeDefinition, SyntaxError> {
        if self.peek_is("class") || self.peek_is("struct") {
            self.pos += 1;
        }
        self.collect_decl_attributes()?;
        let name = self.parse_qualified_name();
        let underlying = if self.peek_is(":") {
            self.pos += 1;
            let mut tokens = Vec::new();
            while let Some(t) = self.peek() {
                if t.is("{") || t.is(";") {
                    break;
                }
                tokens.push(t);
                self.pos += 1;
            }
            Some(join_tokens(&tokens))
        } else {
            None
        };

        if self.peek_is(";") {
            self.pos += 1;
            self.clear_pending();
            return Ok(TypeDefinition::Consumed);
        }
        if !self.peek_is("{") {
            self.pos = start;
            return Ok(TypeDefinition::NotDefinition);
        }
        self.pos += 1;

        let doc = self.pending_doc.take();
        let annotations = std::mem::take(&mut self.pending_annotations);
        let constants = self.parse_enum_body()?;
        self.finish_type_declarators()?;

        let mut cursor = self.cursor(CursorKind::Enum, name, line);
        cursor.doc = doc;
        cursor.annotations = annotations;
        cursor.type_spelling = underlying;
        cursor.children = constants;
        Ok(TypeDefinition::Parsed(cursor))
    }

    fn parse_enum_body(&mut self) -> Result<Vec<Cursor>, SyntaxError> {
        let mut constants = Vec::new();
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.eof("enum body"));
            };
            if tok.is("}") {
                self.pos += 1;
                return Ok(constants);
            }
            if tok.kind != TokenKind::Ident {
                if tok.is("[") {
                    self.skip_balanced()?;
                } else {
                    self.pos += 1;
                }
                continue;
            }
            self.pos += 1;
            let mut constant = self.cursor(CursorKind::EnumConstant, tok.text.as_str(), tok.line);
            while self.peek_is("[") || self.peek_is("__attribute__") {
                if self.peek_is("[") {
                    self.skip_balanced()?;
                } else {
                    self.parse_gnu_attribute()?;
                }
            }
            if self.peek_is("=") {
                self.pos += 1;
                let value = self.collect_until_separator(&[",", "}"])?;
                constant.enum_value = Some(join_tokens(&value));
            }
            if self.peek_is(",") {
                self.pos += 1;
            }
            constants.push(constant);
        }
    }

    /// `Base, public Other<T>, virtual protected Third`
    fn parse_base_clause(&mut self, is_class: bool) -> Result<Vec<BaseSpecifier>, SyntaxError> {
        let mut bases = Vec::new();
        loop {
            let mut access = if is_class { Access::Private } else { Access::Public };
            let mut tokens = Vec::new();
            let mut angle = 0i32;
            loop {
                let Some(t) = self.peek() else {
                    return Err(self.eof("base clause"));
                };
                if angle == 0 && (t.is(",") || t.is("{")) {
                    break;
                }
                self.pos += 1;
                match t.text.as_str() {
                    "public" if angle == 0 => access = Access::Public,
                    "protected" if angle == 0 => access = Access::Protected,
                    "private" if angle == 0 => access = Access::Private,
                    "virtual" if angle == 0 => {}
                    _ => {
                        if t.is("<") {
                            angle += 1;
                        } else if t.is(">") {
                            angle -= 1;
                        }
                        tokens.push(t);
                    }
                }
            }
            if !tokens.is_empty() {
                bases.push(BaseSpecifier {
                    name: join_tokens(&tokens),
                    access,
                });
            }
            if self.peek_is(",") {
                self.pos += 1;
            } else {
                return Ok(bases);
            }
        }
    }

    /// After a type body: `;` or `} instance, *ptr;`
    fn finish_type_declarators(&mut self) -> Result<(), SyntaxError> {
        if self.peek_is(";") {
            self.pos += 1;
        } else if self.peek().is_some_and(|t| t.kind == TokenKind::Ident || t.is("*") || t.is("&")) {
            self.skip_declaration()?;
        }
        self.clear_pending();
        Ok(())
    }

    /// Export macros, GNU attributes, `[[...]]`, `alignas(...)` and
    /// API-visibility macros between a type keyword and its name.
    fn collect_decl_attributes(&mut self) -> Result<(), SyntaxError> {
        while let Some(t) = self.peek() {
            if self.is_export_macro(t) {
                self.pos += 1;
                self.skip_optional_parens()?;
                self.pending_annotations.push(EXPORT_ANNOTATION.to_string());
            } else if t.is("__attribute__") {
                let annotations = self.parse_gnu_attribute()?;
                self.pending_annotations.extend(annotations);
            } else if t.is("[") && self.peek_at(1).is_some_and(|n| n.is("[")) {
                self.skip_balanced()?;
            } else if t.is("alignas") || t.is("__declspec") {
                self.pos += 1;
                self.skip_optional_parens()?;
            } else if t.kind == TokenKind::Ident
                && is_macro_name(&t.text)
                && self.peek_at(1).is_some_and(|n| n.kind == TokenKind::Ident)
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn parse_qualified_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(t) = self.peek() {
            if t.kind != TokenKind::Ident || t.text == "final" {
                break;
            }
            name.push_str(&t.text);
            self.pos += 1;
            if self.peek_is("::") && self.peek_at(1).is_some_and(|n| n.kind == TokenKind::Ident) {
                name.push_str("::");
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    /// `__attribute__((annotate("x"), ...))` → annotation strings.
    fn parse_gnu_attribute(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.pos += 1;
        let start = self.pos;
        if !self.peek_is("(") {
            return Ok(vec![]);
        }
        self.skip_balanced()?;
        let body = &self.tokens[start..self.pos];
        let mut annotations = Vec::new();
        for (i, t) in body.iter().enumerate() {
            if t.is("annotate") {
                if let Some(lit) = body
                    .get(i + 2)
                    .filter(|l| l.kind == TokenKind::Str && body[i + 1].is("("))
                {
                    annotations.push(lit.text.trim_matches('"').to_string());
                }
            }
        }
        Ok(annotations)
    }

    // ── declarations ────────────────────────────────────────────────

    fn parse_declaration(&mut self, scope: Scope) -> Result<Vec<Cursor>, SyntaxError> {
        let line = self.current_line();
        let doc = self.pending_doc.take();
        let mut annotations = std::mem::take(&mut self.pending_annotations);
        let mut specs = Specifiers::default();
        let mut head: Vec<&'a Token> = Vec::new();
        let mut angle = 0i32;

        loop {
            let Some(t) = self.peek() else {
                return Err(self.eof("declaration"));
            };
            match t.kind {
                TokenKind::Doc => {
                    self.pos += 1;
                    continue;
                }
                TokenKind::Ident if angle == 0 => {
                    if SPECIFIERS.contains(&t.text.as_str()) {
                        match t.text.as_str() {
                            "static" => specs.is_static = true,
                            "virtual" => specs.is_virtual = true,
                            "constexpr" => specs.is_constexpr = true,
                            "friend" => specs.is_friend = true,
                            _ => {}
                        }
                        self.pos += 1;
                        continue;
                    }
                    if self.is_export_macro(t) {
                        self.pos += 1;
                        self.skip_optional_parens()?;
                        annotations.push(EXPORT_ANNOTATION.to_string());
                        continue;
                    }
                    match t.text.as_str() {
                        "__attribute__" => {
                            annotations.extend(self.parse_gnu_attribute()?);
                            continue;
                        }
                        "alignas" | "__declspec" => {
                            self.pos += 1;
                            self.skip_optional_parens()?;
                            continue;
                        }
                        "operator" => {
                            debug!(line, "skipping operator");
                            self.skip_declaration()?;
                            return Ok(vec![]);
                        }
                        _ => {}
                    }
                }
                TokenKind::Punct => {
                    if angle == 0 {
                        if t.is("[") && self.peek_at(1).is_some_and(|n| n.is("[")) {
                            self.skip_balanced()?;
                            continue;
                        }
                        if ["(", ";", "=", "{", "[", ":", ",", "}"].iter().any(|s| t.is(s)) {
                            break;
                        }
                    }
                    if t.is("<") {
                        angle += 1;
                    } else if t.is(">") && angle > 0 {
                        angle -= 1;
                    }
                }
                _ => {}
            }
            head.push(t);
            self.pos += 1;
        }

        if specs.is_friend {
            self.skip_declaration()?;
            return Ok(vec![]);
        }

        strip_leading_macros(&mut head);

        let stop_is_paren = self.peek_is("(");
        let skip_reason = if head.iter().any(|t| t.is("~")) {
            Some("destructor")
        } else if head.len() < 2 {
            Some(if stop_is_paren { "constructor or macro" } else { "incomplete declaration" })
        } else if head[head.len() - 1].kind != TokenKind::Ident {
            Some("unnamed declarator")
        } else if head[head.len() - 2].is("::") {
            Some("out-of-line definition")
        } else {
            None
        };
        if let Some(reason) = skip_reason {
            debug!(line, reason, "skipping declaration");
            self.skip_declaration()?;
            return Ok(vec![]);
        }

        let name = head[head.len() - 1].text.clone();
        let type_tokens = &head[..head.len() - 1];

        if stop_is_paren {
            return self.finish_function(scope, name, type_tokens, specs, doc, annotations, line);
        }
        self.finish_variables(scope, name, type_tokens, specs, doc, annotations, line)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_function(
        &mut self,
        scope: Scope,
        name: String,
        type_tokens: &[&'a Token],
        specs: Specifiers,
        doc: Option<String>,
        mut annotations: Vec<String>,
        line: u32,
    ) -> Result<Vec<Cursor>, SyntaxError> {
        let params = self.parse_parameters()?;
        let mut return_type = join_tokens(type_tokens);
        let mut is_const = false;
        let mut is_pure = false;
        let mut deleted = false;

        loop {
            let Some(t) = self.peek() else {
                return Err(self.eof("function declaration"));
            };
            match t.text.as_str() {
                _ if t.kind == TokenKind::Doc => self.pos += 1,
                "const" => {
                    is_const = true;
                    self.pos += 1;
                }
                "volatile" | "&" | "&&" | "override" | "final" => self.pos += 1,
                "noexcept" | "throw" => {
                    self.pos += 1;
                    self.skip_optional_parens()?;
                }
                "->" => {
                    self.pos += 1;
                    let trailing = self.collect_until_separator(&[";", "{", "="])?;
                    if return_type == "auto" {
                        return_type = join_tokens(&trailing);
                    }
                }
                "__attribute__" => annotations.extend(self.parse_gnu_attribute()?),
                "[" => self.skip_balanced()?,
                "=" => {
                    self.pos += 1;
                    match self.bump() {
                        Some(v) if v.is("0") => is_pure = true,
                        Some(v) if v.is("delete") => deleted = true,
                        Some(_) => {}
                        None => return Err(self.eof("function declaration")),
                    }
                }
                ";" => {
                    self.pos += 1;
                    break;
                }
                "{" => {
                    self.skip_balanced()?;
                    if self.peek_is(";") {
                        self.pos += 1;
                    }
                    break;
                }
                "}" => break,
                _ if self.is_export_macro(t) => {
                    self.pos += 1;
                    self.skip_optional_parens()?;
                    annotations.push(EXPORT_ANNOTATION.to_string());
                }
                _ if t.kind == TokenKind::Ident && is_macro_name(&t.text) => {
                    self.pos += 1;
                    self.skip_optional_parens()?;
                }
                _ => {
                    self.skip_declaration()?;
                    break;
                }
            }
        }

        if deleted {
            debug!(line, name = %name, "skipping deleted function");
            return Ok(vec![]);
        }

        let kind = match scope {
            Scope::Record(_) => CursorKind::Method,
            _ => CursorKind::Function,
        };
        let mut cursor = self.cursor(kind, name, line).with_type(return_type);
        cursor.is_static = specs.is_static;
        cursor.is_virtual = specs.is_virtual || is_pure;
        cursor.is_pure = is_pure;
        cursor.is_const = is_const;
        cursor.doc = doc;
        cursor.annotations = annotations;
        cursor.children = params;
        Ok(vec![cursor])
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_variables(
        &mut self,
        scope: Scope,
        name: String,
        type_tokens: &[&'a Token],
        specs: Specifiers,
        doc: Option<String>,
        annotations: Vec<String>,
        line: u32,
    ) -> Result<Vec<Cursor>, SyntaxError> {
        // (type tokens, name, is_array) per declarator
        let mut declarators: Vec<(Vec<&'a Token>, String, bool)> =
            vec![(type_tokens.to_vec(), name, false)];
        let base_len = type_tokens
            .iter()
            .rposition(|t| !(t.is("*") || t.is("&") || t.is("&&")))
            .map_or(0, |i| i + 1);
        let base_type = &type_tokens[..base_len];

        loop {
            let Some(t) = self.peek() else {
                return Err(self.eof("variable declaration"));
            };
            match t.text.as_str() {
                _ if t.kind == TokenKind::Doc => self.pos += 1,
                ";" => {
                    self.pos += 1;
                    break;
                }
                "}" => break,
                "," => {
                    self.pos += 1;
                    let mut ty = base_type.to_vec();
                    while let Some(p) = self.peek().filter(|p| p.is("*") || p.is("&") || p.is("&&") || p.is("const")) {
                        ty.push(p);
                        self.pos += 1;
                    }
                    match self.peek().filter(|n| n.kind == TokenKind::Ident) {
                        Some(n) => {
                            self.pos += 1;
                            declarators.push((ty, n.text.clone(), false));
                        }
                        None => {
                            self.skip_declaration()?;
                            break;
                        }
                    }
                }
                "[" => {
                    self.skip_balanced()?;
                    if let Some(last) = declarators.last_mut() {
                        last.2 = true;
                    }
                }
                "{" => self.skip_balanced()?,
                "=" | ":" => {
                    self.pos += 1;
                    self.collect_until_separator(&[",", ";", "}"])?;
                }
                _ => self.pos += 1,
            }
        }

        let kind = match scope {
            Scope::Record(_) => CursorKind::Field,
            _ => CursorKind::Variable,
        };
        let mut cursors = Vec::new();
        for (ty, name, is_array) in declarators {
            if is_array {
                debug!(line, name = %name, "skipping array declarator");
                continue;
            }
            let mut cursor = self.cursor(kind, name, line).with_type(join_tokens(&ty));
            cursor.is_static = specs.is_static;
            cursor.is_const = specs.is_constexpr || has_top_level_const(&ty);
            cursor.doc = doc.clone();
            cursor.annotations = annotations.clone();
            cursors.push(cursor);
        }
        Ok(cursors)
    }

    fn parse_parameters(&mut self) -> Result<Vec<Cursor>, SyntaxError> {
        let line = self.current_line();
        self.expect("(")?;
        let mut groups: Vec<Vec<&'a Token>> = Vec::new();
        let mut current: Vec<&'a Token> = Vec::new();
        let mut depth = 0i32;
        let mut angle = 0i32;

        loop {
            let Some(t) = self.bump() else {
                return Err(self.error_at(line, "unterminated parameter list"));
            };
            if t.kind == TokenKind::Doc {
                continue;
            }
            if t.kind == TokenKind::Punct {
                match t.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" if depth == 0 => {
                        groups.push(std::mem::take(&mut current));
                        break;
                    }
                    ")" | "]" | "}" => depth -= 1,
                    "<" if depth == 0 => angle += 1,
                    ">" if depth == 0 && angle > 0 => angle -= 1,
                    "," if depth == 0 && angle == 0 => {
                        groups.push(std::mem::take(&mut current));
                        continue;
                    }
                    _ => {}
                }
            }
            current.push(t);
        }

        let mut params = Vec::new();
        for group in groups {
            if group.is_empty() || (group.len() == 1 && (group[0].is("void") || group[0].is("..."))) {
                continue;
            }
            params.push(self.parameter(&group, group[0].line));
        }
        Ok(params)
    }

    fn parameter(&self, tokens: &[&'a Token], line: u32) -> Cursor {
        let mut tokens: Vec<&Token> = tokens
            .iter()
            .copied()
            .filter(|t| !self.is_export_macro(t))
            .collect();

        let mut default_value = None;
        if let Some(eq) = top_level_position(&tokens, "=") {
            default_value = Some(join_tokens(&tokens[eq + 1..]));
            tokens.truncate(eq);
        }

        // Function pointer: `void (*callback)(int)`
        if tokens.iter().any(|t| t.is("(")) {
            let name = tokens
                .iter()
                .skip_while(|t| !t.is("*"))
                .find(|t| t.kind == TokenKind::Ident)
                .map(|t| t.text.clone())
                .unwrap_or_default();
            let mut param = self.cursor(CursorKind::Parameter, name, line).with_type("void*");
            param.default_value = default_value;
            return param;
        }

        let mut array = false;
        while tokens.last().is_some_and(|t| t.is("]")) {
            match tokens.iter().rposition(|t| t.is("[")) {
                Some(open) => {
                    tokens.truncate(open);
                    array = true;
                }
                None => break,
            }
        }

        let named = tokens.len() >= 2
            && tokens[tokens.len() - 1].kind == TokenKind::Ident
            && !TYPE_KEYWORDS.contains(&tokens[tokens.len() - 1].text.as_str())
            && !tokens[tokens.len() - 2].is("::")
            && !tokens[..tokens.len() - 1]
                .iter()
                .all(|t| QUALIFIERS.contains(&t.text.as_str()));
        let (ty, name) = if named {
            (
                &tokens[..tokens.len() - 1],
                tokens[tokens.len() - 1].text.clone(),
            )
        } else {
            (&tokens[..], String::new())
        };

        let mut spelling = join_tokens(ty);
        if array {
            spelling.push('*');
        }
        let mut param = self.cursor(CursorKind::Parameter, name, line).with_type(spelling);
        param.default_value = default_value;
        param
    }

    // ── skipping ────────────────────────────────────────────────────

    /// Skip one bracketed group starting at the current `(`, `[` or `{`.
    fn skip_balanced(&mut self) -> Result<(), SyntaxError> {
        let line = self.current_line();
        let mut depth = 0i32;
        while let Some(t) = self.bump() {
            if t.kind != TokenKind::Punct {
                continue;
            }
            match t.text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth -= 1;
                    if depth <= 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error_at(line, "unbalanced brackets: reached end of file"))
    }

    fn skip_optional_parens(&mut self) -> Result<(), SyntaxError> {
        if self.peek_is("(") {
            self.skip_balanced()?;
        }
        Ok(())
    }

    /// Skip the rest of the current declaration: through `;`, or through a
    /// `{...}` body (and a following `;`). Stops before a scope-closing `}`.
    fn skip_declaration(&mut self) -> Result<(), SyntaxError> {
        loop {
            let Some(t) = self.peek() else {
                return Err(self.eof("declaration"));
            };
            if t.kind == TokenKind::Punct {
                match t.text.as_str() {
                    ";" => {
                        self.pos += 1;
                        break;
                    }
                    "{" => {
                        self.skip_balanced()?;
                        if self.peek_is(";") {
                            self.pos += 1;
                        }
                        break;
                    }
                    "(" | "[" => {
                        self.skip_balanced()?;
                        continue;
                    }
                    "}" => break,
                    _ => {}
                }
            }
            self.pos += 1;
        }
        self.clear_pending();
        Ok(())
    }

    fn skip_template_declaration(&mut self) -> Result<(), SyntaxError> {
        while self.peek_is("template") {
            self.pos += 1;
            if self.peek_is("<") {
                self.skip_angles()?;
            }
        }
        self.skip_declaration()
    }

    fn skip_angles(&mut self) -> Result<(), SyntaxError> {
        let line = self.current_line();
        let mut depth = 0i32;
        while let Some(t) = self.peek() {
            if t.is("(") || t.is("{") || t.is("[") {
                self.skip_balanced()?;
                continue;
            }
            self.pos += 1;
            if t.is("<") {
                depth += 1;
            } else if t.is(">") {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(self.error_at(line, "unterminated template parameter list"))
    }

    /// Collect tokens up to (not including) one of `stops` at bracket depth 0.
    fn collect_until_separator(&mut self, stops: &[&str]) -> Result<Vec<&'a Token>, SyntaxError> {
        let mut out = Vec::new();
        loop {
            let Some(t) = self.peek() else {
                return Err(self.eof("expression"));
            };
            if stops.iter().any(|s| t.is(s)) {
                return Ok(out);
            }
            if t.is("(") || t.is("[") || t.is("{") {
                let start = self.pos;
                self.skip_balanced()?;
                out.extend(&self.tokens[start..self.pos]);
                continue;
            }
            if t.is(")") || t.is("]") {
                return Err(self.error_at(t.line, format!("unexpected '{}'", t.text)));
            }
            out.push(t);
            self.pos += 1;
        }
    }
}

/// Macro-style identifier: upper case, digits and underscores, at least
/// one underscore or three characters (`AZ_RTTI`, `MYAPI`).
fn is_macro_name(text: &str) -> bool {
    text.len() >= 2
        && text.chars().any(|c| c.is_ascii_uppercase())
        && text
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && (text.contains('_') || text.len() >= 3)
}

/// Drop visibility macros in front of a declaration (`MYGEM_API void F();`).
fn strip_leading_macros(head: &mut Vec<&Token>) {
    while head.len() > 2
        && head[0].kind == TokenKind::Ident
        && is_macro_name(&head[0].text)
        && head[1].kind == TokenKind::Ident
    {
        head.remove(0);
    }
}

fn has_top_level_const(tokens: &[&Token]) -> bool {
    if tokens.last().is_some_and(|t| t.is("const")) {
        return true;
    }
    let mut angle = 0i32;
    let mut has_const = false;
    for t in tokens {
        if t.is("<") {
            angle += 1;
        } else if t.is(">") {
            angle -= 1;
        } else if angle == 0 {
            if t.is("*") || t.is("&") || t.is("&&") {
                return false;
            }
            if t.is("const") {
                has_const = true;
            }
        }
    }
    has_const
}

fn top_level_position(tokens: &[&Token], text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate() {
        if t.kind != TokenKind::Punct {
            continue;
        }
        match t.text.as_str() {
            "(" | "[" | "{" | "<" => depth += 1,
            ")" | "]" | "}" | ">" => depth -= 1,
            s if s == text && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Join tokens into a spelling: a space between adjacent words and after commas.
fn join_tokens(tokens: &[&Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for t in tokens {
        if let Some(p) = prev {
            if (p.is_word() && t.is_word()) || p.is(",") {
                out.push(' ');
            }
        }
        out.push_str(&t.text);
        prev = Some(t);
    }
    out
}
