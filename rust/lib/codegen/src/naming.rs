//! C# naming rules.

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

pub fn is_keyword(name: &str) -> bool {
    CSHARP_KEYWORDS.contains(&name)
}

/// Prefix keywords with `@`.
pub fn escape_keyword(name: &str) -> String {
    if is_keyword(name) {
        format!("@{name}")
    } else {
        name.to_string()
    }
}

/// `snake_case` and `camelCase` to `PascalCase`.
pub fn pascal_case(name: &str) -> String {
    if name.contains('_') {
        return name
            .split('_')
            .filter(|part| !part.is_empty())
            .map(capitalize)
            .collect();
    }
    capitalize(name)
}

pub fn camel_case(name: &str) -> String {
    let pascal = pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Property name for a data member: `m_` prefixes are dropped.
pub fn property_name(member: &str) -> String {
    let bare = member.strip_prefix("m_").filter(|rest| !rest.is_empty()).unwrap_or(member);
    escape_keyword(&pascal_case(bare))
}

pub fn method_name(name: &str) -> String {
    escape_keyword(&pascal_case(name))
}

/// C# forbids a member named like its enclosing type; such members get a
/// trailing underscore.
pub fn member_name(name: String, enclosing: &str) -> String {
    if name.trim_start_matches('@') == enclosing.trim_start_matches('@') {
        format!("{name}_")
    } else {
        name
    }
}

pub fn parameter_name(name: &str) -> String {
    escape_keyword(&camel_case(name))
}

/// Type names are kept as declared, only escaped.
pub fn type_name(name: &str) -> String {
    escape_keyword(name)
}

/// Replace characters that are not valid in file names.
pub fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '<' | '>' | '|' | '?' | '*' | '/' | '\\' | '"' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Dotted namespace segment for a module name (`My_Gem-Core` → `My.Gem.Core`).
pub fn namespace_segment(module: &str) -> String {
    module
        .split(['_', '-', '.'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
