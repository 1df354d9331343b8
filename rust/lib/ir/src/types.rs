//! Types IR: normalized type descriptors and the canonical type table.
//!
//! Every type reference inside the declaration tree is a [`TypeDescriptor`]
//! produced by [`TypeTable::normalize`], never a raw native spelling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Target name of the string-like mapping.
pub const STRING_TYPE: &str = "string";

/// Target name used for every non-string pointer.
pub const OPAQUE_HANDLE: &str = "IntPtr";

/// A native type resolved to its managed representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Native spelling as written in the header (whitespace collapsed).
    pub native: String,

    /// Resolved target-language type name (e.g. `int`, `string`, `Vector3`).
    pub target: String,

    #[serde(default)]
    pub is_pointer: bool,

    #[serde(default)]
    pub is_reference: bool,

    #[serde(default)]
    pub is_const: bool,

    /// True when the base spelling was not found in the type table.
    #[serde(default)]
    pub requires_marshaling: bool,
}

impl TypeDescriptor {
    /// Descriptor for a table hit with no qualifiers.
    pub fn plain(native: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            native: native.into(),
            target: target.into(),
            is_pointer: false,
            is_reference: false,
            is_const: false,
            requires_marshaling: false,
        }
    }

    pub fn is_void(&self) -> bool {
        self.target == "void" && !self.is_pointer
    }

    pub fn is_string(&self) -> bool {
        self.target == STRING_TYPE
    }

    pub fn is_opaque_handle(&self) -> bool {
        self.target == OPAQUE_HANDLE
    }
}

/// Native → target type mappings consulted by the normalizer.
///
/// An explicit value rather than process-wide state: each generation run
/// builds its own table and extends it with [`TypeTable::register`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    entries: BTreeMap<String, String>,
}

/// Built-in mappings. Pointer keys (`char*`) only match pointer spellings.
const CANONICAL: &[(&str, &str)] = &[
    ("void", "void"),
    ("bool", "bool"),
    // Character and integer primitives.
    ("char", "sbyte"),
    ("signed char", "sbyte"),
    ("unsigned char", "byte"),
    ("wchar_t", "ushort"),
    ("short", "short"),
    ("short int", "short"),
    ("unsigned short", "ushort"),
    ("unsigned short int", "ushort"),
    ("int", "int"),
    ("signed", "int"),
    ("signed int", "int"),
    ("unsigned", "uint"),
    ("unsigned int", "uint"),
    ("long", "long"),
    ("long int", "long"),
    ("unsigned long", "ulong"),
    ("long long", "long"),
    ("unsigned long long", "ulong"),
    ("float", "float"),
    ("double", "double"),
    // Fixed-width families.
    ("int8_t", "sbyte"),
    ("int16_t", "short"),
    ("int32_t", "int"),
    ("int64_t", "long"),
    ("uint8_t", "byte"),
    ("uint16_t", "ushort"),
    ("uint32_t", "uint"),
    ("uint64_t", "ulong"),
    ("size_t", "ulong"),
    ("std::size_t", "ulong"),
    ("int8", "sbyte"),
    ("int16", "short"),
    ("int32", "int"),
    ("int64", "long"),
    ("uint8", "byte"),
    ("uint16", "ushort"),
    ("uint32", "uint"),
    ("uint64", "ulong"),
    ("AZ::u8", "byte"),
    ("AZ::u16", "ushort"),
    ("AZ::u32", "uint"),
    ("AZ::u64", "ulong"),
    ("AZ::s8", "sbyte"),
    ("AZ::s16", "short"),
    ("AZ::s32", "int"),
    ("AZ::s64", "long"),
    // Strings.
    ("char*", STRING_TYPE),
    ("wchar_t*", STRING_TYPE),
    ("AZStd::string", STRING_TYPE),
    ("AZStd::string_view", STRING_TYPE),
    ("std::string", STRING_TYPE),
    ("std::string_view", STRING_TYPE),
    // Math and identifier types.
    ("AZ::Vector2", "Vector2"),
    ("AZ::Vector3", "Vector3"),
    ("AZ::Vector4", "Vector4"),
    ("AZ::Quaternion", "Quaternion"),
    ("AZ::Transform", "Transform"),
    ("AZ::Matrix3x3", "Matrix3x3"),
    ("AZ::Matrix4x4", "Matrix4x4"),
    ("AZ::Color", "Color"),
    ("AZ::Aabb", "Aabb"),
    ("AZ::EntityId", "EntityId"),
    ("AZ::Crc32", "uint"),
    (OPAQUE_HANDLE, OPAQUE_HANDLE),
];

impl Default for TypeTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TypeTable {
    /// A table with no mappings at all.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The built-in table of primitive, string, math and identifier types.
    pub fn canonical() -> Self {
        let mut table = Self::empty();
        for (native, target) in CANONICAL {
            table.register(*native, *target);
        }
        table
    }

    /// Add (or replace) a mapping. The target is also registered as an
    /// identity entry unless it is already a key, which keeps normalization
    /// idempotent for caller extensions.
    pub fn register(&mut self, native: impl AsRef<str>, target: impl AsRef<str>) {
        let native = canonical_spelling(native.as_ref());
        let target = canonical_spelling(target.as_ref());
        if native.is_empty() || target.is_empty() {
            return;
        }
        self.entries
            .entry(target.clone())
            .or_insert_with(|| target.clone());
        self.entries.insert(native, target);
    }

    pub fn get(&self, native: &str) -> Option<&str> {
        self.entries.get(native).map(String::as_str)
    }

    pub fn contains(&self, native: &str) -> bool {
        self.entries.contains_key(native)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(native, target)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonicalize a native spelling and map it to a target descriptor.
    pub fn normalize(&self, spelling: &str) -> TypeDescriptor {
        let native = canonical_spelling(spelling);
        let mut rest = native.as_str();
        let mut is_const = false;
        let mut is_pointer = false;
        let mut is_reference = false;

        // Leading qualifiers and elaborated-type keywords.
        loop {
            if let Some(r) = strip_leading_word(rest, "const") {
                is_const = true;
                rest = r;
            } else if let Some(r) = ["volatile", "struct", "class", "enum", "typename"]
                .iter()
                .find_map(|kw| strip_leading_word(rest, kw))
            {
                rest = r;
            } else {
                break;
            }
        }

        // Trailing markers, innermost last: `T* const&` → `T`.
        loop {
            if !is_reference {
                if let Some(r) = rest.strip_suffix("&&").or_else(|| rest.strip_suffix('&')) {
                    is_reference = true;
                    rest = r.trim_end();
                    continue;
                }
            }
            if let Some(r) = strip_trailing_word(rest, "const") {
                is_const = true;
                rest = r;
                continue;
            }
            if let Some(r) = strip_trailing_word(rest, "volatile") {
                rest = r;
                continue;
            }
            if !is_pointer {
                if let Some(r) = rest.strip_suffix('*') {
                    is_pointer = true;
                    rest = r.trim_end();
                    continue;
                }
            }
            break;
        }

        // `T**` and deeper are always handles, whatever `T*` maps to.
        let multi_level = is_pointer && rest.ends_with('*');

        let (target, requires_marshaling) = match is_pointer
            .then(|| self.get(&format!("{rest}*")))
            .flatten()
        {
            Some(mapped) => (mapped.to_string(), false),
            None => match self.get(rest) {
                Some(mapped) => (mapped.to_string(), false),
                None => (self.fallback_name(rest), true),
            },
        };

        let target = if is_pointer && (multi_level || target != STRING_TYPE) {
            OPAQUE_HANDLE.to_string()
        } else {
            target
        };

        TypeDescriptor {
            native,
            target,
            is_pointer,
            is_reference,
            is_const,
            requires_marshaling,
        }
    }

    /// Name for a spelling absent from the table: containers become arrays,
    /// everything else keeps its last scope segment.
    fn fallback_name(&self, base: &str) -> String {
        for prefix in ["AZStd::vector<", "std::vector<"] {
            if let Some(inner) = base.strip_prefix(prefix).and_then(|s| s.strip_suffix('>')) {
                let element = first_template_arg(inner);
                return format!("{}[]", self.normalize(element).target);
            }
        }
        let simple = strip_template_args(last_scope_segment(base));
        if simple.is_empty() {
            OPAQUE_HANDLE.to_string()
        } else {
            simple.to_string()
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Collapse whitespace, keeping a single space only between two word tokens:
/// `const  char *` → `const char*`, `AZStd::vector< int >` → `AZStd::vector<int>`.
pub fn canonical_spelling(spelling: &str) -> String {
    let mut out = String::with_capacity(spelling.len());
    let mut pending_space = false;
    for c in spelling.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            if out.chars().last().is_some_and(is_word_char) && is_word_char(c) {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }
    out
}

fn strip_leading_word<'a>(s: &'a str, word: &str) -> Option<&'a str> {
    let rest = s.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if is_word_char(c) => None,
        None => None,
        _ => Some(rest.trim_start()),
    }
}

fn strip_trailing_word<'a>(s: &'a str, word: &str) -> Option<&'a str> {
    let rest = s.strip_suffix(word)?;
    match rest.chars().last() {
        Some(c) if is_word_char(c) => None,
        None => None,
        _ => Some(rest.trim_end()),
    }
}

/// Substring after the last `::` that is not nested inside template brackets.
fn last_scope_segment(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    &s[start..]
}

fn strip_template_args(s: &str) -> &str {
    match s.find('<') {
        Some(idx) => s[..idx].trim_end(),
        None => s,
    }
}

fn first_template_arg(s: &str) -> &str {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => return s[..i].trim(),
            _ => {}
        }
    }
    s.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_spelling_collapses_whitespace() {
        assert_eq!(canonical_spelling("  const   char  * "), "const char*");
        assert_eq!(canonical_spelling("unsigned\tlong  long"), "unsigned long long");
        assert_eq!(canonical_spelling("AZStd::vector< AZ::u8 >"), "AZStd::vector<AZ::u8>");
        assert_eq!(canonical_spelling("Foo :: Bar"), "Foo::Bar");
    }

    #[test]
    fn const_char_pointer_is_string() {
        let t = TypeTable::canonical().normalize("const char*");
        assert_eq!(t.target, STRING_TYPE);
        assert!(t.is_const);
        assert!(t.is_pointer);
        assert!(!t.is_reference);
        assert!(!t.requires_marshaling);
    }

    #[test]
    fn unknown_pointer_is_opaque_handle() {
        let t = TypeTable::canonical().normalize("Foo::Bar*");
        assert_eq!(t.target, OPAQUE_HANDLE);
        assert!(t.is_pointer);
        assert!(t.requires_marshaling);
    }

    #[test]
    fn known_pointer_is_opaque_handle_without_marshaling() {
        let t = TypeTable::canonical().normalize("int*");
        assert_eq!(t.target, OPAQUE_HANDLE);
        assert!(!t.requires_marshaling);

        let t = TypeTable::canonical().normalize("const char**");
        assert_eq!(t.target, OPAQUE_HANDLE);
    }

    #[test]
    fn pointer_to_string_stays_string() {
        let table = TypeTable::canonical();
        for spelling in ["AZStd::string*", "const AZStd::string*", "std::string*", "AZStd::string_view*"] {
            let t = table.normalize(spelling);
            assert_eq!(t.target, STRING_TYPE, "{spelling}");
            assert!(t.is_pointer, "{spelling}");
            assert!(!t.requires_marshaling, "{spelling}");
        }
        assert!(table.normalize("const AZStd::string*").is_const);

        assert_eq!(table.normalize("AZStd::string**").target, OPAQUE_HANDLE);
        assert_eq!(table.normalize("char**").target, OPAQUE_HANDLE);
    }

    #[test]
    fn unknown_type_keeps_last_segment() {
        let t = TypeTable::canonical().normalize("Outer::Inner");
        assert_eq!(t.target, "Inner");
        assert!(t.requires_marshaling);
        assert!(!t.is_pointer);
    }

    #[test]
    fn references_and_trailing_const() {
        let table = TypeTable::canonical();

        let t = table.normalize("const AZ::Vector3&");
        assert_eq!(t.target, "Vector3");
        assert!(t.is_const && t.is_reference && !t.is_pointer);
        assert!(!t.requires_marshaling);

        let t = table.normalize("char* const");
        assert_eq!(t.target, STRING_TYPE);
        assert!(t.is_const && t.is_pointer);

        let t = table.normalize("const AZStd::string &");
        assert_eq!(t.native, "const AZStd::string&");
        assert_eq!(t.target, STRING_TYPE);
        assert!(t.is_reference);

        let t = table.normalize("float const");
        assert_eq!(t.target, "float");
        assert!(t.is_const);
    }

    #[test]
    fn const_prefix_must_be_a_whole_word() {
        let mut table = TypeTable::canonical();
        table.register("constant_t", "int");
        let t = table.normalize("constant_t");
        assert_eq!(t.target, "int");
        assert!(!t.is_const);
    }

    #[test]
    fn vectors_map_to_arrays() {
        let table = TypeTable::canonical();
        let t = table.normalize("const AZStd::vector<AZ::EntityId>&");
        assert_eq!(t.target, "EntityId[]");
        assert!(t.requires_marshaling);
        assert!(t.is_reference);

        let t = table.normalize("std::vector<float, MyAlloc<float>>");
        assert_eq!(t.target, "float[]");
    }

    #[test]
    fn unknown_template_strips_arguments() {
        let t = TypeTable::canonical().normalize("AZStd::unordered_map<int, Foo::Bar>");
        assert_eq!(t.target, "unordered_map");
        assert!(t.requires_marshaling);
    }

    #[test]
    fn register_extends_table() {
        let mut table = TypeTable::canonical();
        assert!(table.normalize("MyLib::Handle").requires_marshaling);
        table.register("MyLib::Handle", "ulong");
        let t = table.normalize("MyLib::Handle");
        assert_eq!(t.target, "ulong");
        assert!(!t.requires_marshaling);
    }

    #[test]
    fn register_adds_identity_entry() {
        let mut table = TypeTable::empty();
        table.register("Game::Score", "Score");
        assert_eq!(table.get("Score"), Some("Score"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn normalize_is_idempotent_over_the_table() {
        let table = TypeTable::canonical();
        for (native, _) in table.iter() {
            let first = table.normalize(native);
            let second = table.normalize(&first.target);
            assert_eq!(second.target, first.target, "target drift for {native}");
            assert!(!second.requires_marshaling, "{native} → {} not in table", first.target);
            assert!(!second.is_pointer && !second.is_reference && !second.is_const);
        }
    }

    #[test]
    fn idempotent_for_caller_extensions() {
        let mut table = TypeTable::canonical();
        table.register("Game::Handle", "GameHandle");
        let first = table.normalize("const Game::Handle&");
        let second = table.normalize(&first.target);
        assert_eq!(second.target, "GameHandle");
        assert!(!second.requires_marshaling);
    }

    #[test]
    fn descriptor_serializes_flags() {
        let t = TypeTable::canonical().normalize("const char*");
        let json = serde_json::to_string(&t).unwrap();
        let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
