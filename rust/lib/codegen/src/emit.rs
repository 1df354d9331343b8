//! C# source emission for one module.
//!
//! Wrappers forward to `NativeMethods`, an internal class of
//! `InternalCall` entry points registered by the native runtime. Entry
//! names are unique per module; overloads get a numeric suffix.

use std::collections::BTreeSet;

use sharpgen_ir::{
    ClassDecl, DeclarationForest, EnumDecl, FunctionDecl, MethodDecl, Parameter, PropertyDecl,
    TypeDescriptor, OPAQUE_HANDLE,
};

use crate::category::{Category, Grouped};
use crate::naming::{
    escape_keyword, escape_xml, member_name, method_name, parameter_name, pascal_case, property_name,
    type_name,
};

pub const NATIVE_METHODS_FILE: &str = "NativeMethods.cs";

/// Static class holding a module's free functions.
const FUNCTIONS_CLASS: &str = "Functions";

/// Address type of addressed event-bus calls.
const BUS_ADDRESS_TYPE: &str = "EntityId";

const ENUM_BASE_TYPES: &[&str] = &["byte", "sbyte", "short", "ushort", "int", "uint", "long", "ulong"];

const FILE_HEADER: &str = "\
//------------------------------------------------------------------------------
// <auto-generated>
//     This code was generated by sharpgen.
//
//     Changes to this file may be overwritten when regenerated.
// </auto-generated>
//------------------------------------------------------------------------------";

/// What emission needs to know about the module and its surroundings.
#[derive(Debug, Clone)]
pub struct ModuleContext<'a> {
    pub namespace: &'a str,
    /// Namespaces of the module's dependencies, imported in every file.
    pub imports: &'a [String],
    /// Namespace of the shared core assembly.
    pub core_namespace: &'a str,
    /// C# type names that resolve: table targets plus classes and enums of
    /// this module and its dependencies. Other marshaled types become handles.
    pub known_types: &'a BTreeSet<String>,
    /// Entity classes a generated class may derive from.
    pub entity_types: &'a BTreeSet<String>,
    pub generate_docs: bool,
}

/// Emit every non-empty category file plus `NativeMethods.cs`.
/// Returns `(file name, content)` pairs in a fixed order.
pub fn emit_module(ctx: &ModuleContext<'_>, forest: &DeclarationForest) -> Vec<(String, String)> {
    let grouped = Grouped::new(forest);
    let mut natives = NativeTable::default();
    let mut files = Vec::new();

    for category in Category::ALL {
        if grouped.is_empty(category) {
            continue;
        }
        let mut w = SourceWriter::new(ctx);
        w.open(&format!("namespace {}", ctx.namespace));
        match category {
            Category::ValueTypes => {
                each_sorted(&mut w, &grouped.value_types, |c| c.name.as_str(), |w, c| {
                    w.value_type(c, &mut natives)
                })
            }
            Category::Entities => {
                each_sorted(&mut w, &grouped.entities, |c| c.name.as_str(), |w, c| {
                    w.entity(c, &mut natives)
                })
            }
            Category::EventBuses => {
                each_sorted(&mut w, &grouped.event_buses, |c| c.name.as_str(), |w, c| {
                    w.event_bus(c, &mut natives)
                })
            }
            Category::Functions => w.functions(&grouped.functions, &mut natives),
            Category::Enums => each_sorted(&mut w, &grouped.enums, |e| e.name.as_str(), |w, e| w.enumeration(e)),
        }
        w.close();
        files.push((category.file_name().to_string(), w.finish()));
    }

    if !natives.entries.is_empty() {
        let mut w = SourceWriter::new(ctx);
        w.open(&format!("namespace {}", ctx.namespace));
        w.native_methods(&natives);
        w.close();
        files.push((NATIVE_METHODS_FILE.to_string(), w.finish()));
    }
    files
}

/// Items sorted by name, separated by blank lines. Sorting is stable so
/// same-named declarations keep their source order.
fn each_sorted<'t, T>(
    w: &mut SourceWriter<'_>,
    items: &[&'t T],
    name: impl Fn(&T) -> &str,
    mut emit: impl FnMut(&mut SourceWriter<'_>, &'t T),
) {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| name(*a).cmp(name(*b)));
    for (i, item) in sorted.into_iter().enumerate() {
        if i > 0 {
            w.blank();
        }
        emit(w, item);
    }
}

// ── Native entry points ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct NativeTable {
    entries: Vec<NativeEntry>,
    names: BTreeSet<String>,
}

#[derive(Debug)]
struct NativeEntry {
    name: String,
    return_type: String,
    params: Vec<String>,
}

impl NativeTable {
    /// Register an entry point; returns its unique name.
    fn add(&mut self, base: &str, return_type: String, params: Vec<String>) -> String {
        let mut name = base.to_string();
        let mut n = 1;
        while !self.names.insert(name.clone()) {
            name = format!("{base}_{n}");
            n += 1;
        }
        self.entries.push(NativeEntry {
            name: name.clone(),
            return_type,
            params,
        });
        name
    }
}

// ── Docs ────────────────────────────────────────────────────────────

/// A Doxygen-style comment split into summary, `@param` and `@return`.
#[derive(Debug, Default, PartialEq, Eq)]
struct DocComment {
    summary: Vec<String>,
    params: Vec<(String, String)>,
    returns: Option<String>,
}

impl DocComment {
    fn parse(doc: &str) -> Self {
        let mut parsed = DocComment::default();
        for line in doc.lines() {
            let line = line.trim().trim_start_matches('*').trim();
            if line.is_empty() {
                continue;
            }
            let tagged = line.strip_prefix('@').or_else(|| line.strip_prefix('\\'));
            let Some(tagged) = tagged else {
                parsed.summary.push(line.to_string());
                continue;
            };
            let (tag, rest) = tagged.split_once(char::is_whitespace).unwrap_or((tagged, ""));
            let rest = rest.trim();
            match tag {
                "param" | "param[in]" | "param[out]" | "param[in,out]" => {
                    let (name, desc) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                    parsed.params.push((name.to_string(), desc.trim().to_string()));
                }
                "return" | "returns" => parsed.returns = Some(rest.to_string()),
                "brief" => parsed.summary.push(rest.to_string()),
                _ => {}
            }
        }
        parsed
    }
}

// ── Writer ──────────────────────────────────────────────────────────

struct SourceWriter<'a> {
    ctx: &'a ModuleContext<'a>,
    out: String,
    indent: usize,
}

/// A parameter as declared in the wrapper and passed to the entry point.
struct ParamParts {
    decl: String,
    arg: String,
    default: Option<String>,
}

impl<'a> SourceWriter<'a> {
    fn new(ctx: &'a ModuleContext<'a>) -> Self {
        let mut w = Self {
            ctx,
            out: String::new(),
            indent: 0,
        };
        w.line(FILE_HEADER);
        w.blank();
        w.line("using System;");
        w.line("using System.Runtime.CompilerServices;");
        w.line("using System.Runtime.InteropServices;");
        let mut imports: BTreeSet<&str> = ctx.imports.iter().map(String::as_str).collect();
        imports.insert(ctx.core_namespace);
        imports.remove(ctx.namespace);
        for ns in imports {
            w.line(&format!("using {ns};"));
        }
        w.blank();
        w
    }

    fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        for l in text.lines() {
            if !l.is_empty() {
                for _ in 0..self.indent {
                    self.out.push_str("    ");
                }
                self.out.push_str(l);
            }
            self.out.push('\n');
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, header: &str) {
        self.line(header);
        self.line("{");
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    fn docs(&mut self, doc: Option<&str>, params: &[Parameter]) {
        let Some(doc) = doc.filter(|_| self.ctx.generate_docs) else {
            return;
        };
        let parsed = DocComment::parse(doc);
        if !parsed.summary.is_empty() {
            self.line("/// <summary>");
            for l in &parsed.summary {
                self.line(&format!("/// {}", escape_xml(l)));
            }
            self.line("/// </summary>");
        }
        for (name, desc) in &parsed.params {
            if params.iter().any(|p| p.name == *name) {
                self.line(&format!(
                    "/// <param name=\"{}\">{}</param>",
                    parameter_name(name).trim_start_matches('@'),
                    escape_xml(desc)
                ));
            }
        }
        if let Some(returns) = &parsed.returns {
            self.line(&format!("/// <returns>{}</returns>", escape_xml(returns)));
        }
    }

    // ── types ──

    fn ty(&self, ty: &TypeDescriptor) -> String {
        if ty.is_void() {
            return "void".to_string();
        }
        if !ty.requires_marshaling || ty.is_opaque_handle() {
            return ty.target.clone();
        }
        let (element, suffix) = match ty.target.strip_suffix("[]") {
            Some(element) => (element, "[]"),
            None => (ty.target.as_str(), ""),
        };
        if self.ctx.known_types.contains(element) {
            format!("{}{suffix}", type_name(element))
        } else {
            format!("{OPAQUE_HANDLE}{suffix}")
        }
    }

    /// Mutable references to values are passed by `ref`.
    fn by_ref(ty: &TypeDescriptor) -> bool {
        ty.is_reference && !ty.is_const && !ty.is_string() && !ty.is_opaque_handle()
    }

    fn params(&self, params: &[Parameter]) -> Vec<ParamParts> {
        let mut parts: Vec<ParamParts> = params
            .iter()
            .map(|p| {
                let name = parameter_name(&p.name);
                let ty = self.ty(&p.ty);
                if Self::by_ref(&p.ty) {
                    ParamParts {
                        decl: format!("ref {ty} {name}"),
                        arg: format!("ref {name}"),
                        default: None,
                    }
                } else {
                    ParamParts {
                        default: p.default_value.as_deref().and_then(|v| default_literal(v, &ty)),
                        decl: format!("{ty} {name}"),
                        arg: name,
                    }
                }
            })
            .collect();
        // Optional parameters must all come last.
        let mut trailing = true;
        for p in parts.iter_mut().rev() {
            trailing = trailing && p.default.is_some();
            if !trailing {
                p.default = None;
            }
        }
        parts
    }

    // ── declarations ──

    fn entity(&mut self, class: &ClassDecl, natives: &mut NativeTable) {
        let name = type_name(&class.name);
        let base = class
            .base
            .as_deref()
            .map(simple_name)
            .filter(|b| *b != class.name && self.ctx.entity_types.contains(*b));

        self.docs(class.doc.as_deref(), &[]);
        match base {
            Some(base) => {
                self.open(&format!("public partial class {name} : {}", type_name(base)));
                self.open(&format!("internal {name}(IntPtr nativeHandle) : base(nativeHandle)"));
                self.close();
            }
            None => {
                self.open(&format!("public partial class {name}"));
                self.line("internal IntPtr NativeHandle { get; }");
                self.blank();
                self.open(&format!("internal {name}(IntPtr nativeHandle)"));
                self.line("NativeHandle = nativeHandle;");
                self.close();
            }
        }

        for prop in class.properties() {
            self.blank();
            self.property(class, prop, natives);
        }
        for method in class.methods() {
            self.blank();
            let receiver = (!method.is_static).then_some(("IntPtr instance", "NativeHandle"));
            self.method(&class.name, method, receiver, natives);
        }
        self.close();
    }

    fn property(&mut self, class: &ClassDecl, prop: &PropertyDecl, natives: &mut NativeTable) {
        let ty = self.ty(&prop.ty);
        let name = member_name(property_name(&prop.name), &type_name(&class.name));
        let bare = name.trim_start_matches('@');
        let getter = natives.add(
            &format!("{}_Get{bare}", class.name),
            ty.clone(),
            vec!["IntPtr instance".to_string()],
        );
        self.docs(prop.doc.as_deref(), &[]);
        self.open(&format!("public {ty} {name}"));
        self.line(&format!("get => NativeMethods.{getter}(NativeHandle);"));
        if !prop.read_only {
            let setter = natives.add(
                &format!("{}_Set{bare}", class.name),
                "void".to_string(),
                vec!["IntPtr instance".to_string(), format!("{ty} value")],
            );
            self.line(&format!("set => NativeMethods.{setter}(NativeHandle, value);"));
        }
        self.close();
    }

    /// A forwarding method. `receiver` is the entry point's leading
    /// parameter and the expression passed for it.
    fn method(
        &mut self,
        owner: &str,
        method: &MethodDecl,
        receiver: Option<(&str, &str)>,
        natives: &mut NativeTable,
    ) {
        let ret = self.ty(&method.return_type);
        let params = self.params(&method.params);
        let mut native_params: Vec<String> = receiver.iter().map(|(decl, _)| decl.to_string()).collect();
        native_params.extend(params.iter().map(|p| p.decl.clone()));
        let entry = natives.add(&format!("{owner}_{}", method.name), ret.clone(), native_params);

        let mut args: Vec<String> = receiver.iter().map(|(_, arg)| arg.to_string()).collect();
        args.extend(params.iter().map(|p| p.arg.clone()));

        let statik = if method.is_static { "static " } else { "" };
        self.docs(method.doc.as_deref(), &method.params);
        self.open(&format!(
            "public {statik}{ret} {}({})",
            member_name(method_name(&method.name), &type_name(owner)),
            wrapper_params(&params)
        ));
        self.forward(&ret, &entry, &args);
        self.close();
    }

    fn forward(&mut self, ret: &str, entry: &str, args: &[String]) {
        let call = format!("NativeMethods.{entry}({});", args.join(", "));
        if ret == "void" {
            self.line(&call);
        } else {
            self.line(&format!("return {call}"));
        }
    }

    fn value_type(&mut self, class: &ClassDecl, natives: &mut NativeTable) {
        let name = type_name(&class.name);
        self.docs(class.doc.as_deref(), &[]);
        self.line("[StructLayout(LayoutKind.Sequential)]");
        self.open(&format!("public partial struct {name}"));
        let mut first = true;
        for prop in class.properties() {
            self.docs(prop.doc.as_deref(), &[]);
            let readonly = if prop.read_only { "readonly " } else { "" };
            self.line(&format!(
                "public {readonly}{} {};",
                self.ty(&prop.ty),
                member_name(property_name(&prop.name), &name)
            ));
            first = false;
        }
        let receiver = format!("{name} self");
        for method in class.methods() {
            if !first {
                self.blank();
            }
            first = false;
            let receiver = (!method.is_static).then_some((receiver.as_str(), "this"));
            self.method(&class.name, method, receiver, natives);
        }
        self.close();
    }

    fn event_bus(&mut self, class: &ClassDecl, natives: &mut NativeTable) {
        let name = type_name(&class.name);
        self.docs(class.doc.as_deref(), &[]);
        self.open(&format!("public static class {name}"));
        let address = format!("{BUS_ADDRESS_TYPE} address");
        let mut first = true;
        for method in class.methods() {
            if !first {
                self.blank();
            }
            first = false;
            if method.is_static {
                self.method(&class.name, method, None, natives);
                continue;
            }
            self.bus_event(&class.name, method, "Broadcast", None, natives);
            self.blank();
            self.bus_event(&class.name, method, "Event", Some(&address), natives);
        }
        self.close();
    }

    fn bus_event(
        &mut self,
        bus: &str,
        method: &MethodDecl,
        prefix: &str,
        address: Option<&str>,
        natives: &mut NativeTable,
    ) {
        let ret = self.ty(&method.return_type);
        let params = self.params(&method.params);
        let mut decls: Vec<String> = address.iter().map(|a| a.to_string()).collect();
        decls.extend(params.iter().map(|p| p.decl.clone()));
        let entry = natives.add(&format!("{bus}_{prefix}{}", method.name), ret.clone(), decls);

        let mut args: Vec<String> = address.iter().map(|_| "address".to_string()).collect();
        args.extend(params.iter().map(|p| p.arg.clone()));

        let mut signature: Vec<String> = address.iter().map(|a| a.to_string()).collect();
        let rest = wrapper_params(&params);
        if !rest.is_empty() {
            signature.push(rest);
        }

        self.docs(method.doc.as_deref(), &method.params);
        self.open(&format!(
            "public static {ret} {}({})",
            member_name(escape_keyword(&format!("{prefix}{}", pascal_case(&method.name))), &type_name(bus)),
            signature.join(", ")
        ));
        self.forward(&ret, &entry, &args);
        self.close();
    }

    fn functions(&mut self, functions: &[&FunctionDecl], natives: &mut NativeTable) {
        let mut sorted = functions.to_vec();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        self.open(&format!("public static partial class {FUNCTIONS_CLASS}"));
        for (i, f) in sorted.into_iter().enumerate() {
            if i > 0 {
                self.blank();
            }
            let ret = self.ty(&f.return_type);
            let params = self.params(&f.params);
            let entry = natives.add(
                &format!("Global_{}", f.name),
                ret.clone(),
                params.iter().map(|p| p.decl.clone()).collect(),
            );
            let args: Vec<String> = params.iter().map(|p| p.arg.clone()).collect();
            self.docs(f.doc.as_deref(), &f.params);
            self.open(&format!(
                "public static {ret} {}({})",
                member_name(method_name(&f.name), FUNCTIONS_CLASS),
                wrapper_params(&params)
            ));
            self.forward(&ret, &entry, &args);
            self.close();
        }
        self.close();
    }

    fn enumeration(&mut self, e: &EnumDecl) {
        let base = e.underlying.target.as_str();
        let base_clause = if base != "int" && ENUM_BASE_TYPES.contains(&base) {
            format!(" : {base}")
        } else {
            String::new()
        };
        self.docs(e.doc.as_deref(), &[]);
        self.open(&format!("public enum {}{base_clause}", type_name(&e.name)));
        for v in &e.values {
            match v.value {
                Some(value) => self.line(&format!("{} = {value},", escape_keyword(&v.name))),
                None => self.line(&format!("{},", escape_keyword(&v.name))),
            }
        }
        self.close();
    }

    fn native_methods(&mut self, natives: &NativeTable) {
        self.open("internal static class NativeMethods");
        for (i, entry) in natives.entries.iter().enumerate() {
            if i > 0 {
                self.blank();
            }
            self.line("[MethodImpl(MethodImplOptions.InternalCall)]");
            self.line(&format!(
                "internal static extern {} {}({});",
                entry.return_type,
                entry.name,
                entry.params.join(", ")
            ));
        }
        self.close();
    }
}

fn wrapper_params(params: &[ParamParts]) -> String {
    params
        .iter()
        .map(|p| match &p.default {
            Some(default) => format!("{} = {default}", p.decl),
            None => p.decl.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn simple_name(spelling: &str) -> &str {
    let head = spelling.split('<').next().unwrap_or(spelling).trim();
    head.rsplit("::").next().unwrap_or(head)
}

/// A C++ default argument as a C# constant, when it has one.
fn default_literal(value: &str, ty: &str) -> Option<String> {
    let value = value.trim();
    match (ty, value) {
        ("bool", "true" | "false") => return Some(value.to_string()),
        (OPAQUE_HANDLE, "nullptr" | "NULL" | "0") => return Some("default".to_string()),
        ("string", "nullptr" | "NULL") => return Some("null".to_string()),
        ("string", v) if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') => {
            return Some(v.to_string())
        }
        _ => {}
    }

    let numeric = value.trim_end_matches(['u', 'U', 'l', 'L', 'f', 'F']);
    let is_number = !numeric.is_empty()
        && numeric.trim_start_matches(['-', '+']).starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && numeric
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !is_number {
        return None;
    }
    match ty {
        "float" => Some(format!("{numeric}f")),
        "double" => Some(numeric.to_string()),
        "sbyte" | "byte" | "short" | "ushort" | "int" | "uint" | "long" | "ulong"
            if !numeric.contains(['.', 'e', 'E']) =>
        {
            Some(numeric.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpgen_ir::{Decl, EnumValue, Member, RecordKind, TypeTable};

    struct Fixture {
        known: BTreeSet<String>,
        entities: BTreeSet<String>,
        imports: Vec<String>,
    }

    impl Fixture {
        fn new(forest: &DeclarationForest) -> Self {
            let table = TypeTable::canonical();
            let mut known: BTreeSet<String> = table.iter().map(|(_, t)| t.to_string()).collect();
            let mut entities = BTreeSet::new();
            for decl in forest.iter() {
                known.insert(decl.name().to_string());
                if let Decl::Class(c) = decl {
                    if crate::category::classify(c) == Category::Entities {
                        entities.insert(c.name.clone());
                    }
                }
            }
            Self {
                known,
                entities,
                imports: vec!["Game.AzCore".to_string()],
            }
        }

        fn ctx(&self) -> ModuleContext<'_> {
            ModuleContext {
                namespace: "Game.Example",
                imports: &self.imports,
                core_namespace: "O3DE.Sharp.Core",
                known_types: &self.known,
                entity_types: &self.entities,
                generate_docs: true,
            }
        }
    }

    fn param(table: &TypeTable, name: &str, ty: &str) -> Parameter {
        Parameter {
            name: name.into(),
            ty: table.normalize(ty),
            default_value: None,
        }
    }

    fn method(table: &TypeTable, name: &str, ret: &str, params: Vec<Parameter>) -> MethodDecl {
        MethodDecl {
            name: name.into(),
            return_type: table.normalize(ret),
            params,
            is_static: false,
            is_const: false,
            doc: None,
        }
    }

    fn file<'f>(files: &'f [(String, String)], name: &str) -> &'f str {
        files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_str())
            .unwrap_or_else(|| panic!("{name} not emitted"))
    }

    fn sample() -> DeclarationForest {
        let t = TypeTable::canonical();
        let mut forest = DeclarationForest::new();

        let mut player = ClassDecl::new("Player", RecordKind::Class, "Player.h");
        player.doc = Some("A player.\n@note internal".into());
        player.members.push(Member::Property(PropertyDecl {
            name: "m_health".into(),
            ty: t.normalize("float"),
            read_only: false,
            doc: None,
        }));
        let mut set_name = method(&t, "SetName", "void", vec![param(&t, "name", "const char*")]);
        set_name.doc = Some("Rename.\n@param name The new <name>".into());
        player.members.push(Member::Method(set_name));
        player
            .members
            .push(Member::Method(method(&t, "Damage", "void", vec![param(&t, "amount", "int")])));
        player.members.push(Member::Method(method(
            &t,
            "Damage",
            "void",
            vec![param(&t, "amount", "int"), param(&t, "source", "Weapons::Gun*")],
        )));
        forest.push(Decl::Class(player));

        let mut boss = ClassDecl::new("Boss", RecordKind::Class, "Player.h");
        boss.base = Some("Game::Player".into());
        forest.push(Decl::Class(boss));

        let mut hit = ClassDecl::new("HitInfo", RecordKind::Struct, "Hit.h");
        hit.members.push(Member::Property(PropertyDecl {
            name: "point".into(),
            ty: t.normalize("AZ::Vector3"),
            read_only: false,
            doc: None,
        }));
        forest.push(Decl::Class(hit));

        let mut bus = ClassDecl::new("HealthRequests", RecordKind::Class, "Bus.h");
        bus.members.push(Member::Method(method(&t, "GetHealth", "float", vec![])));
        forest.push(Decl::Class(bus));

        forest.push(Decl::Function(FunctionDecl {
            name: "Foo".into(),
            scope: "Game".into(),
            return_type: t.normalize("void"),
            params: vec![param(&t, "name", "const char*"), param(&t, "count", "int")],
            doc: None,
            source_file: "Api.h".into(),
        }));

        forest.push(Decl::Enum(EnumDecl {
            name: "State".into(),
            scope: String::new(),
            underlying: t.normalize("uint8_t"),
            values: vec![
                EnumValue { name: "Idle".into(), value: Some(0) },
                EnumValue { name: "Running".into(), value: None },
                EnumValue { name: "default".into(), value: Some(4) },
            ],
            doc: None,
            source_file: "Api.h".into(),
        }));
        forest
    }

    #[test]
    fn category_files_in_fixed_order() {
        let forest = sample();
        let fx = Fixture::new(&forest);
        let files = emit_module(&fx.ctx(), &forest);
        let names: Vec<_> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ValueTypes.cs",
                "Entities.cs",
                "Functions.cs",
                "Enums.cs",
                "EventBuses.cs",
                "NativeMethods.cs"
            ]
        );
        for (_, content) in &files {
            assert!(content.starts_with("//----"));
            assert!(content.contains("using Game.AzCore;"));
            assert!(content.contains("using O3DE.Sharp.Core;"));
            assert!(content.contains("namespace Game.Example\n{"));
        }
    }

    #[test]
    fn entities_forward_to_unique_entry_points() {
        let forest = sample();
        let fx = Fixture::new(&forest);
        let files = emit_module(&fx.ctx(), &forest);
        let entities = file(&files, "Entities.cs");

        assert!(entities.contains("    public partial class Boss : Player\n"));
        assert!(entities.contains("internal Boss(IntPtr nativeHandle) : base(nativeHandle)"));
        assert!(entities.contains("        internal IntPtr NativeHandle { get; }\n"));
        assert!(entities.contains("public float Health\n"));
        assert!(entities.contains("get => NativeMethods.Player_GetHealth(NativeHandle);"));
        assert!(entities.contains("set => NativeMethods.Player_SetHealth(NativeHandle, value);"));
        assert!(entities.contains("public void SetName(string name)"));
        assert!(entities.contains("/// <param name=\"name\">The new &lt;name&gt;</param>"));
        assert!(entities.contains("/// A player."));
        assert!(!entities.contains("@note"));
        // Overloads share a wrapper name but not an entry point.
        assert!(entities.contains("NativeMethods.Player_Damage(NativeHandle, amount);"));
        assert!(entities.contains("public void Damage(int amount, IntPtr source)"));
        assert!(entities.contains("NativeMethods.Player_Damage_1(NativeHandle, amount, source);"));

        let natives = file(&files, "NativeMethods.cs");
        assert!(natives.contains("internal static extern void Player_Damage(IntPtr instance, int amount);"));
        assert!(natives.contains(
            "internal static extern void Player_Damage_1(IntPtr instance, int amount, IntPtr source);"
        ));
        assert!(natives.contains("internal static extern void Global_Foo(string name, int count);"));
    }

    #[test]
    fn value_types_buses_functions_enums() {
        let forest = sample();
        let fx = Fixture::new(&forest);
        let files = emit_module(&fx.ctx(), &forest);

        let values = file(&files, "ValueTypes.cs");
        assert!(values.contains("[StructLayout(LayoutKind.Sequential)]\n    public partial struct HitInfo"));
        assert!(values.contains("public Vector3 Point;"));

        let buses = file(&files, "EventBuses.cs");
        assert!(buses.contains("public static class HealthRequests"));
        assert!(buses.contains("public static float BroadcastGetHealth()"));
        assert!(buses.contains("public static float EventGetHealth(EntityId address)"));
        assert!(buses.contains("return NativeMethods.HealthRequests_EventGetHealth(address);"));

        let functions = file(&files, "Functions.cs");
        assert!(functions.contains("public static void Foo(string name, int count)"));
        assert!(functions.contains("NativeMethods.Global_Foo(name, count);"));

        let enums = file(&files, "Enums.cs");
        assert!(enums.contains("public enum State : byte"));
        assert!(enums.contains("Idle = 0,\n        Running,\n        @default = 4,"));
    }

    #[test]
    fn unknown_types_become_handles() {
        let t = TypeTable::canonical();
        let mut forest = DeclarationForest::new();
        let mut c = ClassDecl::new("Holder", RecordKind::Class, "H.h");
        c.members.push(Member::Method(method(&t, "Get", "Outer::Widget", vec![])));
        c.members.push(Member::Method(method(&t, "Peers", "AZStd::vector<Holder>", vec![])));
        forest.push(Decl::Class(c));

        let fx = Fixture::new(&forest);
        let files = emit_module(&fx.ctx(), &forest);
        let entities = file(&files, "Entities.cs");
        assert!(entities.contains("public IntPtr Get()"));
        assert!(entities.contains("public Holder[] Peers()"));
    }

    #[test]
    fn defaults_only_on_trailing_parameters() {
        let t = TypeTable::canonical();
        let mut forest = DeclarationForest::new();
        let with_default = |name: &str, ty: &str, default: Option<&str>| Parameter {
            default_value: default.map(str::to_string),
            ..param(&t, name, ty)
        };
        let params = vec![
            with_default("a", "int", Some("1")),
            with_default("b", "Thing", Some("Thing()")),
            with_default("scale", "float", Some("1.5f")),
            with_default("flag", "bool", Some("true")),
        ];
        forest.push(Decl::Function(FunctionDecl {
            name: "Spawn".into(),
            scope: String::new(),
            return_type: t.normalize("void"),
            params,
            doc: None,
            source_file: "S.h".into(),
        }));
        let fx = Fixture::new(&forest);
        let files = emit_module(&fx.ctx(), &forest);
        assert!(file(&files, "Functions.cs")
            .contains("public static void Spawn(int a, IntPtr b, float scale = 1.5f, bool flag = true)"));
    }

    #[test]
    fn mutable_references_pass_by_ref() {
        let t = TypeTable::canonical();
        let mut forest = DeclarationForest::new();
        forest.push(Decl::Function(FunctionDecl {
            name: "Nudge".into(),
            scope: String::new(),
            return_type: t.normalize("void"),
            params: vec![param(&t, "pos", "AZ::Vector3&"), param(&t, "by", "const AZ::Vector3&")],
            doc: None,
            source_file: "N.h".into(),
        }));
        let fx = Fixture::new(&forest);
        let files = emit_module(&fx.ctx(), &forest);
        let functions = file(&files, "Functions.cs");
        assert!(functions.contains("public static void Nudge(ref Vector3 pos, Vector3 by)"));
        assert!(functions.contains("NativeMethods.Global_Nudge(ref pos, by);"));
    }

    #[test]
    fn members_never_share_their_enclosing_type_name() {
        let t = TypeTable::canonical();
        let mut forest = DeclarationForest::new();
        forest.push(Decl::Function(FunctionDecl {
            name: "Functions".into(),
            scope: String::new(),
            return_type: t.normalize("void"),
            params: vec![],
            doc: None,
            source_file: "F.h".into(),
        }));
        let mut gauge = ClassDecl::new("Gauge", RecordKind::Class, "G.h");
        gauge.members.push(Member::Property(PropertyDecl {
            name: "m_gauge".into(),
            ty: t.normalize("int"),
            read_only: true,
            doc: None,
        }));
        forest.push(Decl::Class(gauge));
        let mut counter = ClassDecl::new("Counter", RecordKind::Class, "C.h");
        counter.members.push(Member::Method(method(&t, "Counter", "int", vec![])));
        forest.push(Decl::Class(counter));

        let fx = Fixture::new(&forest);
        let files = emit_module(&fx.ctx(), &forest);
        let functions = file(&files, "Functions.cs");
        assert!(functions.contains("public static partial class Functions\n"));
        assert!(functions.contains("public static void Functions_()"));
        assert!(functions.contains("NativeMethods.Global_Functions();"));

        let entities = file(&files, "Entities.cs");
        assert!(entities.contains("public int Gauge_\n"));
        assert!(entities.contains("get => NativeMethods.Gauge_GetGauge_(NativeHandle);"));
        assert!(entities.contains("public int Counter_()"));
    }

    #[test]
    fn doc_comment_parsing() {
        let doc = DocComment::parse("Get the position.\n@param other The other one\n@return The distance");
        assert_eq!(doc.summary, vec!["Get the position."]);
        assert_eq!(doc.params, vec![("other".to_string(), "The other one".to_string())]);
        assert_eq!(doc.returns.as_deref(), Some("The distance"));
    }

    #[test]
    fn default_literals() {
        assert_eq!(default_literal("10u", "uint").as_deref(), Some("10"));
        assert_eq!(default_literal("-1", "int").as_deref(), Some("-1"));
        assert_eq!(default_literal("0.5", "float").as_deref(), Some("0.5f"));
        assert_eq!(default_literal("nullptr", "IntPtr").as_deref(), Some("default"));
        assert_eq!(default_literal("\"hi\"", "string").as_deref(), Some("\"hi\""));
        assert_eq!(default_literal("1.5", "int"), None);
        assert_eq!(default_literal("kMax", "int"), None);
    }
}
