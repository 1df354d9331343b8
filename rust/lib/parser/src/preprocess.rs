//! Line-level preprocessor for the header front end.
//!
//! Evaluates conditionals against the configured defines plus in-file
//! `#define`s and records `#include` targets. Directive lines and inactive
//! regions are blanked so token line numbers stay accurate. Macros are
//! never expanded into the token stream.

use std::collections::BTreeMap;

use crate::expr;

#[derive(Debug)]
pub(crate) struct PreprocessError {
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Default)]
pub(crate) struct Preprocessed {
    pub text: String,
    /// `(target, is_quoted)` for every active `#include`.
    pub includes: Vec<(String, bool)>,
}

struct Frame {
    parent_active: bool,
    taken: bool,
    active: bool,
    seen_else: bool,
    line: u32,
}

pub(crate) struct Preprocessor {
    macros: BTreeMap<String, String>,
}

impl Preprocessor {
    /// `defines` entries are `NAME` or `NAME=VALUE`.
    pub fn new(defines: &[String]) -> Self {
        let mut macros = BTreeMap::new();
        for define in defines {
            let (name, value) = match define.split_once('=') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => (define.trim(), "1"),
            };
            if !name.is_empty() {
                macros.insert(name.to_string(), value.to_string());
            }
        }
        Self { macros }
    }

    pub fn run(&mut self, source: &str) -> Result<Preprocessed, PreprocessError> {
        let mut out = Preprocessed::default();
        let mut stack: Vec<Frame> = Vec::new();
        let lines: Vec<&str> = source.lines().collect();
        let mut idx = 0;

        while idx < lines.len() {
            let line_no = idx as u32 + 1;
            let trimmed = lines[idx].trim_start();
            if !trimmed.starts_with('#') {
                let active = stack.last().map_or(true, |f| f.active);
                if active {
                    out.text.push_str(lines[idx]);
                }
                out.text.push('\n');
                idx += 1;
                continue;
            }

            // Directive, possibly continued with trailing backslashes.
            let mut directive = String::new();
            loop {
                let part = lines[idx];
                idx += 1;
                out.text.push('\n');
                match part.strip_suffix('\\') {
                    Some(head) if idx < lines.len() => {
                        directive.push_str(head);
                        directive.push(' ');
                    }
                    _ => {
                        directive.push_str(part.strip_suffix('\\').unwrap_or(part));
                        break;
                    }
                }
            }
            let directive = strip_comments(directive.trim_start().trim_start_matches('#'));
            let directive = directive.trim();
            let (name, rest) = match directive.find(|c: char| !(c.is_alphanumeric() || c == '_')) {
                Some(i) => (&directive[..i], directive[i..].trim()),
                None => (directive, ""),
            };

            let active = stack.last().map_or(true, |f| f.active);
            match name {
                "if" | "ifdef" | "ifndef" => {
                    let cond = active
                        && match name {
                            "ifdef" => self.macros.contains_key(first_word(rest)),
                            "ifndef" => !self.macros.contains_key(first_word(rest)),
                            _ => self.condition(rest, line_no)?,
                        };
                    stack.push(Frame {
                        parent_active: active,
                        taken: cond,
                        active: cond,
                        seen_else: false,
                        line: line_no,
                    });
                }
                "elif" | "elifdef" | "elifndef" => {
                    let frame = stack.last().ok_or_else(|| err(line_no, "#elif without #if"))?;
                    if frame.seen_else {
                        return Err(err(line_no, "#elif after #else"));
                    }
                    let (parent_active, taken) = (frame.parent_active, frame.taken);
                    let cond = parent_active
                        && !taken
                        && match name {
                            "elifdef" => self.macros.contains_key(first_word(rest)),
                            "elifndef" => !self.macros.contains_key(first_word(rest)),
                            _ => self.condition(rest, line_no)?,
                        };
                    if let Some(frame) = stack.last_mut() {
                        frame.active = cond;
                        frame.taken |= cond;
                    }
                }
                "else" => {
                    let frame = stack.last_mut().ok_or_else(|| err(line_no, "#else without #if"))?;
                    if frame.seen_else {
                        return Err(err(line_no, "duplicate #else"));
                    }
                    frame.seen_else = true;
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                }
                "endif" => {
                    stack.pop().ok_or_else(|| err(line_no, "#endif without #if"))?;
                }
                "define" if active => {
                    let (macro_name, value) = split_define(rest);
                    if !macro_name.is_empty() {
                        self.macros.insert(macro_name.to_string(), value.to_string());
                    }
                }
                "undef" if active => {
                    self.macros.remove(first_word(rest));
                }
                "include" if active => {
                    if let Some(target) = include_target(rest) {
                        out.includes.push(target);
                    }
                }
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(err(open.line, "unterminated conditional directive"));
        }
        Ok(out)
    }

    fn condition(&self, expr_text: &str, line: u32) -> Result<bool, PreprocessError> {
        let replaced = self.replace_defined(expr_text);
        let macros = &self.macros;
        let value = expr::evaluate(&replaced, &|name| Some(macro_value(macros, name, 0)))
            .ok_or_else(|| err(line, format!("cannot evaluate `{}`", expr_text.trim())))?;
        Ok(value != 0)
    }

    /// Rewrite `defined(X)` / `defined X` to `1` or `0`.
    fn replace_defined(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = find_word(rest, "defined") {
            out.push_str(&rest[..pos]);
            let after = rest[pos + "defined".len()..].trim_start();
            let (inner, remaining) = match after.strip_prefix('(') {
                Some(a) => match a.find(')') {
                    Some(close) => (a[..close].trim(), &a[close + 1..]),
                    None => (a.trim(), ""),
                },
                None => {
                    let end = after
                        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                        .unwrap_or(after.len());
                    (&after[..end], &after[end..])
                }
            };
            out.push_str(if self.macros.contains_key(inner) { " 1 " } else { " 0 " });
            rest = remaining;
        }
        out.push_str(rest);
        out
    }
}

/// Value of a macro used inside `#if`; undefined names are 0.
fn macro_value(macros: &BTreeMap<String, String>, name: &str, depth: u32) -> i64 {
    match macros.get(name) {
        None => 0,
        Some(_) if depth > 16 => 0,
        Some(value) if value.trim().is_empty() => 0,
        Some(value) => {
            expr::evaluate(value, &|inner| Some(macro_value(macros, inner, depth + 1))).unwrap_or(0)
        }
    }
}

fn err(line: u32, message: impl Into<String>) -> PreprocessError {
    PreprocessError {
        line,
        message: message.into(),
    }
}

fn first_word(s: &str) -> &str {
    s.split(|c: char| c.is_whitespace() || c == '(').next().unwrap_or("")
}

fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let mut start = 0;
    while let Some(found) = haystack[start..].find(word) {
        let pos = start + found;
        let before = haystack[..pos].chars().last();
        let after = haystack[pos + word.len()..].chars().next();
        let is_ident = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
        if !is_ident(before) && !is_ident(after) {
            return Some(pos);
        }
        start = pos + word.len();
    }
    None
}

/// `NAME value`, `NAME(args) body`. Function-like macros keep an empty value.
fn split_define(rest: &str) -> (&str, &str) {
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..end];
    let tail = &rest[end..];
    if tail.starts_with('(') {
        (name, "")
    } else {
        (name, tail.trim())
    }
}

fn include_target(rest: &str) -> Option<(String, bool)> {
    let rest = rest.trim();
    if let Some(inner) = rest.strip_prefix('"') {
        return inner.find('"').map(|end| (inner[..end].to_string(), true));
    }
    if let Some(inner) = rest.strip_prefix('<') {
        return inner.find('>').map(|end| (inner[..end].to_string(), false));
    }
    None
}

fn strip_comments(s: &str) -> String {
    let mut out = s.to_string();
    if let Some(pos) = out.find("//") {
        out.truncate(pos);
    }
    while let Some(start) = out.find("/*") {
        match out[start..].find("*/") {
            Some(end) => out.replace_range(start..start + end + 2, " "),
            None => {
                out.truncate(start);
                break;
            }
        }
    }
    out
}
