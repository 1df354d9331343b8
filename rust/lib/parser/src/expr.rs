//! Integer constant expressions.
//!
//! Shared by `#if` evaluation and enumerator initializers. Identifiers are
//! resolved through a caller-supplied function; an unresolvable name makes
//! the whole expression fail.

/// Evaluate `source`, resolving names through `resolve`.
/// Returns `None` when the text is not a well-formed constant expression.
pub fn evaluate(source: &str, resolve: &dyn Fn(&str) -> Option<i64>) -> Option<i64> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return None;
    }
    let mut parser = ExprParser {
        tokens: &tokens,
        pos: 0,
        resolve,
    };
    let value = parser.ternary()?;
    if parser.pos == tokens.len() {
        Some(value)
    } else {
        None
    }
}

/// Parse an integer literal: decimal, hex, octal, binary, with `u`/`l` suffixes
/// and `'` digit separators, or a simple character literal.
pub fn parse_int_literal(text: &str) -> Option<i64> {
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return parse_char_literal(inner);
    }
    let cleaned: String = text.chars().filter(|c| *c != '\'').collect();
    let digits = cleaned.trim_end_matches(['u', 'U', 'l', 'L']);
    let (radix, body) = if let Some(h) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, h)
    } else if let Some(b) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, b)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if body.is_empty() {
        return None;
    }
    u64::from_str_radix(body, radix).ok().map(|v| v as i64)
}

fn parse_char_literal(inner: &str) -> Option<i64> {
    let mut chars = inner.chars();
    let value = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => '\n' as i64,
            't' => '\t' as i64,
            'r' => '\r' as i64,
            '0' => 0,
            '\\' => '\\' as i64,
            '\'' => '\'' as i64,
            _ => return None,
        },
        c => c as i64,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(i64),
    Name(String),
    Op(&'static str),
}

const OPERATORS: &[&str] = &[
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "(", ")", "+", "-", "*", "/", "%", "&", "|",
    "^", "~", "!", "<", ">", "?", ":",
];

fn tokenize(source: &str) -> Option<Vec<Tok>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '\'') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Tok::Num(parse_int_literal(&text)?));
            continue;
        }
        if c == '\'' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
            let text: String = chars[start..i.min(chars.len())].iter().collect();
            tokens.push(Tok::Num(parse_int_literal(&text)?));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            // Scoped names (`Flags::Bit`) are one token.
            while i < chars.len() {
                if chars[i].is_alphanumeric() || chars[i] == '_' {
                    i += 1;
                } else if chars[i] == ':' && chars.get(i + 1) == Some(&':') {
                    i += 2;
                } else {
                    break;
                }
            }
            tokens.push(Tok::Name(chars[start..i].iter().collect()));
            continue;
        }
        let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
        let op = OPERATORS.iter().find(|op| rest.starts_with(**op))?;
        tokens.push(Tok::Op(op));
        i += op.chars().count();
    }
    Some(tokens)
}

struct ExprParser<'a> {
    tokens: &'a [Tok],
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<i64>,
}

impl ExprParser<'_> {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Tok::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn eat(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ternary(&mut self) -> Option<i64> {
        let cond = self.binary(0)?;
        if self.eat("?") {
            let then = self.ternary()?;
            if !self.eat(":") {
                return None;
            }
            let otherwise = self.ternary()?;
            Some(if cond != 0 { then } else { otherwise })
        } else {
            Some(cond)
        }
    }

    /// Precedence climbing over the binary operators, lowest level first.
    fn binary(&mut self, level: usize) -> Option<i64> {
        const LEVELS: &[&[&str]] = &[
            &["||"],
            &["&&"],
            &["|"],
            &["^"],
            &["&"],
            &["==", "!="],
            &["<", ">", "<=", ">="],
            &["<<", ">>"],
            &["+", "-"],
            &["*", "/", "%"],
        ];
        if level == LEVELS.len() {
            return self.unary();
        }
        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = self.peek_op().filter(|op| LEVELS[level].contains(op)) {
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i64> {
        if self.eat("-") {
            return self.unary().map(i64::wrapping_neg);
        }
        if self.eat("+") {
            return self.unary();
        }
        if self.eat("~") {
            return self.unary().map(|v| !v);
        }
        if self.eat("!") {
            return self.unary().map(|v| (v == 0) as i64);
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<i64> {
        match self.tokens.get(self.pos)?.clone() {
            Tok::Num(v) => {
                self.pos += 1;
                Some(v)
            }
            Tok::Name(name) => {
                self.pos += 1;
                match name.as_str() {
                    "true" => Some(1),
                    "false" => Some(0),
                    _ => (self.resolve)(&name),
                }
            }
            Tok::Op("(") => {
                self.pos += 1;
                let v = self.ternary()?;
                if self.eat(")") {
                    Some(v)
                } else {
                    None
                }
            }
            Tok::Op(_) => None,
        }
    }
}

fn apply(op: &str, a: i64, b: i64) -> Option<i64> {
    Some(match op {
        "||" => (a != 0 || b != 0) as i64,
        "&&" => (a != 0 && b != 0) as i64,
        "|" => a | b,
        "^" => a ^ b,
        "&" => a & b,
        "==" => (a == b) as i64,
        "!=" => (a != b) as i64,
        "<" => (a < b) as i64,
        ">" => (a > b) as i64,
        "<=" => (a <= b) as i64,
        ">=" => (a >= b) as i64,
        "<<" => a.checked_shl(u32::try_from(b).ok()?)?,
        ">>" => a.checked_shr(u32::try_from(b).ok()?)?,
        "+" => a.wrapping_add(b),
        "-" => a.wrapping_sub(b),
        "*" => a.wrapping_mul(b),
        "/" => a.checked_div(b)?,
        "%" => a.checked_rem(b)?,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> Option<i64> {
        evaluate(s, &|name| match name {
            "A" => Some(1),
            "Flags::B" => Some(4),
            _ => None,
        })
    }

    #[test]
    fn literals() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("010"), Some(8));
        assert_eq!(parse_int_literal("100u"), Some(100));
        assert_eq!(parse_int_literal("1'000"), Some(1000));
        assert_eq!(parse_int_literal("'a'"), Some(97));
        assert_eq!(parse_int_literal("0xFFFFFFFFFFFFFFFF"), Some(-1));
        assert_eq!(parse_int_literal("abc"), None);
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3"), Some(7));
        assert_eq!(eval("(1 + 2) * 3"), Some(9));
        assert_eq!(eval("1 << 4 | 1"), Some(17));
        assert_eq!(eval("~0 & 0xF"), Some(15));
        assert_eq!(eval("-3"), Some(-3));
        assert_eq!(eval("1 == 1 && 2 > 1"), Some(1));
        assert_eq!(eval("0 ? 5 : 6"), Some(6));
    }

    #[test]
    fn names_resolve() {
        assert_eq!(eval("A | Flags::B"), Some(5));
        assert_eq!(eval("A + Unknown"), None);
        assert_eq!(eval("true"), Some(1));
    }

    #[test]
    fn malformed() {
        assert_eq!(eval(""), None);
        assert_eq!(eval("(1"), None);
        assert_eq!(eval("1 2"), None);
        assert_eq!(eval("1 / 0"), None);
        assert_eq!(eval("\"str\""), None);
    }
}
