//! Tokenizer for preprocessed header text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    /// Documentation comment, already stripped of comment markers.
    Doc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Doc && self.kind != TokenKind::Str && self.text == text
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Number)
    }
}

#[derive(Debug)]
pub(crate) struct LexError {
    pub line: u32,
    pub message: String,
}

const MULTI_PUNCT: &[&str] = &["...", "::", "->", "&&", "||", "==", "!=", "<=", ">="];

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;
    let mut line = 1u32;
    // Consecutive `///` lines merge into one doc token.
    let mut last_line_doc_end: Option<u32> = None;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() || c == '\\' {
            i += 1;
            continue;
        }

        // Line comments.
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            let start = i;
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let body = text
                .strip_prefix("///")
                .filter(|b| !b.starts_with('/') && !b.starts_with('<'))
                .or_else(|| text.strip_prefix("//!").filter(|b| !b.starts_with('<')));
            if let Some(body) = body {
                let body = body.trim();
                match tokens.last_mut() {
                    Some(prev)
                        if prev.kind == TokenKind::Doc && last_line_doc_end == Some(line - 1) =>
                    {
                        prev.text.push('\n');
                        prev.text.push_str(body);
                    }
                    _ => tokens.push(Token {
                        kind: TokenKind::Doc,
                        text: body.to_string(),
                        line,
                    }),
                }
                last_line_doc_end = Some(line);
            }
            continue;
        }

        // Block comments.
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start_line = line;
            let start = i;
            i += 2;
            loop {
                if i + 1 >= chars.len() {
                    return Err(LexError {
                        line: start_line,
                        message: "unterminated block comment".into(),
                    });
                }
                if chars[i] == '*' && chars[i + 1] == '/' {
                    i += 2;
                    break;
                }
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let is_doc = (text.starts_with("/**") && !text.starts_with("/***") && text.len() > 4)
                || text.starts_with("/*!");
            if is_doc && !text[3..].starts_with('<') {
                tokens.push(Token {
                    kind: TokenKind::Doc,
                    text: clean_block_doc(&text),
                    line: start_line,
                });
            }
            continue;
        }

        let start_line = line;

        // Raw string literal: R"delim( ... )delim"
        if c == 'R' && chars.get(i + 1) == Some(&'"') {
            let mut j = i + 2;
            let mut delim = String::new();
            while j < chars.len() && chars[j] != '(' {
                delim.push(chars[j]);
                j += 1;
            }
            let close: Vec<char> = format!("){delim}\"").chars().collect();
            j += 1;
            while j < chars.len() && !chars[j..].starts_with(&close) {
                if chars[j] == '\n' {
                    line += 1;
                }
                j += 1;
            }
            if j >= chars.len() {
                return Err(LexError {
                    line: start_line,
                    message: "unterminated raw string literal".into(),
                });
            }
            j += close.len();
            tokens.push(Token {
                kind: TokenKind::Str,
                text: chars[i..j].iter().collect(),
                line: start_line,
            });
            i = j;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            // Encoding prefixes on string literals (u8"..", L"..") belong to the literal.
            if matches!(text.as_str(), "L" | "u" | "U" | "u8") && matches!(chars.get(i), Some('"') | Some('\'')) {
                continue;
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                text,
                line,
            });
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() {
                let ch = chars[i];
                let is_hex = chars[start..i].iter().any(|c| matches!(c, 'x' | 'X'));
                let exponent_sign = (ch == '+' || ch == '-')
                    && match chars[i - 1] {
                        'e' | 'E' => !is_hex,
                        'p' | 'P' => true,
                        _ => false,
                    };
                if ch.is_alphanumeric() || ch == '.' || ch == '\'' || ch == '_' || exponent_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                text: chars[start..i].iter().collect(),
                line,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                if i < chars.len() && chars[i] == '\n' {
                    return Err(LexError {
                        line,
                        message: "unterminated literal".into(),
                    });
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err(LexError {
                    line,
                    message: "unterminated literal".into(),
                });
            }
            i += 1;
            tokens.push(Token {
                kind: if quote == '"' { TokenKind::Str } else { TokenKind::Char },
                text: chars[start..i].iter().collect(),
                line,
            });
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        let text = MULTI_PUNCT
            .iter()
            .find(|p| rest.starts_with(**p))
            .map(|p| p.to_string())
            .unwrap_or_else(|| c.to_string());
        i += text.chars().count();
        tokens.push(Token {
            kind: TokenKind::Punct,
            text,
            line,
        });
    }

    Ok(tokens)
}

/// Strip `/** */` markers and leading `*` from each line.
fn clean_block_doc(text: &str) -> String {
    let inner = text
        .trim_start_matches("/**")
        .trim_start_matches("/*!")
        .trim_end_matches("*/");
    let lines: Vec<&str> = inner
        .lines()
        .map(|l| {
            let l = l.trim();
            l.strip_prefix('*').map(str::trim).unwrap_or(l)
        })
        .collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |e| e + 1);
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn punctuation_and_words() {
        assert_eq!(
            texts("const AZ::Vector3& v = {0.5f, 1e-3};"),
            vec!["const", "AZ", "::", "Vector3", "&", "v", "=", "{", "0.5f", ",", "1e-3", "}", ";"]
        );
        assert_eq!(texts("Foo&& x"), vec!["Foo", "&&", "x"]);
        assert_eq!(texts("vector<vector<int>>"), vec!["vector", "<", "vector", "<", "int", ">", ">"]);
    }

    #[test]
    fn plain_comments_are_dropped() {
        assert_eq!(texts("int /* c */ x; // trailing\n"), vec!["int", "x", ";"]);
    }

    #[test]
    fn doc_comments_become_tokens() {
        let toks = tokenize("/**\n * Get the position.\n * @return pos\n */\nint f();").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Doc);
        assert_eq!(toks[0].text, "Get the position.\n@return pos");
        assert_eq!(toks[1].line, 5);
    }

    #[test]
    fn triple_slash_lines_merge() {
        let toks = tokenize("/// first\n/// second\nint x;\n/// other\n\nint y;").unwrap();
        assert_eq!(toks[0].text, "first\nsecond");
        let docs: Vec<_> = toks.iter().filter(|t| t.kind == TokenKind::Doc).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].text, "other");
    }

    #[test]
    fn strings_and_chars() {
        let toks = tokenize(r#"f("a;b}", '}', L"w", R"x(raw ) " )x")"#).unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::Punct,
                TokenKind::Str,
                TokenKind::Punct,
                TokenKind::Char,
                TokenKind::Punct,
                TokenKind::Str,
                TokenKind::Punct,
                TokenKind::Str,
                TokenKind::Punct,
            ]
        );
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        assert!(tokenize("int x; /* open").is_err());
    }
}
