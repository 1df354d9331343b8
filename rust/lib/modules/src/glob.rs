//! Path globs for module include/exclude lists.
//!
//! Paths are `/`-separated and relative to the project root.
//! `*` and `?` never cross a `/`; a `**` segment spans any number of
//! directories (including none).

/// A compiled glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<String>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        let source = normalize_path(pattern);
        let segments = source.split('/').map(str::to_string).collect();
        Self { source, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// No wildcard characters: the pattern names exactly one file.
    pub fn is_literal(&self) -> bool {
        !self.source.contains(['*', '?'])
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_path(path);
        let parts: Vec<&str> = path.split('/').collect();
        let segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        match_segments(&segments, &parts)
    }
}

/// Forward slashes, no leading `./`, no empty segments.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((seg, rest)) => match path.split_first() {
            Some((part, path_rest)) => match_segment(seg, part) && match_segments(rest, path_rest),
            None => false,
        },
    }
}

/// Single-segment wildcard match with backtracking on `*`.
fn match_segment(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}
