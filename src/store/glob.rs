//! Glob patterns for key enumeration and scan filters.
//!
//! Supports the same syntax as Redis `KEYS`:
//! - `*` matches any run of bytes (including none)
//! - `?` matches exactly one byte
//! - `[abc]`, `[a-z]`, `[^a]` match a byte class
//! - `\x` matches `x` literally

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    pattern: Vec<u8>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.as_bytes().to_vec(),
        }
    }

    /// True if the pattern is `*`, which matches everything.
    pub fn is_match_all(&self) -> bool {
        self.pattern == b"*"
    }

    pub fn matches(&self, text: &[u8]) -> bool {
        self.is_match_all() || match_from(&self.pattern, text)
    }

    pub fn matches_str(&self, text: &str) -> bool {
        self.matches(text.as_bytes())
    }
}

/// Escapes glob metacharacters so `text` matches only itself.
///
/// Namespace names are user supplied; a table called `a*` must not enumerate
/// the keys of table `ab`.
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Iterative matcher. On mismatch it backtracks to the most recent `*` and
/// lets it swallow one more byte, so it runs in O(pattern * text).
fn match_from(pattern: &[u8], text: &[u8]) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    // Collapse runs of stars
                    while p < pattern.len() && pattern[p] == b'*' {
                        p += 1;
                    }
                    if p == pattern.len() {
                        return true;
                    }
                    star = Some((p, t));
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                b'[' => {
                    if let Some((matched, next)) = match_class(pattern, p, text[t]) {
                        if matched {
                            p = next;
                            t += 1;
                            continue;
                        }
                    }
                }
                b'\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }

        match star {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

/// Matches `byte` against the class starting at `pattern[start] == b'['`.
///
/// Returns whether it matched and the index just past the closing `]`, or
/// `None` if the class is unterminated.
fn match_class(pattern: &[u8], start: usize, byte: u8) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != b']' {
        if pattern[i] == b'\\' && i + 1 < pattern.len() {
            i += 1;
            if pattern[i] == byte {
                matched = true;
            }
        } else if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            if byte >= lo && byte <= hi {
                matched = true;
            }
            i += 2;
        } else if pattern[i] == byte {
            matched = true;
        }
        i += 1;
    }

    if i >= pattern.len() {
        return None;
    }

    Some((matched != negate, i + 1))
}
