//! Best-effort conversion of JavaScript regex literals to Lua patterns.
//!
//! Lua patterns are not regular expressions: there is no alternation, no
//! quantified groups, and no bounded repetition. This converter translates
//! the practical subset query scripts actually use and reports everything
//! else as unconvertible. An unconvertible pattern is a value
//! (`pattern: None`), never an error: regex literals are common enough
//! that aborting a whole transpilation on one of them is unacceptable.

/// Outcome of converting one regex literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternConversion {
    /// The Lua pattern, or `None` when the literal uses unsupported
    /// constructs (alternation, lookaround, quantified groups, ...)
    pub pattern: Option<String>,
    /// Whether the literal carried the `g` flag
    pub is_global: bool,
}

impl PatternConversion {
    fn unsupported(is_global: bool) -> Self {
        Self {
            pattern: None,
            is_global,
        }
    }
}

/// Characters with special meaning in Lua patterns; literal occurrences
/// must be `%`-escaped.
const LUA_MAGIC: &str = "^$*+?.([%-)]";

/// Cap on literal unrolling of `{n,m}` repetition.
const MAX_UNROLL: usize = 8;

/// Convert a raw regex literal (`/pattern/flags` as sliced by the
/// tokenizer) into a Lua pattern.
pub fn convert(literal: &str) -> PatternConversion {
    let Some((body, flags)) = split_literal(literal) else {
        return PatternConversion::unsupported(false);
    };
    let is_global = flags.contains('g');

    let chars: Vec<char> = body.chars().collect();
    let mut out = String::new();
    // Lua text of the most recently emitted single atom (char, %class, or
    // [class]); needed to unroll bounded repetition and lazy `+?`.
    let mut last_atom: Option<String> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '|' => return PatternConversion::unsupported(is_global),
            '\\' => {
                let Some(&esc) = chars.get(i + 1) else {
                    return PatternConversion::unsupported(is_global);
                };
                let Some(atom) = convert_escape(esc) else {
                    return PatternConversion::unsupported(is_global);
                };
                out.push_str(&atom);
                last_atom = Some(atom);
                i += 2;
            }
            '[' => {
                let Some((class, consumed)) = convert_class(&chars[i..]) else {
                    return PatternConversion::unsupported(is_global);
                };
                out.push_str(&class);
                last_atom = Some(class);
                i += consumed;
            }
            '(' => {
                // Non-capturing groups degrade to plain groups; lookaround
                // has no Lua equivalent at all.
                if chars.get(i + 1) == Some(&'?') {
                    match chars.get(i + 2) {
                        Some(':') => {
                            out.push('(');
                            i += 3;
                        }
                        _ => return PatternConversion::unsupported(is_global),
                    }
                } else {
                    out.push('(');
                    i += 1;
                }
                last_atom = None;
            }
            ')' => {
                // A quantifier attached to a group cannot be expressed in
                // Lua patterns.
                if matches!(chars.get(i + 1), Some('*') | Some('+') | Some('?') | Some('{')) {
                    return PatternConversion::unsupported(is_global);
                }
                out.push(')');
                last_atom = None;
                i += 1;
            }
            '*' => {
                // Lazy star is exactly Lua's `-`
                let lazy = chars.get(i + 1) == Some(&'?');
                out.push(if lazy { '-' } else { '*' });
                last_atom = None;
                i += if lazy { 2 } else { 1 };
            }
            '+' => {
                if chars.get(i + 1) == Some(&'?') {
                    // `X+?` approximated as one X then lazy repetition
                    let Some(atom) = last_atom.take() else {
                        return PatternConversion::unsupported(is_global);
                    };
                    out.push_str(&atom);
                    out.push('-');
                    i += 2;
                } else {
                    out.push('+');
                    last_atom = None;
                    i += 1;
                }
            }
            '?' => {
                // Greedy and lazy optional both degrade to Lua `?`
                out.push('?');
                last_atom = None;
                i += if chars.get(i + 1) == Some(&'?') { 2 } else { 1 };
            }
            '{' => {
                match parse_bounds(&chars[i..]) {
                    Some((min, max, consumed)) => {
                        let Some(atom) = last_atom.take() else {
                            return PatternConversion::unsupported(is_global);
                        };
                        let Some(unrolled) = unroll(&atom, min, max) else {
                            return PatternConversion::unsupported(is_global);
                        };
                        // The atom itself is already in the buffer once
                        out.truncate(out.len() - atom.len());
                        out.push_str(&unrolled);
                        i += consumed;
                    }
                    None => {
                        // `{` without numeric bounds is a literal brace
                        out.push('{');
                        last_atom = Some("{".into());
                        i += 1;
                    }
                }
            }
            '^' if i == 0 => {
                out.push('^');
                last_atom = None;
                i += 1;
            }
            '$' if i == chars.len() - 1 => {
                out.push('$');
                last_atom = None;
                i += 1;
            }
            '.' => {
                out.push('.');
                last_atom = Some(".".into());
                i += 1;
            }
            _ => {
                let atom = escape_literal(c);
                out.push_str(&atom);
                last_atom = Some(atom);
                i += 1;
            }
        }
    }

    PatternConversion {
        pattern: Some(out),
        is_global,
    }
}

/// Split `/body/flags` into body and flags, honoring escapes and
/// character classes the same way the tokenizer does.
fn split_literal(literal: &str) -> Option<(&str, &str)> {
    let rest = literal.strip_prefix('/')?;
    let chars: Vec<char> = rest.chars().collect();
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                let body_len: usize = chars[..i].iter().map(|c| c.len_utf8()).sum();
                return Some((&rest[..body_len], &rest[body_len + 1..]));
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// One escaped atom outside a character class.
fn convert_escape(esc: char) -> Option<String> {
    Some(match esc {
        'd' => "%d".into(),
        'D' => "%D".into(),
        'w' => "%w".into(),
        'W' => "%W".into(),
        's' => "%s".into(),
        'S' => "%S".into(),
        'n' => "\n".into(),
        't' => "\t".into(),
        'r' => "\r".into(),
        'f' => "\u{c}".into(),
        'v' => "\u{b}".into(),
        '0' => "\0".into(),
        c if c.is_ascii_alphanumeric() => return None, // \b, \B, backrefs, \u...
        c => escape_literal(c),
    })
}

/// Convert a `[...]` class. Returns the Lua class and the number of
/// source chars consumed.
fn convert_class(chars: &[char]) -> Option<(String, usize)> {
    let mut out = String::from("[");
    let mut i = 1;
    if chars.get(i) == Some(&'^') {
        out.push('^');
        i += 1;
    }
    let mut first = true;
    while i < chars.len() {
        match chars[i] {
            ']' if !first => {
                out.push(']');
                return Some((out, i + 1));
            }
            '\\' => {
                let esc = *chars.get(i + 1)?;
                match esc {
                    'd' | 'D' | 'w' | 'W' | 's' | 'S' => {
                        out.push('%');
                        out.push(esc);
                    }
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    ']' => out.push_str("%]"),
                    c if c.is_ascii_alphanumeric() => return None,
                    c => out.push_str(&escape_in_class(c)),
                }
                i += 2;
                first = false;
                continue;
            }
            ']' => {
                // Leading `]` is a literal member
                out.push_str("%]");
            }
            '-' => out.push('-'),
            c => out.push_str(&escape_in_class(c)),
        }
        i += 1;
        first = false;
    }
    None
}

fn escape_literal(c: char) -> String {
    if LUA_MAGIC.contains(c) {
        format!("%{}", c)
    } else {
        c.to_string()
    }
}

/// Escape plain text so Lua pattern matching treats every character
/// literally (used for string-literal separators and patterns).
pub(crate) fn escape_plain(text: &str) -> String {
    text.chars().map(escape_literal).collect()
}

fn escape_in_class(c: char) -> String {
    match c {
        '%' => "%%".into(),
        '^' => "%^".into(),
        ']' => "%]".into(),
        _ => c.to_string(),
    }
}

/// `{n}` / `{n,}` / `{n,m}` bounds. Returns (min, max, consumed).
fn parse_bounds(chars: &[char]) -> Option<(usize, Option<usize>, usize)> {
    let close = chars.iter().position(|&c| c == '}')?;
    let inner: String = chars[1..close].iter().collect();
    if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_digit() || c == ',') {
        return None;
    }
    let (min, max) = match inner.split_once(',') {
        None => {
            let n = inner.parse().ok()?;
            (n, Some(n))
        }
        Some((lo, "")) => (lo.parse().ok()?, None),
        Some((lo, hi)) => (lo.parse().ok()?, Some(hi.parse().ok()?)),
    };
    Some((min, max, close + 1))
}

/// Approximate bounded repetition by literal unrolling: `X{2,4}` becomes
/// `XXX?X?`, `X{2,}` becomes `XXX*`. Only small bounds are worth the
/// blowup.
fn unroll(atom: &str, min: usize, max: Option<usize>) -> Option<String> {
    let copies = max.unwrap_or(min);
    if copies > MAX_UNROLL || max.is_some_and(|m| m < min) {
        return None;
    }
    let mut out = String::new();
    for _ in 0..min {
        out.push_str(atom);
    }
    match max {
        Some(m) => {
            for _ in min..m {
                out.push_str(atom);
                out.push('?');
            }
        }
        None => {
            out.push_str(atom);
            out.push('*');
        }
    }
    Some(out)
}
