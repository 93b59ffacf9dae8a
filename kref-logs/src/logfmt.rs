//! Recognition of pre-formatted `key=value` strings
//!
//! Values rendered by a text logger look like `"msg"="Starting workers"` (klogr's
//! legacy shape) or `reason="object updated" attempt=2`. When such a string ends
//! up inside a JSON record it would be escaped a second time, so the JSON
//! encoder uses [`to_object`] to lift it into a nested object instead.
use serde_json::{Map, Value};

/// Parses a whole string as whitespace separated `key=value` pairs
///
/// Keys and values are either bare (running up to `=` or the next whitespace) or
/// double quoted with Rust debug-style escapes. Returns `None` unless the entire
/// input is made of at least one well formed pair, so ordinary prose is left alone.
#[must_use]
pub fn parse(input: &str) -> Option<Vec<(String, String)>> {
    scan(input).map(|(pairs, _)| pairs)
}

/// Folds `input` into a JSON object when it looks like logger output
///
/// Besides parsing with [`parse`], at least one key or value has to be quoted, the
/// way text loggers always render strings. Bare strings such as `app=web,tier=db`
/// or `default/a=b` stay plain strings. Later duplicates win, matching how
/// repeated keys behave in a JSON record.
#[must_use]
pub fn to_object(input: &str) -> Option<Map<String, Value>> {
    match scan(input) {
        Some((pairs, true)) => Some(fold(pairs)),
        _ => None,
    }
}

/// Folds already parsed pairs into a JSON object of strings
pub(crate) fn fold(pairs: Vec<(String, String)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

/// Parses the pairs and reports whether any key or value was quoted
fn scan(input: &str) -> Option<(Vec<(String, String)>, bool)> {
    let mut pairs = Vec::new();
    let mut quoted = false;
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let (key, after_key) = if let Some(inner) = rest.strip_prefix('"') {
            quoted = true;
            unquote(inner)?
        } else {
            let key_len = rest.find(|c: char| !is_key_char(c)).unwrap_or(rest.len());
            if key_len == 0 {
                return None;
            }
            let (key, after_key) = rest.split_at(key_len);
            (key.to_string(), after_key)
        };
        let after_eq = after_key.strip_prefix('=')?;
        let (value, after_value) = if let Some(inner) = after_eq.strip_prefix('"') {
            quoted = true;
            unquote(inner)?
        } else {
            let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
            let (bare, tail) = after_eq.split_at(end);
            if bare.contains('"') {
                return None;
            }
            (bare.to_string(), tail)
        };
        if !(after_value.is_empty() || after_value.starts_with(char::is_whitespace)) {
            return None;
        }
        pairs.push((key, value));
        rest = after_value.trim_start();
    }
    if pairs.is_empty() {
        None
    } else {
        Some((pairs, quoted))
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

/// Reads a quoted value whose opening quote has already been consumed
fn unquote(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((value, &input[idx + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '"' | '\\' | '\'' => value.push(escaped),
                    'u' => {
                        if chars.next()?.1 != '{' {
                            return None;
                        }
                        let mut hex = String::new();
                        loop {
                            let (_, h) = chars.next()?;
                            if h == '}' {
                                break;
                            }
                            hex.push(h);
                        }
                        let code = u32::from_str_radix(&hex, 16).ok()?;
                        value.push(char::from_u32(code)?);
                    }
                    _ => return None,
                }
            }
            _ => value.push(c),
        }
    }
    // unterminated quote
    None
}
