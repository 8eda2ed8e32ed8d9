//! Wire codec for the restricted JSON dialect.
//!
//! The dialect is deliberately narrow: a flat object (or array of flat
//! objects) whose values are quoted strings or bare finite decimals.
//! Key order is preserved in both directions; it is observable on the
//! wire and the test suite relies on it for deterministic output.

use crate::error::{NimbusError, Result};
use crate::record::Record;

const INDENT: &str = "    ";

/// Renders a record as a flat object, one field per line. A value is
/// emitted unquoted iff it parses as a finite decimal.
pub fn encode(record: &Record) -> String {
    let mut out = String::from("{\n");
    let count = record.len();
    for (index, (key, value)) in record.iter().enumerate() {
        out.push_str(INDENT);
        out.push('"');
        out.push_str(&escape(key));
        out.push_str("\": ");
        if is_decimal(value) {
            out.push_str(value);
        } else {
            out.push('"');
            out.push_str(&escape(value));
            out.push('"');
        }
        if index + 1 < count {
            out.push(',');
        }
        out.push('\n');
    }
    out.push('}');
    out
}

pub fn encode_array(records: &[Record]) -> String {
    let mut out = String::from("[\n");
    for (index, record) in records.iter().enumerate() {
        out.push_str(&encode(record));
        if index + 1 < records.len() {
            out.push_str(",\n");
        }
    }
    out.push_str("\n]");
    out
}

/// Parses a flat object. Rejects the empty object; a trailing comma or
/// empty pair is a structure error.
pub fn decode(text: &str) -> Result<Record> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| {
            NimbusError::MalformedStructure("expected an outer {...} object".to_string())
        })?;

    if inner.trim().is_empty() {
        return Err(NimbusError::MalformedStructure(
            "empty object".to_string(),
        ));
    }

    let mut record = Record::new();
    for pair in split_top_level(inner)? {
        let pair = pair.trim();
        if pair.is_empty() {
            return Err(NimbusError::MalformedStructure(
                "empty key/value pair".to_string(),
            ));
        }

        let (raw_key, raw_value) = pair.split_once(':').ok_or_else(|| {
            NimbusError::MalformedStructure(format!("missing ':' in pair '{}'", pair))
        })?;

        record.insert(decode_key(raw_key.trim())?, decode_value(raw_value.trim())?);
    }

    Ok(record)
}

/// Parses an array of flat objects. Object boundaries are found by
/// brace counting outside quoted strings; an empty interior yields an
/// empty vec.
pub fn decode_array(text: &str) -> Result<Vec<Record>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| {
            NimbusError::MalformedStructure("expected an outer [...] array".to_string())
        })?;

    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut object_start = None;
    let mut chars = inner.char_indices();

    while let Some((index, c)) = chars.next() {
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    object_start = Some(index);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    NimbusError::MalformedStructure("unbalanced braces".to_string())
                })?;
                if depth == 0 {
                    if let Some(start) = object_start.take() {
                        records.push(decode(&inner[start..=index])?);
                    }
                }
            }
            _ => {}
        }
    }

    if in_string {
        return Err(NimbusError::MalformedStructure(
            "unterminated string".to_string(),
        ));
    }
    if depth != 0 {
        return Err(NimbusError::MalformedStructure(
            "unbalanced braces".to_string(),
        ));
    }

    Ok(records)
}

/// Splits an object interior on commas that sit outside quoted
/// strings. A backslash inside a string escapes the following
/// character, so `\"` does not toggle string mode.
fn split_top_level(inner: &str) -> Result<Vec<&str>> {
    let mut pairs = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut chars = inner.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' if in_string => {
                chars.next();
            }
            '"' => in_string = !in_string,
            ',' if !in_string => {
                pairs.push(&inner[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    if in_string {
        return Err(NimbusError::MalformedStructure(
            "unterminated string".to_string(),
        ));
    }

    pairs.push(&inner[start..]);
    Ok(pairs)
}

/// Keys are normally quoted by the encoder; a bare key is accepted
/// as-is.
fn decode_key(raw: &str) -> Result<String> {
    match raw.strip_prefix('"') {
        Some(stripped) => {
            let inner = stripped.strip_suffix('"').ok_or_else(|| {
                NimbusError::MalformedString(format!("unterminated key {}", raw))
            })?;
            unescape(inner)
        }
        None => Ok(raw.to_string()),
    }
}

fn decode_value(raw: &str) -> Result<String> {
    if let Some(stripped) = raw.strip_prefix('"') {
        let inner = stripped.strip_suffix('"').ok_or_else(|| {
            NimbusError::MalformedString(format!("unterminated string value {}", raw))
        })?;
        return unescape(inner);
    }

    if is_decimal(raw) {
        Ok(raw.to_string())
    } else {
        Err(NimbusError::MalformedNumber(raw.to_string()))
    }
}

fn is_decimal(raw: &str) -> bool {
    !raw.is_empty() && raw.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => out.push(unicode_escape(&mut chars)?),
            Some(other) => {
                return Err(NimbusError::MalformedString(format!(
                    "invalid escape \\{}",
                    other
                )));
            }
            None => {
                return Err(NimbusError::MalformedString(
                    "dangling backslash".to_string(),
                ));
            }
        }
    }

    Ok(out)
}

/// Decodes the four hex digits after `\u`, pairing surrogates when a
/// high surrogate is followed by a `\uXXXX` low surrogate.
fn unicode_escape(chars: &mut std::str::Chars<'_>) -> Result<char> {
    let first = hex4(chars)?;

    if (0xDC00..=0xDFFF).contains(&first) {
        return Err(NimbusError::MalformedString(
            "lone low surrogate in \\u escape".to_string(),
        ));
    }

    if (0xD800..=0xDBFF).contains(&first) {
        if chars.next() != Some('\\') || chars.next() != Some('u') {
            return Err(NimbusError::MalformedString(
                "high surrogate not followed by \\u escape".to_string(),
            ));
        }
        let second = hex4(chars)?;
        if !(0xDC00..=0xDFFF).contains(&second) {
            return Err(NimbusError::MalformedString(
                "invalid low surrogate in \\u escape".to_string(),
            ));
        }
        let combined = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
        return char::from_u32(combined).ok_or_else(|| {
            NimbusError::MalformedString("invalid surrogate pair".to_string())
        });
    }

    char::from_u32(first)
        .ok_or_else(|| NimbusError::MalformedString("invalid \\u escape".to_string()))
}

fn hex4(chars: &mut std::str::Chars<'_>) -> Result<u32> {
    let mut value = 0u32;
    for _ in 0..4 {
        let c = chars.next().ok_or_else(|| {
            NimbusError::MalformedString("truncated \\u escape".to_string())
        })?;
        let digit = c.to_digit(16).ok_or_else(|| {
            NimbusError::MalformedString(format!("invalid hex digit '{}' in \\u escape", c))
        })?;
        value = value * 16 + digit;
    }
    Ok(value)
}
