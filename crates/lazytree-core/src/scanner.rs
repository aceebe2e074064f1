//! Stateless tokenizer: given `(buffer, index)`, skip or recognize JSON
//! tokens. No node is ever allocated here — this module only computes
//! offsets and, for the `parse_*` variants, materialized values.

use crate::buffer::CharBuffer;
use crate::error::FormatError;
use crate::node::NodeType;

const CONTEXT_RADIUS: usize = 20;

fn fmt_err(buf: &CharBuffer, offset: usize, expected: impl Into<String>) -> FormatError {
    FormatError::new(offset, expected, buf.context_snippet(offset, CONTEXT_RADIUS))
}

/// Advances past ASCII space, tab, CR, LF only (the JSON definition of
/// whitespace — not Unicode whitespace).
pub fn skip_whitespace(buf: &CharBuffer, mut i: usize) -> usize {
    while let Some(c) = buf.get(i) {
        if matches!(c, ' ' | '\t' | '\r' | '\n') {
            i += 1;
        } else {
            break;
        }
    }
    i
}

/// Peeks one significant character and dispatches to the matching skipper.
/// Returns the index one past the recognized value.
pub fn skip_value(buf: &CharBuffer, i: usize) -> Result<usize, FormatError> {
    let i = skip_whitespace(buf, i);
    match buf.get(i) {
        Some('{') => skip_object(buf, i),
        Some('[') => skip_array(buf, i),
        Some('"') => skip_string(buf, i),
        Some('t') => skip_literal(buf, i, "true"),
        Some('f') => skip_literal(buf, i, "false"),
        Some('n') => skip_literal(buf, i, "null"),
        Some(c) if c == '-' || c.is_ascii_digit() => skip_number(buf, i),
        Some(_) => Err(fmt_err(buf, i, "a JSON value")),
        None => Err(fmt_err(buf, i, "a JSON value")),
    }
}

/// Classify the token at `i` without fully skipping it. Used by lazy nodes
/// to determine their variant from the first significant character.
pub fn detect_type(buf: &CharBuffer, i: usize) -> Result<NodeType, FormatError> {
    let i = skip_whitespace(buf, i);
    match buf.get(i) {
        Some('{') => Ok(NodeType::Object),
        Some('[') => Ok(NodeType::Array),
        Some('"') => Ok(NodeType::String),
        Some('t') | Some('f') => Ok(NodeType::Boolean),
        Some('n') => Ok(NodeType::Null),
        Some(c) if c == '-' || c.is_ascii_digit() => Ok(NodeType::Number),
        _ => Err(fmt_err(buf, i, "a JSON value")),
    }
}

pub fn skip_literal(buf: &CharBuffer, i: usize, expected: &str) -> Result<usize, FormatError> {
    let mut j = i;
    for expected_char in expected.chars() {
        match buf.get(j) {
            Some(c) if c == expected_char => j += 1,
            _ => return Err(fmt_err(buf, j, format!("'{expected}'"))),
        }
    }
    Ok(j)
}

pub fn skip_string(buf: &CharBuffer, i: usize) -> Result<usize, FormatError> {
    let mut j = expect_char(buf, i, '"')?;
    loop {
        match buf.get(j) {
            None => return Err(fmt_err(buf, j, "a closing '\"'")),
            Some('"') => return Ok(j + 1),
            Some('\\') => {
                j = skip_escape(buf, j + 1)?;
            }
            Some(c) if (c as u32) < 0x20 => {
                return Err(fmt_err(buf, j, "a character at or above U+0020"));
            }
            Some(_) => j += 1,
        }
    }
}

fn skip_escape(buf: &CharBuffer, i: usize) -> Result<usize, FormatError> {
    match buf.get(i) {
        Some('"') | Some('\\') | Some('/') | Some('b') | Some('f') | Some('n') | Some('r')
        | Some('t') => Ok(i + 1),
        Some('u') => {
            let mut j = i + 1;
            for _ in 0..4 {
                match buf.get(j) {
                    Some(c) if c.is_ascii_hexdigit() => j += 1,
                    _ => return Err(fmt_err(buf, j, "a hex digit")),
                }
            }
            Ok(j)
        }
        _ => Err(fmt_err(buf, i, "one of \\\" \\\\ \\/ \\b \\f \\n \\r \\t \\u")),
    }
}

pub fn skip_number(buf: &CharBuffer, i: usize) -> Result<usize, FormatError> {
    let mut j = i;
    if buf.get(j) == Some('-') {
        j += 1;
    }
    let int_start = j;
    while matches!(buf.get(j), Some(c) if c.is_ascii_digit()) {
        j += 1;
    }
    if j == int_start {
        return Err(fmt_err(buf, j, "a digit"));
    }
    if buf.get(j) == Some('.') {
        j += 1;
        let frac_start = j;
        while matches!(buf.get(j), Some(c) if c.is_ascii_digit()) {
            j += 1;
        }
        if j == frac_start {
            return Err(fmt_err(buf, j, "a digit"));
        }
    }
    if matches!(buf.get(j), Some('e') | Some('E')) {
        j += 1;
        if matches!(buf.get(j), Some('+') | Some('-')) {
            j += 1;
        }
        let exp_start = j;
        while matches!(buf.get(j), Some(c) if c.is_ascii_digit()) {
            j += 1;
        }
        if j == exp_start {
            return Err(fmt_err(buf, j, "a digit"));
        }
    }
    Ok(j)
}

pub fn skip_array(buf: &CharBuffer, i: usize) -> Result<usize, FormatError> {
    let mut j = expect_char(buf, i, '[')?;
    j = skip_whitespace(buf, j);
    if buf.get(j) == Some(']') {
        return Ok(j + 1);
    }
    loop {
        j = skip_value(buf, j)?;
        j = skip_whitespace(buf, j);
        match buf.get(j) {
            Some(',') => {
                j = skip_whitespace(buf, j + 1);
            }
            Some(']') => return Ok(j + 1),
            _ => return Err(fmt_err(buf, j, "',' or ']'")),
        }
    }
}

pub fn skip_object(buf: &CharBuffer, i: usize) -> Result<usize, FormatError> {
    let mut j = expect_char(buf, i, '{')?;
    j = skip_whitespace(buf, j);
    if buf.get(j) == Some('}') {
        return Ok(j + 1);
    }
    loop {
        j = skip_whitespace(buf, j);
        j = skip_string(buf, j)?;
        j = skip_whitespace(buf, j);
        j = expect_char(buf, j, ':')?;
        j = skip_whitespace(buf, j);
        j = skip_value(buf, j)?;
        j = skip_whitespace(buf, j);
        match buf.get(j) {
            Some(',') => {
                j = skip_whitespace(buf, j + 1);
            }
            Some('}') => return Ok(j + 1),
            _ => return Err(fmt_err(buf, j, "',' or '}'")),
        }
    }
}

fn expect_char(buf: &CharBuffer, i: usize, expected: char) -> Result<usize, FormatError> {
    match buf.get(i) {
        Some(c) if c == expected => Ok(i + 1),
        _ => Err(fmt_err(buf, i, format!("'{expected}'"))),
    }
}

// ---------------------------------------------------------------------------
// Parsing variants — produce a value and `end` together.
// ---------------------------------------------------------------------------

pub fn parse_bool(buf: &CharBuffer, i: usize) -> Result<(bool, usize), FormatError> {
    match buf.get(i) {
        Some('t') => Ok((true, skip_literal(buf, i, "true")?)),
        Some('f') => Ok((false, skip_literal(buf, i, "false")?)),
        _ => Err(fmt_err(buf, i, "'true' or 'false'")),
    }
}

pub fn parse_null(buf: &CharBuffer, i: usize) -> Result<usize, FormatError> {
    skip_literal(buf, i, "null")
}

pub fn parse_number(buf: &CharBuffer, i: usize) -> Result<(f64, usize), FormatError> {
    let end = skip_number(buf, i)?;
    let text = buf.slice(i, end);
    let value = text
        .parse::<f64>()
        .map_err(|_| fmt_err(buf, i, "a well-formed JSON number"))?;
    Ok((value, end))
}

/// Decodes escapes (`\uXXXX` parsed as a 16-bit code unit, with surrogate
/// pairs combined by Rust's standard `char`/`String` machinery via
/// `String::from_utf16`-equivalent handling) and returns the decoded string
/// plus the index one past the closing quote.
pub fn parse_string(buf: &CharBuffer, i: usize) -> Result<(String, usize), FormatError> {
    let mut j = expect_char(buf, i, '"')?;
    let mut units: Vec<u16> = Vec::new();
    loop {
        match buf.get(j) {
            None => return Err(fmt_err(buf, j, "a closing '\"'")),
            Some('"') => {
                j += 1;
                break;
            }
            Some('\\') => {
                let (unit, next) = parse_escape(buf, j + 1)?;
                units.push(unit);
                j = next;
            }
            Some(c) if (c as u32) < 0x20 => {
                return Err(fmt_err(buf, j, "a character at or above U+0020"));
            }
            Some(c) => {
                let mut encode_buf = [0u16; 2];
                units.extend_from_slice(c.encode_utf16(&mut encode_buf));
                j += 1;
            }
        }
    }
    let decoded = String::from_utf16_lossy(&units);
    Ok((decoded, j))
}

fn parse_escape(buf: &CharBuffer, i: usize) -> Result<(u16, usize), FormatError> {
    match buf.get(i) {
        Some('"') => Ok(('"' as u16, i + 1)),
        Some('\\') => Ok(('\\' as u16, i + 1)),
        Some('/') => Ok(('/' as u16, i + 1)),
        Some('b') => Ok((0x08, i + 1)),
        Some('f') => Ok((0x0C, i + 1)),
        Some('n') => Ok((b'\n' as u16, i + 1)),
        Some('r') => Ok((b'\r' as u16, i + 1)),
        Some('t') => Ok((b'\t' as u16, i + 1)),
        Some('u') => {
            let mut j = i + 1;
            let mut code: u16 = 0;
            for _ in 0..4 {
                let digit = match buf.get(j) {
                    Some(c) if c.is_ascii_hexdigit() => c.to_digit(16).unwrap() as u16,
                    _ => return Err(fmt_err(buf, j, "a hex digit")),
                };
                code = code * 16 + digit;
                j += 1;
            }
            Ok((code, j))
        }
        _ => Err(fmt_err(buf, i, "one of \\\" \\\\ \\/ \\b \\f \\n \\r \\t \\u")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(s: &str) -> std::sync::Arc<CharBuffer> {
        CharBuffer::new(s)
    }

    #[test]
    fn skips_whitespace_only_ascii() {
        let b = buf("  \t\r\n x");
        assert_eq!(skip_whitespace(&b, 0), 5);
    }

    #[test]
    fn skips_object_and_array() {
        let b = buf(r#"{"a": 1, "b": [2, 3]}"#);
        assert_eq!(skip_value(&b, 0).unwrap(), b.len());
    }

    #[test]
    fn skip_number_variants() {
        for (s, expect_ok) in [
            ("0", true),
            ("-0", true),
            ("-1.5e10", true),
            ("1.5E-3", true),
            ("01", true), // skip_number stops after the first '0'; caller handles leading-zero semantics
            ("-", false),
            ("1.", false),
            ("1e", false),
        ] {
            let b = buf(s);
            let result = skip_number(&b, 0);
            assert_eq!(result.is_ok(), expect_ok, "input {s:?}");
        }
    }

    #[test]
    fn string_escape_and_surrogate_pairs() {
        let b = buf(r#""é""#);
        let (s, end) = parse_string(&b, 0).unwrap();
        assert_eq!(s, "é");
        assert_eq!(end, b.len());

        let b = buf(r#""\t""#);
        let (s, _) = parse_string(&b, 0).unwrap();
        assert_eq!(s, "\t");

        let b = buf(r#""\q""#);
        let err = parse_string(&b, 0).unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn control_char_in_string_is_format_error() {
        let s = format!("\"{}\"", '\u{1}');
        let b = buf(&s);
        assert!(skip_string(&b, 0).is_err());
    }

    #[test]
    fn literal_mismatch_is_format_error() {
        let b = buf("tru");
        assert!(skip_literal(&b, 0, "true").is_err());
    }

    #[test]
    fn trailing_comma_is_format_error() {
        let b = buf("[1, 2, ]");
        assert!(skip_array(&b, 0).is_err());
    }
}
