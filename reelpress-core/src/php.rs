//! PHP `serialize()` wire-format codec.
//!
//! The `repeatable_fields` metadata value is read by a PHP theme through
//! `unserialize()`, so the encoder here must be byte-exact: string lengths
//! are UTF-8 byte counts, arrays keep insertion order, and every scalar
//! carries its own terminator. The parser exists for round-trip
//! verification and diagnostics; the store only ever encodes.

use std::fmt::Write as _;

use thiserror::Error;

/// A PHP value, restricted to the shapes this schema stores: integers,
/// strings, and ordered arrays with scalar keys.
#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Int(i64),
    Str(String),
    /// Ordered key-value pairs; PHP arrays preserve insertion order.
    Array(Vec<(PhpValue, PhpValue)>),
}

impl PhpValue {
    /// Encode into the PHP `serialize()` wire format.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        match self {
            PhpValue::Int(n) => {
                let _ = write!(out, "i:{n};");
            }
            PhpValue::Str(s) => {
                let _ = write!(out, "s:{}:\"{s}\";", s.len());
            }
            PhpValue::Array(entries) => {
                let _ = write!(out, "a:{}:{{", entries.len());
                for (key, value) in entries {
                    key.write_into(out);
                    value.write_into(out);
                }
                out.push('}');
            }
        }
    }

    /// Decode a serialized value. Strict: trailing bytes are an error.
    pub fn parse(input: &str) -> Result<PhpValue, PhpParseError> {
        let bytes = input.as_bytes();
        let (value, rest) = parse_value(bytes)?;
        if !rest.is_empty() {
            return Err(PhpParseError::TrailingData(rest.len()));
        }
        Ok(value)
    }
}

/// Errors from [`PhpValue::parse`].
#[derive(Error, Debug, PartialEq)]
pub enum PhpParseError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected byte {0:?}")]
    UnexpectedByte(char),
    #[error("invalid length prefix")]
    BadLength,
    #[error("invalid integer literal")]
    BadInt,
    #[error("string payload is not valid utf-8")]
    BadUtf8,
    #[error("{0} trailing bytes after value")]
    TrailingData(usize),
}

fn parse_value(input: &[u8]) -> Result<(PhpValue, &[u8]), PhpParseError> {
    match input.first() {
        Some(b'i') => {
            let rest = expect(input, b"i:")?;
            let (digits, rest) = take_until(rest, b';')?;
            let n = std::str::from_utf8(digits)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(PhpParseError::BadInt)?;
            Ok((PhpValue::Int(n), &rest[1..]))
        }
        Some(b's') => {
            let rest = expect(input, b"s:")?;
            let (len, rest) = take_length(rest)?;
            let rest = expect(rest, b":\"")?;
            if rest.len() < len + 2 {
                return Err(PhpParseError::UnexpectedEnd);
            }
            let payload = std::str::from_utf8(&rest[..len])
                .map_err(|_| PhpParseError::BadUtf8)?
                .to_owned();
            let rest = expect(&rest[len..], b"\";")?;
            Ok((PhpValue::Str(payload), rest))
        }
        Some(b'a') => {
            let rest = expect(input, b"a:")?;
            let (count, rest) = take_length(rest)?;
            let mut rest = expect(rest, b":{")?;
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                let (key, after_key) = parse_value(rest)?;
                let (value, after_value) = parse_value(after_key)?;
                entries.push((key, value));
                rest = after_value;
            }
            let rest = expect(rest, b"}")?;
            Ok((PhpValue::Array(entries), rest))
        }
        Some(&other) => Err(PhpParseError::UnexpectedByte(other as char)),
        None => Err(PhpParseError::UnexpectedEnd),
    }
}

fn expect<'a>(input: &'a [u8], prefix: &[u8]) -> Result<&'a [u8], PhpParseError> {
    if input.len() < prefix.len() {
        return Err(PhpParseError::UnexpectedEnd);
    }
    if &input[..prefix.len()] != prefix {
        return Err(PhpParseError::UnexpectedByte(input[0] as char));
    }
    Ok(&input[prefix.len()..])
}

fn take_until(input: &[u8], stop: u8) -> Result<(&[u8], &[u8]), PhpParseError> {
    let pos = input
        .iter()
        .position(|&b| b == stop)
        .ok_or(PhpParseError::UnexpectedEnd)?;
    Ok((&input[..pos], &input[pos..]))
}

fn take_length(input: &[u8]) -> Result<(usize, &[u8]), PhpParseError> {
    let pos = input
        .iter()
        .position(|&b| !b.is_ascii_digit())
        .ok_or(PhpParseError::UnexpectedEnd)?;
    if pos == 0 {
        return Err(PhpParseError::BadLength);
    }
    let len = std::str::from_utf8(&input[..pos])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or(PhpParseError::BadLength)?;
    Ok((len, &input[pos..]))
}
