//! PDF objects and the object parser.
//!
//! Builds on the tokenizer: dictionaries, arrays, indirect references and
//! stream payloads. Stream data is kept raw here; filters are applied by
//! [`crate::pdf::decode`] once the document's encryption state is known.

use crate::error::{Error, Result};
use crate::pdf::lexer::{self, Token};
use bytes::Bytes;
use std::collections::HashMap;

/// Dictionary type used throughout the PDF reader.
pub type Dict = HashMap<String, Object>;

/// Reference to an indirect object (`10 0 R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    /// Object number
    pub num: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjRef {
    /// Create a reference.
    pub fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

impl std::fmt::Display for ObjRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.num, self.gen)
    }
}

/// A PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// `null`
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i64),
    /// Real
    Real(f64),
    /// String, escapes and hex already decoded to bytes
    String(Vec<u8>),
    /// Name without the leading slash
    Name(String),
    /// Array
    Array(Vec<Object>),
    /// Dictionary
    Dictionary(Dict),
    /// Stream: dictionary plus raw (undecoded) payload
    Stream {
        /// The stream dictionary
        dict: Dict,
        /// Raw payload between `stream` and `endstream`
        data: Bytes,
    },
    /// Indirect reference
    Reference(ObjRef),
}

impl Object {
    /// Human-readable type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// As integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// As a number (integer or real).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// As name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// As string bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// As array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// As dictionary; streams expose their dictionary too.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// As reference.
    pub fn as_ref(&self) -> Option<ObjRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// As boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The filter names of a stream, normalized to a list.
    pub fn filters(&self) -> Vec<String> {
        let dict = match self.as_dict() {
            Some(d) => d,
            None => return Vec::new(),
        };
        match dict.get("Filter") {
            Some(Object::Name(n)) => vec![n.clone()],
            Some(Object::Array(a)) => {
                a.iter().filter_map(|o| o.as_name().map(|s| s.to_string())).collect()
            },
            _ => Vec::new(),
        }
    }
}

/// Parse one object from the input, returning it with the remaining bytes.
///
/// Handles the `N G R` lookahead for references and the `stream` keyword
/// for stream payloads.
pub fn parse_object(input: &[u8]) -> Result<(Object, &[u8])> {
    let (rest, tok) = lexer::token(input).map_err(|_| parse_error(input))?;
    match tok {
        Token::Null => Ok((Object::Null, rest)),
        Token::True => Ok((Object::Boolean(true), rest)),
        Token::False => Ok((Object::Boolean(false), rest)),
        Token::Real(r) => Ok((Object::Real(r), rest)),
        Token::Integer(first) => parse_after_integer(first, rest),
        Token::LiteralString(raw) => Ok((Object::String(lexer::unescape_literal(raw)), rest)),
        Token::HexString(raw) => Ok((Object::String(lexer::decode_hex(raw)), rest)),
        Token::Name(n) => Ok((Object::Name(n), rest)),
        Token::ArrayStart => parse_array(rest),
        Token::DictStart => parse_dict(rest),
        _ => Err(parse_error(input)),
    }
}

/// `N` may begin `N G R`; roll back unless the next two tokens complete a
/// reference.
fn parse_after_integer(first: i64, rest: &[u8]) -> Result<(Object, &[u8])> {
    if first >= 0 {
        if let Ok((rest2, Token::Integer(gen))) = lexer::token(rest) {
            if (0..=u16::MAX as i64).contains(&gen) {
                if let Ok((rest3, Token::RefMarker)) = lexer::token(rest2) {
                    return Ok((
                        Object::Reference(ObjRef::new(first as u32, gen as u16)),
                        rest3,
                    ));
                }
            }
        }
    }
    Ok((Object::Integer(first), rest))
}

fn parse_array(mut input: &[u8]) -> Result<(Object, &[u8])> {
    let mut items = Vec::new();
    loop {
        if let Ok((rest, Token::ArrayEnd)) = lexer::token(input) {
            return Ok((Object::Array(items), rest));
        }
        let (obj, rest) = parse_object(input)?;
        items.push(obj);
        input = rest;
    }
}

fn parse_dict(mut input: &[u8]) -> Result<(Object, &[u8])> {
    let mut dict = Dict::new();
    loop {
        match lexer::token(input) {
            Ok((rest, Token::DictEnd)) => {
                // A stream keyword after the dictionary introduces a payload
                if let Ok((after_kw, Token::StreamStart)) = lexer::token(rest) {
                    return parse_stream_payload(dict, after_kw);
                }
                return Ok((Object::Dictionary(dict), rest));
            },
            Ok((rest, Token::Name(key))) => {
                let (value, rest) = parse_object(rest)?;
                dict.insert(key, value);
                input = rest;
            },
            _ => return Err(parse_error(input)),
        }
    }
}

/// Slice out the bytes between `stream` and `endstream`.
///
/// The standard single EOL after the keyword is skipped. When the Length
/// entry is a direct integer that lands in-bounds it wins; otherwise the
/// payload is found by scanning for `endstream`.
fn parse_stream_payload(dict: Dict, input: &[u8]) -> Result<(Object, &[u8])> {
    let mut data_start = 0usize;
    if input.get(data_start) == Some(&b'\r') {
        data_start += 1;
    }
    if input.get(data_start) == Some(&b'\n') {
        data_start += 1;
    }
    let body = &input[data_start..];

    let by_length = dict
        .get("Length")
        .and_then(|l| l.as_int())
        .and_then(|len| {
            let len = len as usize;
            if len <= body.len() {
                let tail = lexer::skip_ws(&body[len..]);
                if tail.starts_with(b"endstream") {
                    return Some(len);
                }
            }
            None
        });

    let data_len = match by_length {
        Some(len) => len,
        None => {
            let pos = find_subslice(body, b"endstream").ok_or_else(|| {
                Error::InvalidPdf("unterminated stream: no endstream keyword".to_string())
            })?;
            // Trim the EOL that precedes endstream
            let mut end = pos;
            if end > 0 && body[end - 1] == b'\n' {
                end -= 1;
            }
            if end > 0 && body[end - 1] == b'\r' {
                end -= 1;
            }
            end
        },
    };

    let after = &body[data_len..];
    let after = lexer::skip_ws(after);
    let after = after.strip_prefix(b"endstream".as_slice()).unwrap_or(after);
    Ok((
        Object::Stream {
            dict,
            data: Bytes::copy_from_slice(&body[..data_len]),
        },
        after,
    ))
}

/// Find the first occurrence of `needle` in `haystack`.
pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_error(input: &[u8]) -> Error {
    let preview: String = String::from_utf8_lossy(&input[..input.len().min(24)]).into_owned();
    Error::InvalidPdf(format!("cannot parse object near '{}'", preview))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_object(b"null").unwrap().0, Object::Null);
        assert_eq!(parse_object(b"true").unwrap().0, Object::Boolean(true));
        assert_eq!(parse_object(b"42").unwrap().0, Object::Integer(42));
        assert_eq!(parse_object(b"-2.5").unwrap().0, Object::Real(-2.5));
        assert_eq!(parse_object(b"/Type").unwrap().0, Object::Name("Type".to_string()));
    }

    #[test]
    fn test_parse_strings_decode() {
        assert_eq!(
            parse_object(b"(Line1\\nLine2)").unwrap().0,
            Object::String(b"Line1\nLine2".to_vec())
        );
        assert_eq!(parse_object(b"<48656C6C6F>").unwrap().0, Object::String(b"Hello".to_vec()));
    }

    #[test]
    fn test_parse_reference_lookahead() {
        assert_eq!(parse_object(b"10 0 R").unwrap().0, Object::Reference(ObjRef::new(10, 0)));
        // Two integers without R stay separate
        let (obj, rest) = parse_object(b"10 20 30").unwrap();
        assert_eq!(obj, Object::Integer(10));
        let (obj, _) = parse_object(rest).unwrap();
        assert_eq!(obj, Object::Integer(20));
    }

    #[test]
    fn test_parse_array_mixed() {
        let (obj, _) = parse_object(b"[1 (two) /Three 4 0 R]").unwrap();
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 4);
        assert_eq!(arr[3], Object::Reference(ObjRef::new(4, 0)));
    }

    #[test]
    fn test_parse_nested_dict() {
        let (obj, _) =
            parse_object(b"<< /Type /Page /Resources << /Font << /F1 5 0 R >> >> >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Page"));
        let resources = dict.get("Resources").unwrap().as_dict().unwrap();
        assert!(resources.get("Font").unwrap().as_dict().unwrap().contains_key("F1"));
    }

    #[test]
    fn test_parse_stream_with_length() {
        let input = b"<< /Length 5 >>\nstream\nHello\nendstream rest";
        let (obj, rest) = parse_object(input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Hello"),
            other => panic!("expected stream, got {}", other.type_name()),
        }
        assert_eq!(lexer::skip_ws(rest), b"rest");
    }

    #[test]
    fn test_parse_stream_bad_length_falls_back_to_scan() {
        let input = b"<< /Length 9999 >>\nstream\nHello\nendstream";
        let (obj, _) = parse_object(input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Hello"),
            other => panic!("expected stream, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_filters_normalization() {
        let (single, _) = parse_object(b"<< /Filter /FlateDecode >>").unwrap();
        assert_eq!(single.filters(), vec!["FlateDecode"]);
        let (multi, _) = parse_object(b"<< /Filter [/ASCII85Decode /FlateDecode] >>").unwrap();
        assert_eq!(multi.filters(), vec!["ASCII85Decode", "FlateDecode"]);
        let (none, _) = parse_object(b"<< >>").unwrap();
        assert!(none.filters().is_empty());
    }

    #[test]
    fn test_objref_display() {
        assert_eq!(format!("{}", ObjRef::new(7, 1)), "7 1 R");
    }
}
