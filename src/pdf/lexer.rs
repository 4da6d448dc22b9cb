//! PDF tokenizer.
//!
//! Low-level tokenization of PDF byte streams: numbers, strings, names,
//! keywords and delimiters. Whitespace (space, \t, \r, \n, \0, \f) and
//! comments (% to end of line) are skipped between tokens. Escape
//! sequences inside literal strings are NOT decoded here; the object
//! parser owns that.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, value},
    sequence::{delimited, preceded},
    IResult,
};

/// One lexical token.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (42, -123, +17)
    Integer(i64),
    /// Real number (3.14, -.002, 5.)
    Real(f64),
    /// Raw bytes of a literal string, escapes intact
    LiteralString(&'a [u8]),
    /// Raw hex digits of a hex string, whitespace intact
    HexString(&'a [u8]),
    /// Name with `#XX` escapes decoded (`/A#20B` → `A B`)
    Name(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `obj`
    ObjStart,
    /// `endobj`
    ObjEnd,
    /// `stream`
    StreamStart,
    /// `endstream`
    StreamEnd,
    /// The reference marker in `10 0 R`
    RefMarker,
}

/// Is `c` PDF whitespace (ISO 32000-1, Table 1)?
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// Is `c` a PDF delimiter character?
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Skip whitespace and `%` comments; always succeeds.
pub fn skip_ws(input: &[u8]) -> &[u8] {
    let mut rest = input;
    loop {
        let trimmed = match rest.iter().position(|&c| !is_whitespace(c)) {
            Some(n) => &rest[n..],
            None => &rest[rest.len()..],
        };
        if trimmed.first() == Some(&b'%') {
            let end = trimmed
                .iter()
                .position(|&c| c == b'\r' || c == b'\n')
                .unwrap_or(trimmed.len());
            rest = &trimmed[end..];
        } else {
            return trimmed;
        }
    }
}

fn number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, sign) = opt(one_of("+-"))(input)?;
    let (rest, int_part) = opt(digit1)(rest)?;
    let (rest, frac_part) = opt(preceded(char('.'), opt(digit1)))(rest)?;
    if int_part.is_none() && frac_part.is_none() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)));
    }

    let int_str = int_part.map(|b| std::str::from_utf8(b).unwrap_or("0")).unwrap_or("0");
    match frac_part {
        None => {
            let mut n: i64 = int_str.parse().map_err(|_| {
                nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
            })?;
            if sign == Some('-') {
                n = -n;
            }
            Ok((rest, Token::Integer(n)))
        },
        Some(frac) => {
            let frac_str = frac.map(|b| std::str::from_utf8(b).unwrap_or("0")).unwrap_or("0");
            let mut n: f64 = format!("{}.{}", int_str, frac_str).parse().map_err(|_| {
                nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
            })?;
            if sign == Some('-') {
                n = -n;
            }
            Ok((rest, Token::Real(n)))
        },
    }
}

/// Scan a literal string, honoring nested balanced parentheses and skipping
/// escape sequences (including 1-3 digit octal escapes).
fn literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0usize;
    while depth > 0 && pos < body.len() {
        match body[pos] {
            b'\\' => {
                pos += 1;
                if pos < body.len() && body[pos].is_ascii_digit() {
                    let mut digits = 0;
                    while digits < 3 && pos < body.len() && body[pos].is_ascii_digit() {
                        pos += 1;
                        digits += 1;
                    }
                } else {
                    pos += 1;
                }
            },
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                pos += 1;
            },
            _ => pos += 1,
        }
    }
    if depth != 0 {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    Ok((&body[pos..], Token::LiteralString(&body[..pos - 1])))
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    // `<<` opens a dictionary, not a hex string
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    delimited(
        char('<'),
        map(
            take_while(|c: u8| c.is_ascii_hexdigit() || c.is_ascii_whitespace()),
            Token::HexString,
        ),
        char('>'),
    )(input)
}

/// Decode the `#XX` escapes a name may carry (ISO 32000-1, 7.3.5).
/// Malformed escapes are kept literally.
pub fn decode_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '#' {
            out.push(c);
            continue;
        }
        let mut clone = chars.clone();
        match (clone.next(), clone.next()) {
            (Some(h1), Some(h2)) => {
                match u8::from_str_radix(&format!("{}{}", h1, h2), 16) {
                    Ok(byte) => {
                        out.push(byte as char);
                        chars = clone;
                    },
                    Err(_) => out.push('#'),
                }
            },
            _ => out.push('#'),
        }
    }
    out
}

fn name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(
            take_while(|c: u8| !is_whitespace(c) && !is_delimiter(c)),
            |bytes: &[u8]| Token::Name(decode_name(std::str::from_utf8(bytes).unwrap_or(""))),
        ),
    )(input)
}

fn keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::False, tag(b"false")),
        value(Token::True, tag(b"true")),
        value(Token::Null, tag(b"null")),
        value(Token::ObjEnd, tag(b"endobj")),
        value(Token::ObjStart, tag(b"obj")),
        // "endstream" must win over "stream"
        value(Token::StreamEnd, tag(b"endstream")),
        value(Token::StreamStart, tag(b"stream")),
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
        value(Token::RefMarker, tag(b"R")),
    ))(input)
}

/// Read the next token, skipping leading whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((keyword, name, number, literal_string, hex_string))(input)
}

/// Read the next content-stream operand or operator word.
///
/// Content streams interleave tokens with operator keywords (`Tj`, `re`,
/// `cm`). A word is any run of regular characters that is not a number.
pub fn operator_word(input: &[u8]) -> IResult<&[u8], &str> {
    let input = skip_ws(input);
    let (rest, word) = take_while(|c: u8| !is_whitespace(c) && !is_delimiter(c))(input)?;
    if word.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Alpha)));
    }
    Ok((rest, std::str::from_utf8(word).unwrap_or("")))
}

/// Decode the escape sequences of a literal string body (7.3.4.2).
pub fn unescape_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        i += 1;
        if i >= raw.len() {
            break;
        }
        match raw[i] {
            b'n' => {
                out.push(b'\n');
                i += 1;
            },
            b'r' => {
                out.push(b'\r');
                i += 1;
            },
            b't' => {
                out.push(b'\t');
                i += 1;
            },
            b'b' => {
                out.push(0x08);
                i += 1;
            },
            b'f' => {
                out.push(0x0C);
                i += 1;
            },
            b'(' | b')' | b'\\' => {
                out.push(raw[i]);
                i += 1;
            },
            b'\r' => {
                // Line continuation: swallow CR and an optional LF
                i += 1;
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'\n' => i += 1,
            c if c.is_ascii_digit() => {
                let mut value = 0u16;
                let mut digits = 0;
                while digits < 3 && i < raw.len() && raw[i].is_ascii_digit() {
                    value = value * 8 + (raw[i] - b'0') as u16;
                    i += 1;
                    digits += 1;
                }
                out.push((value & 0xFF) as u8);
            },
            c => {
                // Unknown escape: the backslash is dropped
                out.push(c);
                i += 1;
            },
        }
    }
    out
}

/// Decode a hex string body into bytes; an odd final digit is padded with 0.
pub fn decode_hex(raw: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = raw.iter().copied().filter(|c| c.is_ascii_hexdigit()).collect();
    let mut out = Vec::with_capacity(digits.len().div_ceil(2));
    for pair in digits.chunks(2) {
        let hi = (pair[0] as char).to_digit(16).unwrap_or(0) as u8;
        let lo = if pair.len() == 2 {
            (pair[1] as char).to_digit(16).unwrap_or(0) as u8
        } else {
            0
        };
        out.push((hi << 4) | lo);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_and_reals() {
        assert_eq!(token(b"42").unwrap().1, Token::Integer(42));
        assert_eq!(token(b"-123").unwrap().1, Token::Integer(-123));
        assert_eq!(token(b"+17").unwrap().1, Token::Integer(17));
        assert_eq!(token(b"-.002").unwrap().1, Token::Real(-0.002));
        assert_eq!(token(b".5").unwrap().1, Token::Real(0.5));
        assert_eq!(token(b"5.").unwrap().1, Token::Real(5.0));
    }

    #[test]
    fn test_literal_string_nesting_and_escapes() {
        assert_eq!(token(b"(Hello)").unwrap().1, Token::LiteralString(b"Hello"));
        assert_eq!(token(b"(a (b) c)").unwrap().1, Token::LiteralString(b"a (b) c"));
        assert_eq!(token(b"(x \\) y)").unwrap().1, Token::LiteralString(b"x \\) y"));
        assert_eq!(token(b"()").unwrap().1, Token::LiteralString(b""));
    }

    #[test]
    fn test_hex_string_vs_dict() {
        assert_eq!(token(b"<48656C6C6F>").unwrap().1, Token::HexString(b"48656C6C6F"));
        assert_eq!(token(b"<<").unwrap().1, Token::DictStart);
    }

    #[test]
    fn test_names_with_escapes() {
        assert_eq!(token(b"/Type").unwrap().1, Token::Name("Type".to_string()));
        assert_eq!(token(b"/A#20B").unwrap().1, Token::Name("A B".to_string()));
        assert_eq!(token(b"/A#ZZ").unwrap().1, Token::Name("A#ZZ".to_string()));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(token(b"true").unwrap().1, Token::True);
        assert_eq!(token(b"endstream").unwrap().1, Token::StreamEnd);
        assert_eq!(token(b"stream").unwrap().1, Token::StreamStart);
        assert_eq!(token(b"endobj").unwrap().1, Token::ObjEnd);
        assert_eq!(token(b"R").unwrap().1, Token::RefMarker);
    }

    #[test]
    fn test_comments_and_whitespace_skipped() {
        assert_eq!(token(b"  % note\n 42").unwrap().1, Token::Integer(42));
        assert_eq!(skip_ws(b"% only a comment"), b"");
    }

    #[test]
    fn test_unescape_literal() {
        assert_eq!(unescape_literal(b"Line1\\nLine2"), b"Line1\nLine2");
        assert_eq!(unescape_literal(b"\\(paren\\)"), b"(paren)");
        assert_eq!(unescape_literal(b"\\101"), b"A");
        assert_eq!(unescape_literal(b"\\53"), b"+");
        assert_eq!(unescape_literal(b"a\\\r\nb"), b"ab");
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex(b"48656C6C6F"), b"Hello");
        assert_eq!(decode_hex(b"48 65 6C"), vec![0x48, 0x65, 0x6C]);
        assert_eq!(decode_hex(b"901FA"), vec![0x90, 0x1F, 0xA0]); // odd digit padded
    }

    #[test]
    fn test_operator_word() {
        let (rest, word) = operator_word(b" Tj 5").unwrap();
        assert_eq!(word, "Tj");
        assert_eq!(rest, b" 5");
        let (_, word) = operator_word(b"T*").unwrap();
        assert_eq!(word, "T*");
    }

    #[test]
    fn test_obj_snippet() {
        let input = b"1 0 obj << /Type /Catalog >> endobj";
        let (rest, t) = token(input).unwrap();
        assert_eq!(t, Token::Integer(1));
        let (rest, t) = token(rest).unwrap();
        assert_eq!(t, Token::Integer(0));
        let (rest, t) = token(rest).unwrap();
        assert_eq!(t, Token::ObjStart);
        let (rest, t) = token(rest).unwrap();
        assert_eq!(t, Token::DictStart);
        let (rest, t) = token(rest).unwrap();
        assert_eq!(t, Token::Name("Type".to_string()));
        let (rest, t) = token(rest).unwrap();
        assert_eq!(t, Token::Name("Catalog".to_string()));
        let (rest, t) = token(rest).unwrap();
        assert_eq!(t, Token::DictEnd);
        let (_, t) = token(rest).unwrap();
        assert_eq!(t, Token::ObjEnd);
    }
}
