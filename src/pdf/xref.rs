//! Cross-reference discovery: classic tables, xref streams, the trailer
//! chain.
//!
//! Discovery starts from the `startxref` pointer near the end of the file.
//! Each section is either a traditional `xref` table (20-byte entries) or
//! an xref stream (`/Type /XRef`, field widths in `/W`, ranges in
//! `/Index`). Sections chain through `/Prev`; earlier sections only
//! supply entries later ones did not define.

use crate::error::{Error, Result};
use crate::pdf::decode;
use crate::pdf::lexer;
use crate::pdf::object::{find_subslice, parse_object, Dict, Object};
use std::collections::HashMap;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free entry
    Free,
    /// At a byte offset in the file
    Offset(u64),
    /// Inside an object stream: (stream object number, index within it)
    InStream(u32, u32),
}

/// The merged cross-reference table plus the newest trailer.
#[derive(Debug, Default)]
pub struct Xref {
    /// Object number to location
    pub entries: HashMap<u32, XrefEntry>,
    /// Trailer dictionary of the newest section (holds Root, Info,
    /// Encrypt, ID)
    pub trailer: Dict,
}

impl Xref {
    /// Look up an object's location.
    pub fn get(&self, num: u32) -> Option<XrefEntry> {
        self.entries.get(&num).copied()
    }
}

/// Locate `startxref` and parse the whole chain.
pub fn parse_xref(bytes: &[u8]) -> Result<Xref> {
    let start = find_startxref(bytes)?;
    let mut xref = Xref::default();
    let mut next = Some(start);
    let mut visited = Vec::new();

    while let Some(offset) = next {
        if visited.contains(&offset) {
            break; // cycle in Prev chain
        }
        visited.push(offset);
        if offset as usize >= bytes.len() {
            return Err(Error::InvalidPdf(format!("xref offset {} beyond EOF", offset)));
        }
        let section = &bytes[offset as usize..];
        let trailer = if lexer::skip_ws(section).starts_with(b"xref") {
            parse_table_section(section, &mut xref)?
        } else {
            parse_stream_section(section, &mut xref)?
        };
        if xref.trailer.is_empty() {
            xref.trailer = trailer.clone();
        }
        next = trailer.get("Prev").and_then(|p| p.as_int()).map(|v| v as u64);
        // Hybrid files point at a supplementary xref stream
        if let Some(stm) = trailer.get("XRefStm").and_then(|p| p.as_int()) {
            if (stm as usize) < bytes.len() {
                let _ = parse_stream_section(&bytes[stm as usize..], &mut xref);
            }
        }
    }

    if xref.entries.is_empty() {
        return Err(Error::InvalidPdf("empty cross-reference table".to_string()));
    }
    Ok(xref)
}

/// Scan backwards for the `startxref` keyword and read the offset after it.
pub fn find_startxref(bytes: &[u8]) -> Result<u64> {
    let window = &bytes[bytes.len().saturating_sub(1024)..];
    let pos = window
        .windows(b"startxref".len())
        .rposition(|w| w == b"startxref")
        .ok_or_else(|| Error::InvalidPdf("startxref keyword not found".to_string()))?;
    let after = lexer::skip_ws(&window[pos + b"startxref".len()..]);
    let digits: Vec<u8> = after.iter().copied().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(Error::InvalidPdf("startxref is not followed by an offset".to_string()));
    }
    String::from_utf8_lossy(&digits)
        .parse::<u64>()
        .map_err(|_| Error::InvalidPdf("malformed startxref offset".to_string()))
}

/// Parse a traditional `xref` table and its trailing `trailer` dictionary.
fn parse_table_section(section: &[u8], xref: &mut Xref) -> Result<Dict> {
    let mut rest = lexer::skip_ws(section);
    rest = rest.strip_prefix(b"xref".as_slice()).unwrap_or(rest);

    loop {
        rest = lexer::skip_ws(rest);
        if rest.starts_with(b"trailer") {
            let (obj, _) = parse_object(&rest[b"trailer".len()..])?;
            return match obj {
                Object::Dictionary(d) => Ok(d),
                other => Err(Error::InvalidObjectType {
                    expected: "Dictionary".to_string(),
                    found: other.type_name().to_string(),
                }),
            };
        }
        // Subsection header: `first count`
        let (after_first, first) = read_int(rest)?;
        let (after_count, count) = read_int(after_first)?;
        rest = lexer::skip_ws(after_count);
        for i in 0..count {
            if rest.len() < 18 {
                return Err(Error::InvalidPdf("truncated xref entry".to_string()));
            }
            // 10-digit offset, 5-digit generation, f|n
            let entry = &rest[..20.min(rest.len())];
            let offset: u64 = String::from_utf8_lossy(&entry[0..10])
                .trim()
                .parse()
                .map_err(|_| Error::InvalidPdf("malformed xref offset field".to_string()))?;
            let kind = entry[17];
            let num = (first + i) as u32;
            xref.entries.entry(num).or_insert(match kind {
                b'f' => XrefEntry::Free,
                _ => XrefEntry::Offset(offset),
            });
            let consumed = entry_length(entry);
            rest = &rest[consumed..];
        }
    }
}

/// Entries are nominally 20 bytes but some producers use 19 (single EOL).
fn entry_length(entry: &[u8]) -> usize {
    if entry.len() >= 20 && (entry[19] == b'\n' || entry[19] == b'\r') {
        20
    } else {
        19.min(entry.len())
    }
}

fn read_int(input: &[u8]) -> Result<(&[u8], i64)> {
    let input = lexer::skip_ws(input);
    let digits: Vec<u8> = input.iter().copied().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(Error::InvalidPdf("expected integer in xref section".to_string()));
    }
    let value = String::from_utf8_lossy(&digits)
        .parse()
        .map_err(|_| Error::InvalidPdf("malformed integer in xref section".to_string()))?;
    Ok((&input[digits.len()..], value))
}

/// Parse an xref stream section (`N G obj << /Type /XRef ... >> stream`).
fn parse_stream_section(section: &[u8], xref: &mut Xref) -> Result<Dict> {
    // Skip the `N G obj` header
    let rest = lexer::skip_ws(section);
    let (rest, _num) = read_int(rest)?;
    let (rest, _gen) = read_int(rest)?;
    let rest = lexer::skip_ws(rest);
    let rest = rest.strip_prefix(b"obj".as_slice()).ok_or_else(|| {
        Error::InvalidPdf("xref offset does not point at an object".to_string())
    })?;

    let (stream, _) = parse_object(rest)?;
    let dict = stream
        .as_dict()
        .cloned()
        .ok_or_else(|| Error::InvalidPdf("xref stream has no dictionary".to_string()))?;
    let data = decode::decode_stream(&stream)?;

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|w| w.as_array().map(|a| {
            a.iter().filter_map(|o| o.as_int()).map(|v| v as usize).collect()
        }))
        .ok_or_else(|| Error::InvalidPdf("xref stream missing /W".to_string()))?;
    if widths.len() < 3 {
        return Err(Error::InvalidPdf("xref stream /W must have three fields".to_string()));
    }
    let size = dict.get("Size").and_then(|s| s.as_int()).unwrap_or(0);
    let index: Vec<i64> = dict
        .get("Index")
        .and_then(|i| i.as_array().map(|a| a.iter().filter_map(|o| o.as_int()).collect()))
        .unwrap_or_else(|| vec![0, size]);

    let entry_len: usize = widths.iter().sum();
    if entry_len == 0 {
        return Err(Error::InvalidPdf("xref stream has zero-width entries".to_string()));
    }
    let mut cursor = 0usize;
    for range in index.chunks(2) {
        if range.len() < 2 {
            break;
        }
        let (first, count) = (range[0], range[1]);
        for i in 0..count {
            if cursor + entry_len > data.len() {
                break;
            }
            let raw = &data[cursor..cursor + entry_len];
            cursor += entry_len;
            let field = |start: usize, len: usize| -> u64 {
                use byteorder::{BigEndian, ByteOrder};
                match len {
                    2 => BigEndian::read_u16(&raw[start..start + 2]) as u64,
                    4 => BigEndian::read_u32(&raw[start..start + 4]) as u64,
                    8 => BigEndian::read_u64(&raw[start..start + 8]),
                    // Odd widths (1- and 3-byte fields are common) fold up
                    _ => raw[start..start + len]
                        .iter()
                        .fold(0u64, |acc, &b| (acc << 8) | b as u64),
                }
            };
            // A zero-width type field defaults to type 1
            let kind = if widths[0] == 0 { 1 } else { field(0, widths[0]) };
            let f2 = field(widths[0], widths[1]);
            let f3 = field(widths[0] + widths[1], widths[2]);
            let num = (first + i) as u32;
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::Offset(f2),
                2 => XrefEntry::InStream(f2 as u32, f3 as u32),
                _ => continue,
            };
            xref.entries.entry(num).or_insert(entry);
        }
    }
    Ok(dict)
}
