//! Stream filters.
//!
//! FlateDecode, LZWDecode, ASCII85Decode and ASCIIHexDecode are decoded;
//! DCTDecode (JPEG) and JPXDecode (JPEG 2000) pass through so the image
//! layer can repackage them. A filter chain is applied left to right, and
//! the PNG predictor is reversed afterwards when `DecodeParms` asks for it.

use crate::error::{Error, Result};
use crate::pdf::object::{Dict, Object};
use std::io::Read;

/// Predictor parameters from a stream's `DecodeParms`.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10..15 = PNG)
    pub predictor: i64,
    /// Samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Extract predictor parameters from a `DecodeParms` dictionary.
    pub fn from_dict(dict: &Dict) -> Self {
        let int = |key: &str, default: i64| dict.get(key).and_then(|o| o.as_int()).unwrap_or(default);
        Self {
            predictor: int("Predictor", 1),
            columns: int("Columns", 1) as usize,
            colors: int("Colors", 1) as usize,
            bits_per_component: int("BitsPerComponent", 8) as usize,
        }
    }
}

/// Decode a stream object's payload through its filter chain.
pub fn decode_stream(stream: &Object) -> Result<Vec<u8>> {
    let (dict, data) = match stream {
        Object::Stream { dict, data } => (dict, data),
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };
    let params = match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(Object::Dictionary(d)) => Some(DecodeParams::from_dict(d)),
        Some(Object::Array(a)) => a
            .iter()
            .find_map(|o| o.as_dict())
            .map(DecodeParams::from_dict),
        _ => None,
    };
    decode_chain(data, &stream.filters(), params)
}

/// Apply a named filter chain left to right, then the optional predictor.
pub fn decode_chain(data: &[u8], filters: &[String], params: Option<DecodeParams>) -> Result<Vec<u8>> {
    let mut current = data.to_vec();
    for filter in filters {
        current = match filter.as_str() {
            "FlateDecode" | "Fl" => inflate(&current)?,
            "LZWDecode" | "LZW" => lzw(&current)?,
            "ASCII85Decode" | "A85" => ascii85(&current)?,
            "ASCIIHexDecode" | "AHx" => ascii_hex(&current)?,
            // Image codecs pass through; the image layer keeps them as-is
            "DCTDecode" | "DCT" | "JPXDecode" => current,
            other => return Err(Error::UnsupportedFilter(other.to_string())),
        };
    }
    if let Some(params) = params {
        if params.predictor > 1 {
            current = undo_predictor(&current, &params)?;
        }
    }
    Ok(current)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(_) => {
            // Some producers emit raw deflate without the zlib wrapper
            let mut out = Vec::new();
            flate2::read::DeflateDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| Error::Decode(format!("FlateDecode failed: {}", e)))?;
            Ok(out)
        },
    }
}

fn lzw(data: &[u8]) -> Result<Vec<u8>> {
    weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .decode(data)
        .map_err(|e| Error::Decode(format!("LZWDecode failed: {:?}", e)))
}

fn ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let end = data.iter().position(|&c| c == b'>').unwrap_or(data.len());
    Ok(crate::pdf::lexer::decode_hex(&data[..end]))
}

fn ascii85(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut filled = 0usize;
    let mut bytes = data.iter().copied().peekable();
    while let Some(c) = bytes.next() {
        match c {
            b'~' => break, // ~> terminator
            b'z' if filled == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[filled] = c - b'!';
                filled += 1;
                if filled == 5 {
                    let value = group.iter().fold(0u32, |acc, &d| {
                        acc.wrapping_mul(85).wrapping_add(d as u32)
                    });
                    out.extend_from_slice(&value.to_be_bytes());
                    filled = 0;
                }
            },
            c if c.is_ascii_whitespace() => {},
            _ => return Err(Error::Decode(format!("invalid ASCII85 byte 0x{:02X}", c))),
        }
    }
    if filled > 0 {
        // Final partial group: pad with 'u', keep filled-1 output bytes
        for slot in group.iter_mut().skip(filled) {
            *slot = 84;
        }
        let value = group.iter().fold(0u32, |acc, &d| acc.wrapping_mul(85).wrapping_add(d as u32));
        out.extend_from_slice(&value.to_be_bytes()[..filled - 1]);
    }
    Ok(out)
}

/// Reverse the PNG per-row predictor (predictors 10..=15) or the TIFF
/// horizontal predictor (2).
fn undo_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let bpp = (params.colors * params.bits_per_component).div_ceil(8).max(1);
    let row_len = (params.columns * params.colors * params.bits_per_component).div_ceil(8);

    if params.predictor == 2 {
        // TIFF horizontal differencing (8-bit components only)
        let mut out = data.to_vec();
        for row in out.chunks_mut(row_len) {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        return Ok(out);
    }

    // PNG predictors carry a per-row filter-type byte
    let stride = row_len + 1;
    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];
    for chunk in data.chunks(stride) {
        if chunk.len() < 2 {
            break;
        }
        let filter = chunk[0];
        let mut row = chunk[1..].to_vec();
        match filter {
            0 => {},
            1 => {
                for i in bpp..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            },
            2 => {
                for i in 0..row.len() {
                    row[i] = row[i].wrapping_add(previous[i]);
                }
            },
            3 => {
                for i in 0..row.len() {
                    let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                    let up = previous[i] as u16;
                    row[i] = row[i].wrapping_add(((left + up) / 2) as u8);
                }
            },
            4 => {
                for i in 0..row.len() {
                    let left = if i >= bpp { row[i - bpp] as i16 } else { 0 };
                    let up = previous[i] as i16;
                    let up_left = if i >= bpp { previous[i - bpp] as i16 } else { 0 };
                    let p = left + up - up_left;
                    let (pa, pb, pc) = ((p - left).abs(), (p - up).abs(), (p - up_left).abs());
                    let paeth = if pa <= pb && pa <= pc {
                        left
                    } else if pb <= pc {
                        up
                    } else {
                        up_left
                    };
                    row[i] = row[i].wrapping_add(paeth as u8);
                }
            },
            other => {
                return Err(Error::Decode(format!("unknown PNG predictor filter {}", other)))
            },
        }
        out.extend_from_slice(&row);
        previous = row;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_flate_round_trip() {
        let original = b"Hello, compressed world! Hello, compressed world!";
        let compressed = deflate(original);
        let decoded = decode_chain(&compressed, &["FlateDecode".to_string()], None).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_ascii_hex() {
        let decoded = decode_chain(b"48656C6C6F>", &["ASCIIHexDecode".to_string()], None).unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_ascii85_known_vector() {
        // 87cUR is the ASCII85 group for the four bytes "Hell"
        let decoded = decode_chain(b"87cUR~>", &["ASCII85Decode".to_string()], None).unwrap();
        assert_eq!(decoded, b"Hell");
    }

    #[test]
    fn test_ascii85_z_shortcut_and_partial() {
        let decoded = decode_chain(b"z~>", &["ASCII85Decode".to_string()], None).unwrap();
        assert_eq!(decoded, vec![0, 0, 0, 0]);
        // "/c" (2 chars) decodes to 1 byte
        let decoded = decode_chain(b"/c~>", &["ASCII85Decode".to_string()], None).unwrap();
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_chain_left_to_right() {
        // Hex-encoded zlib data: AHx first, then Flate
        let compressed = deflate(b"chained");
        let hex: String = compressed.iter().map(|b| format!("{:02X}", b)).collect();
        let filters = vec!["ASCIIHexDecode".to_string(), "FlateDecode".to_string()];
        let decoded = decode_chain(format!("{}>", hex).as_bytes(), &filters, None).unwrap();
        assert_eq!(decoded, b"chained");
    }

    #[test]
    fn test_dct_passes_through() {
        let jpeg_ish = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        let decoded = decode_chain(&jpeg_ish, &["DCTDecode".to_string()], None).unwrap();
        assert_eq!(decoded, jpeg_ish);
    }

    #[test]
    fn test_unsupported_filter() {
        let result = decode_chain(b"x", &["Crypt".to_string()], None);
        assert!(matches!(result, Err(Error::UnsupportedFilter(_))));
    }

    #[test]
    fn test_png_up_predictor() {
        // Two rows of 4 bytes, filter type 2 (Up)
        let row_len = 4;
        let raw = [
            0u8, 1, 2, 3, 4, // filter 0: literal
            2, 1, 1, 1, 1, // filter 2: add previous row
        ];
        let params = DecodeParams {
            predictor: 12,
            columns: row_len,
            colors: 1,
            bits_per_component: 8,
        };
        let decoded = undo_predictor(&raw, &params).unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 4, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decode_stream_object() {
        let compressed = deflate(b"payload");
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
        dict.insert("Length".to_string(), Object::Integer(compressed.len() as i64));
        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::from(compressed),
        };
        assert_eq!(decode_stream(&stream).unwrap(), b"payload");
    }
}
