//! Font handling for text extraction: encodings, ToUnicode CMaps and
//! glyph widths.
//!
//! Character-to-Unicode resolution order for a simple font: the encoding's
//! `Differences` array (glyph names), then the base encoding
//! (WinAnsi/MacRoman/Standard), then Latin-1. A Type0 font consumes
//! two-byte CIDs (Identity-H) and maps them through its ToUnicode CMap
//! when one is present.

use crate::pdf::lexer;
use crate::pdf::object::{Dict, Object};
use std::collections::HashMap;

/// A subset of the Adobe Glyph List covering the standard Latin set, the
/// Latin-1 supplement and common typographic/currency glyphs.
static GLYPH_NAMES: phf::Map<&'static str, char> = phf::phf_map! {
    "space" => ' ', "exclam" => '!', "quotedbl" => '"', "numbersign" => '#',
    "dollar" => '$', "percent" => '%', "ampersand" => '&', "quotesingle" => '\'',
    "parenleft" => '(', "parenright" => ')', "asterisk" => '*', "plus" => '+',
    "comma" => ',', "hyphen" => '-', "period" => '.', "slash" => '/',
    "zero" => '0', "one" => '1', "two" => '2', "three" => '3', "four" => '4',
    "five" => '5', "six" => '6', "seven" => '7', "eight" => '8', "nine" => '9',
    "colon" => ':', "semicolon" => ';', "less" => '<', "equal" => '=',
    "greater" => '>', "question" => '?', "at" => '@',
    "A" => 'A', "B" => 'B', "C" => 'C', "D" => 'D', "E" => 'E', "F" => 'F',
    "G" => 'G', "H" => 'H', "I" => 'I', "J" => 'J', "K" => 'K', "L" => 'L',
    "M" => 'M', "N" => 'N', "O" => 'O', "P" => 'P', "Q" => 'Q', "R" => 'R',
    "S" => 'S', "T" => 'T', "U" => 'U', "V" => 'V', "W" => 'W', "X" => 'X',
    "Y" => 'Y', "Z" => 'Z',
    "bracketleft" => '[', "backslash" => '\\', "bracketright" => ']',
    "asciicircum" => '^', "underscore" => '_', "grave" => '`',
    "a" => 'a', "b" => 'b', "c" => 'c', "d" => 'd', "e" => 'e', "f" => 'f',
    "g" => 'g', "h" => 'h', "i" => 'i', "j" => 'j', "k" => 'k', "l" => 'l',
    "m" => 'm', "n" => 'n', "o" => 'o', "p" => 'p', "q" => 'q', "r" => 'r',
    "s" => 's', "t" => 't', "u" => 'u', "v" => 'v', "w" => 'w', "x" => 'x',
    "y" => 'y', "z" => 'z',
    "braceleft" => '{', "bar" => '|', "braceright" => '}', "asciitilde" => '~',
    // Latin-1 supplement
    "exclamdown" => '¡', "cent" => '¢', "sterling" => '£', "currency" => '¤',
    "yen" => '¥', "brokenbar" => '¦', "section" => '§', "dieresis" => '¨',
    "copyright" => '©', "ordfeminine" => 'ª', "guillemotleft" => '«',
    "logicalnot" => '¬', "registered" => '®', "macron" => '¯', "degree" => '°',
    "plusminus" => '±', "acute" => '´', "mu" => 'µ', "paragraph" => '¶',
    "periodcentered" => '·', "cedilla" => '¸', "ordmasculine" => 'º',
    "guillemotright" => '»', "onequarter" => '¼', "onehalf" => '½',
    "threequarters" => '¾', "questiondown" => '¿',
    "Agrave" => 'À', "Aacute" => 'Á', "Acircumflex" => 'Â', "Atilde" => 'Ã',
    "Adieresis" => 'Ä', "Aring" => 'Å', "AE" => 'Æ', "Ccedilla" => 'Ç',
    "Egrave" => 'È', "Eacute" => 'É', "Ecircumflex" => 'Ê', "Edieresis" => 'Ë',
    "Igrave" => 'Ì', "Iacute" => 'Í', "Icircumflex" => 'Î', "Idieresis" => 'Ï',
    "Eth" => 'Ð', "Ntilde" => 'Ñ', "Ograve" => 'Ò', "Oacute" => 'Ó',
    "Ocircumflex" => 'Ô', "Otilde" => 'Õ', "Odieresis" => 'Ö', "multiply" => '×',
    "Oslash" => 'Ø', "Ugrave" => 'Ù', "Uacute" => 'Ú', "Ucircumflex" => 'Û',
    "Udieresis" => 'Ü', "Yacute" => 'Ý', "Thorn" => 'Þ', "germandbls" => 'ß',
    "agrave" => 'à', "aacute" => 'á', "acircumflex" => 'â', "atilde" => 'ã',
    "adieresis" => 'ä', "aring" => 'å', "ae" => 'æ', "ccedilla" => 'ç',
    "egrave" => 'è', "eacute" => 'é', "ecircumflex" => 'ê', "edieresis" => 'ë',
    "igrave" => 'ì', "iacute" => 'í', "icircumflex" => 'î', "idieresis" => 'ï',
    "eth" => 'ð', "ntilde" => 'ñ', "ograve" => 'ò', "oacute" => 'ó',
    "ocircumflex" => 'ô', "otilde" => 'õ', "odieresis" => 'ö', "divide" => '÷',
    "oslash" => 'ø', "ugrave" => 'ù', "uacute" => 'ú', "ucircumflex" => 'û',
    "udieresis" => 'ü', "yacute" => 'ý', "thorn" => 'þ', "ydieresis" => 'ÿ',
    // Typographic and currency
    "bullet" => '•', "dagger" => '†', "daggerdbl" => '‡', "ellipsis" => '…',
    "emdash" => '—', "endash" => '–', "quoteleft" => '\u{2018}',
    "quoteright" => '\u{2019}', "quotedblleft" => '\u{201C}',
    "quotedblright" => '\u{201D}', "quotesinglbase" => '‚', "quotedblbase" => '„',
    "perthousand" => '‰', "guilsinglleft" => '‹', "guilsinglright" => '›',
    "fraction" => '⁄', "Euro" => '€', "trademark" => '™', "florin" => 'ƒ',
    "circumflex" => 'ˆ', "tilde" => '˜', "OE" => 'Œ', "oe" => 'œ',
    "Scaron" => 'Š', "scaron" => 'š', "Ydieresis" => 'Ÿ', "Zcaron" => 'Ž',
    "zcaron" => 'ž', "fi" => 'ﬁ', "fl" => 'ﬂ', "minus" => '−',
};

/// Resolve an Adobe glyph name to a character.
///
/// `uniXXXX` and `uXXXX[XX]` forms are decoded numerically; unknown names
/// yield `None`.
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    if let Some(c) = GLYPH_NAMES.get(name) {
        return Some(*c);
    }
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    None
}

/// WinAnsiEncoding (CP1252): Latin-1 with the 0x80–0x9F window remapped.
pub fn win_ansi_to_char(code: u8) -> Option<char> {
    match code {
        0x80 => Some('€'),
        0x82 => Some('‚'),
        0x83 => Some('ƒ'),
        0x84 => Some('„'),
        0x85 => Some('…'),
        0x86 => Some('†'),
        0x87 => Some('‡'),
        0x88 => Some('ˆ'),
        0x89 => Some('‰'),
        0x8A => Some('Š'),
        0x8B => Some('‹'),
        0x8C => Some('Œ'),
        0x8E => Some('Ž'),
        0x91 => Some('\u{2018}'),
        0x92 => Some('\u{2019}'),
        0x93 => Some('\u{201C}'),
        0x94 => Some('\u{201D}'),
        0x95 => Some('•'),
        0x96 => Some('–'),
        0x97 => Some('—'),
        0x98 => Some('˜'),
        0x99 => Some('™'),
        0x9A => Some('š'),
        0x9B => Some('›'),
        0x9C => Some('œ'),
        0x9E => Some('ž'),
        0x9F => Some('Ÿ'),
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D => None,
        c => char::from_u32(c as u32),
    }
}

/// Base encoding of a simple font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseEncoding {
    /// WinAnsiEncoding (CP1252)
    #[default]
    WinAnsi,
    /// MacRomanEncoding (approximated by the glyph table + Latin-1)
    MacRoman,
    /// StandardEncoding
    Standard,
}

/// Everything the interpreter needs to run one font.
#[derive(Debug, Clone, Default)]
pub struct PdfFont {
    /// BaseFont name (possibly subset-prefixed)
    pub base_font: String,
    /// True for Type0 composite fonts (two-byte codes)
    pub is_type0: bool,
    /// Base encoding for simple fonts
    pub base_encoding: BaseEncoding,
    /// `Differences` overrides: code to glyph name
    pub differences: HashMap<u8, String>,
    /// ToUnicode CMap: character code to replacement text
    pub to_unicode: HashMap<u32, String>,
    /// First code covered by `widths`
    pub first_char: u32,
    /// Glyph widths in thousandths of an em, indexed from `first_char`
    pub widths: Vec<f32>,
    /// Width used when a code is outside the table
    pub missing_width: f32,
    /// Type0 per-CID widths
    pub cid_widths: HashMap<u32, f32>,
    /// Type0 default width (`/DW`)
    pub default_width: f32,
}

impl PdfFont {
    /// Build from a font dictionary; `resolve` chases indirect references
    /// and `load_stream` fetches and decodes a stream's payload.
    pub fn from_dict(
        dict: &Dict,
        resolve: &dyn Fn(&Object) -> Option<Object>,
        load_stream: &dyn Fn(&Object) -> Option<Vec<u8>>,
    ) -> Self {
        let mut font = PdfFont {
            base_font: dict
                .get("BaseFont")
                .and_then(|o| o.as_name())
                .unwrap_or_default()
                .to_string(),
            default_width: 1000.0,
            missing_width: 500.0,
            ..Default::default()
        };

        let subtype = dict.get("Subtype").and_then(|o| o.as_name()).unwrap_or("");
        font.is_type0 = subtype == "Type0";

        if font.is_type0 {
            // Metrics live on the descendant CIDFont
            if let Some(descendant) = dict
                .get("DescendantFonts")
                .and_then(|o| resolve(o))
                .and_then(|o| o.as_array().and_then(|a| a.first().cloned()))
                .and_then(|o| resolve(&o))
                .and_then(|o| o.as_dict().cloned())
            {
                if let Some(dw) = descendant.get("DW").and_then(|o| o.as_number()) {
                    font.default_width = dw as f32;
                }
                if let Some(w) = descendant.get("W").and_then(|o| resolve(o)) {
                    if let Some(array) = w.as_array() {
                        font.cid_widths = parse_cid_widths(array);
                    }
                }
            }
        } else {
            font.first_char = dict.get("FirstChar").and_then(|o| o.as_int()).unwrap_or(0) as u32;
            if let Some(widths) = dict.get("Widths").and_then(|o| resolve(o)) {
                if let Some(array) = widths.as_array() {
                    font.widths = array.iter().filter_map(|o| o.as_number()).map(|w| w as f32).collect();
                }
            }
            if let Some(descriptor) = dict
                .get("FontDescriptor")
                .and_then(|o| resolve(o))
                .and_then(|o| o.as_dict().cloned())
            {
                if let Some(mw) = descriptor.get("MissingWidth").and_then(|o| o.as_number()) {
                    font.missing_width = mw as f32;
                }
            }
            match dict.get("Encoding").and_then(|o| resolve(o)) {
                Some(Object::Name(name)) => font.base_encoding = base_encoding_from_name(&name),
                Some(Object::Dictionary(enc)) => {
                    if let Some(base) = enc.get("BaseEncoding").and_then(|o| o.as_name()) {
                        font.base_encoding = base_encoding_from_name(base);
                    }
                    if let Some(Object::Array(diffs)) = enc.get("Differences") {
                        font.differences = parse_differences(diffs);
                    }
                },
                _ => {},
            }
        }

        if let Some(cmap) = dict.get("ToUnicode").and_then(|o| resolve(o)) {
            if let Some(data) = load_stream(&cmap) {
                font.to_unicode = parse_to_unicode(&data);
            }
        }

        font
    }

    /// Decode a shown string into `(code, text)` pairs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<(u32, String)> {
        if self.is_type0 {
            // Identity-H: two bytes per CID
            bytes
                .chunks(2)
                .map(|pair| {
                    let code = if pair.len() == 2 {
                        ((pair[0] as u32) << 8) | pair[1] as u32
                    } else {
                        pair[0] as u32
                    };
                    (code, self.code_to_text(code))
                })
                .collect()
        } else {
            bytes.iter().map(|&b| (b as u32, self.code_to_text(b as u32))).collect()
        }
    }

    fn code_to_text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        if !self.is_type0 {
            let byte = code as u8;
            if let Some(name) = self.differences.get(&byte) {
                if let Some(c) = glyph_name_to_char(name) {
                    return c.to_string();
                }
            }
            let mapped = match self.base_encoding {
                BaseEncoding::WinAnsi => win_ansi_to_char(byte),
                // Standard and MacRoman fall back to the Latin-1 window,
                // which covers the printable ASCII range both share
                BaseEncoding::MacRoman | BaseEncoding::Standard => char::from_u32(code),
            };
            if let Some(c) = mapped {
                return c.to_string();
            }
        }
        // Last resort: the raw code point
        char::from_u32(code).map(|c| c.to_string()).unwrap_or_default()
    }

    /// Width of a code in thousandths of an em.
    pub fn width(&self, code: u32) -> f32 {
        if self.is_type0 {
            return self.cid_widths.get(&code).copied().unwrap_or(self.default_width);
        }
        let index = code.wrapping_sub(self.first_char) as usize;
        self.widths.get(index).copied().filter(|w| *w > 0.0).unwrap_or(self.missing_width)
    }
}

fn base_encoding_from_name(name: &str) -> BaseEncoding {
    match name {
        "MacRomanEncoding" => BaseEncoding::MacRoman,
        "StandardEncoding" => BaseEncoding::Standard,
        _ => BaseEncoding::WinAnsi,
    }
}

/// `Differences` arrays alternate a start code with glyph names.
fn parse_differences(array: &[Object]) -> HashMap<u8, String> {
    let mut map = HashMap::new();
    let mut code = 0u32;
    for item in array {
        match item {
            Object::Integer(n) => code = *n as u32,
            Object::Name(name) => {
                if code <= 0xFF {
                    map.insert(code as u8, name.clone());
                }
                code += 1;
            },
            _ => {},
        }
    }
    map
}

/// Type0 `/W` arrays: `c [w1 w2 ...]` or `cFirst cLast w`.
fn parse_cid_widths(array: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < array.len() {
        let first = match array[i].as_int() {
            Some(n) => n as u32,
            None => break,
        };
        match array.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().filter_map(|o| o.as_number()).enumerate() {
                    widths.insert(first + offset as u32, w as f32);
                }
                i += 2;
            },
            Some(last_obj) => {
                let last = last_obj.as_int().unwrap_or(first as i64) as u32;
                let w = array.get(i + 2).and_then(|o| o.as_number()).unwrap_or(1000.0) as f32;
                for cid in first..=last {
                    widths.insert(cid, w);
                }
                i += 3;
            },
            None => break,
        }
    }
    widths
}

/// Parse a ToUnicode CMap: `beginbfchar`/`beginbfrange` sections.
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    let text = String::from_utf8_lossy(data);

    let mut rest = text.as_ref();
    while let Some(start) = rest.find("beginbfchar") {
        let body_start = start + "beginbfchar".len();
        let end = rest[body_start..].find("endbfchar").map(|e| body_start + e);
        let body = match end {
            Some(e) => &rest[body_start..e],
            None => break,
        };
        let hexes = collect_hex_strings(body);
        for pair in hexes.chunks(2) {
            if let [src, dst] = pair {
                if let Some(code) = hex_code(src) {
                    map.insert(code, utf16_be_to_string(dst));
                }
            }
        }
        rest = &rest[end.unwrap_or(rest.len())..];
    }

    let mut rest = text.as_ref();
    while let Some(start) = rest.find("beginbfrange") {
        let body_start = start + "beginbfrange".len();
        let end = rest[body_start..].find("endbfrange").map(|e| body_start + e);
        let body = match end {
            Some(e) => &rest[body_start..e],
            None => break,
        };
        let hexes = collect_hex_strings(body);
        for triple in hexes.chunks(3) {
            if let [lo, hi, dst] = triple {
                if let (Some(lo), Some(hi), Some(base)) =
                    (hex_code(lo), hex_code(hi), hex_code(dst))
                {
                    for (offset, code) in (lo..=hi).enumerate() {
                        if let Some(c) = char::from_u32(base + offset as u32) {
                            map.insert(code, c.to_string());
                        }
                    }
                }
            }
        }
        rest = &rest[end.unwrap_or(rest.len())..];
    }

    map
}

fn collect_hex_strings(body: &str) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            if let Some(end) = bytes[i + 1..].iter().position(|&c| c == b'>') {
                out.push(lexer::decode_hex(&bytes[i + 1..i + 1 + end]));
                i += end + 2;
                continue;
            }
        }
        i += 1;
    }
    out
}

fn hex_code(bytes: &[u8]) -> Option<u32> {
    match bytes.len() {
        1 => Some(bytes[0] as u32),
        2 => Some(((bytes[0] as u32) << 8) | bytes[1] as u32),
        4 => Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        _ => None,
    }
}

fn utf16_be_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
