//! Content-stream interpretation: the graphics-state machine, text matrix
//! algebra and item extraction.
//!
//! One page at a time: the decrypted, decompressed content stream plus the
//! page's fonts and image XObjects go in; positioned text, line segments
//! (candidate borders and dividers) and image placements come out.

use crate::pdf::fonts::PdfFont;
use crate::pdf::lexer::{self, Token};
use crate::pdf::object::Object;
use std::collections::HashMap;

/// A 2D transformation matrix `[a b 0; c d 0; e f 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scale
    pub a: f32,
    /// Skew
    pub b: f32,
    /// Skew
    pub c: f32,
    /// Vertical scale
    pub d: f32,
    /// Horizontal translation
    pub e: f32,
    /// Vertical translation
    pub f: f32,
}

impl Matrix {
    /// The identity matrix.
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// A translation matrix.
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self { e: tx, f: ty, ..Self::identity() }
    }

    /// `self · other` (apply `self` first, then `other`).
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// The graphics state pushed by `q` and popped by `Q`.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// Current transformation matrix
    pub ctm: Matrix,
    /// Fill color (RGB, 0..=1)
    pub fill: (f32, f32, f32),
    /// Stroke color (RGB, 0..=1)
    pub stroke: (f32, f32, f32),
    /// Selected font name
    pub font_name: String,
    /// Font size (Tf)
    pub font_size: f32,
    /// Character spacing (Tc)
    pub char_space: f32,
    /// Word spacing (Tw)
    pub word_space: f32,
    /// Horizontal scale percent (Tz)
    pub h_scale: f32,
    /// Leading (TL)
    pub leading: f32,
    /// Text rise (Ts)
    pub rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::identity(),
            fill: (0.0, 0.0, 0.0),
            stroke: (0.0, 0.0, 0.0),
            font_name: String::new(),
            font_size: 0.0,
            char_space: 0.0,
            word_space: 0.0,
            h_scale: 100.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// A positioned piece of shown text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    /// Decoded text
    pub text: String,
    /// Baseline origin X (user space)
    pub x: f32,
    /// Baseline origin Y (user space)
    pub y: f32,
    /// Advance width in user space
    pub width: f32,
    /// Font size at the time of showing
    pub font_size: f32,
    /// Font resource name (`F1`)
    pub font_name: String,
    /// Fill color at the time of showing
    pub fill: (f32, f32, f32),
}

/// A straight line segment in user space (from paths and thin rectangles).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineItem {
    /// Start X
    pub x0: f32,
    /// Start Y
    pub y0: f32,
    /// End X
    pub x1: f32,
    /// End Y
    pub y1: f32,
}

impl LineItem {
    /// Roughly horizontal (within 1pt of flat)?
    pub fn is_horizontal(&self) -> bool {
        (self.y1 - self.y0).abs() <= 1.0 && (self.x1 - self.x0).abs() > 1.0
    }

    /// Roughly vertical?
    pub fn is_vertical(&self) -> bool {
        (self.x1 - self.x0).abs() <= 1.0 && (self.y1 - self.y0).abs() > 1.0
    }
}

/// An image placement.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    /// XObject resource name
    pub name: String,
    /// Lower-left X in user space
    pub x: f32,
    /// Lower-left Y in user space
    pub y: f32,
    /// Rendered width
    pub width: f32,
    /// Rendered height
    pub height: f32,
}

/// Everything extracted from one content stream.
#[derive(Debug, Default, Clone)]
pub struct PageContent {
    /// Text runs in paint order
    pub text: Vec<TextItem>,
    /// Line segments (borders, underlines, table grids)
    pub lines: Vec<LineItem>,
    /// Image placements
    pub images: Vec<ImageItem>,
}

/// An operand or operator pulled from the stream.
enum Op {
    Operand(Object),
    Operator(String),
}

/// Execute a content stream against the given font set.
pub fn interpret(content: &[u8], fonts: &HashMap<String, PdfFont>) -> PageContent {
    let mut out = PageContent::default();
    let mut gs = GraphicsState::default();
    let mut stack: Vec<GraphicsState> = Vec::new();
    let mut tm = Matrix::identity();
    let mut tlm = Matrix::identity();
    let mut operands: Vec<Object> = Vec::new();

    // Current path state
    let mut current: Option<(f32, f32)> = None;
    let mut path_start: Option<(f32, f32)> = None;
    let mut segments: Vec<LineItem> = Vec::new();
    let mut rects: Vec<[f32; 4]> = Vec::new();

    let mut input: &[u8] = content;
    loop {
        let (rest, op) = match next_op(input) {
            Some(pair) => pair,
            None => break,
        };
        input = rest;
        let op = match op {
            Op::Operand(obj) => {
                operands.push(obj);
                continue;
            },
            Op::Operator(word) => word,
        };

        let num = |operands: &[Object], i: usize| -> f32 {
            operands.get(i).and_then(|o| o.as_number()).unwrap_or(0.0) as f32
        };

        match op.as_str() {
            "q" => stack.push(gs.clone()),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    gs = saved;
                }
            },
            "cm" => {
                if operands.len() >= 6 {
                    let m = Matrix {
                        a: num(&operands, 0),
                        b: num(&operands, 1),
                        c: num(&operands, 2),
                        d: num(&operands, 3),
                        e: num(&operands, 4),
                        f: num(&operands, 5),
                    };
                    gs.ctm = m.multiply(&gs.ctm);
                }
            },
            "BT" => {
                tm = Matrix::identity();
                tlm = Matrix::identity();
            },
            "ET" => {},
            "Tm" => {
                if operands.len() >= 6 {
                    tm = Matrix {
                        a: num(&operands, 0),
                        b: num(&operands, 1),
                        c: num(&operands, 2),
                        d: num(&operands, 3),
                        e: num(&operands, 4),
                        f: num(&operands, 5),
                    };
                    tlm = tm;
                }
            },
            "Td" => {
                tlm = Matrix::translation(num(&operands, 0), num(&operands, 1)).multiply(&tlm);
                tm = tlm;
            },
            "TD" => {
                gs.leading = -num(&operands, 1);
                tlm = Matrix::translation(num(&operands, 0), num(&operands, 1)).multiply(&tlm);
                tm = tlm;
            },
            "T*" => {
                tlm = Matrix::translation(0.0, -gs.leading).multiply(&tlm);
                tm = tlm;
            },
            "Tf" => {
                gs.font_name = operands
                    .first()
                    .and_then(|o| o.as_name())
                    .unwrap_or_default()
                    .to_string();
                gs.font_size = num(&operands, 1);
            },
            "Tc" => gs.char_space = num(&operands, 0),
            "Tw" => gs.word_space = num(&operands, 0),
            "Tz" => gs.h_scale = num(&operands, 0),
            "TL" => gs.leading = num(&operands, 0),
            "Ts" => gs.rise = num(&operands, 0),
            "Tj" => {
                if let Some(Object::String(bytes)) = operands.first() {
                    show_text(bytes, &gs, fonts, &mut tm, &mut out);
                }
            },
            "'" => {
                tlm = Matrix::translation(0.0, -gs.leading).multiply(&tlm);
                tm = tlm;
                if let Some(Object::String(bytes)) = operands.first() {
                    show_text(bytes, &gs, fonts, &mut tm, &mut out);
                }
            },
            "\"" => {
                gs.word_space = num(&operands, 0);
                gs.char_space = num(&operands, 1);
                tlm = Matrix::translation(0.0, -gs.leading).multiply(&tlm);
                tm = tlm;
                if let Some(bytes) = operands.get(2).and_then(|o| o.as_bytes()).map(|b| b.to_vec()) {
                    show_text(&bytes, &gs, fonts, &mut tm, &mut out);
                }
            },
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes) => {
                                show_text(bytes, &gs, fonts, &mut tm, &mut out);
                            },
                            // A positive adjustment moves the next glyph
                            // left by N/1000 em
                            Object::Integer(_) | Object::Real(_) => {
                                let adjust = item.as_number().unwrap_or(0.0) as f32;
                                let tx = -adjust / 1000.0 * gs.font_size * gs.h_scale / 100.0;
                                tm = Matrix::translation(tx, 0.0).multiply(&tm);
                            },
                            _ => {},
                        }
                    }
                }
            },
            "rg" => gs.fill = (num(&operands, 0), num(&operands, 1), num(&operands, 2)),
            "RG" => gs.stroke = (num(&operands, 0), num(&operands, 1), num(&operands, 2)),
            "g" => {
                let v = num(&operands, 0);
                gs.fill = (v, v, v);
            },
            "G" => {
                let v = num(&operands, 0);
                gs.stroke = (v, v, v);
            },
            "re" => {
                if operands.len() >= 4 {
                    rects.push([
                        num(&operands, 0),
                        num(&operands, 1),
                        num(&operands, 2),
                        num(&operands, 3),
                    ]);
                    current = Some((num(&operands, 0), num(&operands, 1)));
                }
            },
            "m" => {
                let p = (num(&operands, 0), num(&operands, 1));
                current = Some(p);
                path_start = Some(p);
            },
            "l" => {
                let p = (num(&operands, 0), num(&operands, 1));
                if let Some(from) = current {
                    segments.push(LineItem { x0: from.0, y0: from.1, x1: p.0, y1: p.1 });
                }
                current = Some(p);
            },
            "c" | "v" | "y" => {
                // Curves contribute their chord for layout purposes
                let (ex, ey) = match op.as_str() {
                    "c" => (num(&operands, 4), num(&operands, 5)),
                    _ => (num(&operands, 2), num(&operands, 3)),
                };
                if let Some(from) = current {
                    segments.push(LineItem { x0: from.0, y0: from.1, x1: ex, y1: ey });
                }
                current = Some((ex, ey));
            },
            "h" => {
                if let (Some(from), Some(start)) = (current, path_start) {
                    segments.push(LineItem {
                        x0: from.0,
                        y0: from.1,
                        x1: start.0,
                        y1: start.1,
                    });
                    current = Some(start);
                }
            },
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                flush_path(&gs, &mut segments, &mut rects, &mut out);
                current = None;
                path_start = None;
            },
            "n" => {
                segments.clear();
                rects.clear();
                current = None;
                path_start = None;
            },
            "Do" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name()) {
                    // The CTM's scale gives the placed size, its
                    // translation the lower-left origin
                    out.images.push(ImageItem {
                        name: name.to_string(),
                        x: gs.ctm.e,
                        y: gs.ctm.f,
                        width: gs.ctm.a.abs(),
                        height: gs.ctm.d.abs(),
                    });
                }
            },
            "BI" => {
                // Inline image: skip to EI
                if let Some(pos) = crate::pdf::object::find_subslice(input, b"EI") {
                    input = &input[pos + 2..];
                }
            },
            _ => {}, // gs, W, BDC/EMC, color-space selection: no layout effect
        }
        operands.clear();
    }
    out
}

/// Show a string: decode through the font, emit one positioned item, and
/// advance the text matrix glyph by glyph.
fn show_text(
    bytes: &[u8],
    gs: &GraphicsState,
    fonts: &HashMap<String, PdfFont>,
    tm: &mut Matrix,
    out: &mut PageContent,
) {
    let fallback = PdfFont::default();
    let font = fonts.get(&gs.font_name).unwrap_or(&fallback);
    let trm = tm.multiply(&gs.ctm);
    let (start_x, start_y) = trm.apply(0.0, gs.rise);

    let mut text = String::new();
    let mut advance = 0.0f32;
    for (code, decoded) in font.decode(bytes) {
        let glyph_width = font.width(code) / 1000.0 * gs.font_size;
        let mut tx = glyph_width + gs.char_space;
        if code == 0x20 {
            tx += gs.word_space;
        }
        tx *= gs.h_scale / 100.0;
        advance += tx;
        text.push_str(&decoded);
    }
    *tm = Matrix::translation(advance, 0.0).multiply(tm);

    if !text.is_empty() {
        out.text.push(TextItem {
            text,
            x: start_x,
            y: start_y,
            width: advance,
            font_size: gs.font_size,
            font_name: gs.font_name.clone(),
            fill: gs.fill,
        });
    }
}

/// Move the collected path into line items, transformed to user space.
/// Thin rectangles become single lines; others contribute their four
/// edges as candidate borders.
fn flush_path(
    gs: &GraphicsState,
    segments: &mut Vec<LineItem>,
    rects: &mut Vec<[f32; 4]>,
    out: &mut PageContent,
) {
    for seg in segments.drain(..) {
        let (x0, y0) = gs.ctm.apply(seg.x0, seg.y0);
        let (x1, y1) = gs.ctm.apply(seg.x1, seg.y1);
        out.lines.push(LineItem { x0, y0, x1, y1 });
    }
    for [x, y, w, h] in rects.drain(..) {
        let (x0, y0) = gs.ctm.apply(x, y);
        let (x1, y1) = gs.ctm.apply(x + w, y + h);
        let (width, height) = ((x1 - x0).abs(), (y1 - y0).abs());
        if height <= 2.0 {
            let mid = (y0 + y1) / 2.0;
            out.lines.push(LineItem { x0, y0: mid, x1, y1: mid });
        } else if width <= 2.0 {
            let mid = (x0 + x1) / 2.0;
            out.lines.push(LineItem { x0: mid, y0, x1: mid, y1 });
        } else {
            out.lines.push(LineItem { x0, y0, x1, y1: y0 });
            out.lines.push(LineItem { x0, y0: y1, x1, y1 });
            out.lines.push(LineItem { x0, y0, x1: x0, y1 });
            out.lines.push(LineItem { x0: x1, y0, x1, y1 });
        }
    }
}

/// Pull the next operand or operator from the stream.
fn next_op(input: &[u8]) -> Option<(&[u8], Op)> {
    let input = lexer::skip_ws(input);
    let first = *input.first()?;
    match first {
        b'(' | b'/' => match lexer::token(input) {
            Ok((rest, Token::LiteralString(raw))) => {
                Some((rest, Op::Operand(Object::String(lexer::unescape_literal(raw)))))
            },
            Ok((rest, Token::Name(n))) => Some((rest, Op::Operand(Object::Name(n)))),
            _ => None,
        },
        b'<' => {
            if input.starts_with(b"<<") {
                let (dict, rest) = parse_inline_dict(&input[2..])?;
                Some((rest, Op::Operand(dict)))
            } else {
                match lexer::token(input) {
                    Ok((rest, Token::HexString(raw))) => {
                        Some((rest, Op::Operand(Object::String(lexer::decode_hex(raw)))))
                    },
                    _ => None,
                }
            }
        },
        b'[' => {
            let (array, rest) = parse_inline_array(&input[1..])?;
            Some((rest, Op::Operand(array)))
        },
        c if c.is_ascii_digit() || c == b'+' || c == b'-' || c == b'.' => {
            match lexer::token(input) {
                Ok((rest, Token::Integer(i))) => Some((rest, Op::Operand(Object::Integer(i)))),
                Ok((rest, Token::Real(r))) => Some((rest, Op::Operand(Object::Real(r)))),
                _ => None,
            }
        },
        _ => {
            let (rest, word) = lexer::operator_word(input).ok()?;
            if word.is_empty() {
                None
            } else {
                Some((rest, Op::Operator(word.to_string())))
            }
        },
    }
}

/// Operand arrays never contain `N G R` references, so this reader has no
/// reference lookahead (a bare `R` there would be the RG operator's head).
fn parse_inline_array(mut input: &[u8]) -> Option<(Object, &[u8])> {
    let mut items = Vec::new();
    loop {
        input = lexer::skip_ws(input);
        if input.first() == Some(&b']') {
            return Some((Object::Array(items), &input[1..]));
        }
        let (rest, op) = next_op(input)?;
        match op {
            Op::Operand(obj) => items.push(obj),
            Op::Operator(_) => return None,
        }
        input = rest;
    }
}

fn parse_inline_dict(mut input: &[u8]) -> Option<(Object, &[u8])> {
    let mut dict = crate::pdf::object::Dict::new();
    loop {
        input = lexer::skip_ws(input);
        if input.starts_with(b">>") {
            return Some((Object::Dictionary(dict), &input[2..]));
        }
        let (rest, key) = match lexer::token(input) {
            Ok((rest, Token::Name(n))) => (rest, n),
            _ => return None,
        };
        let (rest, value) = next_op(rest)?;
        match value {
            Op::Operand(obj) => {
                dict.insert(key, obj);
            },
            Op::Operator(_) => return None,
        }
        input = rest;
    }
}
