//! The document AST.
//!
//! This is the shared contract between the container writer, the container
//! reader and the PDF importer: a strongly typed, immutable-by-convention
//! tree of blocks and inlines. Constructors return fresh nodes; mutation is
//! expressed as `with_*` operations that return new nodes sharing
//! sub-branches. The writer consumes a document without mutating it.

pub mod block;
pub mod drawing;
pub mod inline;
pub mod list;
pub mod table;
pub mod visit;

pub use block::{
    Alignment, Block, BorderSide, BorderStyle, DropCap, DropCapStyle, ImageBlock, Indent,
    LineRule, LineSpacing, NumberingRef, Paragraph, ParagraphBorders, ParagraphProperties,
    ShapeBlock, TableOfContents,
};
pub use drawing::{
    emu_to_pt, pt_to_emu, Anchor, AnchorAlign, AnchorOffset, EffectExtent, HorizontalAnchor,
    ImageData, InlineImage, Position, Shape, ShapePreset, VerticalAnchor, WrapMode,
};
pub use inline::{
    ColorValue, FontSelection, Highlight, Inline, LineVariant, ShadingValue, Text, TextProperties,
};
pub use list::{List, ListItem, ListLevel, ListStyle, NumberFormat};
pub use table::{
    CellBorders, CellWidth, Table, TableBorders, TableCell, TableFloat, TableRow, VMerge,
    VerticalAlignment, WidthType,
};
pub use visit::Visitor;

use crate::error::Warning;
use crate::fonts::EmbeddedFont;
use std::collections::BTreeMap;

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Portrait (default)
    #[default]
    Portrait,
    /// Landscape
    Landscape,
}

/// Page margins in twips (twentieths of a point).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    /// Top margin
    pub top: i32,
    /// Right margin
    pub right: i32,
    /// Bottom margin
    pub bottom: i32,
    /// Left margin
    pub left: i32,
    /// Distance from page edge to header
    pub header: i32,
    /// Distance from page edge to footer
    pub footer: i32,
    /// Gutter
    pub gutter: i32,
}

impl Default for Margins {
    fn default() -> Self {
        // Word's standard 1-inch margins, 0.5-inch header/footer
        Self {
            top: 1440,
            right: 1440,
            bottom: 1440,
            left: 1440,
            header: 720,
            footer: 720,
            gutter: 0,
        }
    }
}

/// Page background: a solid color or a tiled image.
#[derive(Debug, Clone, PartialEq)]
pub enum PageBackground {
    /// Solid color, six-hex uppercase
    Color(String),
    /// Background image
    Image(ImageData),
}

/// A header or footer: its own small block sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderFooter {
    /// Content blocks
    pub blocks: Vec<Block>,
}

impl HeaderFooter {
    /// Create a header/footer from blocks.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }
}

/// Section descriptor: page geometry plus header/footer for the pages that
/// follow.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionProperties {
    /// Page width in twips
    pub page_width: i32,
    /// Page height in twips
    pub page_height: i32,
    /// Page orientation
    pub orientation: Orientation,
    /// Margins
    pub margins: Margins,
    /// Optional page background
    pub background: Option<PageBackground>,
    /// Default header
    pub header: Option<HeaderFooter>,
    /// Default footer
    pub footer: Option<HeaderFooter>,
}

impl Default for SectionProperties {
    fn default() -> Self {
        // A4 portrait
        Self {
            page_width: 11906,
            page_height: 16838,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            background: None,
            header: None,
            footer: None,
        }
    }
}

/// Named color palette plus major/minor font families.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Theme color slots (dk1, lt1, accent1..accent6, hlink, ...) to six-hex values
    pub colors: indexmap::IndexMap<String, String>,
    /// Major (heading) font family
    pub major_font: String,
    /// Minor (body) font family
    pub minor_font: String,
}

impl Default for Theme {
    fn default() -> Self {
        // The standard Office theme palette
        let mut colors = indexmap::IndexMap::new();
        for (name, hex) in [
            ("dk1", "000000"),
            ("lt1", "FFFFFF"),
            ("dk2", "44546A"),
            ("lt2", "E7E6E6"),
            ("accent1", "4472C4"),
            ("accent2", "ED7D31"),
            ("accent3", "A5A5A5"),
            ("accent4", "FFC000"),
            ("accent5", "5B9BD5"),
            ("accent6", "70AD47"),
            ("hlink", "0563C1"),
            ("folHlink", "954F72"),
        ] {
            colors.insert(name.to_string(), hex.to_string());
        }
        Self {
            colors,
            major_font: "Calibri Light".to_string(),
            minor_font: "Calibri".to_string(),
        }
    }
}

impl Theme {
    /// Look up a theme color slot, returning its six-hex value.
    pub fn color(&self, name: &str) -> Option<&str> {
        self.colors.get(name).map(|s| s.as_str())
    }

    /// Resolve a theme color with optional tint/shade applied.
    ///
    /// Tint blends toward white, shade toward black; both are a single byte
    /// where 0xFF means "no change".
    pub fn resolve(&self, name: &str, tint: Option<u8>, shade: Option<u8>) -> Option<String> {
        let hex = self.color(name)?;
        let (r, g, b) = parse_hex_rgb(hex)?;
        let blend = |c: u8, factor: u8, toward: u8| -> u8 {
            let f = factor as f32 / 255.0;
            (c as f32 * f + toward as f32 * (1.0 - f)).round() as u8
        };
        let (r, g, b) = if let Some(t) = tint {
            (blend(r, t, 255), blend(g, t, 255), blend(b, t, 255))
        } else if let Some(s) = shade {
            (blend(r, s, 0), blend(g, s, 0), blend(b, s, 0))
        } else {
            (r, g, b)
        };
        Some(format!("{:02X}{:02X}{:02X}", r, g, b))
    }
}

fn parse_hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Raw XML preserved verbatim for parts the writer does not regenerate.
///
/// `None` means "synthesize a default"; `Some` is re-emitted byte-for-byte
/// so an opened package round-trips without loss.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreservedParts {
    /// word/styles.xml
    pub styles: Option<String>,
    /// word/numbering.xml
    pub numbering: Option<String>,
    /// word/settings.xml
    pub settings: Option<String>,
    /// word/webSettings.xml
    pub web_settings: Option<String>,
    /// word/fontTable.xml
    pub font_table: Option<String>,
    /// \[Content_Types\].xml
    pub content_types: Option<String>,
    /// _rels/.rels
    pub root_rels: Option<String>,
    /// word/footnotes.xml (structured notes win on re-export)
    pub footnotes: Option<String>,
    /// word/endnotes.xml (structured notes win on re-export)
    pub endnotes: Option<String>,
    /// docProps/core.xml
    pub core_props: Option<String>,
    /// docProps/app.xml
    pub app_props: Option<String>,
}

/// A word-processing document.
///
/// An ordered block sequence, a trailing section descriptor, notes keyed by
/// id, a theme, embedded fonts, preserved raw parts and accumulated
/// warnings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Ordered body blocks
    pub blocks: Vec<Block>,
    /// The document-final section descriptor
    pub section: SectionProperties,
    /// Footnote definitions keyed by note id
    pub footnotes: BTreeMap<u32, Vec<Block>>,
    /// Endnote definitions keyed by note id
    pub endnotes: BTreeMap<u32, Vec<Block>>,
    /// Theme palette and fonts
    pub theme: Theme,
    /// Fonts embedded into the package
    pub embedded_fonts: Vec<EmbeddedFont>,
    /// Raw XML for parts carried through unchanged
    pub preserved: PreservedParts,
    /// Non-fatal issues encountered while producing this document
    pub warnings: Vec<Warning>,
}

impl Document {
    /// Create an empty document with default section properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document from blocks.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks, ..Self::default() }
    }

    /// Return a copy with one block appended.
    pub fn push_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Return a copy with a footnote definition added.
    pub fn with_footnote(mut self, id: u32, content: Vec<Block>) -> Self {
        self.footnotes.insert(id, content);
        self
    }

    /// Return a copy with an endnote definition added.
    pub fn with_endnote(mut self, id: u32, content: Vec<Block>) -> Self {
        self.endnotes.insert(id, content);
        self
    }

    /// Return a copy with the given section properties.
    pub fn with_section(mut self, section: SectionProperties) -> Self {
        self.section = section;
        self
    }

    /// Check the document's internal invariants.
    ///
    /// Every note reference must resolve to a defined note of the same kind,
    /// and every list numbering id must be consistent. Returns the list of
    /// violations (empty when the document is coherent).
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut walk = |blocks: &[Block], violations: &mut Vec<String>| {
            for block in blocks {
                for inline in block.inlines() {
                    match inline {
                        Inline::FootnoteRef(id) if !self.footnotes.contains_key(id) => {
                            violations.push(format!("footnote reference {} has no definition", id));
                        },
                        Inline::EndnoteRef(id) if !self.endnotes.contains_key(id) => {
                            violations.push(format!("endnote reference {} has no definition", id));
                        },
                        _ => {},
                    }
                }
            }
        };
        walk(&self.blocks, &mut violations);
        for content in self.footnotes.values().chain(self.endnotes.values()) {
            walk(content, &mut violations);
        }
        violations
    }
}
