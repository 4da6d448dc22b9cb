//! Block nodes: paragraphs and the other top-level content of a body.

use super::drawing::{ImageData, Shape};
use super::inline::Inline;
use super::list::List;
use super::table::Table;
use super::SectionProperties;

/// A block node.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A paragraph of inlines
    Paragraph(Paragraph),
    /// A table
    Table(Table),
    /// A list
    List(List),
    /// A block-level image
    Image(ImageBlock),
    /// A shape promoted to block level
    Shape(ShapeBlock),
    /// A section break carrying the descriptor applied from this point on
    SectionBreak(SectionProperties),
    /// A drop-capped paragraph
    DropCap(DropCap),
    /// A table-of-contents field
    TableOfContents(TableOfContents),
}

impl Block {
    /// Convenience constructor for a plain paragraph.
    pub fn paragraph(inlines: Vec<Inline>) -> Self {
        Block::Paragraph(Paragraph::new(inlines))
    }

    /// The inline children of this block, where it has any.
    ///
    /// Tables and lists expose their nested inlines through their own
    /// structure; this accessor covers the directly-inline-bearing kinds.
    pub fn inlines(&self) -> &[Inline] {
        match self {
            Block::Paragraph(p) => &p.inlines,
            Block::DropCap(d) => &d.rest,
            _ => &[],
        }
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Left-aligned
    Left,
    /// Centered
    Center,
    /// Right-aligned
    Right,
    /// Justified (`w:jc w:val="both"`)
    Justify,
}

impl Alignment {
    /// WordprocessingML value.
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }

    /// Parse a WordprocessingML `w:jc` value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "left" | "start" => Alignment::Left,
            "center" => Alignment::Center,
            "right" | "end" => Alignment::Right,
            "both" | "justify" | "distribute" => Alignment::Justify,
            _ => return None,
        })
    }
}

/// Border line styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BorderStyle {
    /// Explicitly no border — distinct from an absent border
    None,
    Single,
    Thick,
    Double,
    Dotted,
    Dashed,
    DotDash,
    DotDotDash,
    Triple,
    Wave,
    DoubleWave,
    Inset,
    Outset,
}

impl BorderStyle {
    /// WordprocessingML value.
    pub fn as_str(self) -> &'static str {
        match self {
            BorderStyle::None => "none",
            BorderStyle::Single => "single",
            BorderStyle::Thick => "thick",
            BorderStyle::Double => "double",
            BorderStyle::Dotted => "dotted",
            BorderStyle::Dashed => "dashed",
            BorderStyle::DotDash => "dotDash",
            BorderStyle::DotDotDash => "dotDotDash",
            BorderStyle::Triple => "triple",
            BorderStyle::Wave => "wave",
            BorderStyle::DoubleWave => "doubleWave",
            BorderStyle::Inset => "inset",
            BorderStyle::Outset => "outset",
        }
    }

    /// Parse a WordprocessingML border style value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "none" | "nil" => BorderStyle::None,
            "single" => BorderStyle::Single,
            "thick" => BorderStyle::Thick,
            "double" => BorderStyle::Double,
            "dotted" => BorderStyle::Dotted,
            "dashed" => BorderStyle::Dashed,
            "dotDash" => BorderStyle::DotDash,
            "dotDotDash" => BorderStyle::DotDotDash,
            "triple" => BorderStyle::Triple,
            "wave" => BorderStyle::Wave,
            "doubleWave" => BorderStyle::DoubleWave,
            "inset" => BorderStyle::Inset,
            "outset" => BorderStyle::Outset,
            _ => return None,
        })
    }
}

/// One border side: style, width, color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderSide {
    /// Line style
    pub style: BorderStyle,
    /// Width in eighths of a point
    pub size: u32,
    /// Six-hex uppercase color, or "auto"
    pub color: String,
}

impl BorderSide {
    /// A single-line border of the given size and color.
    pub fn single(size: u32, color: impl Into<String>) -> Self {
        Self {
            style: BorderStyle::Single,
            size,
            color: color.into().to_uppercase(),
        }
    }

    /// An explicit "no border" marker.
    pub fn none() -> Self {
        Self {
            style: BorderStyle::None,
            size: 0,
            color: "auto".to_string(),
        }
    }
}

/// The four paragraph border sides, each optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParagraphBorders {
    /// Top border
    pub top: Option<BorderSide>,
    /// Bottom border
    pub bottom: Option<BorderSide>,
    /// Left border
    pub left: Option<BorderSide>,
    /// Right border
    pub right: Option<BorderSide>,
}

impl ParagraphBorders {
    /// True when no side is set.
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none() && self.left.is_none() && self.right.is_none()
    }
}

/// Line spacing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRule {
    /// Amount is a multiple of single spacing in 240ths
    Auto,
    /// Amount is an exact height in twips
    Exact,
    /// Amount is a minimum height in twips
    AtLeast,
}

impl LineRule {
    /// WordprocessingML value.
    pub fn as_str(self) -> &'static str {
        match self {
            LineRule::Auto => "auto",
            LineRule::Exact => "exact",
            LineRule::AtLeast => "atLeast",
        }
    }

    /// Parse a WordprocessingML `w:lineRule` value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "auto" => LineRule::Auto,
            "exact" => LineRule::Exact,
            "atLeast" => LineRule::AtLeast,
            _ => return None,
        })
    }
}

/// Line spacing: an amount plus the rule interpreting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpacing {
    /// Spacing amount (twips, or 240ths for Auto)
    pub amount: u32,
    /// How the amount is interpreted
    pub rule: LineRule,
}

/// Paragraph indentation in twips.
///
/// A hanging indent of N is encoded as `first_line = -N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indent {
    /// Left indent
    pub left: Option<i32>,
    /// Right indent
    pub right: Option<i32>,
    /// First-line indent; negative means hanging
    pub first_line: Option<i32>,
}

/// Reference from a paragraph into the numbering tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingRef {
    /// Concrete numbering id (`w:numId`)
    pub num_id: u32,
    /// List level, 0..=8
    pub level: u8,
}

/// Paragraph-level formatting as a record of optional properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphProperties {
    /// Alignment
    pub alignment: Option<Alignment>,
    /// Paragraph style id (`w:pStyle`)
    pub style_id: Option<String>,
    /// Indentation
    pub indent: Indent,
    /// Line spacing
    pub line_spacing: Option<LineSpacing>,
    /// Space before, twentieths of a point
    pub spacing_before: Option<u32>,
    /// Space after, twentieths of a point
    pub spacing_after: Option<u32>,
    /// Background shading, six-hex uppercase
    pub shading: Option<String>,
    /// Borders
    pub borders: ParagraphBorders,
    /// Force a page break before this paragraph
    pub page_break_before: bool,
    /// Numbering reference for list items
    pub numbering: Option<NumberingRef>,
}

impl ParagraphProperties {
    /// True when every field is inherited or default.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Right-biased merge used by the style cascade.
    pub fn merged_with(&self, over: &ParagraphProperties) -> ParagraphProperties {
        ParagraphProperties {
            alignment: over.alignment.or(self.alignment),
            style_id: over.style_id.clone().or_else(|| self.style_id.clone()),
            indent: Indent {
                left: over.indent.left.or(self.indent.left),
                right: over.indent.right.or(self.indent.right),
                first_line: over.indent.first_line.or(self.indent.first_line),
            },
            line_spacing: over.line_spacing.or(self.line_spacing),
            spacing_before: over.spacing_before.or(self.spacing_before),
            spacing_after: over.spacing_after.or(self.spacing_after),
            shading: over.shading.clone().or_else(|| self.shading.clone()),
            borders: ParagraphBorders {
                top: over.borders.top.clone().or_else(|| self.borders.top.clone()),
                bottom: over.borders.bottom.clone().or_else(|| self.borders.bottom.clone()),
                left: over.borders.left.clone().or_else(|| self.borders.left.clone()),
                right: over.borders.right.clone().or_else(|| self.borders.right.clone()),
            },
            page_break_before: over.page_break_before || self.page_break_before,
            numbering: over.numbering.or(self.numbering),
        }
    }
}

/// A paragraph: ordered inlines plus properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    /// Inline children in order
    pub inlines: Vec<Inline>,
    /// Paragraph formatting
    pub props: ParagraphProperties,
}

impl Paragraph {
    /// Create a paragraph from inlines.
    pub fn new(inlines: Vec<Inline>) -> Self {
        Self {
            inlines,
            props: ParagraphProperties::default(),
        }
    }

    /// Return a copy with the given properties.
    pub fn with_props(mut self, props: ParagraphProperties) -> Self {
        self.props = props;
        self
    }

    /// Return a copy with the given alignment.
    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.props.alignment = Some(alignment);
        self
    }

    /// Return a copy with the given style id.
    pub fn styled(mut self, style_id: impl Into<String>) -> Self {
        self.props.style_id = Some(style_id.into());
        self
    }
}

/// A block-level image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    /// Payload and pixel dimensions
    pub data: ImageData,
    /// Alt text
    pub alt: Option<String>,
}

/// A shape promoted to block level.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeBlock {
    /// The wrapped shape
    pub shape: Shape,
}

/// Drop cap placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCapStyle {
    /// Inside the text frame
    Drop,
    /// In the margin
    Margin,
}

impl DropCapStyle {
    /// WordprocessingML `w:dropCap` value.
    pub fn as_str(self) -> &'static str {
        match self {
            DropCapStyle::Drop => "drop",
            DropCapStyle::Margin => "margin",
        }
    }
}

/// A paragraph opening with a dropped capital letter.
#[derive(Debug, Clone, PartialEq)]
pub struct DropCap {
    /// The dropped letter(s)
    pub letter: String,
    /// Height in lines, at least 2
    pub lines: u32,
    /// Placement
    pub style: DropCapStyle,
    /// Font family for the big letter
    pub font_family: Option<String>,
    /// Font size in half-points for the big letter
    pub size: Option<u32>,
    /// Horizontal space between letter and text, twips
    pub h_space: Option<u32>,
    /// The rest of the paragraph
    pub rest: Vec<Inline>,
}

/// A table-of-contents field.
///
/// Serializes as the standard `TOC` field instruction wrapped in the
/// begin/separate/end field-character triple.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOfContents {
    /// First outline level included
    pub from_level: u8,
    /// Last outline level included
    pub to_level: u8,
}

impl Default for TableOfContents {
    fn default() -> Self {
        Self { from_level: 1, to_level: 3 }
    }
}

impl TableOfContents {
    /// The field instruction, e.g. `TOC \o "1-3" \h \z \u`.
    pub fn instruction(&self) -> String {
        format!(" TOC \\o \"{}-{}\" \\h \\z \\u ", self.from_level, self.to_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_justify_maps_to_both() {
        assert_eq!(Alignment::Justify.as_str(), "both");
        assert_eq!(Alignment::parse("both"), Some(Alignment::Justify));
        assert_eq!(Alignment::parse("justify"), Some(Alignment::Justify));
    }

    #[test]
    fn test_border_style_round_trip() {
        for style in [
            BorderStyle::None,
            BorderStyle::Single,
            BorderStyle::DotDotDash,
            BorderStyle::DoubleWave,
        ] {
            assert_eq!(BorderStyle::parse(style.as_str()), Some(style));
        }
        // "nil" is an input alias for none
        assert_eq!(BorderStyle::parse("nil"), Some(BorderStyle::None));
    }

    #[test]
    fn test_paragraph_merge_right_biased() {
        let style = ParagraphProperties {
            alignment: Some(Alignment::Center),
            spacing_after: Some(200),
            ..Default::default()
        };
        let direct = ParagraphProperties {
            alignment: Some(Alignment::Right),
            ..Default::default()
        };
        let merged = style.merged_with(&direct);
        assert_eq!(merged.alignment, Some(Alignment::Right));
        assert_eq!(merged.spacing_after, Some(200));
    }

    #[test]
    fn test_hanging_indent_is_negative_first_line() {
        let props = ParagraphProperties {
            indent: Indent {
                left: Some(720),
                first_line: Some(-360),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(props.indent.first_line, Some(-360));
    }

    #[test]
    fn test_toc_instruction() {
        assert_eq!(TableOfContents::default().instruction(), " TOC \\o \"1-3\" \\h \\z \\u ");
    }

    #[test]
    fn test_border_side_none_is_explicit() {
        let none = BorderSide::none();
        assert_eq!(none.style, BorderStyle::None);
        // An explicit none is not the same as an absent Option
        assert_ne!(Some(none), None::<BorderSide>.clone());
    }
}
