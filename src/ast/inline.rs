//! Inline nodes: text runs and the other leaf content of a paragraph.

use super::block::BorderSide;
use super::drawing::{InlineImage, Shape};

/// An inline node.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// A formatted text run
    Text(Text),
    /// Explicit line break (`w:br`)
    LineBreak,
    /// Tab character (`w:tab`)
    Tab,
    /// An image inside a run
    Image(InlineImage),
    /// A preset-geometry shape
    Shape(Shape),
    /// Reference to a footnote definition by id
    FootnoteRef(u32),
    /// Reference to an endnote definition by id
    EndnoteRef(u32),
    /// Legacy form-field checkbox
    Checkbox {
        /// Whether the box is checked
        checked: bool,
    },
    /// Current page number field
    PageNumber,
    /// Total page count field
    PageCount,
    /// Raw WordprocessingML carried through verbatim
    Raw(String),
}

impl Inline {
    /// Convenience constructor for a plain text run.
    pub fn text(content: impl Into<String>) -> Self {
        Inline::Text(Text::new(content))
    }
}

/// Single or double line decoration (underline / strikethrough).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineVariant {
    /// Explicitly no decoration — overrides an inherited value
    None,
    /// Single line
    Single,
    /// Double line
    Double,
}

/// A color: either a literal six-hex value or a theme slot with optional
/// tint/shade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorValue {
    /// Literal color, six-hex uppercase
    Hex(String),
    /// Theme color slot
    Theme {
        /// Slot name (accent1, dk1, ...)
        name: String,
        /// Blend toward white (0x00 = white, 0xFF = unchanged)
        tint: Option<u8>,
        /// Blend toward black (0x00 = black, 0xFF = unchanged)
        shade: Option<u8>,
    },
}

impl ColorValue {
    /// A literal hex color, normalized to uppercase.
    pub fn hex(value: impl Into<String>) -> Self {
        ColorValue::Hex(value.into().to_uppercase())
    }
}

/// Run shading fill — same shape as [`ColorValue`] but applied behind text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadingValue {
    /// Literal fill, six-hex uppercase
    Hex(String),
    /// Theme fill slot
    Theme {
        /// Slot name
        name: String,
        /// Blend toward white
        tint: Option<u8>,
        /// Blend toward black
        shade: Option<u8>,
    },
}

impl ShadingValue {
    /// A literal hex fill, normalized to uppercase.
    pub fn hex(value: impl Into<String>) -> Self {
        ShadingValue::Hex(value.into().to_uppercase())
    }
}

/// The sixteen named highlight wash colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Highlight {
    Black,
    Blue,
    Cyan,
    DarkBlue,
    DarkCyan,
    DarkGray,
    DarkGreen,
    DarkMagenta,
    DarkRed,
    DarkYellow,
    Green,
    LightGray,
    Magenta,
    Red,
    White,
    Yellow,
}

impl Highlight {
    /// The WordprocessingML value for this highlight.
    pub fn as_str(self) -> &'static str {
        match self {
            Highlight::Black => "black",
            Highlight::Blue => "blue",
            Highlight::Cyan => "cyan",
            Highlight::DarkBlue => "darkBlue",
            Highlight::DarkCyan => "darkCyan",
            Highlight::DarkGray => "darkGray",
            Highlight::DarkGreen => "darkGreen",
            Highlight::DarkMagenta => "darkMagenta",
            Highlight::DarkRed => "darkRed",
            Highlight::DarkYellow => "darkYellow",
            Highlight::Green => "green",
            Highlight::LightGray => "lightGray",
            Highlight::Magenta => "magenta",
            Highlight::Red => "red",
            Highlight::White => "white",
            Highlight::Yellow => "yellow",
        }
    }

    /// Parse a WordprocessingML highlight value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "black" => Highlight::Black,
            "blue" => Highlight::Blue,
            "cyan" => Highlight::Cyan,
            "darkBlue" => Highlight::DarkBlue,
            "darkCyan" => Highlight::DarkCyan,
            "darkGray" => Highlight::DarkGray,
            "darkGreen" => Highlight::DarkGreen,
            "darkMagenta" => Highlight::DarkMagenta,
            "darkRed" => Highlight::DarkRed,
            "darkYellow" => Highlight::DarkYellow,
            "green" => Highlight::Green,
            "lightGray" => Highlight::LightGray,
            "magenta" => Highlight::Magenta,
            "red" => Highlight::Red,
            "white" => Highlight::White,
            "yellow" => Highlight::Yellow,
            _ => return None,
        })
    }
}

/// Font selection for the four script slots plus theme bindings and hint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FontSelection {
    /// ASCII range face
    pub ascii: Option<String>,
    /// High-ANSI range face
    pub h_ansi: Option<String>,
    /// Complex-script face
    pub cs: Option<String>,
    /// East-Asian face
    pub east_asia: Option<String>,
    /// Theme binding for the ASCII slot (e.g. "minorHAnsi")
    pub ascii_theme: Option<String>,
    /// Theme binding for the high-ANSI slot
    pub h_ansi_theme: Option<String>,
    /// Theme binding for the complex-script slot
    pub cs_theme: Option<String>,
    /// Theme binding for the East-Asian slot
    pub east_asia_theme: Option<String>,
    /// Script hint ("default", "eastAsia", "cs")
    pub hint: Option<String>,
}

impl FontSelection {
    /// A selection naming the same face for ASCII and high-ANSI.
    pub fn named(family: impl Into<String>) -> Self {
        let family = family.into();
        Self {
            ascii: Some(family.clone()),
            h_ansi: Some(family),
            ..Self::default()
        }
    }

    /// True when no slot is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Character formatting as a record of optional properties.
///
/// Absent (`None`) fields inherit through the style cascade; present fields
/// override. Merging is a right-biased fold — see
/// [`crate::ooxml::styles::resolve_run_properties`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextProperties {
    /// Bold
    pub bold: Option<bool>,
    /// Italic
    pub italic: Option<bool>,
    /// Underline
    pub underline: Option<LineVariant>,
    /// Strikethrough (Double maps to `w:dstrike`)
    pub strike: Option<LineVariant>,
    /// Text color
    pub color: Option<ColorValue>,
    /// Shading fill behind the run
    pub shading: Option<ShadingValue>,
    /// Named highlight wash
    pub highlight: Option<Highlight>,
    /// Font size in half-points
    pub size: Option<u32>,
    /// Font faces
    pub fonts: Option<FontSelection>,
    /// Superscript
    pub superscript: Option<bool>,
    /// Subscript
    pub subscript: Option<bool>,
    /// All capitals
    pub all_caps: Option<bool>,
    /// Small capitals
    pub small_caps: Option<bool>,
    /// Outline effect
    pub outline: Option<bool>,
    /// Shadow effect
    pub shadow: Option<bool>,
    /// Emboss effect
    pub emboss: Option<bool>,
    /// Imprint (engrave) effect
    pub imprint: Option<bool>,
    /// Text border
    pub border: Option<BorderSide>,
    /// Character spacing in twips (may be negative)
    pub char_spacing: Option<i32>,
}

impl TextProperties {
    /// True when every field is inherited.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Right-biased merge: fields present on `over` replace fields on `self`.
    pub fn merged_with(&self, over: &TextProperties) -> TextProperties {
        macro_rules! pick {
            ($field:ident) => {
                over.$field.clone().or_else(|| self.$field.clone())
            };
        }
        TextProperties {
            bold: pick!(bold),
            italic: pick!(italic),
            underline: pick!(underline),
            strike: pick!(strike),
            color: pick!(color),
            shading: pick!(shading),
            highlight: pick!(highlight),
            size: pick!(size),
            fonts: pick!(fonts),
            superscript: pick!(superscript),
            subscript: pick!(subscript),
            all_caps: pick!(all_caps),
            small_caps: pick!(small_caps),
            outline: pick!(outline),
            shadow: pick!(shadow),
            emboss: pick!(emboss),
            imprint: pick!(imprint),
            border: pick!(border),
            char_spacing: pick!(char_spacing),
        }
    }
}

/// A formatted text run, optionally wrapped in a hyperlink.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    /// The run content
    pub content: String,
    /// Direct formatting
    pub props: TextProperties,
    /// Hyperlink target
    pub href: Option<String>,
}

impl Text {
    /// Create a plain run.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Return a copy with the given properties.
    pub fn with_props(mut self, props: TextProperties) -> Self {
        self.props = props;
        self
    }

    /// Return a copy wrapped in a hyperlink.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Return a bold copy.
    pub fn bold(mut self) -> Self {
        self.props.bold = Some(true);
        self
    }

    /// Return an italic copy.
    pub fn italic(mut self) -> Self {
        self.props.italic = Some(true);
        self
    }

    /// Return a copy with the given literal color.
    pub fn color(mut self, hex: impl Into<String>) -> Self {
        self.props.color = Some(ColorValue::hex(hex));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_builders_return_fresh_nodes() {
        let base = Text::new("hello");
        let styled = base.clone().bold().italic().color("ff0000");
        assert!(base.props.is_empty());
        assert_eq!(styled.props.bold, Some(true));
        assert_eq!(styled.props.italic, Some(true));
        assert_eq!(styled.props.color, Some(ColorValue::Hex("FF0000".to_string())));
    }

    #[test]
    fn test_merge_is_right_biased() {
        let style = TextProperties {
            bold: Some(true),
            size: Some(24),
            ..Default::default()
        };
        let direct = TextProperties {
            bold: Some(false),
            italic: Some(true),
            ..Default::default()
        };
        let merged = style.merged_with(&direct);
        assert_eq!(merged.bold, Some(false)); // direct wins
        assert_eq!(merged.size, Some(24)); // inherited
        assert_eq!(merged.italic, Some(true));
    }

    #[test]
    fn test_merge_none_does_not_override() {
        let style = TextProperties {
            underline: Some(LineVariant::Single),
            ..Default::default()
        };
        let merged = style.merged_with(&TextProperties::default());
        assert_eq!(merged.underline, Some(LineVariant::Single));
    }

    #[test]
    fn test_explicit_none_variant_overrides() {
        // LineVariant::None is a value, not an absence: it must survive the merge
        let style = TextProperties {
            underline: Some(LineVariant::Single),
            ..Default::default()
        };
        let direct = TextProperties {
            underline: Some(LineVariant::None),
            ..Default::default()
        };
        assert_eq!(style.merged_with(&direct).underline, Some(LineVariant::None));
    }

    #[test]
    fn test_highlight_round_trip() {
        for h in [Highlight::Yellow, Highlight::DarkCyan, Highlight::LightGray] {
            assert_eq!(Highlight::parse(h.as_str()), Some(h));
        }
        assert_eq!(Highlight::parse("mauve"), None);
    }

    #[test]
    fn test_color_value_uppercases() {
        assert_eq!(ColorValue::hex("ab12cd"), ColorValue::Hex("AB12CD".to_string()));
    }

    #[test]
    fn test_font_selection_named() {
        let f = FontSelection::named("Courier New");
        assert_eq!(f.ascii.as_deref(), Some("Courier New"));
        assert_eq!(f.h_ansi.as_deref(), Some("Courier New"));
        assert!(f.cs.is_none());
        assert!(!f.is_empty());
    }
}
