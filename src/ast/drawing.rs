//! Drawing nodes: images, shapes and floating-object anchors.
//!
//! Dimensions are points in the AST and EMU at the XML layer
//! (1 pt = 12700 EMU, 1 in = 914400 EMU).

use super::inline::Inline;
use bytes::Bytes;
use indexmap::IndexMap;

/// EMU per point.
pub const EMU_PER_POINT: i64 = 12_700;
/// EMU per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Convert points to EMU.
pub fn pt_to_emu(pt: f32) -> i64 {
    (pt as f64 * EMU_PER_POINT as f64).round() as i64
}

/// Convert EMU to points.
pub fn emu_to_pt(emu: i64) -> f32 {
    (emu as f64 / EMU_PER_POINT as f64) as f32
}

/// An image payload with its source pixel dimensions.
///
/// Payloads are deduplicated by byte identity at write time: two nodes
/// holding the same `Bytes` produce one media part.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Raw encoded bytes (PNG, JPEG, ...)
    pub bytes: Bytes,
    /// File extension without the dot ("png", "jpeg")
    pub extension: String,
    /// Pixel width
    pub px_width: u32,
    /// Pixel height
    pub px_height: u32,
}

impl ImageData {
    /// Create an image payload.
    pub fn new(bytes: impl Into<Bytes>, extension: impl Into<String>, px_width: u32, px_height: u32) -> Self {
        Self {
            bytes: bytes.into(),
            extension: extension.into(),
            px_width,
            px_height,
        }
    }

    /// Identity key for media deduplication: pointer + length of the payload.
    pub fn identity(&self) -> (usize, usize) {
        (self.bytes.as_ptr() as usize, self.bytes.len())
    }
}

/// Where a drawing sits relative to the text flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// In the line of text
    Inline,
    /// Anchored to the page/margin/paragraph with wrap
    Floating(Box<Anchor>),
}

/// Horizontal anchor base (`wp:positionH/@relativeFrom`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAnchor {
    /// Page edge
    Page,
    /// Margin
    #[default]
    Margin,
    /// Text column
    Column,
    /// Character position
    Character,
}

impl HorizontalAnchor {
    /// DrawingML value.
    pub fn as_str(self) -> &'static str {
        match self {
            HorizontalAnchor::Page => "page",
            HorizontalAnchor::Margin => "margin",
            HorizontalAnchor::Column => "column",
            HorizontalAnchor::Character => "character",
        }
    }

    /// Parse a DrawingML `relativeFrom` value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "page" => HorizontalAnchor::Page,
            "margin" => HorizontalAnchor::Margin,
            "column" => HorizontalAnchor::Column,
            "character" => HorizontalAnchor::Character,
            _ => return None,
        })
    }
}

/// Vertical anchor base (`wp:positionV/@relativeFrom`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAnchor {
    /// Page edge
    Page,
    /// Margin
    #[default]
    Margin,
    /// Anchor paragraph
    Paragraph,
    /// Anchor line
    Line,
}

impl VerticalAnchor {
    /// DrawingML value.
    pub fn as_str(self) -> &'static str {
        match self {
            VerticalAnchor::Page => "page",
            VerticalAnchor::Margin => "margin",
            VerticalAnchor::Paragraph => "paragraph",
            VerticalAnchor::Line => "line",
        }
    }

    /// Parse a DrawingML `relativeFrom` value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "page" => VerticalAnchor::Page,
            "margin" => VerticalAnchor::Margin,
            "paragraph" => VerticalAnchor::Paragraph,
            "line" => VerticalAnchor::Line,
            _ => return None,
        })
    }
}

/// Either an alignment keyword or a signed EMU offset from the anchor base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOffset {
    /// Alignment keyword ("left", "center", "right", "top", "bottom", ...)
    Align(AnchorAlign),
    /// Signed offset in EMU
    Offset(i64),
}

/// Alignment keywords for anchored drawings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AnchorAlign {
    Left,
    Center,
    Right,
    Top,
    Bottom,
    Inside,
    Outside,
}

impl AnchorAlign {
    /// DrawingML value.
    pub fn as_str(self) -> &'static str {
        match self {
            AnchorAlign::Left => "left",
            AnchorAlign::Center => "center",
            AnchorAlign::Right => "right",
            AnchorAlign::Top => "top",
            AnchorAlign::Bottom => "bottom",
            AnchorAlign::Inside => "inside",
            AnchorAlign::Outside => "outside",
        }
    }

    /// Parse a DrawingML alignment keyword.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "left" => AnchorAlign::Left,
            "center" => AnchorAlign::Center,
            "right" => AnchorAlign::Right,
            "top" => AnchorAlign::Top,
            "bottom" => AnchorAlign::Bottom,
            "inside" => AnchorAlign::Inside,
            "outside" => AnchorAlign::Outside,
            _ => return None,
        })
    }
}

/// Text wrap mode around a floating object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No wrap element
    None,
    /// Wrap in a rectangle
    #[default]
    Square,
    /// Wrap tight to the shape outline
    Tight,
    /// Wrap through transparent regions
    Through,
    /// Text above and below only
    TopAndBottom,
    /// Object behind text (`behindDoc`)
    BehindText,
}

/// Extra bounding-box room for effects, EMU per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectExtent {
    /// Left
    pub left: i64,
    /// Top
    pub top: i64,
    /// Right
    pub right: i64,
    /// Bottom
    pub bottom: i64,
}

/// Full anchor state for a floating drawing.
///
/// Attributes the reader does not recognize are carried in `extensions`
/// keyed by qualified name, and re-emitted verbatim after the known ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Distance from text, EMU: top
    pub dist_top: i64,
    /// Distance from text, EMU: bottom
    pub dist_bottom: i64,
    /// Distance from text, EMU: left
    pub dist_left: i64,
    /// Distance from text, EMU: right
    pub dist_right: i64,
    /// Whether the (ignored) simple position is in effect
    pub simple_pos: bool,
    /// Z-order among floating objects
    pub relative_height: u32,
    /// Anchor is locked
    pub locked: bool,
    /// Layout inside table cells
    pub layout_in_cell: bool,
    /// Allow overlap with other floats
    pub allow_overlap: bool,
    /// Effect extent, when present
    pub effect_extent: Option<EffectExtent>,
    /// Horizontal position: base plus alignment-or-offset
    pub h_anchor: HorizontalAnchor,
    /// Horizontal alignment or offset
    pub h_offset: AnchorOffset,
    /// Vertical position base
    pub v_anchor: VerticalAnchor,
    /// Vertical alignment or offset
    pub v_offset: AnchorOffset,
    /// Wrap mode
    pub wrap: WrapMode,
    /// Unrecognized attributes by qualified name, in original order
    pub extensions: IndexMap<String, String>,
}

impl Default for Anchor {
    fn default() -> Self {
        Self {
            dist_top: 0,
            dist_bottom: 0,
            dist_left: 114_300,
            dist_right: 114_300,
            simple_pos: false,
            relative_height: 0,
            locked: false,
            layout_in_cell: true,
            allow_overlap: true,
            effect_extent: None,
            h_anchor: HorizontalAnchor::Margin,
            h_offset: AnchorOffset::Offset(0),
            v_anchor: VerticalAnchor::Paragraph,
            v_offset: AnchorOffset::Offset(0),
            wrap: WrapMode::Square,
            extensions: IndexMap::new(),
        }
    }
}

/// An image inside a run, inline or floating.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    /// Payload
    pub data: ImageData,
    /// Rendered width in points
    pub width_pt: f32,
    /// Rendered height in points
    pub height_pt: f32,
    /// Alt text
    pub alt: Option<String>,
    /// Inline or floating
    pub position: Position,
}

impl InlineImage {
    /// An inline image rendered at the given size in points.
    pub fn new(data: ImageData, width_pt: f32, height_pt: f32) -> Self {
        Self {
            data,
            width_pt,
            height_pt,
            alt: None,
            position: Position::Inline,
        }
    }

    /// Return a copy floated with the given anchor.
    pub fn floating(mut self, anchor: Anchor) -> Self {
        self.position = Position::Floating(Box::new(anchor));
        self
    }
}

/// Preset shape geometries.
///
/// The names are the OOXML `a:prstGeom` tokens; unrecognized presets are
/// carried through as [`ShapePreset::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ShapePreset {
    Rect,
    RoundRect,
    Ellipse,
    Triangle,
    RtTriangle,
    Diamond,
    Pentagon,
    Hexagon,
    Octagon,
    Star4,
    Star5,
    Star6,
    Star8,
    Star10,
    Star12,
    Star16,
    Star24,
    Star32,
    RightArrow,
    LeftArrow,
    UpArrow,
    DownArrow,
    LeftRightArrow,
    UpDownArrow,
    BentArrow,
    CurvedRightArrow,
    FlowChartProcess,
    FlowChartDecision,
    FlowChartTerminator,
    FlowChartDocument,
    FlowChartConnector,
    WedgeRectCallout,
    WedgeRoundRectCallout,
    WedgeEllipseCallout,
    CloudCallout,
    /// Any other preset token, preserved verbatim
    Other(String),
}

impl ShapePreset {
    /// The `prst` attribute value.
    pub fn as_str(&self) -> &str {
        match self {
            ShapePreset::Rect => "rect",
            ShapePreset::RoundRect => "roundRect",
            ShapePreset::Ellipse => "ellipse",
            ShapePreset::Triangle => "triangle",
            ShapePreset::RtTriangle => "rtTriangle",
            ShapePreset::Diamond => "diamond",
            ShapePreset::Pentagon => "pentagon",
            ShapePreset::Hexagon => "hexagon",
            ShapePreset::Octagon => "octagon",
            ShapePreset::Star4 => "star4",
            ShapePreset::Star5 => "star5",
            ShapePreset::Star6 => "star6",
            ShapePreset::Star8 => "star8",
            ShapePreset::Star10 => "star10",
            ShapePreset::Star12 => "star12",
            ShapePreset::Star16 => "star16",
            ShapePreset::Star24 => "star24",
            ShapePreset::Star32 => "star32",
            ShapePreset::RightArrow => "rightArrow",
            ShapePreset::LeftArrow => "leftArrow",
            ShapePreset::UpArrow => "upArrow",
            ShapePreset::DownArrow => "downArrow",
            ShapePreset::LeftRightArrow => "leftRightArrow",
            ShapePreset::UpDownArrow => "upDownArrow",
            ShapePreset::BentArrow => "bentArrow",
            ShapePreset::CurvedRightArrow => "curvedRightArrow",
            ShapePreset::FlowChartProcess => "flowChartProcess",
            ShapePreset::FlowChartDecision => "flowChartDecision",
            ShapePreset::FlowChartTerminator => "flowChartTerminator",
            ShapePreset::FlowChartDocument => "flowChartDocument",
            ShapePreset::FlowChartConnector => "flowChartConnector",
            ShapePreset::WedgeRectCallout => "wedgeRectCallout",
            ShapePreset::WedgeRoundRectCallout => "wedgeRoundRectCallout",
            ShapePreset::WedgeEllipseCallout => "wedgeEllipseCallout",
            ShapePreset::CloudCallout => "cloudCallout",
            ShapePreset::Other(s) => s,
        }
    }

    /// Parse a `prst` token; unknown tokens become [`ShapePreset::Other`].
    pub fn parse(s: &str) -> Self {
        match s {
            "rect" => ShapePreset::Rect,
            "roundRect" => ShapePreset::RoundRect,
            "ellipse" => ShapePreset::Ellipse,
            "triangle" => ShapePreset::Triangle,
            "rtTriangle" => ShapePreset::RtTriangle,
            "diamond" => ShapePreset::Diamond,
            "pentagon" => ShapePreset::Pentagon,
            "hexagon" => ShapePreset::Hexagon,
            "octagon" => ShapePreset::Octagon,
            "star4" => ShapePreset::Star4,
            "star5" => ShapePreset::Star5,
            "star6" => ShapePreset::Star6,
            "star8" => ShapePreset::Star8,
            "star10" => ShapePreset::Star10,
            "star12" => ShapePreset::Star12,
            "star16" => ShapePreset::Star16,
            "star24" => ShapePreset::Star24,
            "star32" => ShapePreset::Star32,
            "rightArrow" => ShapePreset::RightArrow,
            "leftArrow" => ShapePreset::LeftArrow,
            "upArrow" => ShapePreset::UpArrow,
            "downArrow" => ShapePreset::DownArrow,
            "leftRightArrow" => ShapePreset::LeftRightArrow,
            "upDownArrow" => ShapePreset::UpDownArrow,
            "bentArrow" => ShapePreset::BentArrow,
            "curvedRightArrow" => ShapePreset::CurvedRightArrow,
            "flowChartProcess" => ShapePreset::FlowChartProcess,
            "flowChartDecision" => ShapePreset::FlowChartDecision,
            "flowChartTerminator" => ShapePreset::FlowChartTerminator,
            "flowChartDocument" => ShapePreset::FlowChartDocument,
            "flowChartConnector" => ShapePreset::FlowChartConnector,
            "wedgeRectCallout" => ShapePreset::WedgeRectCallout,
            "wedgeRoundRectCallout" => ShapePreset::WedgeRoundRectCallout,
            "wedgeEllipseCallout" => ShapePreset::WedgeEllipseCallout,
            "cloudCallout" => ShapePreset::CloudCallout,
            other => ShapePreset::Other(other.to_string()),
        }
    }
}

/// A preset-geometry shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Width in points
    pub width_pt: f32,
    /// Height in points
    pub height_pt: f32,
    /// Preset geometry
    pub preset: ShapePreset,
    /// Fill color, six-hex uppercase
    pub fill: Option<String>,
    /// Outline color, six-hex uppercase
    pub outline: Option<String>,
    /// Outline width in points
    pub outline_width_pt: Option<f32>,
    /// Inner text, rendered in a text box
    pub text: Vec<Inline>,
    /// Rotation in degrees
    pub rotation: f32,
    /// Inline or floating
    pub position: Position,
}

impl Shape {
    /// A shape of the given preset and size.
    pub fn new(preset: ShapePreset, width_pt: f32, height_pt: f32) -> Self {
        Self {
            width_pt,
            height_pt,
            preset,
            fill: None,
            outline: None,
            outline_width_pt: None,
            text: Vec::new(),
            rotation: 0.0,
            position: Position::Inline,
        }
    }

    /// Return a copy with the given fill.
    pub fn filled(mut self, hex: impl Into<String>) -> Self {
        self.fill = Some(hex.into().to_uppercase());
        self
    }

    /// Return a copy with the given outline.
    pub fn outlined(mut self, hex: impl Into<String>, width_pt: f32) -> Self {
        self.outline = Some(hex.into().to_uppercase());
        self.outline_width_pt = Some(width_pt);
        self
    }
}
