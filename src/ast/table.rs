//! Table nodes: rows, cells, merge primitives and conflict-resolution state.

use super::block::{Alignment, Block, BorderSide};

/// How a cell width (or table width) is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidthType {
    /// Sized by content (`w:type="auto"`)
    #[default]
    Auto,
    /// Fixed width in twips (`w:type="dxa"`)
    Twips,
    /// Percent of the available width, in fiftieths of a percent (`w:type="pct"`)
    Percent,
}

impl WidthType {
    /// WordprocessingML `w:type` value.
    pub fn as_str(self) -> &'static str {
        match self {
            WidthType::Auto => "auto",
            WidthType::Twips => "dxa",
            WidthType::Percent => "pct",
        }
    }

    /// Parse a WordprocessingML width type.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "auto" => WidthType::Auto,
            "dxa" => WidthType::Twips,
            "pct" => WidthType::Percent,
            _ => return None,
        })
    }
}

/// A width value plus its measurement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWidth {
    /// The magnitude, interpreted per `kind`
    pub amount: i32,
    /// How the magnitude is measured
    pub kind: WidthType,
}

/// Vertical merge state as found in the raw XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMerge {
    /// This cell starts a vertical merge region
    Restart,
    /// This cell continues the region started above (an empty `w:vMerge`
    /// defaults to continue)
    Continue,
}

/// Vertical alignment of cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    /// Top (default)
    #[default]
    Top,
    /// Centered
    Center,
    /// Bottom
    Bottom,
}

impl VerticalAlignment {
    /// WordprocessingML value.
    pub fn as_str(self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }

    /// Parse a WordprocessingML `w:vAlign` value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "top" => VerticalAlignment::Top,
            "center" => VerticalAlignment::Center,
            "bottom" => VerticalAlignment::Bottom,
            _ => return None,
        })
    }
}

/// Per-cell border set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellBorders {
    /// Top border
    pub top: Option<BorderSide>,
    /// Bottom border
    pub bottom: Option<BorderSide>,
    /// Left border
    pub left: Option<BorderSide>,
    /// Right border
    pub right: Option<BorderSide>,
}

impl CellBorders {
    /// True when no side is set.
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none() && self.left.is_none() && self.right.is_none()
    }
}

/// Table-level border set, including the inside grid lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableBorders {
    /// Top outer border
    pub top: Option<BorderSide>,
    /// Bottom outer border
    pub bottom: Option<BorderSide>,
    /// Left outer border
    pub left: Option<BorderSide>,
    /// Right outer border
    pub right: Option<BorderSide>,
    /// Horizontal lines between rows
    pub inside_h: Option<BorderSide>,
    /// Vertical lines between columns
    pub inside_v: Option<BorderSide>,
}

impl TableBorders {
    /// True when no side is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// A uniform single-line grid of the given size and color.
    pub fn grid(size: u32, color: impl Into<String>) -> Self {
        let side = BorderSide::single(size, color.into());
        Self {
            top: Some(side.clone()),
            bottom: Some(side.clone()),
            left: Some(side.clone()),
            right: Some(side.clone()),
            inside_h: Some(side.clone()),
            inside_v: Some(side),
        }
    }
}

/// Floating-table position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFloat {
    /// Horizontal anchor (`w:horzAnchor`): page, margin, column or character ("text")
    pub h_anchor: String,
    /// Vertical anchor (`w:vertAnchor`): page, margin, paragraph or line ("text")
    pub v_anchor: String,
    /// X offset in twips (`w:tblpX`)
    pub x: i32,
    /// Y offset in twips (`w:tblpY`)
    pub y: i32,
    /// Distance from surrounding text, twips: left
    pub left_from_text: i32,
    /// Distance from surrounding text, twips: right
    pub right_from_text: i32,
    /// Distance from surrounding text, twips: top
    pub top_from_text: i32,
    /// Distance from surrounding text, twips: bottom
    pub bottom_from_text: i32,
}

/// A table cell owning ordered blocks (nested tables included).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableCell {
    /// Cell content
    pub blocks: Vec<Block>,
    /// Horizontal span in grid columns, at least 1
    pub grid_span: u32,
    /// Vertical merge state as read from XML; resolved into `row_span`
    pub v_merge: Option<VMerge>,
    /// Effective vertical span after row-span resolution, at least 1
    pub row_span: u32,
    /// Shading fill, six-hex uppercase; "auto" resolves to no shading
    pub shading: Option<String>,
    /// Preferred width
    pub width: Option<CellWidth>,
    /// Vertical content alignment
    pub v_align: VerticalAlignment,
    /// Per-side borders
    pub borders: CellBorders,
}

impl TableCell {
    /// A cell holding the given blocks.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            grid_span: 1,
            row_span: 1,
            ..Self::default()
        }
    }

    /// Return a copy spanning `n` grid columns.
    pub fn spanning(mut self, n: u32) -> Self {
        self.grid_span = n.max(1);
        self
    }

    /// Return a copy with the given shading fill.
    pub fn shaded(mut self, hex: impl Into<String>) -> Self {
        self.shading = Some(hex.into().to_uppercase());
        self
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    /// Cells in grid order
    pub cells: Vec<TableCell>,
    /// Borders applied at row level (between cell and table precedence)
    pub borders: CellBorders,
    /// Row-level shading
    pub shading: Option<String>,
    /// Repeat as a header row on each page
    pub is_header: bool,
}

impl TableRow {
    /// A row from cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self { cells, ..Self::default() }
    }
}

/// Conditional-formatting flags (`w:tblLook` bitfield).
///
/// Bit values match the OOXML encoding: 0x0020 first row, 0x0040 last row,
/// 0x0080 first column, 0x0100 last column, 0x0200 no row banding, 0x0400
/// no column banding.
pub const TBL_LOOK_FIRST_ROW: u16 = 0x0020;
/// Last-row conditional formatting flag.
pub const TBL_LOOK_LAST_ROW: u16 = 0x0040;
/// First-column conditional formatting flag.
pub const TBL_LOOK_FIRST_COL: u16 = 0x0080;
/// Last-column conditional formatting flag.
pub const TBL_LOOK_LAST_COL: u16 = 0x0100;
/// Suppress row banding.
pub const TBL_LOOK_NO_H_BAND: u16 = 0x0200;
/// Suppress column banding.
pub const TBL_LOOK_NO_V_BAND: u16 = 0x0400;

/// A table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Rows in order
    pub rows: Vec<TableRow>,
    /// Table style id
    pub style_id: Option<String>,
    /// Explicit borders
    pub borders: TableBorders,
    /// Overall width
    pub width: Option<CellWidth>,
    /// Table alignment within the text column
    pub alignment: Option<Alignment>,
    /// Floating position, when the table is anchored
    pub float: Option<TableFloat>,
    /// Conditional style activation bitfield
    pub look: u16,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            style_id: None,
            borders: TableBorders::default(),
            width: None,
            alignment: None,
            float: None,
            look: TBL_LOOK_FIRST_ROW | TBL_LOOK_NO_H_BAND,
        }
    }
}

impl Table {
    /// A table from rows.
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self { rows, ..Self::default() }
    }

    /// Number of grid columns, from the widest row (spans included).
    pub fn column_count(&self) -> u32 {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.grid_span).sum::<u32>())
            .max()
            .unwrap_or(0)
    }
}
