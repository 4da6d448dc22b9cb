//! Table parsing and resolution: vertical-merge collapse, border and
//! shading conflict resolution.

use super::ReaderContext;
use crate::ast::{
    Alignment, BorderSide, BorderStyle, CellBorders, CellWidth, Table, TableBorders, TableCell,
    TableFloat, TableRow, VMerge, VerticalAlignment, WidthType,
};
use crate::error::Result;
use crate::ooxml::dom::XmlNode;

/// Parse a `w:tbl` element, resolving vertical merges into row spans.
pub(crate) fn parse_table(node: &XmlNode, ctx: &mut ReaderContext) -> Result<Table> {
    let mut table = Table::new(Vec::new());

    if let Some(tbl_pr) = node.child("tblPr") {
        table.style_id = tbl_pr.child("tblStyle").and_then(|s| s.val()).map(|s| s.to_string());
        table.alignment = tbl_pr.child("jc").and_then(|j| j.val()).and_then(Alignment::parse);
        table.width = tbl_pr.child("tblW").and_then(parse_width);
        if let Some(borders) = tbl_pr.child("tblBorders") {
            table.borders = TableBorders {
                top: parse_border_side(borders.child("top")),
                left: parse_border_side(borders.child("left")),
                bottom: parse_border_side(borders.child("bottom")),
                right: parse_border_side(borders.child("right")),
                inside_h: parse_border_side(borders.child("insideH")),
                inside_v: parse_border_side(borders.child("insideV")),
            };
        }
        if let Some(look) = tbl_pr.child("tblLook").and_then(|l| l.val()) {
            if let Ok(bits) = u16::from_str_radix(look, 16) {
                table.look = bits;
            }
        }
        if let Some(float) = tbl_pr.child("tblpPr") {
            let get = |name: &str| {
                float.attr_local(name).and_then(|v| v.parse::<i32>().ok()).unwrap_or(0)
            };
            table.float = Some(TableFloat {
                h_anchor: float.attr_local("horzAnchor").unwrap_or("margin").to_string(),
                v_anchor: float.attr_local("vertAnchor").unwrap_or("paragraph").to_string(),
                x: get("tblpX"),
                y: get("tblpY"),
                left_from_text: get("leftFromText"),
                right_from_text: get("rightFromText"),
                top_from_text: get("topFromText"),
                bottom_from_text: get("bottomFromText"),
            });
        }
    }

    // First pass: collect raw cells with their grid positions.
    let mut raw_rows: Vec<(TableRow, Vec<(u32, TableCell)>)> = Vec::new();
    for tr in node.children_named("tr") {
        let mut row = TableRow::new(Vec::new());
        if let Some(tr_pr) = tr.child("trPr") {
            row.is_header = tr_pr.child("tblHeader").map(|t| t.as_toggle()).unwrap_or(false);
        }
        let mut col = 0u32;
        let mut cells = Vec::new();
        for tc in tr.children_named("tc") {
            let cell = parse_cell(tc, ctx)?;
            let span = cell.grid_span;
            cells.push((col, cell));
            col += span;
        }
        raw_rows.push((row, cells));
    }

    resolve_vertical_merges(&mut raw_rows);

    for (mut row, cells) in raw_rows {
        row.cells = cells.into_iter().map(|(_, c)| c).collect();
        table.rows.push(row);
    }
    Ok(table)
}

/// Second pass: each restart cell absorbs the continue cells below it at
/// the same column; absorbed cells are removed from the model.
fn resolve_vertical_merges(rows: &mut Vec<(TableRow, Vec<(u32, TableCell)>)>) {
    let row_count = rows.len();
    for r in 0..row_count {
        for i in 0..rows[r].1.len() {
            let (col, is_restart) = {
                let (c, cell) = &rows[r].1[i];
                (*c, cell.v_merge == Some(VMerge::Restart))
            };
            if !is_restart {
                continue;
            }
            let mut span = 1u32;
            for below in rows.iter().skip(r + 1) {
                let continues = below
                    .1
                    .iter()
                    .any(|(c, cell)| *c == col && cell.v_merge == Some(VMerge::Continue));
                if continues {
                    span += 1;
                } else {
                    break;
                }
            }
            let (_, cell) = &mut rows[r].1[i];
            cell.row_span = span;
            cell.v_merge = None;
        }
    }
    // Drop the absorbed continuation cells; orphan continues (no restart
    // above) stay as ordinary cells.
    for r in 0..row_count {
        let cols_with_restart_above: Vec<u32> = (0..r)
            .flat_map(|above| {
                rows[above]
                    .1
                    .iter()
                    .filter(|(_, cell)| cell.row_span as usize > r - above)
                    .map(|(c, _)| *c)
                    .collect::<Vec<u32>>()
            })
            .collect();
        rows[r].1.retain(|(c, cell)| {
            !(cell.v_merge == Some(VMerge::Continue) && cols_with_restart_above.contains(c))
        });
        for (_, cell) in &mut rows[r].1 {
            if cell.v_merge == Some(VMerge::Continue) {
                cell.v_merge = None;
            }
        }
    }
}

fn parse_cell(tc: &XmlNode, ctx: &mut ReaderContext) -> Result<TableCell> {
    let mut cell = TableCell::new(Vec::new());
    if let Some(tc_pr) = tc.child("tcPr") {
        if let Some(span) = tc_pr.child("gridSpan").and_then(|g| g.val_int()) {
            cell.grid_span = (span.max(1)) as u32;
        }
        if let Some(merge) = tc_pr.child("vMerge") {
            // An empty w:vMerge defaults to continue
            cell.v_merge = Some(match merge.val() {
                Some("restart") => VMerge::Restart,
                _ => VMerge::Continue,
            });
        }
        cell.width = tc_pr.child("tcW").and_then(parse_width);
        cell.v_align = tc_pr
            .child("vAlign")
            .and_then(|v| v.val())
            .and_then(VerticalAlignment::parse)
            .unwrap_or_default();
        // "auto" shading resolves to no shading applied
        cell.shading = tc_pr
            .child("shd")
            .and_then(|s| s.attr_local("fill"))
            .and_then(crate::ooxml::styles::parse_color_attr);
        if let Some(borders) = tc_pr.child("tcBorders") {
            cell.borders = CellBorders {
                top: parse_border_side(borders.child("top")),
                left: parse_border_side(borders.child("left")),
                bottom: parse_border_side(borders.child("bottom")),
                right: parse_border_side(borders.child("right")),
            };
        }
    }
    cell.blocks = super::body::parse_blocks(tc, ctx)?;
    // The mandatory trailing empty paragraph of an otherwise empty cell
    // carries no content
    if let [crate::ast::Block::Paragraph(p)] = cell.blocks.as_slice() {
        if p.inlines.is_empty() && p.props.is_empty() {
            cell.blocks.clear();
        }
    }
    Ok(cell)
}

/// Parse a `w:tcW`/`w:tblW` width element.
fn parse_width(node: &XmlNode) -> Option<CellWidth> {
    let amount = node.attr_local("w")?.parse::<i32>().ok()?;
    let kind = node.attr_local("type").and_then(WidthType::parse).unwrap_or(WidthType::Twips);
    if kind == WidthType::Auto && amount == 0 {
        return None;
    }
    Some(CellWidth { amount, kind })
}

/// Parse a border side element (`w:top`, `w:bdr`, ...).
pub(crate) fn parse_border_side(node: Option<&XmlNode>) -> Option<BorderSide> {
    let node = node?;
    let style = node.val().and_then(BorderStyle::parse)?;
    Some(BorderSide {
        style,
        size: node.attr_local("sz").and_then(|v| v.parse().ok()).unwrap_or(0),
        color: node
            .attr_local("color")
            .map(|c| if c.eq_ignore_ascii_case("auto") { "auto".to_string() } else { c.to_uppercase() })
            .unwrap_or_else(|| "auto".to_string()),
    })
}

/// Resolve one border position through the conflict-precedence chain,
/// highest first: cell, row, explicit table border, style-based table
/// border, document default.
///
/// An explicit "none" (style [`BorderStyle::None`]) is a value — it stops
/// the search — while an absent side keeps falling through.
pub fn resolve_cell_border(
    cell: Option<&BorderSide>,
    row: Option<&BorderSide>,
    table: Option<&BorderSide>,
    style: Option<&BorderSide>,
    document_default: Option<&BorderSide>,
) -> Option<BorderSide> {
    for candidate in [cell, row, table, style, document_default] {
        if let Some(side) = candidate {
            return Some(side.clone());
        }
    }
    None
}

/// Resolve shading through the same precedence; `auto` has already been
/// mapped to `None` at parse time, so the first present value wins.
pub fn resolve_cell_shading(
    cell: Option<&str>,
    row: Option<&str>,
    table: Option<&str>,
    style: Option<&str>,
) -> Option<String> {
    for candidate in [cell, row, table, style] {
        if let Some(fill) = candidate {
            return Some(fill.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_precedence_cell_wins() {
        let cell = BorderSide::single(8, "FF0000");
        let table = BorderSide::single(4, "000000");
        let resolved = resolve_cell_border(Some(&cell), None, Some(&table), None, None);
        assert_eq!(resolved.unwrap().color, "FF0000");
    }

    #[test]
    fn test_border_none_overrides_lower_levels() {
        // "none" at cell level beats a present table border
        let none = BorderSide::none();
        let table = BorderSide::single(4, "000000");
        let resolved = resolve_cell_border(Some(&none), None, Some(&table), None, None).unwrap();
        assert_eq!(resolved.style, BorderStyle::None);
    }

    #[test]
    fn test_border_absent_falls_through() {
        let style = BorderSide::single(2, "CCCCCC");
        let resolved = resolve_cell_border(None, None, None, Some(&style), None).unwrap();
        assert_eq!(resolved.color, "CCCCCC");
        assert_eq!(resolve_cell_border(None, None, None, None, None), None);
    }

    #[test]
    fn test_shading_precedence() {
        assert_eq!(
            resolve_cell_shading(Some("FFFF00"), Some("00FF00"), None, None).as_deref(),
            Some("FFFF00")
        );
        assert_eq!(resolve_cell_shading(None, None, Some("EEEEEE"), None).as_deref(), Some("EEEEEE"));
        assert_eq!(resolve_cell_shading(None, None, None, None), None);
    }

    #[test]
    fn test_parse_border_side_defaults() {
        let node = crate::ooxml::dom::parse(r#"<w:top w:val="single" w:sz="4"/>"#).unwrap();
        let side = parse_border_side(Some(&node)).unwrap();
        assert_eq!(side.style, BorderStyle::Single);
        assert_eq!(side.size, 4);
        assert_eq!(side.color, "auto");
    }

    #[test]
    fn test_parse_width_auto_zero_is_none() {
        let node = crate::ooxml::dom::parse(r#"<w:tblW w:w="0" w:type="auto"/>"#).unwrap();
        assert_eq!(parse_width(&node), None);
        let node = crate::ooxml::dom::parse(r#"<w:tcW w:w="2500" w:type="pct"/>"#).unwrap();
        let width = parse_width(&node).unwrap();
        assert_eq!(width.amount, 2500);
        assert_eq!(width.kind, WidthType::Percent);
    }

    #[test]
    fn test_vertical_merge_resolution() {
        // Row 0: [A][B][C restart]; row 1: [D span2][C continue]
        let mk = |v_merge, span: u32| {
            let mut cell = TableCell::new(Vec::new());
            cell.v_merge = v_merge;
            cell.grid_span = span;
            cell
        };
        let mut rows = vec![
            (
                TableRow::new(Vec::new()),
                vec![
                    (0u32, mk(None, 1)),
                    (1u32, mk(None, 1)),
                    (2u32, mk(Some(VMerge::Restart), 1)),
                ],
            ),
            (
                TableRow::new(Vec::new()),
                vec![(0u32, mk(None, 2)), (2u32, mk(Some(VMerge::Continue), 1))],
            ),
        ];
        resolve_vertical_merges(&mut rows);
        assert_eq!(rows[0].1.len(), 3);
        assert_eq!(rows[0].1[2].1.row_span, 2);
        // The continuation cell is removed from row 1
        assert_eq!(rows[1].1.len(), 1);
        assert_eq!(rows[1].1[0].1.grid_span, 2);
    }

    #[test]
    fn test_orphan_continue_becomes_plain_cell() {
        let mk = |v_merge| {
            let mut cell = TableCell::new(Vec::new());
            cell.v_merge = v_merge;
            cell
        };
        let mut rows = vec![(
            TableRow::new(Vec::new()),
            vec![(0u32, mk(Some(VMerge::Continue)))],
        )];
        resolve_vertical_merges(&mut rows);
        assert_eq!(rows[0].1.len(), 1);
        assert_eq!(rows[0].1[0].1.v_merge, None);
        assert_eq!(rows[0].1[0].1.row_span, 1);
    }
}
