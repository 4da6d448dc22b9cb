//! Table round-trips: vertical merge resolution, spans, borders, shading,
//! floating position, nested tables.

use docx_oxide::ast::{
    Block, BorderSide, BorderStyle, CellWidth, Document, Inline, Table, TableBorders, TableCell,
    TableFloat, TableRow, VerticalAlignment, WidthType,
};
use docx_oxide::ooxml::{DocxReader, DocxWriter};

fn cell(text: &str) -> TableCell {
    TableCell::new(vec![Block::paragraph(vec![Inline::text(text)])])
}

fn round_trip(doc: &Document) -> Document {
    let bytes = DocxWriter::new().write(doc).expect("write");
    DocxReader::read(&bytes).expect("read")
}

#[test]
fn test_basic_grid_round_trip() {
    let table = Table::new(vec![
        TableRow::new(vec![cell("a"), cell("b")]),
        TableRow::new(vec![cell("c"), cell("d")]),
    ]);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_vertical_merge_with_mixed_grid_span() {
    // Header row [A][B][C restart]; next row [D gridSpan=2][continuation].
    // After resolution: row 0 has three cells with C spanning 2 rows; row 1
    // has the single spanning cell D.
    let mut c_cell = cell("C");
    c_cell.row_span = 2;
    let table = Table::new(vec![
        TableRow::new(vec![cell("A"), cell("B"), c_cell]),
        TableRow::new(vec![cell("D").spanning(2)]),
    ]);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);

    match &back.blocks[0] {
        Block::Table(t) => {
            assert_eq!(t.rows[0].cells.len(), 3);
            assert_eq!(t.rows[0].cells[2].row_span, 2);
            assert_eq!(t.rows[1].cells.len(), 1);
            assert_eq!(t.rows[1].cells[0].grid_span, 2);
        },
        other => panic!("expected table, got {:?}", other),
    }
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_cell_attributes_round_trip() {
    let mut fancy = cell("styled");
    fancy = fancy.shaded("FFE599");
    fancy.width = Some(CellWidth {
        amount: 2500,
        kind: WidthType::Percent,
    });
    fancy.v_align = VerticalAlignment::Center;
    fancy.borders.top = Some(BorderSide {
        style: BorderStyle::Dashed,
        size: 8,
        color: "FF0000".to_string(),
    });
    let table = Table::new(vec![TableRow::new(vec![fancy, cell("plain")])]);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_table_level_attributes_round_trip() {
    let mut table = Table::new(vec![TableRow::new(vec![cell("x"), cell("y")])]);
    table.style_id = Some("TableGrid".to_string());
    table.borders = TableBorders::grid(4, "000000");
    table.width = Some(CellWidth {
        amount: 9000,
        kind: WidthType::Twips,
    });
    table.alignment = Some(docx_oxide::ast::Alignment::Center);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_floating_table_round_trip() {
    let mut table = Table::new(vec![TableRow::new(vec![cell("floats")])]);
    table.float = Some(TableFloat {
        h_anchor: "page".to_string(),
        v_anchor: "paragraph".to_string(),
        x: 1440,
        y: 720,
        left_from_text: 180,
        right_from_text: 180,
        top_from_text: 0,
        bottom_from_text: 0,
    });
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_nested_table_round_trip() {
    let inner = Table::new(vec![TableRow::new(vec![cell("inner")])]);
    let outer_cell = TableCell::new(vec![
        Block::paragraph(vec![Inline::text("above")]),
        Block::Table(inner),
        Block::paragraph(vec![Inline::text("below")]),
    ]);
    let table = Table::new(vec![TableRow::new(vec![outer_cell, cell("side")])]);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_header_row_round_trip() {
    let mut header = TableRow::new(vec![cell("Name"), cell("Value")]);
    header.is_header = true;
    let table = Table::new(vec![header, TableRow::new(vec![cell("a"), cell("1")])]);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_empty_cell_round_trip() {
    let table = Table::new(vec![TableRow::new(vec![TableCell::new(Vec::new()), cell("b")])]);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_border_precedence_resolution() {
    use docx_oxide::ooxml::reader::{resolve_cell_border, resolve_cell_shading};

    let cell_border = BorderSide::single(8, "FF0000");
    let row_border = BorderSide::single(6, "00FF00");
    let table_border = BorderSide::single(4, "0000FF");
    let style_border = BorderSide::single(2, "CCCCCC");

    // Highest-precedence non-empty value wins
    assert_eq!(
        resolve_cell_border(
            Some(&cell_border),
            Some(&row_border),
            Some(&table_border),
            Some(&style_border),
            None
        ),
        Some(cell_border.clone())
    );
    assert_eq!(
        resolve_cell_border(None, Some(&row_border), Some(&table_border), None, None),
        Some(row_border)
    );
    // Explicit none overrides everything below, and is distinct from absent
    let none = BorderSide::none();
    assert_eq!(
        resolve_cell_border(Some(&none), None, Some(&table_border), None, None),
        Some(none)
    );
    assert_eq!(resolve_cell_border(None, None, None, None, None), None);

    // Shading follows the same chain; "auto" was mapped to absent at parse
    assert_eq!(
        resolve_cell_shading(Some("FFFF00"), None, Some("EEEEEE"), None).as_deref(),
        Some("FFFF00")
    );
    assert_eq!(resolve_cell_shading(None, None, None, Some("111111")).as_deref(), Some("111111"));
}

#[test]
fn test_three_row_merge() {
    let mut top = cell("tall");
    top.row_span = 3;
    let table = Table::new(vec![
        TableRow::new(vec![top, cell("r0")]),
        TableRow::new(vec![cell("r1")]),
        TableRow::new(vec![cell("r2")]),
    ]);
    let doc = Document::with_blocks(vec![Block::Table(table)]);
    let back = round_trip(&doc);
    match &back.blocks[0] {
        Block::Table(t) => {
            assert_eq!(t.rows[0].cells[0].row_span, 3);
            assert_eq!(t.rows[1].cells.len(), 1);
            assert_eq!(t.rows[2].cells.len(), 1);
        },
        other => panic!("expected table, got {:?}", other),
    }
    assert_eq!(doc.blocks, back.blocks);
}
