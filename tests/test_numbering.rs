//! List and numbering tests: nine-level definitions, ilvl/numId wiring,
//! continuity across interruptions.

use docx_oxide::ast::{Block, Document, Inline, List, ListItem, NumberFormat};
use docx_oxide::ooxml::{DocxReader, DocxWriter};
use std::io::Read;

fn round_trip(doc: &Document) -> Document {
    let bytes = DocxWriter::new().write(doc).expect("write");
    DocxReader::read(&bytes).expect("read")
}

fn archive_part(bytes: &[u8], name: &str) -> String {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn item(text: &str, level: u8) -> ListItem {
    ListItem::new(vec![Inline::text(text)]).at_level(level)
}

#[test]
fn test_nested_list_levels_and_num_id() {
    // Items at levels {0, 0, 1, 1, 2, 0} with numId=1
    let list = List {
        num_id: 1,
        ..List::ordered(vec![
            item("one", 0),
            item("two", 0),
            item("two.a", 1),
            item("two.b", 1),
            item("two.b.i", 2),
            item("three", 0),
        ])
    };
    let doc = Document::with_blocks(vec![Block::List(list)]);
    let bytes = DocxWriter::new().write(&doc).unwrap();

    // numbering.xml defines abstractNumId 0 with nine levels
    let numbering = archive_part(&bytes, "word/numbering.xml");
    assert!(numbering.contains("w:abstractNumId=\"0\""));
    for level in 0..9 {
        assert!(numbering.contains(&format!("<w:lvl w:ilvl=\"{}\">", level)));
    }
    assert!(numbering.contains("<w:num w:numId=\"1\">"));

    // Each item paragraph carries its ilvl and numId=1
    let document = archive_part(&bytes, "word/document.xml");
    assert_eq!(document.matches("<w:numId w:val=\"1\"/>").count(), 6);
    assert_eq!(document.matches("<w:ilvl w:val=\"0\"/>").count(), 3);
    assert_eq!(document.matches("<w:ilvl w:val=\"1\"/>").count(), 2);
    assert_eq!(document.matches("<w:ilvl w:val=\"2\"/>").count(), 1);

    // And it reads back structurally identical
    let back = round_trip(&doc);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_bullet_list_round_trip() {
    let list = List {
        num_id: 1,
        ..List::bullet(vec![item("alpha", 0), item("beta", 0)])
    };
    let doc = Document::with_blocks(vec![Block::List(list)]);
    let back = round_trip(&doc);
    match &back.blocks[0] {
        Block::List(l) => {
            assert!(!l.is_ordered);
            assert_eq!(l.style.marker_font.as_deref(), Some("Symbol"));
            assert_eq!(l.style.levels[0].format, NumberFormat::Bullet);
        },
        other => panic!("expected list, got {:?}", other),
    }
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_list_continuity_across_interruption() {
    // A list interrupted by a plain paragraph and resumed with the same
    // numId: the second segment restarts counting at items-so-far + 1.
    let first = List {
        num_id: 1,
        ..List::ordered(vec![item("one", 0), item("two", 0)])
    };
    let second = List {
        num_id: 1,
        start_index: 3,
        ..List::ordered(vec![item("three", 0)])
    };
    let doc = Document::with_blocks(vec![
        Block::List(first),
        Block::paragraph(vec![Inline::text("an interruption")]),
        Block::List(second),
    ]);

    let back = round_trip(&doc);
    let lists: Vec<&List> = back
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::List(l) => Some(l),
            _ => None,
        })
        .collect();
    assert_eq!(lists.len(), 2);
    // Both segments share the numbering id
    assert_eq!(lists[0].num_id, lists[1].num_id);
    assert_eq!(lists[0].start_index, 1);
    // 1 + count of same-level items in the first segment
    assert_eq!(lists[1].start_index, 3);
    assert_eq!(doc.blocks, back.blocks);
}

#[test]
fn test_continuity_counts_only_same_level() {
    let first = List {
        num_id: 2,
        ..List::ordered(vec![item("one", 0), item("one.a", 1), item("one.b", 1)])
    };
    let second = List {
        num_id: 2,
        start_index: 2,
        ..List::ordered(vec![item("two", 0)])
    };
    let doc = Document::with_blocks(vec![
        Block::List(first),
        Block::paragraph(vec![Inline::text("gap")]),
        Block::List(second),
    ]);
    let back = round_trip(&doc);
    let lists: Vec<&List> = back
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::List(l) => Some(l),
            _ => None,
        })
        .collect();
    // Only the single level-0 item of the first segment counts
    assert_eq!(lists[1].start_index, 2);
}

#[test]
fn test_two_independent_lists_get_distinct_abstract_definitions() {
    let ordered = List {
        num_id: 1,
        ..List::ordered(vec![item("1", 0)])
    };
    let bullets = List {
        num_id: 2,
        ..List::bullet(vec![item("•", 0)])
    };
    let doc = Document::with_blocks(vec![
        Block::List(ordered),
        Block::paragraph(vec![Inline::text("between")]),
        Block::List(bullets),
    ]);
    let bytes = DocxWriter::new().write(&doc).unwrap();
    let numbering = archive_part(&bytes, "word/numbering.xml");
    assert!(numbering.contains("w:abstractNumId=\"0\""));
    assert!(numbering.contains("w:abstractNumId=\"1\""));
    assert!(numbering.contains("<w:num w:numId=\"1\">"));
    assert!(numbering.contains("<w:num w:numId=\"2\">"));
}

#[test]
fn test_start_override_for_explicit_start_index() {
    // A single list that begins at 4 carries a startOverride
    let list = List {
        num_id: 1,
        start_index: 4,
        ..List::ordered(vec![item("four", 0)])
    };
    let doc = Document::with_blocks(vec![Block::List(list)]);
    let bytes = DocxWriter::new().write(&doc).unwrap();
    let numbering = archive_part(&bytes, "word/numbering.xml");
    assert!(numbering.contains("<w:startOverride w:val=\"4\"/>"));

    let back = DocxReader::read(&bytes).unwrap();
    match &back.blocks[0] {
        Block::List(l) => assert_eq!(l.start_index, 4),
        other => panic!("expected list, got {:?}", other),
    }
}

#[test]
fn test_level_clamped_to_eight() {
    let list = List {
        num_id: 1,
        ..List::ordered(vec![ListItem {
            level: 8,
            inlines: vec![Inline::text("deep")],
            override_level: None,
        }])
    };
    let doc = Document::with_blocks(vec![Block::List(list)]);
    let back = round_trip(&doc);
    match &back.blocks[0] {
        Block::List(l) => assert_eq!(l.items[0].level, 8),
        other => panic!("expected list, got {:?}", other),
    }
}
