//! Header, footer, footnote and endnote part emission.
//!
//! These parts own their relationships: an image referenced from a header
//! registers in `word/_rels/header1.xml.rels`, not in the document's.

use super::body::{write_blocks, BodyContext};
use super::MediaPool;
use crate::ast::Block;
use crate::error::{Result, Warning};
use crate::ids::IdRegistry;
use crate::ooxml::Relationship;
use crate::xml::XmlBuilder;
use std::collections::BTreeMap;

const PART_NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:r", crate::ooxml::NS_R),
    ("xmlns:w", crate::ooxml::NS_W),
    ("xmlns:wp", crate::ooxml::NS_WP),
    ("xmlns:wps", crate::ooxml::NS_WPS),
];

/// Render a header (`w:hdr`) or footer (`w:ftr`) part.
///
/// Returns the XML and the part's own relationships.
pub(crate) fn write_header_footer(
    root: &'static str,
    blocks: &[Block],
    registry: &mut IdRegistry,
    media: &mut MediaPool,
    warnings: &mut Vec<Warning>,
    part_name: &str,
) -> Result<(String, Vec<Relationship>)> {
    let mut rels = Vec::new();
    let mut b = XmlBuilder::new();
    b.open(root, PART_NAMESPACES);
    {
        let mut ctx = BodyContext {
            registry,
            rels: &mut rels,
            media,
            warnings,
            part: part_name,
        };
        if blocks.is_empty() {
            b.empty("w:p", &[]);
        } else {
            write_blocks(&mut b, blocks, &mut ctx)?;
        }
    }
    b.close();
    Ok((b.finish(), rels))
}

/// Render `word/footnotes.xml` or `word/endnotes.xml` from structured
/// definitions, separators included.
///
/// Returns the XML and the part's own relationships.
pub(crate) fn write_notes_part(
    root: &'static str,
    item: &'static str,
    notes: &BTreeMap<u32, Vec<Block>>,
    registry: &mut IdRegistry,
    media: &mut MediaPool,
    warnings: &mut Vec<Warning>,
    part_name: &str,
) -> Result<(String, Vec<Relationship>)> {
    let is_footnote = item == "w:footnote";
    let mut rels = Vec::new();
    let mut b = XmlBuilder::new();
    b.open(root, PART_NAMESPACES);

    // The standard separator definitions occupy ids -1 and 0
    write_separator(&mut b, item, "-1", "separator", "w:separator");
    write_separator(&mut b, item, "0", "continuationSeparator", "w:continuationSeparator");

    for (id, blocks) in notes {
        b.open(item, &[("w:id", &id.to_string())]);
        let mut ctx = BodyContext {
            registry: &mut *registry,
            rels: &mut rels,
            media: &mut *media,
            warnings: &mut *warnings,
            part: part_name,
        };
        write_note_content(&mut b, blocks, is_footnote, &mut ctx)?;
        b.close();
    }

    b.close();
    Ok((b.finish(), rels))
}

fn write_separator(b: &mut XmlBuilder, item: &'static str, id: &str, kind: &str, marker: &str) {
    b.open(item, &[("w:type", kind), ("w:id", id)]);
    b.open("w:p", &[]);
    b.open("w:pPr", &[]);
    b.empty("w:spacing", &[("w:after", "0"), ("w:line", "240"), ("w:lineRule", "auto")]);
    b.close();
    b.open("w:r", &[]);
    b.empty(marker, &[]);
    b.close();
    b.close();
    b.close();
}

/// Emit a note's blocks, prefixing the first paragraph with the standard
/// self-reference marker run.
fn write_note_content(
    b: &mut XmlBuilder,
    blocks: &[Block],
    is_footnote: bool,
    ctx: &mut BodyContext,
) -> Result<()> {
    let (style, ref_style, marker) = if is_footnote {
        ("FootnoteText", "FootnoteReference", "w:footnoteRef")
    } else {
        ("EndnoteText", "EndnoteReference", "w:endnoteRef")
    };
    match blocks.first() {
        Some(Block::Paragraph(first)) => {
            b.open("w:p", &[]);
            b.open("w:pPr", &[]);
            b.empty("w:pStyle", &[("w:val", first.props.style_id.as_deref().unwrap_or(style))]);
            b.close();
            b.open("w:r", &[]);
            b.open("w:rPr", &[]);
            b.empty("w:rStyle", &[("w:val", ref_style)]);
            b.close();
            b.empty(marker, &[]);
            b.close();
            // A space separates the marker from the note text
            b.open("w:r", &[]);
            b.preserved_text("w:t", " ");
            b.close();
            super::body::write_inlines(b, &first.inlines, ctx)?;
            b.close();
            write_blocks(b, &blocks[1..], ctx)?;
        },
        _ => {
            write_blocks(b, blocks, ctx)?;
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Inline;

    #[test]
    fn test_header_part_namespaces_and_content() {
        let mut registry = IdRegistry::with_seed(1);
        let mut media = MediaPool::default();
        let mut warnings = Vec::new();
        let blocks = vec![Block::paragraph(vec![Inline::text("Running head")])];
        let (xml, rels) = write_header_footer(
            "w:hdr",
            &blocks,
            &mut registry,
            &mut media,
            &mut warnings,
            "word/header1.xml",
        )
        .unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<w:hdr"));
        assert!(xml.contains("Running head"));
        assert!(rels.is_empty());
    }

    #[test]
    fn test_header_image_rel_is_part_local() {
        let mut registry = IdRegistry::with_seed(1);
        let mut media = MediaPool::default();
        let mut warnings = Vec::new();
        let image = crate::ast::InlineImage::new(
            crate::ast::ImageData::new(vec![9u8; 4], "png", 4, 4),
            10.0,
            10.0,
        );
        let blocks = vec![Block::paragraph(vec![Inline::Image(image)])];
        let (_, rels) = write_header_footer(
            "w:hdr",
            &blocks,
            &mut registry,
            &mut media,
            &mut warnings,
            "word/header1.xml",
        )
        .unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].target, "media/image1.png");
    }

    #[test]
    fn test_notes_part_has_separators_and_definition() {
        let mut registry = IdRegistry::with_seed(1);
        let mut media = MediaPool::default();
        let mut warnings = Vec::new();
        let mut notes = BTreeMap::new();
        notes.insert(2, vec![Block::paragraph(vec![Inline::text("the note")])]);
        let (xml, _) = write_notes_part(
            "w:footnotes",
            "w:footnote",
            &notes,
            &mut registry,
            &mut media,
            &mut warnings,
            "word/footnotes.xml",
        )
        .unwrap();
        assert!(xml.contains("w:type=\"separator\" w:id=\"-1\""));
        assert!(xml.contains("w:type=\"continuationSeparator\" w:id=\"0\""));
        assert!(xml.contains("<w:footnote w:id=\"2\">"));
        assert!(xml.contains("<w:footnoteRef/>"));
        assert!(xml.contains("the note"));
        assert!(xml.contains("FootnoteText"));
    }

    #[test]
    fn test_endnote_marker_styles() {
        let mut registry = IdRegistry::with_seed(1);
        let mut media = MediaPool::default();
        let mut warnings = Vec::new();
        let mut notes = BTreeMap::new();
        notes.insert(1, vec![Block::paragraph(vec![Inline::text("see also")])]);
        let (xml, _) = write_notes_part(
            "w:endnotes",
            "w:endnote",
            &notes,
            &mut registry,
            &mut media,
            &mut warnings,
            "word/endnotes.xml",
        )
        .unwrap();
        assert!(xml.contains("<w:endnoteRef/>"));
        assert!(xml.contains("EndnoteReference"));
    }
}
