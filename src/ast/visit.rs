//! Visitor entry points for walking a document tree.
//!
//! Readers, writers and transformers all traverse the same shape; the
//! default method bodies walk children so an implementation only overrides
//! the node kinds it cares about.

use super::block::{Block, DropCap, ImageBlock, Paragraph, ShapeBlock, TableOfContents};
use super::inline::{Inline, Text};
use super::list::List;
use super::table::Table;
use super::{Document, SectionProperties};

/// A read-only visitor over blocks and inlines.
pub trait Visitor {
    /// Visit a block; the default dispatches to the kind-specific methods.
    fn visit_block(&mut self, block: &Block) {
        match block {
            Block::Paragraph(p) => self.visit_paragraph(p),
            Block::Table(t) => self.visit_table(t),
            Block::List(l) => self.visit_list(l),
            Block::Image(i) => self.visit_image_block(i),
            Block::Shape(s) => self.visit_shape_block(s),
            Block::SectionBreak(s) => self.visit_section_break(s),
            Block::DropCap(d) => self.visit_drop_cap(d),
            Block::TableOfContents(t) => self.visit_toc(t),
        }
    }

    /// Visit a paragraph; the default walks its inlines.
    fn visit_paragraph(&mut self, paragraph: &Paragraph) {
        for inline in &paragraph.inlines {
            self.visit_inline(inline);
        }
    }

    /// Visit a table; the default walks every cell's blocks.
    fn visit_table(&mut self, table: &Table) {
        for row in &table.rows {
            for cell in &row.cells {
                for block in &cell.blocks {
                    self.visit_block(block);
                }
            }
        }
    }

    /// Visit a list; the default walks every item's inlines.
    fn visit_list(&mut self, list: &List) {
        for item in &list.items {
            for inline in &item.inlines {
                self.visit_inline(inline);
            }
        }
    }

    /// Visit a block-level image.
    fn visit_image_block(&mut self, _image: &ImageBlock) {}

    /// Visit a block-level shape; the default walks its inner text.
    fn visit_shape_block(&mut self, shape: &ShapeBlock) {
        for inline in &shape.shape.text {
            self.visit_inline(inline);
        }
    }

    /// Visit a section break.
    fn visit_section_break(&mut self, _section: &SectionProperties) {}

    /// Visit a drop cap; the default walks the remaining inlines.
    fn visit_drop_cap(&mut self, drop_cap: &DropCap) {
        for inline in &drop_cap.rest {
            self.visit_inline(inline);
        }
    }

    /// Visit a table-of-contents field.
    fn visit_toc(&mut self, _toc: &TableOfContents) {}

    /// Visit an inline; the default dispatches text runs and shapes.
    fn visit_inline(&mut self, inline: &Inline) {
        match inline {
            Inline::Text(t) => self.visit_text(t),
            Inline::Shape(s) => {
                for i in &s.text {
                    self.visit_inline(i);
                }
            },
            _ => {},
        }
    }

    /// Visit a text run.
    fn visit_text(&mut self, _text: &Text) {}
}

/// Walk every block of a document, including notes and header/footer content.
pub fn walk_document<V: Visitor>(visitor: &mut V, document: &Document) {
    for block in &document.blocks {
        visitor.visit_block(block);
    }
    for content in document.footnotes.values().chain(document.endnotes.values()) {
        for block in content {
            visitor.visit_block(block);
        }
    }
    for hf in [&document.section.header, &document.section.footer].into_iter().flatten() {
        for block in &hf.blocks {
            visitor.visit_block(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::table::{TableCell, TableRow};
    use crate::ast::HeaderFooter;

    #[derive(Default)]
    struct TextCollector {
        texts: Vec<String>,
    }

    impl Visitor for TextCollector {
        fn visit_text(&mut self, text: &Text) {
            self.texts.push(text.content.clone());
        }
    }

    #[test]
    fn test_walk_collects_nested_text() {
        let table = Table::new(vec![TableRow::new(vec![TableCell::new(vec![Block::paragraph(
            vec![Inline::text("in cell")],
        )])])]);
        let doc = Document::with_blocks(vec![
            Block::paragraph(vec![Inline::text("top")]),
            Block::Table(table),
        ]);

        let mut collector = TextCollector::default();
        walk_document(&mut collector, &doc);
        assert_eq!(collector.texts, vec!["top", "in cell"]);
    }

    #[test]
    fn test_walk_includes_notes_and_headers() {
        let mut doc = Document::with_blocks(vec![Block::paragraph(vec![Inline::text("body")])])
            .with_footnote(1, vec![Block::paragraph(vec![Inline::text("note")])]);
        doc.section.header =
            Some(HeaderFooter::new(vec![Block::paragraph(vec![Inline::text("header")])]));

        let mut collector = TextCollector::default();
        walk_document(&mut collector, &doc);
        assert_eq!(collector.texts, vec!["body", "note", "header"]);
    }
}
