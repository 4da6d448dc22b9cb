//! The container writer: document AST in, ZIP-of-XML-parts out.
//!
//! The archive is assembled fully in memory before it reaches the caller;
//! nothing is written to a destination until the complete byte sequence is
//! known. Preservation-first policy: parts carried through from a read
//! (styles, numbering, settings, webSettings, fontTable, content types,
//! root relationships) are emitted byte-for-byte; everything else is
//! synthesized from the AST.

pub(crate) mod body;
pub(crate) mod drawing;
pub(crate) mod notes;
pub(crate) mod numbering;

use crate::ast::{Block, Document, ImageData, List, Visitor};
use crate::error::{Result, Warning};
use crate::ids::{IdRegistry, ReservedRel};
use crate::ooxml::{content_type, image_content_type, rel_type, Relationship};
use crate::xml::XmlBuilder;
use bytes::Bytes;
use indexmap::IndexMap;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deduplicated media payloads, one archive entry per distinct byte identity.
#[derive(Debug, Default)]
pub(crate) struct MediaPool {
    entries: IndexMap<(usize, usize), (String, Bytes)>,
    counter: u32,
}

impl MediaPool {
    /// Register a payload, returning its file name under `word/media/`.
    pub fn add(&mut self, data: &ImageData) -> String {
        if let Some((name, _)) = self.entries.get(&data.identity()) {
            return name.clone();
        }
        self.counter += 1;
        let name = format!("image{}.{}", self.counter, data.extension);
        self.entries.insert(data.identity(), (name.clone(), data.bytes.clone()));
        name
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Bytes)> {
        self.entries.values().map(|(n, b)| (n, b))
    }

    fn extensions(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (name, _) in self.entries.values() {
            if let Some(ext) = name.rsplit('.').next() {
                if !seen.iter().any(|e| e == ext) {
                    seen.push(ext.to_string());
                }
            }
        }
        seen
    }
}

/// One concrete numbering instance scheduled for `word/numbering.xml`.
#[derive(Debug, Clone)]
pub(crate) struct NumberingInstance {
    pub num_id: u32,
    pub abstract_id: u32,
    pub style: crate::ast::ListStyle,
    pub start_override: Option<u32>,
}

/// Serializes a [`Document`] into an OOXML package.
#[derive(Debug, Default)]
pub struct DocxWriter {
    registry: IdRegistry,
    warnings: Vec<Warning>,
}

impl DocxWriter {
    /// A writer with a fresh identifier registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer continuing from an existing registry (ids seen on read are
    /// never re-issued).
    pub fn with_registry(registry: IdRegistry) -> Self {
        Self {
            registry,
            warnings: Vec::new(),
        }
    }

    /// Warnings recorded during the last write (clamped values).
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Serialize the document. The input is not mutated.
    pub fn write(&mut self, document: &Document) -> Result<Vec<u8>> {
        self.warnings.clear();
        self.registry.reset_rels();

        // Lists may arrive without a concrete numbering id; assign the free
        // ids up front so body serialization and numbering.xml agree.
        let (document, numbering) = assign_numbering(document.clone());

        let mut media = MediaPool::default();
        let mut doc_rels: Vec<Relationship> = Vec::new();

        // Reserved relationship slots for the standard parts, in their
        // canonical order.
        let rid_styles = self.registry.reserve_rel(ReservedRel::Styles);
        let rid_settings = self.registry.reserve_rel(ReservedRel::Settings);
        let rid_web = self.registry.reserve_rel(ReservedRel::WebSettings);
        let rid_fonts = self.registry.reserve_rel(ReservedRel::FontTable);
        doc_rels.push(Relationship::internal(&rid_styles, rel_type::STYLES, "styles.xml"));
        doc_rels.push(Relationship::internal(&rid_settings, rel_type::SETTINGS, "settings.xml"));
        doc_rels.push(Relationship::internal(&rid_web, rel_type::WEB_SETTINGS, "webSettings.xml"));
        doc_rels.push(Relationship::internal(&rid_fonts, rel_type::FONT_TABLE, "fontTable.xml"));

        let has_numbering = !numbering.is_empty() || document.preserved.numbering.is_some();
        if has_numbering {
            let rid = self.registry.reserve_rel(ReservedRel::Numbering);
            doc_rels.push(Relationship::internal(&rid, rel_type::NUMBERING, "numbering.xml"));
        }
        let has_footnotes =
            !document.footnotes.is_empty() || document.preserved.footnotes.is_some();
        if has_footnotes {
            let rid = self.registry.reserve_rel(ReservedRel::Footnotes);
            doc_rels.push(Relationship::internal(&rid, rel_type::FOOTNOTES, "footnotes.xml"));
        }
        let has_endnotes = !document.endnotes.is_empty() || document.preserved.endnotes.is_some();
        if has_endnotes {
            let rid = self.registry.reserve_rel(ReservedRel::Endnotes);
            doc_rels.push(Relationship::internal(&rid, rel_type::ENDNOTES, "endnotes.xml"));
        }

        // Body first: images and hyperlinks take their relationship ids in
        // encounter order.
        let mut body = XmlBuilder::fragment();
        {
            let mut ctx = body::BodyContext {
                registry: &mut self.registry,
                rels: &mut doc_rels,
                media: &mut media,
                warnings: &mut self.warnings,
                part: "word/document.xml",
            };
            body::write_blocks(&mut body, &document.blocks, &mut ctx)?;
        }

        // Header/footer parts and their references in the trailing sectPr.
        let mut extra_parts: Vec<(String, Vec<u8>)> = Vec::new();
        let mut header_ref = None;
        let mut footer_ref = None;
        if let Some(header) = &document.section.header {
            let rid = self.registry.next_rel_id();
            let (xml, part_rels) = notes::write_header_footer(
                "w:hdr",
                &header.blocks,
                &mut self.registry,
                &mut media,
                &mut self.warnings,
                "word/header1.xml",
            )?;
            extra_parts.push(("word/header1.xml".to_string(), xml.into_bytes()));
            if !part_rels.is_empty() {
                extra_parts.push((
                    "word/_rels/header1.xml.rels".to_string(),
                    relationships_xml(&part_rels).into_bytes(),
                ));
            }
            doc_rels.push(Relationship::internal(&rid, rel_type::HEADER, "header1.xml"));
            header_ref = Some(rid);
        }
        if let Some(footer) = &document.section.footer {
            let rid = self.registry.next_rel_id();
            let (xml, part_rels) = notes::write_header_footer(
                "w:ftr",
                &footer.blocks,
                &mut self.registry,
                &mut media,
                &mut self.warnings,
                "word/footer1.xml",
            )?;
            extra_parts.push(("word/footer1.xml".to_string(), xml.into_bytes()));
            if !part_rels.is_empty() {
                extra_parts.push((
                    "word/_rels/footer1.xml.rels".to_string(),
                    relationships_xml(&part_rels).into_bytes(),
                ));
            }
            doc_rels.push(Relationship::internal(&rid, rel_type::FOOTER, "footer1.xml"));
            footer_ref = Some(rid);
        }

        // The document part proper: body blocks then the final sectPr.
        let document_xml = {
            let mut b = XmlBuilder::new();
            b.open(
                "w:document",
                &[
                    ("xmlns:wpc", "http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas"),
                    ("xmlns:r", crate::ooxml::NS_R),
                    ("xmlns:w", crate::ooxml::NS_W),
                    ("xmlns:wp", crate::ooxml::NS_WP),
                    ("xmlns:wps", crate::ooxml::NS_WPS),
                    ("xmlns:mc", "http://schemas.openxmlformats.org/markup-compatibility/2006"),
                ],
            );
            if let Some(crate::ast::PageBackground::Color(hex)) = &document.section.background {
                b.empty("w:background", &[("w:color", hex)]);
            }
            b.open("w:body", &[]);
            b.raw(&body.finish());
            body::write_section_properties(
                &mut b,
                &document.section,
                header_ref.as_deref(),
                footer_ref.as_deref(),
            );
            b.close(); // w:body
            b.close(); // w:document
            b.finish()
        };

        // Notes parts. Structured definitions win over preserved XML.
        let footnotes_xml = if !document.footnotes.is_empty() {
            let (xml, part_rels) = notes::write_notes_part(
                "w:footnotes",
                "w:footnote",
                &document.footnotes,
                &mut self.registry,
                &mut media,
                &mut self.warnings,
                "word/footnotes.xml",
            )?;
            if !part_rels.is_empty() {
                extra_parts.push((
                    "word/_rels/footnotes.xml.rels".to_string(),
                    relationships_xml(&part_rels).into_bytes(),
                ));
            }
            Some(xml)
        } else {
            document.preserved.footnotes.clone()
        };
        let endnotes_xml = if !document.endnotes.is_empty() {
            let (xml, part_rels) = notes::write_notes_part(
                "w:endnotes",
                "w:endnote",
                &document.endnotes,
                &mut self.registry,
                &mut media,
                &mut self.warnings,
                "word/endnotes.xml",
            )?;
            if !part_rels.is_empty() {
                extra_parts.push((
                    "word/_rels/endnotes.xml.rels".to_string(),
                    relationships_xml(&part_rels).into_bytes(),
                ));
            }
            Some(xml)
        } else {
            document.preserved.endnotes.clone()
        };

        // Embedded fonts: one obfuscated payload per font, wired through
        // fontTable.xml.rels.
        let mut font_rels: Vec<Relationship> = Vec::new();
        let mut font_parts: Vec<(String, Vec<u8>)> = Vec::new();
        for font in &document.embedded_fonts {
            let key = crate::fonts::guid_key_bytes(&font.guid)?;
            let mut payload = font.bytes.to_vec();
            crate::fonts::obfuscate(&mut payload, &key);
            let rid = format!("rId{}", font_rels.len() + 1);
            font_rels.push(Relationship::internal(
                &rid,
                rel_type::FONT,
                format!("fonts/{{{}}}.odttf", font.guid),
            ));
            font_parts.push((font.part_name(), payload));
        }

        // Styles / numbering / settings / webSettings / fontTable:
        // preserved wins, synthesis otherwise.
        let styles_xml = document.preserved.styles.clone().unwrap_or_else(|| {
            let (para, chara) = referenced_styles(&document);
            crate::ooxml::styles::synthesize_styles_xml(&para, &chara, &document.theme)
        });
        let numbering_xml = document
            .preserved
            .numbering
            .clone()
            .or_else(|| {
                if numbering.is_empty() {
                    None
                } else {
                    Some(numbering::synthesize_numbering_xml(&numbering))
                }
            });
        let settings_xml = document
            .preserved
            .settings
            .clone()
            .unwrap_or_else(|| self.synthesize_settings(!document.embedded_fonts.is_empty()));
        let web_settings_xml = document
            .preserved
            .web_settings
            .clone()
            .unwrap_or_else(default_web_settings);
        let font_table_xml = document
            .preserved
            .font_table
            .clone()
            .unwrap_or_else(|| synthesize_font_table(&document, &font_rels));

        let core_props_xml = document
            .preserved
            .core_props
            .clone()
            .unwrap_or_else(default_core_props);
        let app_props_xml = document
            .preserved
            .app_props
            .clone()
            .unwrap_or_else(default_app_props);

        // Root relationships and content types.
        let root_rels_xml = document.preserved.root_rels.clone().unwrap_or_else(|| {
            relationships_xml(&[
                Relationship::internal("rId1", rel_type::DOCUMENT, "word/document.xml"),
                Relationship::internal("rId2", rel_type::CORE_PROPS, "docProps/core.xml"),
                Relationship::internal("rId3", rel_type::APP_PROPS, "docProps/app.xml"),
            ])
        });
        let content_types_xml = document.preserved.content_types.clone().unwrap_or_else(|| {
            content_types(
                &media,
                has_numbering && numbering_xml.is_some(),
                footnotes_xml.is_some(),
                endnotes_xml.is_some(),
                document.section.header.is_some(),
                document.section.footer.is_some(),
                !document.embedded_fonts.is_empty(),
            )
        });

        // Assemble the archive.
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut put = |zip: &mut ZipWriter<std::io::Cursor<Vec<u8>>>,
                       name: &str,
                       data: &[u8]|
         -> Result<()> {
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

        put(&mut zip, "[Content_Types].xml", content_types_xml.as_bytes())?;
        put(&mut zip, "_rels/.rels", root_rels_xml.as_bytes())?;
        put(&mut zip, "word/document.xml", document_xml.as_bytes())?;
        put(&mut zip, "word/_rels/document.xml.rels", relationships_xml(&doc_rels).as_bytes())?;
        put(&mut zip, "word/styles.xml", styles_xml.as_bytes())?;
        put(&mut zip, "word/settings.xml", settings_xml.as_bytes())?;
        put(&mut zip, "word/webSettings.xml", web_settings_xml.as_bytes())?;
        put(&mut zip, "word/fontTable.xml", font_table_xml.as_bytes())?;
        if !font_rels.is_empty() {
            put(
                &mut zip,
                "word/_rels/fontTable.xml.rels",
                relationships_xml(&font_rels).as_bytes(),
            )?;
        }
        if let Some(xml) = &numbering_xml {
            put(&mut zip, "word/numbering.xml", xml.as_bytes())?;
        }
        for (name, data) in &extra_parts {
            put(&mut zip, name, data)?;
        }
        if let Some(xml) = &footnotes_xml {
            put(&mut zip, "word/footnotes.xml", xml.as_bytes())?;
        }
        if let Some(xml) = &endnotes_xml {
            put(&mut zip, "word/endnotes.xml", xml.as_bytes())?;
        }
        for (name, bytes) in media.iter() {
            put(&mut zip, &format!("word/media/{}", name), bytes)?;
        }
        for (name, payload) in &font_parts {
            put(&mut zip, name, payload)?;
        }
        put(&mut zip, "docProps/core.xml", core_props_xml.as_bytes())?;
        put(&mut zip, "docProps/app.xml", app_props_xml.as_bytes())?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn synthesize_settings(&mut self, embeds_fonts: bool) -> String {
        let doc_id = self.registry.document_id();
        let rsid = self.registry.rsid();
        let mut b = XmlBuilder::new();
        b.open(
            "w:settings",
            &[
                ("xmlns:w", crate::ooxml::NS_W),
                ("xmlns:w14", "http://schemas.microsoft.com/office/word/2010/wordml"),
            ],
        );
        b.empty("w:zoom", &[("w:percent", "100")]);
        if embeds_fonts {
            b.empty("w:embedTrueTypeFonts", &[]);
            b.empty("w:saveSubsetFonts", &[]);
        }
        b.empty("w:defaultTabStop", &[("w:val", "708")]);
        b.open("w:rsids", &[]);
        b.empty("w:rsidRoot", &[("w:val", &rsid)]);
        b.empty("w:rsid", &[("w:val", &rsid)]);
        b.close();
        b.empty("w14:docId", &[("w14:val", &doc_id)]);
        b.close();
        b.finish()
    }
}

/// Collect every style id referenced by content, split paragraph/character.
fn referenced_styles(document: &Document) -> (Vec<String>, Vec<String>) {
    #[derive(Default)]
    struct Collector {
        para: Vec<String>,
        chara: Vec<String>,
        has_list: bool,
    }
    impl Visitor for Collector {
        fn visit_paragraph(&mut self, p: &crate::ast::Paragraph) {
            if let Some(id) = &p.props.style_id {
                if !self.para.contains(id) {
                    self.para.push(id.clone());
                }
            }
            for inline in &p.inlines {
                self.visit_inline(inline);
            }
        }

        fn visit_list(&mut self, list: &crate::ast::List) {
            self.has_list = true;
            for item in &list.items {
                for inline in &item.inlines {
                    self.visit_inline(inline);
                }
            }
        }
    }
    let mut c = Collector::default();
    crate::ast::visit::walk_document(&mut c, document);
    if c.has_list && !c.para.iter().any(|s| s == "ListParagraph") {
        c.para.push("ListParagraph".to_string());
    }
    if !document.footnotes.is_empty() {
        c.para.push("FootnoteText".to_string());
        c.chara.push("FootnoteReference".to_string());
    }
    if !document.endnotes.is_empty() {
        c.para.push("EndnoteText".to_string());
        c.chara.push("EndnoteReference".to_string());
    }
    (c.para, c.chara)
}

/// Walk the document and give every list a concrete numbering id, returning
/// the instances `word/numbering.xml` must define.
///
/// Lists sharing a `num_id` (continuation segments) share one instance; the
/// first segment's start index becomes the instance's override when it is
/// not 1.
fn assign_numbering(mut document: Document) -> (Document, Vec<NumberingInstance>) {
    // Collect the ids already in use so fresh ones never collide.
    let mut used: Vec<u32> = Vec::new();
    fn collect_used(blocks: &[Block], used: &mut Vec<u32>) {
        for block in blocks {
            match block {
                Block::List(l) if l.num_id != 0 => used.push(l.num_id),
                Block::Table(t) => {
                    for row in &t.rows {
                        for cell in &row.cells {
                            collect_used(&cell.blocks, used);
                        }
                    }
                },
                _ => {},
            }
        }
    }
    collect_used(&document.blocks, &mut used);

    let mut next_free = || {
        let mut candidate = 1;
        while used.contains(&candidate) {
            candidate += 1;
        }
        used.push(candidate);
        candidate
    };

    let mut instances: Vec<NumberingInstance> = Vec::new();
    fn assign(
        blocks: &mut [Block],
        instances: &mut Vec<NumberingInstance>,
        next_free: &mut impl FnMut() -> u32,
    ) {
        for block in blocks {
            match block {
                Block::List(list) => {
                    if list.num_id == 0 {
                        list.num_id = next_free();
                    }
                    assign_instance(list, instances);
                },
                Block::Table(table) => {
                    for row in &mut table.rows {
                        for cell in &mut row.cells {
                            assign(&mut cell.blocks, instances, next_free);
                        }
                    }
                },
                _ => {},
            }
        }
    }
    fn assign_instance(list: &List, instances: &mut Vec<NumberingInstance>) {
        if instances.iter().any(|i| i.num_id == list.num_id) {
            return; // continuation segment of an instance already scheduled
        }
        let abstract_id = instances.len() as u32;
        instances.push(NumberingInstance {
            num_id: list.num_id,
            abstract_id,
            style: list.style.clone(),
            start_override: (list.start_index > 1).then_some(list.start_index),
        });
    }
    assign(&mut document.blocks, &mut instances, &mut next_free);
    for content in document.footnotes.values_mut().chain(document.endnotes.values_mut()) {
        assign(content, &mut instances, &mut next_free);
    }
    for hf in [&mut document.section.header, &mut document.section.footer]
        .into_iter()
        .flatten()
    {
        assign(&mut hf.blocks, &mut instances, &mut next_free);
    }

    (document, instances)
}

/// Render a `.rels` part.
pub(crate) fn relationships_xml(rels: &[Relationship]) -> String {
    let mut b = XmlBuilder::new();
    b.open("Relationships", &[("xmlns", crate::ooxml::NS_REL_PKG)]);
    for rel in rels {
        if rel.external {
            b.empty(
                "Relationship",
                &[
                    ("Id", rel.id.as_str()),
                    ("Type", rel.rel_type.as_str()),
                    ("Target", rel.target.as_str()),
                    ("TargetMode", "External"),
                ],
            );
        } else {
            b.empty(
                "Relationship",
                &[
                    ("Id", rel.id.as_str()),
                    ("Type", rel.rel_type.as_str()),
                    ("Target", rel.target.as_str()),
                ],
            );
        }
    }
    b.close();
    b.finish()
}

fn content_types(
    media: &MediaPool,
    has_numbering: bool,
    has_footnotes: bool,
    has_endnotes: bool,
    has_header: bool,
    has_footer: bool,
    has_fonts: bool,
) -> String {
    let mut b = XmlBuilder::new();
    b.open("Types", &[("xmlns", crate::ooxml::NS_CONTENT_TYPES)]);
    b.empty("Default", &[("Extension", "rels"), ("ContentType", content_type::RELATIONSHIPS)]);
    b.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")]);
    for ext in media.extensions() {
        b.empty(
            "Default",
            &[("Extension", ext.as_str()), ("ContentType", image_content_type(&ext))],
        );
    }
    if has_fonts {
        b.empty(
            "Default",
            &[("Extension", "odttf"), ("ContentType", content_type::OBFUSCATED_FONT)],
        );
    }
    let overrides: &[(&str, &str, bool)] = &[
        ("/word/document.xml", content_type::DOCUMENT, true),
        ("/word/styles.xml", content_type::STYLES, true),
        ("/word/settings.xml", content_type::SETTINGS, true),
        ("/word/webSettings.xml", content_type::WEB_SETTINGS, true),
        ("/word/fontTable.xml", content_type::FONT_TABLE, true),
        ("/word/numbering.xml", content_type::NUMBERING, has_numbering),
        ("/word/header1.xml", content_type::HEADER, has_header),
        ("/word/footer1.xml", content_type::FOOTER, has_footer),
        ("/word/footnotes.xml", content_type::FOOTNOTES, has_footnotes),
        ("/word/endnotes.xml", content_type::ENDNOTES, has_endnotes),
        ("/docProps/core.xml", content_type::CORE_PROPS, true),
        ("/docProps/app.xml", content_type::APP_PROPS, true),
    ];
    for (part, ct, include) in overrides.iter().copied() {
        if include {
            b.empty("Override", &[("PartName", part), ("ContentType", ct)]);
        }
    }
    b.close();
    b.finish()
}

fn default_web_settings() -> String {
    let mut b = XmlBuilder::new();
    b.open("w:webSettings", &[("xmlns:w", crate::ooxml::NS_W)]);
    b.empty("w:optimizeForBrowser", &[]);
    b.empty("w:allowPNG", &[]);
    b.close();
    b.finish()
}

fn synthesize_font_table(document: &Document, font_rels: &[Relationship]) -> String {
    let mut b = XmlBuilder::new();
    b.open(
        "w:fonts",
        &[("xmlns:w", crate::ooxml::NS_W), ("xmlns:r", crate::ooxml::NS_R)],
    );
    for name in [document.theme.minor_font.as_str(), document.theme.major_font.as_str()] {
        b.open("w:font", &[("w:name", name)]);
        b.empty("w:family", &[("w:val", "swiss")]);
        b.empty("w:pitch", &[("w:val", "variable")]);
        b.close();
    }
    for (font, rel) in document.embedded_fonts.iter().zip(font_rels) {
        b.open("w:font", &[("w:name", font.family.as_str())]);
        b.empty(
            "w:embedRegular",
            &[("r:id", rel.id.as_str()), ("w:fontKey", font.font_key().as_str())],
        );
        b.close();
    }
    b.close();
    b.finish()
}

fn default_core_props() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut b = XmlBuilder::new();
    b.open(
        "cp:coreProperties",
        &[
            ("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    );
    b.open("dc:creator", &[]);
    b.text("docx_oxide");
    b.close();
    b.open("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")]);
    b.text(&now);
    b.close();
    b.open("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")]);
    b.text(&now);
    b.close();
    b.close();
    b.finish()
}

fn default_app_props() -> String {
    let mut b = XmlBuilder::new();
    b.open(
        "Properties",
        &[
            ("xmlns", "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"),
            ("xmlns:vt", "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"),
        ],
    );
    b.open("Application", &[]);
    b.text("docx_oxide");
    b.close();
    b.close();
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Inline, ListItem};

    #[test]
    fn test_media_pool_dedup() {
        let mut pool = MediaPool::default();
        let payload = Bytes::from(vec![1u8, 2, 3]);
        let a = ImageData::new(payload.clone(), "png", 4, 4);
        let b = ImageData::new(payload, "png", 4, 4);
        let name_a = pool.add(&a);
        let name_b = pool.add(&b);
        assert_eq!(name_a, name_b);
        assert_eq!(pool.iter().count(), 1);
    }

    #[test]
    fn test_media_pool_names_are_sequential() {
        let mut pool = MediaPool::default();
        let a = ImageData::new(vec![1u8], "png", 1, 1);
        let b = ImageData::new(vec![2u8], "jpeg", 1, 1);
        assert_eq!(pool.add(&a), "image1.png");
        assert_eq!(pool.add(&b), "image2.jpeg");
        assert_eq!(pool.extensions(), vec!["png".to_string(), "jpeg".to_string()]);
    }

    #[test]
    fn test_assign_numbering_allocates_free_ids() {
        let doc = Document::with_blocks(vec![
            Block::List(crate::ast::List::ordered(vec![ListItem::new(vec![Inline::text("a")])])),
            Block::List(crate::ast::List {
                num_id: 1,
                ..crate::ast::List::bullet(vec![ListItem::new(vec![Inline::text("b")])])
            }),
        ]);
        let (doc, instances) = assign_numbering(doc);
        let ids: Vec<u32> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::List(l) => Some(l.num_id),
                _ => None,
            })
            .collect();
        // Explicit id 1 is kept; the unnumbered list gets the next free id
        assert!(ids.contains(&1));
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(instances.len(), 2);
    }

    #[test]
    fn test_assign_numbering_shares_instance_for_continuation() {
        let seg = crate::ast::List {
            num_id: 3,
            ..crate::ast::List::ordered(vec![ListItem::new(vec![Inline::text("x")])])
        };
        let mut cont = seg.clone();
        cont.start_index = 2;
        let doc = Document::with_blocks(vec![
            Block::List(seg),
            Block::paragraph(vec![Inline::text("interruption")]),
            Block::List(cont),
        ]);
        let (_, instances) = assign_numbering(doc);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].num_id, 3);
        // First segment starts at 1: no override
        assert_eq!(instances[0].start_override, None);
    }

    #[test]
    fn test_relationships_xml_shape() {
        let xml = relationships_xml(&[
            Relationship::internal("rId1", rel_type::STYLES, "styles.xml"),
            Relationship::external("rId2", rel_type::HYPERLINK, "https://example.com/?a=1&b=2"),
        ]);
        assert!(xml.contains("Id=\"rId1\""));
        assert!(xml.contains("TargetMode=\"External\""));
        assert!(xml.contains("&amp;b=2"));
    }
}
