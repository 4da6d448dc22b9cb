//! The container reader: ZIP-of-XML-parts in, document AST plus warnings
//! out.
//!
//! Parts the reader fully understands are reconstructed structurally; the
//! raw XML of styles, numbering, settings, webSettings, fontTable, content
//! types and root relationships is preserved verbatim so the writer can
//! re-emit them byte-for-byte. Every id encountered is registered so a
//! re-save never collides.

pub(crate) mod body;
pub(crate) mod drawing;
pub(crate) mod table;

pub use table::{resolve_cell_border, resolve_cell_shading};

use crate::ast::{
    Document, HeaderFooter, ImageData, PageBackground, Theme,
};
use crate::error::{Error, Result, Warning};
use crate::fonts::EmbeddedFont;
use crate::ids::IdRegistry;
use crate::ooxml::dom::{self, XmlNode};
use crate::ooxml::numbering::{
    AbstractLevel, AbstractNumbering, ContinuityTracker, NumInstance, NumberingTables,
};
use crate::ooxml::styles::{StyleCache, StyleDefinition, StyleKind};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

/// Every file of the archive, loaded up front. The reader never mutates
/// the input buffer and never touches the source again after this.
pub(crate) struct PartStore {
    files: HashMap<String, Vec<u8>>,
}

impl PartStore {
    fn from_zip(bytes: &[u8]) -> Result<Self> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor)
            .map_err(|e| Error::InvalidPackage(format!("not a ZIP archive: {}", e)))?;
        let mut files = HashMap::new();
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            files.insert(file.name().to_string(), data);
        }
        Ok(Self { files })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|v| v.as_slice())
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// Shared state for parsing one part's content.
pub(crate) struct ReaderContext<'a> {
    pub styles: &'a StyleCache,
    pub numbering: &'a NumberingTables,
    pub rels: &'a HashMap<String, (String, bool)>,
    pub parts: &'a PartStore,
    pub registry: &'a mut IdRegistry,
    pub warnings: &'a mut Vec<Warning>,
    pub continuity: &'a mut ContinuityTracker,
}

impl ReaderContext<'_> {
    /// The target of a relationship id (hyperlink href or part path).
    pub fn rel_target(&self, rid: &str) -> Option<&str> {
        self.rels.get(rid).map(|(target, _)| target.as_str())
    }

    /// Resolve an `r:embed` id to its media payload.
    pub fn image_by_rel(&self, rid: &str) -> Option<ImageData> {
        let (target, external) = self.rels.get(rid)?;
        if *external {
            return None;
        }
        let path = format!("word/{}", target);
        let bytes = self.parts.get(&path)?.to_vec();
        let extension = target.rsplit('.').next().unwrap_or("bin").to_string();
        let (px_width, px_height) = probe_dimensions(&bytes);
        Some(ImageData::new(bytes, extension, px_width, px_height))
    }
}

fn probe_dimensions(bytes: &[u8]) -> (u32, u32) {
    use image::GenericImageView;
    match image::load_from_memory(bytes) {
        Ok(img) => img.dimensions(),
        Err(_) => (0, 0),
    }
}

/// Deserializes an OOXML package into a [`Document`].
#[derive(Debug, Default)]
pub struct DocxReader {
    registry: IdRegistry,
}

impl DocxReader {
    /// A reader with a fresh identifier registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: read a package in one call.
    pub fn read(bytes: &[u8]) -> Result<Document> {
        Self::new().parse(bytes)
    }

    /// The registry with every id seen during the last parse, for handing
    /// to a writer so a re-save never collides.
    pub fn into_registry(self) -> IdRegistry {
        self.registry
    }

    /// Parse a package.
    pub fn parse(&mut self, bytes: &[u8]) -> Result<Document> {
        let parts = PartStore::from_zip(bytes)?;
        let mut warnings: Vec<Warning> = Vec::new();

        let document_xml = parts
            .get_str("word/document.xml")
            .ok_or_else(|| Error::InvalidPackage("word/document.xml is missing".to_string()))?;

        // Relationship graph for the document part
        let doc_rels = parse_relationships(
            parts.get_str("word/_rels/document.xml.rels").as_deref(),
            &mut self.registry,
        );

        // Styles and numbering come first so body parsing can resolve
        // against them
        let styles_raw = parts.get_str("word/styles.xml");
        let style_cache = match &styles_raw {
            Some(xml) => parse_styles(xml, &mut warnings),
            None => StyleCache::new(),
        };
        let numbering_raw = parts.get_str("word/numbering.xml");
        let numbering_tables = match &numbering_raw {
            Some(xml) => parse_numbering(xml, &mut warnings),
            None => NumberingTables::new(),
        };
        let theme = parts
            .get_str("word/theme/theme1.xml")
            .and_then(|xml| parse_theme(&xml))
            .unwrap_or_default();

        // Settings: preserved verbatim, document id and RSIDs registered
        let settings_raw = parts.get_str("word/settings.xml");
        if let Some(xml) = &settings_raw {
            if let Ok(root) = dom::parse(xml) {
                for node in &root.children {
                    if node.local_name() == "docId" {
                        if let Some(val) = node.attr_local("val") {
                            self.registry.register_document_id(val);
                        }
                    }
                }
                if let Some(rsids) = root.child("rsids") {
                    for rsid in &rsids.children {
                        if let Some(val) = rsid.attr_local("val") {
                            self.registry.register_document_id(val);
                        }
                    }
                }
            }
        }

        let mut document = Document::new();
        document.theme = theme;
        document.preserved.styles = styles_raw;
        document.preserved.numbering = numbering_raw;
        document.preserved.settings = settings_raw;
        document.preserved.web_settings = parts.get_str("word/webSettings.xml");
        document.preserved.font_table = parts.get_str("word/fontTable.xml");
        document.preserved.content_types = parts.get_str("[Content_Types].xml");
        document.preserved.root_rels = parts.get_str("_rels/.rels");
        document.preserved.core_props = parts.get_str("docProps/core.xml");
        document.preserved.app_props = parts.get_str("docProps/app.xml");

        // The body
        let root = dom::parse(&document_xml)?;
        let w_body = root
            .child("body")
            .ok_or_else(|| Error::InvalidPackage("document.xml has no w:body".to_string()))?;
        if let Some(bg) = root.child("background").and_then(|b| b.attr_local("color")) {
            document.section.background = Some(PageBackground::Color(bg.to_uppercase()));
        }

        let mut continuity = ContinuityTracker::new();
        {
            let mut ctx = ReaderContext {
                styles: &style_cache,
                numbering: &numbering_tables,
                rels: &doc_rels,
                parts: &parts,
                registry: &mut self.registry,
                warnings: &mut warnings,
                continuity: &mut continuity,
            };
            document.blocks = body::parse_blocks(w_body, &mut ctx)?;
        }

        // Trailing section properties
        let mut header_rid = None;
        let mut footer_rid = None;
        if let Some(sect) = w_body.child("sectPr") {
            let (section, h, f) = body::parse_section_properties(sect);
            let background = document.section.background.take();
            document.section = section;
            document.section.background = background;
            header_rid = h;
            footer_rid = f;
        }

        // Header and footer parts, each with its own relationship graph
        document.section.header = self.parse_header_footer(
            header_rid.as_deref(),
            &doc_rels,
            &parts,
            &style_cache,
            &numbering_tables,
            &mut warnings,
        )?;
        document.section.footer = self.parse_header_footer(
            footer_rid.as_deref(),
            &doc_rels,
            &parts,
            &style_cache,
            &numbering_tables,
            &mut warnings,
        )?;

        // Notes: structured definitions plus preserved raw XML
        document.preserved.footnotes = parts.get_str("word/footnotes.xml");
        document.preserved.endnotes = parts.get_str("word/endnotes.xml");
        document.footnotes = self.parse_notes(
            document.preserved.footnotes.as_deref(),
            "footnote",
            "word/footnotes.xml",
            &parts,
            &style_cache,
            &numbering_tables,
            &mut warnings,
        )?;
        document.endnotes = self.parse_notes(
            document.preserved.endnotes.as_deref(),
            "endnote",
            "word/endnotes.xml",
            &parts,
            &style_cache,
            &numbering_tables,
            &mut warnings,
        )?;

        // Embedded fonts: reverse the obfuscation using the stored fontKey
        document.embedded_fonts =
            parse_embedded_fonts(&parts, document.preserved.font_table.as_deref(), &mut warnings);

        document.warnings = warnings;
        Ok(document)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_header_footer(
        &mut self,
        rid: Option<&str>,
        doc_rels: &HashMap<String, (String, bool)>,
        parts: &PartStore,
        styles: &StyleCache,
        numbering: &NumberingTables,
        warnings: &mut Vec<Warning>,
    ) -> Result<Option<HeaderFooter>> {
        let rid = match rid {
            Some(r) => r,
            None => return Ok(None),
        };
        let target = match doc_rels.get(rid) {
            Some((target, false)) => target.clone(),
            _ => return Ok(None),
        };
        let part_name = format!("word/{}", target);
        let xml = match parts.get_str(&part_name) {
            Some(xml) => xml,
            None => {
                warnings.push(Warning::partial(part_name, "referenced part is missing"));
                return Ok(None);
            },
        };
        let rels_name = format!("word/_rels/{}.rels", target);
        let part_rels = parse_relationships(parts.get_str(&rels_name).as_deref(), &mut self.registry);
        let root = dom::parse(&xml)?;
        let mut continuity = ContinuityTracker::new();
        let mut ctx = ReaderContext {
            styles,
            numbering,
            rels: &part_rels,
            parts,
            registry: &mut self.registry,
            warnings,
            continuity: &mut continuity,
        };
        let blocks = body::parse_blocks(&root, &mut ctx)?;
        Ok(Some(HeaderFooter::new(blocks)))
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_notes(
        &mut self,
        xml: Option<&str>,
        item_name: &str,
        part_name: &str,
        parts: &PartStore,
        styles: &StyleCache,
        numbering: &NumberingTables,
        warnings: &mut Vec<Warning>,
    ) -> Result<BTreeMap<u32, Vec<crate::ast::Block>>> {
        let mut notes = BTreeMap::new();
        let xml = match xml {
            Some(xml) => xml,
            None => return Ok(notes),
        };
        let root = match dom::parse(xml) {
            Ok(root) => root,
            Err(e) => {
                warnings.push(Warning::partial(part_name, format!("unparseable: {}", e)));
                return Ok(notes);
            },
        };
        let rels_name = format!(
            "word/_rels/{}.rels",
            part_name.rsplit('/').next().unwrap_or(part_name)
        );
        let part_rels = parse_relationships(parts.get_str(&rels_name).as_deref(), &mut self.registry);
        let mut continuity = ContinuityTracker::new();
        for node in root.children_named(item_name) {
            // Separator definitions occupy ids -1 and 0
            if node.attr_local("type").is_some() {
                continue;
            }
            let id = match node.attr_local("id").and_then(|v| v.parse::<u32>().ok()) {
                Some(id) => id,
                None => continue,
            };
            self.registry.register_id(id);
            let mut ctx = ReaderContext {
                styles,
                numbering,
                rels: &part_rels,
                parts,
                registry: &mut self.registry,
                warnings: &mut *warnings,
                continuity: &mut continuity,
            };
            let mut blocks = body::parse_blocks(node, &mut ctx)?;
            strip_note_marker(&mut blocks, item_name);
            notes.insert(id, blocks);
        }
        Ok(notes)
    }
}

/// Remove the conventional self-reference marker the writer injects: the
/// note-text style on the first paragraph and the single separating space.
fn strip_note_marker(blocks: &mut [crate::ast::Block], item_name: &str) {
    let default_style = if item_name == "footnote" { "FootnoteText" } else { "EndnoteText" };
    if let Some(crate::ast::Block::Paragraph(p)) = blocks.first_mut() {
        if p.props.style_id.as_deref() == Some(default_style) {
            p.props.style_id = None;
        }
        if matches!(p.inlines.first(), Some(crate::ast::Inline::Text(t)) if t.content == " " && t.props.is_empty())
        {
            p.inlines.remove(0);
        }
    }
}

/// Parse a `.rels` part into `id → (target, external)`, registering every
/// relationship id.
pub(crate) fn parse_relationships(
    xml: Option<&str>,
    registry: &mut IdRegistry,
) -> HashMap<String, (String, bool)> {
    let mut rels = HashMap::new();
    let xml = match xml {
        Some(xml) => xml,
        None => return rels,
    };
    if let Ok(root) = dom::parse(xml) {
        for rel in root.children_named("Relationship") {
            if let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) {
                registry.register_rel_id(id);
                let external = rel.attr("TargetMode") == Some("External");
                rels.insert(id.to_string(), (target.to_string(), external));
            }
        }
    }
    rels
}

/// Parse `word/styles.xml` into the style cache.
fn parse_styles(xml: &str, warnings: &mut Vec<Warning>) -> StyleCache {
    let mut cache = StyleCache::new();
    let root = match dom::parse(xml) {
        Ok(root) => root,
        Err(e) => {
            warnings.push(Warning::partial("word/styles.xml", format!("unparseable: {}", e)));
            return cache;
        },
    };
    for style in root.children_named("style") {
        let id = match style.attr_local("styleId") {
            Some(id) => id.to_string(),
            None => continue,
        };
        let kind = style
            .attr_local("type")
            .and_then(StyleKind::parse)
            .unwrap_or(StyleKind::Paragraph);
        let mut def = StyleDefinition::new(id, kind);
        if let Some(name) = style.child("name").and_then(|n| n.val()) {
            def.name = name.to_string();
        }
        def.based_on = style.child("basedOn").and_then(|b| b.val()).map(|s| s.to_string());
        def.link = style.child("link").and_then(|l| l.val()).map(|s| s.to_string());
        let (run_props, _) = body::parse_run_properties(style.child("rPr"));
        def.run_props = run_props;
        def.para_props = body::parse_paragraph_properties(style.child("pPr"));
        cache.insert(def);
    }
    cache
}

/// Parse `word/numbering.xml` into the numbering tables.
fn parse_numbering(xml: &str, warnings: &mut Vec<Warning>) -> NumberingTables {
    let mut tables = NumberingTables::new();
    let root = match dom::parse(xml) {
        Ok(root) => root,
        Err(e) => {
            warnings.push(Warning::partial("word/numbering.xml", format!("unparseable: {}", e)));
            return tables;
        },
    };
    for abstract_node in root.children_named("abstractNum") {
        let id = match abstract_node
            .attr_local("abstractNumId")
            .and_then(|v| v.parse::<u32>().ok())
        {
            Some(id) => id,
            None => continue,
        };
        let mut levels = Vec::new();
        for lvl in abstract_node.children_named("lvl") {
            let format = lvl
                .child("numFmt")
                .and_then(|f| f.val())
                .and_then(crate::ast::NumberFormat::parse)
                .unwrap_or_default();
            let text = lvl
                .child("lvlText")
                .and_then(|t| t.val())
                .unwrap_or_default()
                .to_string();
            let ind = lvl.descend(&["pPr", "ind"]);
            let indent = ind
                .and_then(|i| i.attr_local("left"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let hanging = ind
                .and_then(|i| i.attr_local("hanging"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let start = lvl
                .child("start")
                .and_then(|s| s.val_int())
                .map(|v| v as u32)
                .unwrap_or(1);
            let r_pr = lvl.child("rPr");
            levels.push(AbstractLevel {
                format,
                text,
                indent,
                hanging,
                start,
                marker_font: r_pr
                    .and_then(|r| r.child("rFonts"))
                    .and_then(|f| f.attr_local("ascii"))
                    .map(|s| s.to_string()),
                marker_color: r_pr
                    .and_then(|r| r.child("color"))
                    .and_then(|c| c.val())
                    .map(|s| s.to_uppercase()),
            });
        }
        tables.abstracts.insert(id, AbstractNumbering { id, levels });
    }
    for num in root.children_named("num") {
        let num_id = match num.attr_local("numId").and_then(|v| v.parse::<u32>().ok()) {
            Some(id) => id,
            None => continue,
        };
        let abstract_id = match num
            .child("abstractNumId")
            .and_then(|a| a.val_int())
            .map(|v| v as u32)
        {
            Some(id) => id,
            None => continue,
        };
        let mut instance = NumInstance {
            abstract_id,
            ..Default::default()
        };
        for over in num.children_named("lvlOverride") {
            let ilvl = over.attr_local("ilvl").and_then(|v| v.parse::<u8>().ok()).unwrap_or(0);
            if let Some(start) = over
                .child("startOverride")
                .and_then(|s| s.val_int())
                .map(|v| v as u32)
            {
                instance.start_overrides.insert(ilvl, start);
            }
        }
        tables.nums.insert(num_id, instance);
    }
    tables
}

/// Parse `word/theme/theme1.xml` into the theme palette and fonts.
fn parse_theme(xml: &str) -> Option<Theme> {
    let root = dom::parse(xml).ok()?;
    let theme_elements = root.child("themeElements")?;
    let mut theme = Theme::default();
    if let Some(scheme) = theme_elements.child("clrScheme") {
        for slot in &scheme.children {
            let name = slot.local_name().to_string();
            let hex = slot
                .child("srgbClr")
                .and_then(|c| c.attr("val"))
                .or_else(|| slot.child("sysClr").and_then(|c| c.attr("lastClr")));
            if let Some(hex) = hex {
                theme.colors.insert(name, hex.to_uppercase());
            }
        }
    }
    if let Some(fonts) = theme_elements.child("fontScheme") {
        if let Some(major) = fonts
            .child("majorFont")
            .and_then(|f| f.child("latin"))
            .and_then(|l| l.attr("typeface"))
        {
            theme.major_font = major.to_string();
        }
        if let Some(minor) = fonts
            .child("minorFont")
            .and_then(|f| f.child("latin"))
            .and_then(|l| l.attr("typeface"))
        {
            theme.minor_font = minor.to_string();
        }
    }
    Some(theme)
}

/// Read the font table, resolve each embedded font's payload and reverse
/// the obfuscation.
fn parse_embedded_fonts(
    parts: &PartStore,
    font_table: Option<&str>,
    warnings: &mut Vec<Warning>,
) -> Vec<EmbeddedFont> {
    let mut fonts = Vec::new();
    let xml = match font_table {
        Some(xml) => xml,
        None => return fonts,
    };
    let root = match dom::parse(xml) {
        Ok(root) => root,
        Err(_) => return fonts,
    };
    let mut registry = IdRegistry::new();
    let rels = parse_relationships(
        parts.get_str("word/_rels/fontTable.xml.rels").as_deref(),
        &mut registry,
    );
    for font in root.children_named("font") {
        let family = font.attr_local("name").unwrap_or_default().to_string();
        for embed in font.children_named("embedRegular") {
            let font_key = match embed.attr_local("fontKey") {
                Some(key) => key,
                None => continue,
            };
            let target = embed
                .attr_local("id")
                .and_then(|rid| rels.get(rid))
                .map(|(target, _)| target.clone());
            let target = match target {
                Some(t) => t,
                None => continue,
            };
            let part_name = format!("word/{}", target);
            let payload = match parts.get(&part_name) {
                Some(bytes) => bytes,
                None => {
                    warnings.push(Warning::partial(part_name, "embedded font payload missing"));
                    continue;
                },
            };
            match crate::fonts::deobfuscate(payload, font_key) {
                Ok(bytes) => fonts.push(EmbeddedFont {
                    family: family.clone(),
                    bytes: bytes.into(),
                    guid: font_key.trim_matches(['{', '}']).to_uppercase(),
                }),
                Err(e) => {
                    warnings.push(Warning::partial(
                        "word/fontTable.xml",
                        format!("cannot deobfuscate font '{}': {}", family, e),
                    ));
                },
            }
        }
    }
    fonts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_zip_is_invalid_package() {
        let result = DocxReader::read(b"this is not a zip archive");
        assert!(matches!(result, Err(Error::InvalidPackage(_))));
    }

    #[test]
    fn test_parse_relationships_registers_ids() {
        let xml = r#"<?xml version="1.0"?>
            <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
              <Relationship Id="rId3" Type="t" Target="settings.xml"/>
              <Relationship Id="rId9" Type="t" Target="https://x" TargetMode="External"/>
            </Relationships>"#;
        let mut registry = IdRegistry::new();
        let rels = parse_relationships(Some(xml), &mut registry);
        assert_eq!(rels.get("rId3"), Some(&("settings.xml".to_string(), false)));
        assert_eq!(rels.get("rId9"), Some(&("https://x".to_string(), true)));
        // rId3 and rId9 are taken; allocation continues around them
        assert_eq!(registry.next_rel_id(), "rId1");
    }

    #[test]
    fn test_parse_styles_chain() {
        let xml = r#"<w:styles xmlns:w="w">
            <w:style w:type="paragraph" w:styleId="Heading1">
              <w:name w:val="heading 1"/>
              <w:basedOn w:val="Normal"/>
              <w:link w:val="Heading1Char"/>
              <w:rPr><w:b/><w:sz w:val="32"/></w:rPr>
            </w:style>
        </w:styles>"#;
        let mut warnings = Vec::new();
        let cache = parse_styles(xml, &mut warnings);
        let def = cache.get("Heading1").unwrap();
        assert_eq!(def.name, "heading 1");
        assert_eq!(def.based_on.as_deref(), Some("Normal"));
        assert_eq!(def.link.as_deref(), Some("Heading1Char"));
        assert_eq!(def.run_props.bold, Some(true));
        assert_eq!(def.run_props.size, Some(32));
    }

    #[test]
    fn test_parse_numbering_tables() {
        let xml = r#"<w:numbering xmlns:w="w">
          <w:abstractNum w:abstractNumId="0">
            <w:lvl w:ilvl="0">
              <w:start w:val="1"/>
              <w:numFmt w:val="decimal"/>
              <w:lvlText w:val="%1."/>
              <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>
            </w:lvl>
          </w:abstractNum>
          <w:num w:numId="1">
            <w:abstractNumId w:val="0"/>
            <w:lvlOverride w:ilvl="0"><w:startOverride w:val="3"/></w:lvlOverride>
          </w:num>
        </w:numbering>"#;
        let mut warnings = Vec::new();
        let tables = parse_numbering(xml, &mut warnings);
        assert_eq!(tables.level_for(1, 0).unwrap().text, "%1.");
        assert_eq!(tables.start_for(1, 0), 3);
        assert!(tables.is_ordered(1));
    }

    #[test]
    fn test_parse_theme_colors_and_fonts() {
        let xml = r#"<a:theme xmlns:a="a"><a:themeElements>
            <a:clrScheme a:name="Office">
              <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
              <a:accent1><a:srgbClr val="4472c4"/></a:accent1>
            </a:clrScheme>
            <a:fontScheme a:name="Office">
              <a:majorFont><a:latin typeface="Georgia"/></a:majorFont>
              <a:minorFont><a:latin typeface="Garamond"/></a:minorFont>
            </a:fontScheme>
        </a:themeElements></a:theme>"#;
        let theme = parse_theme(xml).unwrap();
        assert_eq!(theme.color("accent1"), Some("4472C4"));
        assert_eq!(theme.color("dk1"), Some("000000"));
        assert_eq!(theme.major_font, "Georgia");
        assert_eq!(theme.minor_font, "Garamond");
    }
}
