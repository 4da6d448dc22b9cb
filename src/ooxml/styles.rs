//! Style definitions and the formatting cascade.
//!
//! A style is a partial property set. Effective run formatting is a
//! right-biased fold of {paragraph style, character style, direct
//! properties}: direct values override, absent values inherit, and `auto`
//! at a color position means "inherit, do not override". Linked
//! paragraph/character style pairs are followed.

use crate::ast::{ColorValue, ParagraphProperties, TextProperties, Theme};
use crate::xml::XmlBuilder;
use indexmap::IndexMap;

/// What a style applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    /// Paragraph style
    Paragraph,
    /// Character (run) style
    Character,
    /// Table style
    Table,
    /// Numbering style
    Numbering,
}

impl StyleKind {
    /// WordprocessingML `w:type` value.
    pub fn as_str(self) -> &'static str {
        match self {
            StyleKind::Paragraph => "paragraph",
            StyleKind::Character => "character",
            StyleKind::Table => "table",
            StyleKind::Numbering => "numbering",
        }
    }

    /// Parse a `w:type` value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "paragraph" => StyleKind::Paragraph,
            "character" => StyleKind::Character,
            "table" => StyleKind::Table,
            "numbering" => StyleKind::Numbering,
            _ => return None,
        })
    }
}

/// One style definition from `word/styles.xml`.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDefinition {
    /// Style id referenced from content
    pub id: String,
    /// What the style applies to
    pub kind: StyleKind,
    /// Display name
    pub name: String,
    /// Parent style id
    pub based_on: Option<String>,
    /// Linked companion style id (paragraph ↔ character pairs)
    pub link: Option<String>,
    /// Run-level properties contributed by this style
    pub run_props: TextProperties,
    /// Paragraph-level properties contributed by this style
    pub para_props: ParagraphProperties,
}

impl StyleDefinition {
    /// A new empty style.
    pub fn new(id: impl Into<String>, kind: StyleKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            based_on: None,
            link: None,
            run_props: TextProperties::default(),
            para_props: ParagraphProperties::default(),
        }
    }
}

/// Every style definition of a document, keyed by style id.
#[derive(Debug, Clone, Default)]
pub struct StyleCache {
    styles: IndexMap<String, StyleDefinition>,
}

impl StyleCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing any previous one with the same id.
    pub fn insert(&mut self, style: StyleDefinition) {
        self.styles.insert(style.id.clone(), style);
    }

    /// Look up a definition.
    pub fn get(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.get(id)
    }

    /// Number of cached definitions.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// True when no style is cached.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Run properties contributed by a style, with its `basedOn` chain and
    /// linked companion folded in (base first, so derived values win).
    pub fn chain_run_props(&self, id: &str) -> TextProperties {
        let mut chain = Vec::new();
        let mut seen = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(style_id) = current {
            if seen.contains(&style_id) {
                break; // cycle guard
            }
            seen.push(style_id.clone());
            match self.styles.get(&style_id) {
                Some(def) => {
                    chain.push(def);
                    current = def.based_on.clone();
                },
                None => break,
            }
        }
        let mut props = TextProperties::default();
        for def in chain.iter().rev() {
            props = props.merged_with(&def.run_props);
            if let Some(link) = &def.link {
                if let Some(linked) = self.styles.get(link) {
                    if linked.kind == StyleKind::Character {
                        props = props.merged_with(&linked.run_props);
                    }
                }
            }
        }
        props
    }

    /// Paragraph properties contributed by a style, `basedOn` chain folded.
    pub fn chain_para_props(&self, id: &str) -> ParagraphProperties {
        let mut chain = Vec::new();
        let mut seen = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(style_id) = current {
            if seen.contains(&style_id) {
                break;
            }
            seen.push(style_id.clone());
            match self.styles.get(&style_id) {
                Some(def) => {
                    chain.push(def);
                    current = def.based_on.clone();
                },
                None => break,
            }
        }
        let mut props = ParagraphProperties::default();
        for def in chain.iter().rev() {
            props = props.merged_with(&def.para_props);
        }
        props
    }
}

/// Resolve the effective run formatting for a text run.
///
/// Precedence, highest last: paragraph style (`pStyle`), character style
/// (`rStyle`), direct properties.
pub fn resolve_run_properties(
    cache: &StyleCache,
    paragraph_style: Option<&str>,
    run_style: Option<&str>,
    direct: &TextProperties,
) -> TextProperties {
    let mut props = TextProperties::default();
    if let Some(ps) = paragraph_style {
        props = props.merged_with(&cache.chain_run_props(ps));
    }
    if let Some(rs) = run_style {
        props = props.merged_with(&cache.chain_run_props(rs));
    }
    props.merged_with(direct)
}

/// Resolve the effective paragraph formatting.
pub fn resolve_paragraph_properties(
    cache: &StyleCache,
    paragraph_style: Option<&str>,
    direct: &ParagraphProperties,
) -> ParagraphProperties {
    let mut props = ParagraphProperties::default();
    if let Some(ps) = paragraph_style {
        props = props.merged_with(&cache.chain_para_props(ps));
    }
    props.merged_with(direct)
}

/// Resolve a color value to a literal six-hex string using the theme.
pub fn effective_color(color: &ColorValue, theme: &Theme) -> Option<String> {
    match color {
        ColorValue::Hex(hex) => Some(hex.clone()),
        ColorValue::Theme { name, tint, shade } => theme.resolve(name, *tint, *shade),
    }
}

/// Parse a color attribute value: `auto` means inherit (None).
pub fn parse_color_attr(value: &str) -> Option<String> {
    if value.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(value.to_uppercase())
    }
}

/// Synthesize a minimal `word/styles.xml` covering the referenced styles.
///
/// Used only when the document carries no preserved styles part. Emits the
/// document defaults, `Normal`, `DefaultParagraphFont` and a bare definition
/// for every style id the content references.
pub fn synthesize_styles_xml(
    paragraph_styles: &[String],
    character_styles: &[String],
    theme: &Theme,
) -> String {
    let mut b = XmlBuilder::new();
    b.open("w:styles", &[("xmlns:w", super::NS_W), ("xmlns:r", super::NS_R)]);

    b.open("w:docDefaults", &[]);
    b.open("w:rPrDefault", &[]);
    b.open("w:rPr", &[]);
    b.empty(
        "w:rFonts",
        &[
            ("w:ascii", theme.minor_font.as_str()),
            ("w:eastAsia", theme.minor_font.as_str()),
            ("w:hAnsi", theme.minor_font.as_str()),
            ("w:cs", theme.minor_font.as_str()),
        ],
    );
    b.empty("w:sz", &[("w:val", "22")]);
    b.empty("w:szCs", &[("w:val", "22")]);
    b.close(); // w:rPr
    b.close(); // w:rPrDefault
    b.open("w:pPrDefault", &[]);
    b.open("w:pPr", &[]);
    b.empty("w:spacing", &[("w:after", "160"), ("w:line", "259"), ("w:lineRule", "auto")]);
    b.close();
    b.close();
    b.close(); // w:docDefaults

    b.open("w:style", &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")]);
    b.empty("w:name", &[("w:val", "Normal")]);
    b.empty("w:qFormat", &[]);
    b.close();

    b.open(
        "w:style",
        &[("w:type", "character"), ("w:default", "1"), ("w:styleId", "DefaultParagraphFont")],
    );
    b.empty("w:name", &[("w:val", "Default Paragraph Font")]);
    b.empty("w:uiPriority", &[("w:val", "1")]);
    b.empty("w:semiHidden", &[]);
    b.empty("w:unhideWhenUsed", &[]);
    b.close();

    for id in paragraph_styles {
        if id == "Normal" {
            continue;
        }
        b.open("w:style", &[("w:type", "paragraph"), ("w:styleId", id)]);
        b.empty("w:name", &[("w:val", id)]);
        b.empty("w:basedOn", &[("w:val", "Normal")]);
        b.empty("w:qFormat", &[]);
        b.close();
    }
    for id in character_styles {
        if id == "DefaultParagraphFont" {
            continue;
        }
        b.open("w:style", &[("w:type", "character"), ("w:styleId", id)]);
        b.empty("w:name", &[("w:val", id)]);
        b.empty("w:basedOn", &[("w:val", "DefaultParagraphFont")]);
        b.close();
    }

    b.close(); // w:styles
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LineVariant;

    fn cache_with_chain() -> StyleCache {
        let mut cache = StyleCache::new();

        let mut base = StyleDefinition::new("Base", StyleKind::Paragraph);
        base.run_props.size = Some(20);
        base.run_props.bold = Some(true);
        cache.insert(base);

        let mut heading = StyleDefinition::new("Heading1", StyleKind::Paragraph);
        heading.based_on = Some("Base".to_string());
        heading.run_props.size = Some(32);
        cache.insert(heading);

        let mut emphasis = StyleDefinition::new("Emphasis", StyleKind::Character);
        emphasis.run_props.italic = Some(true);
        cache.insert(emphasis);

        cache
    }

    #[test]
    fn test_based_on_chain_derived_wins() {
        let cache = cache_with_chain();
        let props = cache.chain_run_props("Heading1");
        assert_eq!(props.size, Some(32)); // overridden by Heading1
        assert_eq!(props.bold, Some(true)); // inherited from Base
    }

    #[test]
    fn test_cascade_precedence() {
        let cache = cache_with_chain();
        let direct = TextProperties {
            size: Some(48),
            ..Default::default()
        };
        let resolved =
            resolve_run_properties(&cache, Some("Heading1"), Some("Emphasis"), &direct);
        assert_eq!(resolved.size, Some(48)); // direct beats both styles
        assert_eq!(resolved.italic, Some(true)); // character style
        assert_eq!(resolved.bold, Some(true)); // paragraph style chain
    }

    #[test]
    fn test_character_style_beats_paragraph_style() {
        let mut cache = cache_with_chain();
        let mut strong = StyleDefinition::new("Strong", StyleKind::Character);
        strong.run_props.bold = Some(false);
        cache.insert(strong);

        let resolved = resolve_run_properties(
            &cache,
            Some("Base"),
            Some("Strong"),
            &TextProperties::default(),
        );
        assert_eq!(resolved.bold, Some(false));
    }

    #[test]
    fn test_linked_character_style_followed() {
        let mut cache = StyleCache::new();
        let mut para = StyleDefinition::new("Quote", StyleKind::Paragraph);
        para.link = Some("QuoteChar".to_string());
        cache.insert(para);
        let mut linked = StyleDefinition::new("QuoteChar", StyleKind::Character);
        linked.run_props.underline = Some(LineVariant::Single);
        cache.insert(linked);

        let props = cache.chain_run_props("Quote");
        assert_eq!(props.underline, Some(LineVariant::Single));
    }

    #[test]
    fn test_cycle_guard_terminates() {
        let mut cache = StyleCache::new();
        let mut a = StyleDefinition::new("A", StyleKind::Paragraph);
        a.based_on = Some("B".to_string());
        cache.insert(a);
        let mut b = StyleDefinition::new("B", StyleKind::Paragraph);
        b.based_on = Some("A".to_string());
        cache.insert(b);
        // Must not loop forever
        let _ = cache.chain_run_props("A");
    }

    #[test]
    fn test_auto_color_means_inherit() {
        assert_eq!(parse_color_attr("auto"), None);
        assert_eq!(parse_color_attr("ff0000").as_deref(), Some("FF0000"));
    }

    #[test]
    fn test_effective_theme_color() {
        let theme = Theme::default();
        let color = ColorValue::Theme {
            name: "accent1".to_string(),
            tint: None,
            shade: None,
        };
        assert_eq!(effective_color(&color, &theme).as_deref(), Some("4472C4"));
    }

    #[test]
    fn test_synthesized_styles_include_referenced() {
        let theme = Theme::default();
        let xml = synthesize_styles_xml(
            &["Heading1".to_string()],
            &["FootnoteReference".to_string()],
            &theme,
        );
        assert!(xml.contains("w:styleId=\"Normal\""));
        assert!(xml.contains("w:styleId=\"Heading1\""));
        assert!(xml.contains("w:styleId=\"FootnoteReference\""));
        assert!(xml.contains("w:docDefaults"));
    }
}
