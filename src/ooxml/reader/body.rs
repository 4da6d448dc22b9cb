//! Body parsing: WordprocessingML back into blocks and inlines.
//!
//! Content controls (`w:sdt`) are structurally transparent: the parser
//! descends into `w:sdtContent` wherever one wraps block or inline content.

use super::ReaderContext;
use crate::ast::{
    Alignment, Block, ColorValue, DropCap, DropCapStyle, FontSelection, Highlight, Indent, Inline,
    LineRule, LineSpacing, LineVariant, List, ListItem, Margins, NumberingRef, Orientation,
    Paragraph, ParagraphBorders, ParagraphProperties, SectionProperties, ShadingValue,
    TableOfContents, Text, TextProperties,
};
use crate::error::Result;
use crate::ooxml::dom::XmlNode;
use crate::ooxml::styles::{parse_color_attr, resolve_run_properties};

/// Parse the block-level children of a container (`w:body`, `w:tc`,
/// `w:hdr`, a note definition).
pub(crate) fn parse_blocks(parent: &XmlNode, ctx: &mut ReaderContext) -> Result<Vec<Block>> {
    // Flatten SDT wrappers first so list grouping sees the real sequence
    let mut children: Vec<&XmlNode> = Vec::new();
    flatten_block_children(parent, &mut children);

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < children.len() {
        let node = children[i];
        match node.local_name() {
            "tbl" => {
                blocks.push(Block::Table(super::table::parse_table(node, ctx)?));
                i += 1;
            },
            "p" => {
                // A run of consecutive numbered paragraphs sharing a numId
                // becomes one list node
                if let Some(numbering) = paragraph_numbering(node) {
                    let num_id = numbering.num_id;
                    // The first segment honors a startOverride; continuation
                    // segments continue the running count
                    let continued = ctx.continuity.start_index(num_id, 0);
                    let start_index = if continued == 1 {
                        ctx.numbering.start_for(num_id, 0)
                    } else {
                        continued
                    };
                    let mut items = Vec::new();
                    while i < children.len() && children[i].local_name() == "p" {
                        match paragraph_numbering(children[i]) {
                            Some(n) if n.num_id == num_id => {
                                let level = n.level.min(8);
                                let paragraph = parse_paragraph(children[i], ctx)?;
                                ctx.continuity.record(num_id, level);
                                items.push(ListItem {
                                    level,
                                    inlines: paragraph.inlines,
                                    override_level: None,
                                });
                                i += 1;
                            },
                            _ => break,
                        }
                    }
                    let style = ctx
                        .numbering
                        .abstract_for(num_id)
                        .map(|a| a.to_list_style())
                        .unwrap_or_else(crate::ast::ListStyle::ordered);
                    blocks.push(Block::List(List {
                        is_ordered: ctx.numbering.is_ordered(num_id),
                        style,
                        items,
                        num_id,
                        start_index,
                    }));
                    continue;
                }
                if let Some(drop_cap) = parse_drop_cap(node, children.get(i + 1).copied(), ctx)? {
                    blocks.push(Block::DropCap(drop_cap));
                    // The framed letter plus its continuation paragraph
                    let consumed_next = children
                        .get(i + 1)
                        .map(|n| n.local_name() == "p")
                        .unwrap_or(false);
                    i += if consumed_next { 2 } else { 1 };
                    continue;
                }
                if let Some(toc) = parse_toc_paragraph(node) {
                    blocks.push(Block::TableOfContents(toc));
                    i += 1;
                    continue;
                }
                if let Some(section) = parse_mid_body_section(node) {
                    blocks.push(Block::SectionBreak(section));
                    i += 1;
                    continue;
                }
                blocks.push(Block::Paragraph(parse_paragraph(node, ctx)?));
                i += 1;
            },
            _ => {
                i += 1;
            },
        }
    }
    Ok(blocks)
}

fn flatten_block_children<'a>(parent: &'a XmlNode, out: &mut Vec<&'a XmlNode>) {
    for child in &parent.children {
        match child.local_name() {
            "sdt" => {
                if let Some(content) = child.child("sdtContent") {
                    flatten_block_children(content, out);
                }
            },
            "p" | "tbl" => out.push(child),
            _ => {},
        }
    }
}

fn paragraph_numbering(p: &XmlNode) -> Option<NumberingRef> {
    let num_pr = p.descend(&["pPr", "numPr"])?;
    let num_id = num_pr.child("numId")?.val_int()? as u32;
    let level = num_pr.child("ilvl").and_then(|l| l.val_int()).unwrap_or(0) as u8;
    if num_id == 0 {
        return None; // numId 0 removes numbering
    }
    Some(NumberingRef { num_id, level })
}

/// A paragraph framed with `w:dropCap` plus its continuation paragraph.
fn parse_drop_cap(
    p: &XmlNode,
    next: Option<&XmlNode>,
    ctx: &mut ReaderContext,
) -> Result<Option<DropCap>> {
    let frame = match p.descend(&["pPr", "framePr"]) {
        Some(f) if f.attr_local("dropCap").is_some() => f,
        _ => return Ok(None),
    };
    let style = match frame.attr_local("dropCap") {
        Some("margin") => DropCapStyle::Margin,
        _ => DropCapStyle::Drop,
    };
    let lines = frame
        .attr_local("lines")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(2)
        .max(2);
    let h_space = frame.attr_local("hSpace").and_then(|v| v.parse::<u32>().ok());

    let mut letter = String::new();
    let mut font_family = None;
    let mut size = None;
    for run in p.children_named("r") {
        if let Some(t) = run.child("t") {
            letter.push_str(&t.text);
        }
        if let Some(r_pr) = run.child("rPr") {
            if font_family.is_none() {
                font_family = r_pr
                    .child("rFonts")
                    .and_then(|f| f.attr_local("ascii"))
                    .map(|s| s.to_string());
            }
            if size.is_none() {
                size = r_pr.child("sz").and_then(|s| s.val_int()).map(|v| v as u32);
            }
        }
    }

    let rest = match next {
        Some(next_p) if next_p.local_name() == "p" => {
            let style_id = next_p
                .descend(&["pPr", "pStyle"])
                .and_then(|s| s.val())
                .map(|s| s.to_string());
            parse_inlines(next_p, ctx, style_id.as_deref())?
        },
        _ => Vec::new(),
    };

    Ok(Some(DropCap {
        letter,
        lines,
        style,
        font_family,
        size,
        h_space,
        rest,
    }))
}

/// A paragraph whose field instruction is a `TOC` field.
fn parse_toc_paragraph(p: &XmlNode) -> Option<TableOfContents> {
    for run in p.children_named("r") {
        if let Some(instr) = run.child("instrText") {
            let text = instr.text.trim();
            if let Some(rest) = text.strip_prefix("TOC") {
                let mut toc = TableOfContents::default();
                // \o "1-3" names the outline range
                if let Some(range_start) = rest.find('"') {
                    let range = &rest[range_start + 1..];
                    if let Some(range_end) = range.find('"') {
                        let mut parts = range[..range_end].splitn(2, '-');
                        if let (Some(from), Some(to)) = (parts.next(), parts.next()) {
                            if let (Ok(f), Ok(t)) = (from.parse(), to.parse()) {
                                toc.from_level = f;
                                toc.to_level = t;
                            }
                        }
                    }
                }
                return Some(toc);
            }
        }
    }
    None
}

/// A paragraph holding only a `w:sectPr` is a section break.
fn parse_mid_body_section(p: &XmlNode) -> Option<SectionProperties> {
    let sect = p.descend(&["pPr", "sectPr"])?;
    let has_content = p.children_named("r").next().is_some();
    if has_content {
        return None;
    }
    let (section, _, _) = parse_section_properties(sect);
    Some(section)
}

/// Parse one paragraph into the AST.
pub(crate) fn parse_paragraph(p: &XmlNode, ctx: &mut ReaderContext) -> Result<Paragraph> {
    let props = parse_paragraph_properties(p.child("pPr"));
    let inlines = parse_inlines(p, ctx, props.style_id.as_deref())?;
    Ok(Paragraph { inlines, props })
}

/// Parse `w:pPr` into direct paragraph properties.
pub(crate) fn parse_paragraph_properties(p_pr: Option<&XmlNode>) -> ParagraphProperties {
    let mut props = ParagraphProperties::default();
    let p_pr = match p_pr {
        Some(node) => node,
        None => return props,
    };
    props.style_id = p_pr.child("pStyle").and_then(|s| s.val()).map(|s| s.to_string());
    props.alignment = p_pr.child("jc").and_then(|j| j.val()).and_then(Alignment::parse);
    props.page_break_before = p_pr.child("pageBreakBefore").map(|t| t.as_toggle()).unwrap_or(false);
    props.numbering = paragraph_numbering_from_ppr(p_pr);
    if let Some(ind) = p_pr.child("ind") {
        let get = |name: &str| ind.attr_local(name).and_then(|v| v.parse::<i32>().ok());
        props.indent = Indent {
            left: get("left"),
            right: get("right"),
            // Hanging N parses as first-line = -N
            first_line: match (get("hanging"), get("firstLine")) {
                (Some(h), _) => Some(-h),
                (None, Some(f)) => Some(f),
                (None, None) => None,
            },
        };
    }
    if let Some(spacing) = p_pr.child("spacing") {
        let get = |name: &str| spacing.attr_local(name).and_then(|v| v.parse::<u32>().ok());
        props.spacing_before = get("before");
        props.spacing_after = get("after");
        if let Some(line) = get("line") {
            props.line_spacing = Some(LineSpacing {
                amount: line,
                rule: spacing
                    .attr_local("lineRule")
                    .and_then(LineRule::parse)
                    .unwrap_or(LineRule::Auto),
            });
        }
    }
    props.shading = p_pr
        .child("shd")
        .and_then(|s| s.attr_local("fill"))
        .and_then(parse_color_attr);
    if let Some(borders) = p_pr.child("pBdr") {
        props.borders = ParagraphBorders {
            top: super::table::parse_border_side(borders.child("top")),
            bottom: super::table::parse_border_side(borders.child("bottom")),
            left: super::table::parse_border_side(borders.child("left")),
            right: super::table::parse_border_side(borders.child("right")),
        };
    }
    props
}

fn paragraph_numbering_from_ppr(p_pr: &XmlNode) -> Option<NumberingRef> {
    let num_pr = p_pr.child("numPr")?;
    let num_id = num_pr.child("numId")?.val_int()? as u32;
    if num_id == 0 {
        return None;
    }
    Some(NumberingRef {
        num_id,
        level: num_pr.child("ilvl").and_then(|l| l.val_int()).unwrap_or(0) as u8,
    })
}

/// Accumulated field-character state while walking runs.
struct FieldState {
    instruction: String,
    checkbox_default: Option<bool>,
}

/// Parse the inline content of a paragraph (or hyperlink wrapper).
pub(crate) fn parse_inlines(
    parent: &XmlNode,
    ctx: &mut ReaderContext,
    paragraph_style: Option<&str>,
) -> Result<Vec<Inline>> {
    let mut inlines = Vec::new();
    let mut field: Option<FieldState> = None;
    parse_inlines_into(parent, ctx, paragraph_style, None, &mut inlines, &mut field)?;
    Ok(inlines)
}

fn parse_inlines_into(
    parent: &XmlNode,
    ctx: &mut ReaderContext,
    paragraph_style: Option<&str>,
    href: Option<&str>,
    inlines: &mut Vec<Inline>,
    field: &mut Option<FieldState>,
) -> Result<()> {
    for child in &parent.children {
        match child.local_name() {
            "r" => {
                if let Some(fld) = child.child("fldChar") {
                    match fld.attr_local("fldCharType") {
                        Some("begin") => {
                            *field = Some(FieldState {
                                instruction: String::new(),
                                checkbox_default: fld
                                    .descend(&["ffData", "checkBox", "default"])
                                    .map(|d| d.as_toggle()),
                            });
                        },
                        Some("end") => {
                            if let Some(state) = field.take() {
                                push_field_result(&state, inlines);
                            }
                        },
                        _ => {}, // "separate": cached result runs follow, skipped below
                    }
                    continue;
                }
                if let Some(instr) = child.child("instrText") {
                    if let Some(state) = field.as_mut() {
                        state.instruction.push_str(&instr.text);
                    }
                    continue;
                }
                if field.is_some() {
                    continue; // cached field result, regenerated by consumers
                }
                parse_run(child, ctx, paragraph_style, href, inlines)?;
            },
            "hyperlink" => {
                let target = child
                    .attr_local("id")
                    .and_then(|rid| ctx.rel_target(rid))
                    .map(|s| s.to_string());
                parse_inlines_into(
                    child,
                    ctx,
                    paragraph_style,
                    target.as_deref(),
                    inlines,
                    field,
                )?;
            },
            "fldSimple" => {
                let instr = child.attr_local("instr").unwrap_or("");
                if instr.contains("NUMPAGES") {
                    inlines.push(Inline::PageCount);
                } else if instr.contains("PAGE") {
                    inlines.push(Inline::PageNumber);
                }
            },
            "sdt" => {
                if let Some(content) = child.child("sdtContent") {
                    parse_inlines_into(content, ctx, paragraph_style, href, inlines, field)?;
                }
            },
            _ => {},
        }
    }
    Ok(())
}

fn push_field_result(state: &FieldState, inlines: &mut Vec<Inline>) {
    let instr = state.instruction.as_str();
    if instr.contains("FORMCHECKBOX") {
        inlines.push(Inline::Checkbox {
            checked: state.checkbox_default.unwrap_or(false),
        });
    } else if instr.contains("NUMPAGES") {
        inlines.push(Inline::PageCount);
    } else if instr.contains("PAGE") {
        inlines.push(Inline::PageNumber);
    }
}

fn parse_run(
    run: &XmlNode,
    ctx: &mut ReaderContext,
    paragraph_style: Option<&str>,
    href: Option<&str>,
    inlines: &mut Vec<Inline>,
) -> Result<()> {
    let (direct, run_style) = parse_run_properties(run.child("rPr"));
    let resolved = resolve_run_properties(ctx.styles, paragraph_style, run_style.as_deref(), &direct);

    for child in &run.children {
        match child.local_name() {
            "t" => {
                inlines.push(Inline::Text(Text {
                    content: child.text.clone(),
                    props: resolved.clone(),
                    href: href.map(|s| s.to_string()),
                }));
            },
            "br" => inlines.push(Inline::LineBreak),
            "tab" => inlines.push(Inline::Tab),
            "drawing" => {
                if let Some(inline) = super::drawing::parse_drawing(child, ctx) {
                    inlines.push(inline);
                }
            },
            "footnoteReference" => {
                if let Some(id) = child.attr_local("id").and_then(|v| v.parse::<u32>().ok()) {
                    ctx.registry.register_id(id);
                    inlines.push(Inline::FootnoteRef(id));
                }
            },
            "endnoteReference" => {
                if let Some(id) = child.attr_local("id").and_then(|v| v.parse::<u32>().ok()) {
                    ctx.registry.register_id(id);
                    inlines.push(Inline::EndnoteRef(id));
                }
            },
            _ => {},
        }
    }
    Ok(())
}

/// Parse `w:rPr` into direct properties plus the referenced character style.
pub(crate) fn parse_run_properties(r_pr: Option<&XmlNode>) -> (TextProperties, Option<String>) {
    let mut props = TextProperties::default();
    let r_pr = match r_pr {
        Some(node) => node,
        None => return (props, None),
    };
    let run_style = r_pr.child("rStyle").and_then(|s| s.val()).map(|s| s.to_string());

    let toggle = |name: &str| r_pr.child(name).map(|t| t.as_toggle());
    props.bold = toggle("b");
    props.italic = toggle("i");
    props.all_caps = toggle("caps");
    props.small_caps = toggle("smallCaps");
    props.outline = toggle("outline");
    props.shadow = toggle("shadow");
    props.emboss = toggle("emboss");
    props.imprint = toggle("imprint");

    if let Some(strike) = r_pr.child("strike") {
        props.strike = Some(if strike.as_toggle() { LineVariant::Single } else { LineVariant::None });
    }
    if r_pr.child("dstrike").map(|t| t.as_toggle()).unwrap_or(false) {
        props.strike = Some(LineVariant::Double);
    }
    if let Some(u) = r_pr.child("u") {
        props.underline = Some(match u.val() {
            Some("none") => LineVariant::None,
            Some("double") => LineVariant::Double,
            _ => LineVariant::Single,
        });
    }
    if let Some(color) = r_pr.child("color") {
        if let Some(theme) = color.attr_local("themeColor") {
            props.color = Some(ColorValue::Theme {
                name: theme.to_string(),
                tint: color.attr_local("themeTint").and_then(|v| u8::from_str_radix(v, 16).ok()),
                shade: color.attr_local("themeShade").and_then(|v| u8::from_str_radix(v, 16).ok()),
            });
        } else if let Some(hex) = color.val().and_then(parse_color_attr) {
            props.color = Some(ColorValue::Hex(hex));
        }
        // "auto" inherits: leave None
    }
    if let Some(shd) = r_pr.child("shd") {
        if let Some(theme) = shd.attr_local("themeFill") {
            props.shading = Some(ShadingValue::Theme {
                name: theme.to_string(),
                tint: shd.attr_local("themeFillTint").and_then(|v| u8::from_str_radix(v, 16).ok()),
                shade: shd
                    .attr_local("themeFillShade")
                    .and_then(|v| u8::from_str_radix(v, 16).ok()),
            });
        } else if let Some(fill) = shd.attr_local("fill").and_then(parse_color_attr) {
            props.shading = Some(ShadingValue::Hex(fill));
        }
    }
    props.highlight = r_pr.child("highlight").and_then(|h| h.val()).and_then(Highlight::parse);
    props.size = r_pr.child("sz").and_then(|s| s.val_int()).map(|v| v as u32);
    props.char_spacing = r_pr.child("spacing").and_then(|s| s.val_int()).map(|v| v as i32);
    if let Some(fonts) = r_pr.child("rFonts") {
        let get = |name: &str| fonts.attr_local(name).map(|s| s.to_string());
        let selection = FontSelection {
            ascii: get("ascii"),
            h_ansi: get("hAnsi"),
            cs: get("cs"),
            east_asia: get("eastAsia"),
            ascii_theme: get("asciiTheme"),
            h_ansi_theme: get("hAnsiTheme"),
            cs_theme: get("cstheme"),
            east_asia_theme: get("eastAsiaTheme"),
            hint: get("hint"),
        };
        if !selection.is_empty() {
            props.fonts = Some(selection);
        }
    }
    match r_pr.child("vertAlign").and_then(|v| v.val()) {
        Some("superscript") => props.superscript = Some(true),
        Some("subscript") => props.subscript = Some(true),
        _ => {},
    }
    props.border = super::table::parse_border_side(r_pr.child("bdr"));

    (props, run_style)
}

/// Parse a `w:sectPr` into section geometry plus header/footer rel ids.
pub(crate) fn parse_section_properties(
    sect: &XmlNode,
) -> (SectionProperties, Option<String>, Option<String>) {
    let mut section = SectionProperties::default();
    if let Some(size) = sect.child("pgSz") {
        if let Some(w) = size.attr_local("w").and_then(|v| v.parse().ok()) {
            section.page_width = w;
        }
        if let Some(h) = size.attr_local("h").and_then(|v| v.parse().ok()) {
            section.page_height = h;
        }
        if size.attr_local("orient") == Some("landscape") {
            section.orientation = Orientation::Landscape;
        }
    }
    if let Some(margins) = sect.child("pgMar") {
        let get = |name: &str, default: i32| {
            margins.attr_local(name).and_then(|v| v.parse().ok()).unwrap_or(default)
        };
        section.margins = Margins {
            top: get("top", 1440),
            right: get("right", 1440),
            bottom: get("bottom", 1440),
            left: get("left", 1440),
            header: get("header", 720),
            footer: get("footer", 720),
            gutter: get("gutter", 0),
        };
    }
    let header_rid = sect
        .children_named("headerReference")
        .find(|h| h.attr_local("type") == Some("default"))
        .or_else(|| sect.children_named("headerReference").next())
        .and_then(|h| h.attr_local("id"))
        .map(|s| s.to_string());
    let footer_rid = sect
        .children_named("footerReference")
        .find(|f| f.attr_local("type") == Some("default"))
        .or_else(|| sect.children_named("footerReference").next())
        .and_then(|f| f.attr_local("id"))
        .map(|s| s.to_string());
    (section, header_rid, footer_rid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::dom;

    #[test]
    fn test_parse_run_properties_basics() {
        let xml = r#"<w:rPr><w:b/><w:i w:val="0"/><w:color w:val="ff0000"/>
            <w:sz w:val="28"/><w:u w:val="double"/><w:highlight w:val="yellow"/></w:rPr>"#;
        let node = dom::parse(xml).unwrap();
        let (props, style) = parse_run_properties(Some(&node));
        assert_eq!(props.bold, Some(true));
        assert_eq!(props.italic, Some(false));
        assert_eq!(props.color, Some(ColorValue::Hex("FF0000".to_string())));
        assert_eq!(props.size, Some(28));
        assert_eq!(props.underline, Some(LineVariant::Double));
        assert_eq!(props.highlight, Some(Highlight::Yellow));
        assert!(style.is_none());
    }

    #[test]
    fn test_auto_color_inherits() {
        let node = dom::parse(r#"<w:rPr><w:color w:val="auto"/></w:rPr>"#).unwrap();
        let (props, _) = parse_run_properties(Some(&node));
        assert_eq!(props.color, None);
    }

    #[test]
    fn test_theme_color_with_tint() {
        let node = dom::parse(
            r#"<w:rPr><w:color w:val="9CC2E5" w:themeColor="accent1" w:themeTint="99"/></w:rPr>"#,
        )
        .unwrap();
        let (props, _) = parse_run_properties(Some(&node));
        assert_eq!(
            props.color,
            Some(ColorValue::Theme {
                name: "accent1".to_string(),
                tint: Some(0x99),
                shade: None,
            })
        );
    }

    #[test]
    fn test_dstrike_maps_to_double() {
        let node = dom::parse(r#"<w:rPr><w:dstrike/></w:rPr>"#).unwrap();
        let (props, _) = parse_run_properties(Some(&node));
        assert_eq!(props.strike, Some(LineVariant::Double));
    }

    #[test]
    fn test_hanging_indent_parses_negative() {
        let node = dom::parse(
            r#"<w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>"#,
        )
        .unwrap();
        let props = parse_paragraph_properties(Some(&node));
        assert_eq!(props.indent.left, Some(720));
        assert_eq!(props.indent.first_line, Some(-360));
    }

    #[test]
    fn test_section_properties_parse() {
        let xml = r#"<w:sectPr>
            <w:headerReference w:type="default" r:id="rId8"/>
            <w:pgSz w:w="15840" w:h="12240" w:orient="landscape"/>
            <w:pgMar w:top="1134" w:right="850" w:bottom="1134" w:left="850"
                     w:header="708" w:footer="708" w:gutter="0"/>
        </w:sectPr>"#;
        let node = dom::parse(xml).unwrap();
        let (section, header, footer) = parse_section_properties(&node);
        assert_eq!(section.page_width, 15840);
        assert_eq!(section.orientation, Orientation::Landscape);
        assert_eq!(section.margins.top, 1134);
        assert_eq!(header.as_deref(), Some("rId8"));
        assert!(footer.is_none());
    }

    #[test]
    fn test_toc_paragraph_detection() {
        let xml = r#"<w:p>
            <w:r><w:fldChar w:fldCharType="begin"/></w:r>
            <w:r><w:instrText xml:space="preserve"> TOC \o "2-4" \h \z \u </w:instrText></w:r>
            <w:r><w:fldChar w:fldCharType="end"/></w:r>
        </w:p>"#;
        let node = dom::parse(xml).unwrap();
        let toc = parse_toc_paragraph(&node).unwrap();
        assert_eq!(toc.from_level, 2);
        assert_eq!(toc.to_level, 4);
    }
}
