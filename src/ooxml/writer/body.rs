//! Body serialization: blocks and inlines to WordprocessingML.

use super::MediaPool;
use crate::ast::{
    Block, BorderSide, DropCap, ImageBlock, Inline, LineVariant, List, Orientation, Paragraph,
    ParagraphProperties, SectionProperties, Table, TableCell, Text, TextProperties, VMerge,
};
use crate::error::{Result, Warning};
use crate::ids::IdRegistry;
use crate::ooxml::{rel_type, Relationship};
use crate::xml::XmlBuilder;

/// Everything block serialization needs to allocate ids, register
/// relationships and record clamping warnings for one part.
pub(crate) struct BodyContext<'a> {
    pub registry: &'a mut IdRegistry,
    pub rels: &'a mut Vec<Relationship>,
    pub media: &'a mut MediaPool,
    pub warnings: &'a mut Vec<Warning>,
    pub part: &'a str,
}

impl BodyContext<'_> {
    /// Register an image payload and return its `r:embed` id.
    pub fn image_rel(&mut self, data: &crate::ast::ImageData) -> String {
        let file = self.media.add(data);
        let target = format!("media/{}", file);
        if let Some(existing) = self
            .rels
            .iter()
            .find(|r| r.rel_type == rel_type::IMAGE && r.target == target)
        {
            return existing.id.clone();
        }
        let rid = self.registry.next_rel_id();
        self.rels.push(Relationship::internal(&rid, rel_type::IMAGE, target));
        rid
    }

    /// Register a hyperlink target and return its `r:id`.
    pub fn hyperlink_rel(&mut self, href: &str) -> String {
        let rid = self.registry.next_rel_id();
        self.rels.push(Relationship::external(&rid, rel_type::HYPERLINK, href));
        rid
    }

    /// Validate a six-hex color, clamping bad input to black with a warning.
    pub fn sanitize_hex(&mut self, value: &str) -> String {
        let upper = value.to_uppercase();
        if upper.len() == 6 && upper.chars().all(|c| c.is_ascii_hexdigit()) {
            upper
        } else if upper == "AUTO" {
            "auto".to_string()
        } else {
            self.warnings.push(Warning::constraint(
                self.part,
                format!("invalid hex color '{}' clamped to 000000", value),
            ));
            "000000".to_string()
        }
    }
}

/// Serialize a block sequence.
pub(crate) fn write_blocks(b: &mut XmlBuilder, blocks: &[Block], ctx: &mut BodyContext) -> Result<()> {
    for block in blocks {
        match block {
            Block::Paragraph(p) => write_paragraph(b, p, ctx, None)?,
            Block::Table(t) => write_table(b, t, ctx)?,
            Block::List(l) => write_list(b, l, ctx)?,
            Block::Image(img) => write_image_block(b, img, ctx)?,
            Block::Shape(s) => {
                b.open("w:p", &[]);
                b.open("w:r", &[]);
                super::drawing::write_shape(b, &s.shape, ctx)?;
                b.close();
                b.close();
            },
            Block::SectionBreak(section) => {
                b.open("w:p", &[]);
                b.open("w:pPr", &[]);
                write_section_properties(b, section, None, None);
                b.close();
                b.close();
            },
            Block::DropCap(d) => write_drop_cap(b, d, ctx)?,
            Block::TableOfContents(toc) => {
                b.open("w:p", &[]);
                write_field_begin(b);
                write_instr_text(b, &toc.instruction());
                write_field_char(b, "separate");
                write_field_char(b, "end");
                b.close();
            },
        }
    }
    Ok(())
}

fn write_paragraph(
    b: &mut XmlBuilder,
    paragraph: &Paragraph,
    ctx: &mut BodyContext,
    numbering: Option<(u32, u8)>,
) -> Result<()> {
    b.open("w:p", &[]);
    let mut props = paragraph.props.clone();
    if let Some((num_id, level)) = numbering {
        props.numbering = Some(crate::ast::NumberingRef { num_id, level });
        if props.style_id.is_none() {
            props.style_id = Some("ListParagraph".to_string());
        }
    }
    write_paragraph_properties(b, &props, ctx);
    write_inlines(b, &paragraph.inlines, ctx)?;
    b.close();
    Ok(())
}

fn write_paragraph_properties(b: &mut XmlBuilder, props: &ParagraphProperties, ctx: &mut BodyContext) {
    if props.is_empty() {
        return;
    }
    b.open("w:pPr", &[]);
    if let Some(style) = &props.style_id {
        b.empty("w:pStyle", &[("w:val", style)]);
    }
    if props.page_break_before {
        b.empty("w:pageBreakBefore", &[]);
    }
    if let Some(num) = &props.numbering {
        b.open("w:numPr", &[]);
        b.empty("w:ilvl", &[("w:val", &num.level.min(8).to_string())]);
        b.empty("w:numId", &[("w:val", &num.num_id.to_string())]);
        b.close();
    }
    if !props.borders.is_empty() {
        b.open("w:pBdr", &[]);
        for (tag, side) in [
            ("w:top", &props.borders.top),
            ("w:left", &props.borders.left),
            ("w:bottom", &props.borders.bottom),
            ("w:right", &props.borders.right),
        ] {
            if let Some(side) = side {
                write_border_side(b, tag, side, ctx);
            }
        }
        b.close();
    }
    if let Some(fill) = &props.shading {
        let fill = ctx.sanitize_hex(fill);
        b.empty("w:shd", &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", &fill)]);
    }
    if props.spacing_before.is_some() || props.spacing_after.is_some() || props.line_spacing.is_some()
    {
        let mut attrs: Vec<(&str, String)> = Vec::new();
        if let Some(before) = props.spacing_before {
            attrs.push(("w:before", before.to_string()));
        }
        if let Some(after) = props.spacing_after {
            attrs.push(("w:after", after.to_string()));
        }
        if let Some(spacing) = props.line_spacing {
            attrs.push(("w:line", spacing.amount.to_string()));
            attrs.push(("w:lineRule", spacing.rule.as_str().to_string()));
        }
        let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        b.empty("w:spacing", &borrowed);
    }
    let indent = &props.indent;
    if indent.left.is_some() || indent.right.is_some() || indent.first_line.is_some() {
        let mut attrs: Vec<(&str, String)> = Vec::new();
        if let Some(left) = indent.left {
            attrs.push(("w:left", left.to_string()));
        }
        if let Some(right) = indent.right {
            attrs.push(("w:right", right.to_string()));
        }
        // Hanging N is encoded as first-line = -N
        if let Some(first) = indent.first_line {
            if first < 0 {
                attrs.push(("w:hanging", (-first).to_string()));
            } else {
                attrs.push(("w:firstLine", first.to_string()));
            }
        }
        let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        b.empty("w:ind", &borrowed);
    }
    if let Some(alignment) = props.alignment {
        b.empty("w:jc", &[("w:val", alignment.as_str())]);
    }
    b.close();
}

pub(crate) fn write_inlines(b: &mut XmlBuilder, inlines: &[Inline], ctx: &mut BodyContext) -> Result<()> {
    for inline in inlines {
        match inline {
            Inline::Text(text) => write_text(b, text, ctx)?,
            Inline::LineBreak => {
                b.open("w:r", &[]);
                b.empty("w:br", &[]);
                b.close();
            },
            Inline::Tab => {
                b.open("w:r", &[]);
                b.empty("w:tab", &[]);
                b.close();
            },
            Inline::Image(image) => {
                b.open("w:r", &[]);
                super::drawing::write_image(b, image, ctx)?;
                b.close();
            },
            Inline::Shape(shape) => {
                b.open("w:r", &[]);
                super::drawing::write_shape(b, shape, ctx)?;
                b.close();
            },
            Inline::FootnoteRef(id) => {
                b.open("w:r", &[]);
                b.open("w:rPr", &[]);
                b.empty("w:rStyle", &[("w:val", "FootnoteReference")]);
                b.close();
                b.empty("w:footnoteReference", &[("w:id", &id.to_string())]);
                b.close();
            },
            Inline::EndnoteRef(id) => {
                b.open("w:r", &[]);
                b.open("w:rPr", &[]);
                b.empty("w:rStyle", &[("w:val", "EndnoteReference")]);
                b.close();
                b.empty("w:endnoteReference", &[("w:id", &id.to_string())]);
                b.close();
            },
            Inline::Checkbox { checked } => write_checkbox(b, *checked),
            Inline::PageNumber => {
                b.empty("w:fldSimple", &[("w:instr", " PAGE ")]);
            },
            Inline::PageCount => {
                b.empty("w:fldSimple", &[("w:instr", " NUMPAGES ")]);
            },
            Inline::Raw(xml) => {
                b.raw(xml);
            },
        }
    }
    Ok(())
}

fn write_text(b: &mut XmlBuilder, text: &Text, ctx: &mut BodyContext) -> Result<()> {
    if let Some(href) = &text.href {
        let rid = ctx.hyperlink_rel(href);
        b.open("w:hyperlink", &[("r:id", &rid), ("w:history", "1")]);
        write_run(b, text, ctx);
        b.close();
    } else {
        write_run(b, text, ctx);
    }
    Ok(())
}

fn write_run(b: &mut XmlBuilder, text: &Text, ctx: &mut BodyContext) {
    b.open("w:r", &[]);
    write_run_properties(b, &text.props, ctx);
    b.preserved_text("w:t", &text.content);
    b.close();
}

/// Emit `w:rPr`, fields in the schema's declaration order.
pub(crate) fn write_run_properties(b: &mut XmlBuilder, props: &TextProperties, ctx: &mut BodyContext) {
    if props.is_empty() {
        return;
    }
    b.open("w:rPr", &[]);
    if let Some(fonts) = &props.fonts {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        let pairs = [
            ("w:ascii", &fonts.ascii),
            ("w:hAnsi", &fonts.h_ansi),
            ("w:eastAsia", &fonts.east_asia),
            ("w:cs", &fonts.cs),
            ("w:asciiTheme", &fonts.ascii_theme),
            ("w:hAnsiTheme", &fonts.h_ansi_theme),
            ("w:eastAsiaTheme", &fonts.east_asia_theme),
            ("w:cstheme", &fonts.cs_theme),
            ("w:hint", &fonts.hint),
        ];
        for (key, value) in pairs {
            if let Some(v) = value {
                attrs.push((key, v.as_str()));
            }
        }
        if !attrs.is_empty() {
            b.empty("w:rFonts", &attrs);
        }
    }
    write_toggle(b, "w:b", props.bold);
    write_toggle(b, "w:i", props.italic);
    write_toggle(b, "w:caps", props.all_caps);
    write_toggle(b, "w:smallCaps", props.small_caps);
    match props.strike {
        Some(LineVariant::Single) => {
            b.empty("w:strike", &[]);
        },
        Some(LineVariant::Double) => {
            b.empty("w:dstrike", &[]);
        },
        Some(LineVariant::None) => {
            b.empty("w:strike", &[("w:val", "0")]);
        },
        None => {},
    }
    write_toggle(b, "w:outline", props.outline);
    write_toggle(b, "w:shadow", props.shadow);
    write_toggle(b, "w:emboss", props.emboss);
    write_toggle(b, "w:imprint", props.imprint);
    if let Some(color) = &props.color {
        match color {
            crate::ast::ColorValue::Hex(hex) => {
                let hex = ctx.sanitize_hex(hex);
                b.empty("w:color", &[("w:val", &hex)]);
            },
            crate::ast::ColorValue::Theme { name, tint, shade } => {
                let mut attrs: Vec<(&str, String)> =
                    vec![("w:val", "000000".to_string()), ("w:themeColor", name.clone())];
                if let Some(t) = tint {
                    attrs.push(("w:themeTint", format!("{:02X}", t)));
                }
                if let Some(s) = shade {
                    attrs.push(("w:themeShade", format!("{:02X}", s)));
                }
                let borrowed: Vec<(&str, &str)> =
                    attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
                b.empty("w:color", &borrowed);
            },
        }
    }
    if let Some(spacing) = props.char_spacing {
        b.empty("w:spacing", &[("w:val", &spacing.to_string())]);
    }
    if let Some(size) = props.size {
        let size = size.to_string();
        b.empty("w:sz", &[("w:val", &size)]);
        b.empty("w:szCs", &[("w:val", &size)]);
    }
    if let Some(highlight) = props.highlight {
        b.empty("w:highlight", &[("w:val", highlight.as_str())]);
    }
    match props.underline {
        Some(LineVariant::Single) => {
            b.empty("w:u", &[("w:val", "single")]);
        },
        Some(LineVariant::Double) => {
            b.empty("w:u", &[("w:val", "double")]);
        },
        Some(LineVariant::None) => {
            b.empty("w:u", &[("w:val", "none")]);
        },
        None => {},
    }
    if let Some(border) = &props.border {
        write_border_side(b, "w:bdr", border, ctx);
    }
    if let Some(shading) = &props.shading {
        match shading {
            crate::ast::ShadingValue::Hex(hex) => {
                let hex = ctx.sanitize_hex(hex);
                b.empty("w:shd", &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", &hex)]);
            },
            crate::ast::ShadingValue::Theme { name, tint, shade } => {
                let mut attrs: Vec<(&str, String)> = vec![
                    ("w:val", "clear".to_string()),
                    ("w:color", "auto".to_string()),
                    ("w:fill", "FFFFFF".to_string()),
                    ("w:themeFill", name.clone()),
                ];
                if let Some(t) = tint {
                    attrs.push(("w:themeFillTint", format!("{:02X}", t)));
                }
                if let Some(s) = shade {
                    attrs.push(("w:themeFillShade", format!("{:02X}", s)));
                }
                let borrowed: Vec<(&str, &str)> =
                    attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
                b.empty("w:shd", &borrowed);
            },
        }
    }
    if props.superscript == Some(true) {
        b.empty("w:vertAlign", &[("w:val", "superscript")]);
    } else if props.subscript == Some(true) {
        b.empty("w:vertAlign", &[("w:val", "subscript")]);
    }
    b.close();
}

fn write_toggle(b: &mut XmlBuilder, tag: &str, value: Option<bool>) {
    match value {
        Some(true) => {
            b.empty(tag, &[]);
        },
        Some(false) => {
            b.empty(tag, &[("w:val", "0")]);
        },
        None => {},
    }
}

fn write_border_side(b: &mut XmlBuilder, tag: &str, side: &BorderSide, ctx: &mut BodyContext) {
    let color = ctx.sanitize_hex(&side.color);
    b.empty(
        tag,
        &[
            ("w:val", side.style.as_str()),
            ("w:sz", &side.size.to_string()),
            ("w:space", "0"),
            ("w:color", &color),
        ],
    );
}

fn write_checkbox(b: &mut XmlBuilder, checked: bool) {
    b.open("w:r", &[]);
    b.open("w:fldChar", &[("w:fldCharType", "begin")]);
    b.open("w:ffData", &[]);
    b.empty("w:name", &[("w:val", "")]);
    b.empty("w:enabled", &[]);
    b.empty("w:calcOnExit", &[("w:val", "0")]);
    b.open("w:checkBox", &[]);
    b.empty("w:sizeAuto", &[]);
    b.empty("w:default", &[("w:val", if checked { "1" } else { "0" })]);
    b.close();
    b.close();
    b.close();
    b.close();
    write_instr_text(b, " FORMCHECKBOX ");
    write_field_char(b, "end");
}

fn write_field_begin(b: &mut XmlBuilder) {
    write_field_char(b, "begin");
}

fn write_field_char(b: &mut XmlBuilder, kind: &str) {
    b.open("w:r", &[]);
    b.empty("w:fldChar", &[("w:fldCharType", kind)]);
    b.close();
}

fn write_instr_text(b: &mut XmlBuilder, instruction: &str) {
    b.open("w:r", &[]);
    b.preserved_text("w:instrText", instruction);
    b.close();
}

fn write_image_block(b: &mut XmlBuilder, image: &ImageBlock, ctx: &mut BodyContext) -> Result<()> {
    // Pixel dimensions render at 96 dpi
    let width_pt = image.data.px_width as f32 * 72.0 / 96.0;
    let height_pt = image.data.px_height as f32 * 72.0 / 96.0;
    let mut inline = crate::ast::InlineImage::new(image.data.clone(), width_pt, height_pt);
    inline.alt = image.alt.clone();
    b.open("w:p", &[]);
    b.open("w:r", &[]);
    super::drawing::write_image(b, &inline, ctx)?;
    b.close();
    b.close();
    Ok(())
}

fn write_list(b: &mut XmlBuilder, list: &List, ctx: &mut BodyContext) -> Result<()> {
    for item in &list.items {
        let paragraph = Paragraph::new(item.inlines.clone());
        write_paragraph(b, &paragraph, ctx, Some((list.num_id, item.level)))?;
    }
    Ok(())
}

fn write_drop_cap(b: &mut XmlBuilder, drop_cap: &DropCap, ctx: &mut BodyContext) -> Result<()> {
    let mut lines = drop_cap.lines;
    if lines < 2 {
        ctx.warnings.push(Warning::constraint(
            ctx.part,
            format!("drop cap lines {} clamped to 2", lines),
        ));
        lines = 2;
    }
    // The dropped letter lives in its own framed paragraph
    b.open("w:p", &[]);
    b.open("w:pPr", &[]);
    let lines_str = lines.to_string();
    let mut attrs: Vec<(&str, String)> = vec![
        ("w:dropCap", drop_cap.style.as_str().to_string()),
        ("w:lines", lines_str),
    ];
    if let Some(h_space) = drop_cap.h_space {
        attrs.push(("w:hSpace", h_space.to_string()));
    }
    attrs.push(("w:wrap", "around".to_string()));
    attrs.push(("w:vAnchor", "text".to_string()));
    attrs.push(("w:hAnchor", "text".to_string()));
    let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    b.empty("w:framePr", &borrowed);
    b.empty("w:spacing", &[("w:after", "0")]);
    b.close();

    let mut letter_props = TextProperties::default();
    if let Some(family) = &drop_cap.font_family {
        letter_props.fonts = Some(crate::ast::FontSelection::named(family.clone()));
    }
    letter_props.size = drop_cap.size;
    let letter = Text::new(drop_cap.letter.clone()).with_props(letter_props);
    write_run(b, &letter, ctx);
    b.close();

    // The remaining text continues in a normal paragraph
    let rest = Paragraph::new(drop_cap.rest.clone());
    write_paragraph(b, &rest, ctx, None)
}

fn write_table(b: &mut XmlBuilder, table: &Table, ctx: &mut BodyContext) -> Result<()> {
    b.open("w:tbl", &[]);
    b.open("w:tblPr", &[]);
    if let Some(style) = &table.style_id {
        b.empty("w:tblStyle", &[("w:val", style)]);
    }
    if let Some(float) = &table.float {
        b.empty(
            "w:tblpPr",
            &[
                ("w:leftFromText", &float.left_from_text.to_string()),
                ("w:rightFromText", &float.right_from_text.to_string()),
                ("w:topFromText", &float.top_from_text.to_string()),
                ("w:bottomFromText", &float.bottom_from_text.to_string()),
                ("w:horzAnchor", &float.h_anchor),
                ("w:vertAnchor", &float.v_anchor),
                ("w:tblpX", &float.x.to_string()),
                ("w:tblpY", &float.y.to_string()),
            ],
        );
    }
    match table.width {
        Some(width) => {
            b.empty(
                "w:tblW",
                &[("w:w", &width.amount.to_string()), ("w:type", width.kind.as_str())],
            );
        },
        None => {
            b.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")]);
        },
    }
    if let Some(alignment) = table.alignment {
        b.empty("w:jc", &[("w:val", alignment.as_str())]);
    }
    if !table.borders.is_empty() {
        b.open("w:tblBorders", &[]);
        for (tag, side) in [
            ("w:top", &table.borders.top),
            ("w:left", &table.borders.left),
            ("w:bottom", &table.borders.bottom),
            ("w:right", &table.borders.right),
            ("w:insideH", &table.borders.inside_h),
            ("w:insideV", &table.borders.inside_v),
        ] {
            if let Some(side) = side {
                write_border_side(b, tag, side, ctx);
            }
        }
        b.close();
    }
    let look = format!("{:04X}", table.look);
    b.empty(
        "w:tblLook",
        &[
            ("w:val", &look),
            ("w:firstRow", if table.look & crate::ast::table::TBL_LOOK_FIRST_ROW != 0 { "1" } else { "0" }),
            ("w:lastRow", if table.look & crate::ast::table::TBL_LOOK_LAST_ROW != 0 { "1" } else { "0" }),
            ("w:firstColumn", if table.look & crate::ast::table::TBL_LOOK_FIRST_COL != 0 { "1" } else { "0" }),
            ("w:lastColumn", if table.look & crate::ast::table::TBL_LOOK_LAST_COL != 0 { "1" } else { "0" }),
            ("w:noHBand", if table.look & crate::ast::table::TBL_LOOK_NO_H_BAND != 0 { "1" } else { "0" }),
            ("w:noVBand", if table.look & crate::ast::table::TBL_LOOK_NO_V_BAND != 0 { "1" } else { "0" }),
        ],
    );
    b.close(); // w:tblPr

    // Column grid: equal split of the fixed width when known
    let columns = table.column_count().max(1);
    let total = match table.width {
        Some(w) if w.kind == crate::ast::WidthType::Twips => w.amount,
        _ => 9026,
    };
    b.open("w:tblGrid", &[]);
    for _ in 0..columns {
        b.empty("w:gridCol", &[("w:w", &(total / columns as i32).to_string())]);
    }
    b.close();

    // Active vertical merges: (start column, width in columns, rows left)
    let mut active: Vec<(u32, u32, u32)> = Vec::new();
    for row in &table.rows {
        b.open("w:tr", &[]);
        if row.is_header {
            b.open("w:trPr", &[]);
            b.empty("w:tblHeader", &[]);
            b.close();
        }
        let mut pending: Vec<(u32, u32, u32)> = Vec::new();
        let mut col = 0u32;
        let mut cells = row.cells.iter().peekable();
        loop {
            if let Some(idx) = active.iter().position(|s| s.0 == col && s.2 > 0) {
                // Continuation cell for a merge started in an earlier row
                let (_, span, _) = active[idx];
                write_merge_continuation(b, span);
                active[idx].2 -= 1;
                if active[idx].2 == 0 {
                    active.remove(idx);
                }
                col += span;
                continue;
            }
            match cells.next() {
                Some(cell) => {
                    write_cell(b, cell, ctx)?;
                    if cell.row_span > 1 {
                        pending.push((col, cell.grid_span, cell.row_span - 1));
                    }
                    col += cell.grid_span;
                },
                None => {
                    // Any remaining merges further right still need cells
                    match active
                        .iter()
                        .filter(|s| s.0 >= col && s.2 > 0)
                        .map(|s| s.0)
                        .min()
                    {
                        Some(next) => col = next,
                        None => break,
                    }
                },
            }
        }
        b.close(); // w:tr
        active.extend(pending);
    }
    b.close(); // w:tbl
    Ok(())
}

fn write_merge_continuation(b: &mut XmlBuilder, span: u32) {
    b.open("w:tc", &[]);
    b.open("w:tcPr", &[]);
    if span > 1 {
        b.empty("w:gridSpan", &[("w:val", &span.to_string())]);
    }
    b.empty("w:vMerge", &[]);
    b.close();
    b.empty("w:p", &[]);
    b.close();
}

fn write_cell(b: &mut XmlBuilder, cell: &TableCell, ctx: &mut BodyContext) -> Result<()> {
    b.open("w:tc", &[]);
    b.open("w:tcPr", &[]);
    if let Some(width) = cell.width {
        b.empty("w:tcW", &[("w:w", &width.amount.to_string()), ("w:type", width.kind.as_str())]);
    }
    if cell.grid_span > 1 {
        b.empty("w:gridSpan", &[("w:val", &cell.grid_span.to_string())]);
    }
    if cell.row_span > 1 {
        b.empty("w:vMerge", &[("w:val", "restart")]);
    } else if cell.v_merge == Some(VMerge::Continue) {
        b.empty("w:vMerge", &[]);
    }
    if !cell.borders.is_empty() {
        b.open("w:tcBorders", &[]);
        for (tag, side) in [
            ("w:top", &cell.borders.top),
            ("w:left", &cell.borders.left),
            ("w:bottom", &cell.borders.bottom),
            ("w:right", &cell.borders.right),
        ] {
            if let Some(side) = side {
                write_border_side(b, tag, side, ctx);
            }
        }
        b.close();
    }
    if let Some(fill) = &cell.shading {
        let fill = ctx.sanitize_hex(fill);
        b.empty("w:shd", &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", &fill)]);
    }
    if cell.v_align != crate::ast::VerticalAlignment::Top {
        b.empty("w:vAlign", &[("w:val", cell.v_align.as_str())]);
    }
    b.close(); // w:tcPr
    if cell.blocks.is_empty() {
        // A cell must end with a paragraph
        b.empty("w:p", &[]);
    } else {
        write_blocks(b, &cell.blocks, ctx)?;
    }
    b.close(); // w:tc
    Ok(())
}

/// Emit the section descriptor (trailing `w:sectPr` or inside a break).
pub(crate) fn write_section_properties(
    b: &mut XmlBuilder,
    section: &SectionProperties,
    header_rid: Option<&str>,
    footer_rid: Option<&str>,
) {
    b.open("w:sectPr", &[]);
    if let Some(rid) = header_rid {
        b.empty("w:headerReference", &[("w:type", "default"), ("r:id", rid)]);
    }
    if let Some(rid) = footer_rid {
        b.empty("w:footerReference", &[("w:type", "default"), ("r:id", rid)]);
    }
    let width = section.page_width.to_string();
    let height = section.page_height.to_string();
    match section.orientation {
        Orientation::Portrait => {
            b.empty("w:pgSz", &[("w:w", &width), ("w:h", &height)]);
        },
        Orientation::Landscape => {
            b.empty("w:pgSz", &[("w:w", &width), ("w:h", &height), ("w:orient", "landscape")]);
        },
    }
    let m = &section.margins;
    b.empty(
        "w:pgMar",
        &[
            ("w:top", &m.top.to_string()),
            ("w:right", &m.right.to_string()),
            ("w:bottom", &m.bottom.to_string()),
            ("w:left", &m.left.to_string()),
            ("w:header", &m.header.to_string()),
            ("w:footer", &m.footer.to_string()),
            ("w:gutter", &m.gutter.to_string()),
        ],
    );
    b.empty("w:cols", &[("w:space", "708")]);
    b.empty("w:docGrid", &[("w:linePitch", "360")]);
    b.close();
}
