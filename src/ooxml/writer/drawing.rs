//! Drawing emission: inline and anchored images, preset-geometry shapes.

use super::body::BodyContext;
use crate::ast::{
    pt_to_emu, Anchor, AnchorOffset, InlineImage, Position, Shape, WrapMode,
};
use crate::error::Result;
use crate::xml::XmlBuilder;

/// Emit a `w:drawing` for an image (caller provides the enclosing run).
pub(crate) fn write_image(b: &mut XmlBuilder, image: &InlineImage, ctx: &mut BodyContext) -> Result<()> {
    let rid = ctx.image_rel(&image.data);
    let drawing_id = ctx.registry.next_id();
    let cx = pt_to_emu(image.width_pt.max(0.0)).to_string();
    let cy = pt_to_emu(image.height_pt.max(0.0)).to_string();
    let name = format!("Picture {}", drawing_id);
    let alt = image.alt.clone().unwrap_or_default();

    b.open("w:drawing", &[]);
    match &image.position {
        Position::Inline => {
            b.open(
                "wp:inline",
                &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
            );
            b.empty("wp:extent", &[("cx", &cx), ("cy", &cy)]);
            b.empty("wp:effectExtent", &[("l", "0"), ("t", "0"), ("r", "0"), ("b", "0")]);
            write_doc_pr(b, drawing_id, &name, &alt);
            write_frame_lock(b);
            write_picture(b, &rid, &name, &cx, &cy);
            b.close(); // wp:inline
        },
        Position::Floating(anchor) => {
            write_anchor_open(b, anchor);
            b.empty("wp:extent", &[("cx", &cx), ("cy", &cy)]);
            write_effect_extent(b, anchor);
            write_wrap(b, anchor.wrap);
            write_doc_pr(b, drawing_id, &name, &alt);
            write_frame_lock(b);
            write_picture(b, &rid, &name, &cx, &cy);
            b.close(); // wp:anchor
        },
    }
    b.close(); // w:drawing
    Ok(())
}

/// Emit a `w:drawing` for a preset-geometry shape.
pub(crate) fn write_shape(b: &mut XmlBuilder, shape: &Shape, ctx: &mut BodyContext) -> Result<()> {
    let drawing_id = ctx.registry.next_id();
    let cx = pt_to_emu(shape.width_pt.max(0.0)).to_string();
    let cy = pt_to_emu(shape.height_pt.max(0.0)).to_string();
    let name = format!("Shape {}", drawing_id);

    b.open("w:drawing", &[]);
    let floating = match &shape.position {
        Position::Inline => {
            b.open(
                "wp:inline",
                &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
            );
            false
        },
        Position::Floating(anchor) => {
            write_anchor_open(b, anchor);
            true
        },
    };
    b.empty("wp:extent", &[("cx", &cx), ("cy", &cy)]);
    if let Position::Floating(anchor) = &shape.position {
        write_effect_extent(b, anchor);
        write_wrap(b, anchor.wrap);
    } else {
        b.empty("wp:effectExtent", &[("l", "0"), ("t", "0"), ("r", "0"), ("b", "0")]);
    }
    write_doc_pr(b, drawing_id, &name, "");
    write_frame_lock(b);

    b.open("a:graphic", &[("xmlns:a", crate::ooxml::NS_A)]);
    b.open("a:graphicData", &[("uri", crate::ooxml::NS_WPS)]);
    b.open("wps:wsp", &[]);
    b.open("wps:cNvSpPr", &[]);
    b.empty("a:spLocks", &[("noChangeArrowheads", "1")]);
    b.close();
    b.open("wps:spPr", &[]);

    // Rotation is stored in 60000ths of a degree
    if shape.rotation != 0.0 {
        let rot = ((shape.rotation as f64 * 60_000.0).round() as i64).to_string();
        b.open("a:xfrm", &[("rot", &rot)]);
    } else {
        b.open("a:xfrm", &[]);
    }
    b.empty("a:off", &[("x", "0"), ("y", "0")]);
    b.empty("a:ext", &[("cx", &cx), ("cy", &cy)]);
    b.close(); // a:xfrm

    b.open("a:prstGeom", &[("prst", shape.preset.as_str())]);
    b.empty("a:avLst", &[]);
    b.close();

    if let Some(fill) = &shape.fill {
        let fill = ctx.sanitize_hex(fill);
        b.open("a:solidFill", &[]);
        b.empty("a:srgbClr", &[("val", &fill)]);
        b.close();
    } else {
        b.empty("a:noFill", &[]);
    }
    if let Some(outline) = &shape.outline {
        let outline = ctx.sanitize_hex(outline);
        match shape.outline_width_pt {
            Some(width_pt) => {
                let width = pt_to_emu(width_pt).to_string();
                b.open("a:ln", &[("w", &width)]);
            },
            None => {
                b.open("a:ln", &[]);
            },
        }
        b.open("a:solidFill", &[]);
        b.empty("a:srgbClr", &[("val", &outline)]);
        b.close();
        b.close();
    }
    b.close(); // wps:spPr

    if !shape.text.is_empty() {
        // Inner text renders as a single text-box paragraph
        b.open("wps:txbx", &[]);
        b.open("w:txbxContent", &[]);
        b.open("w:p", &[]);
        let paragraph = crate::ast::Paragraph::new(shape.text.clone());
        write_inner_paragraph(b, &paragraph, ctx)?;
        b.close(); // w:p
        b.close(); // w:txbxContent
        b.close(); // wps:txbx
    }
    b.empty("wps:bodyPr", &[("rot", "0"), ("vert", "horz"), ("wrap", "square"), ("anchor", "t")]);

    b.close(); // wps:wsp
    b.close(); // a:graphicData
    b.close(); // a:graphic
    if floating {
        b.close(); // wp:anchor
    } else {
        b.close(); // wp:inline
    }
    b.close(); // w:drawing
    Ok(())
}

fn write_inner_paragraph(
    b: &mut XmlBuilder,
    paragraph: &crate::ast::Paragraph,
    ctx: &mut BodyContext,
) -> Result<()> {
    for inline in &paragraph.inlines {
        if let crate::ast::Inline::Text(text) = inline {
            b.open("w:r", &[]);
            super::body::write_run_properties(b, &text.props, ctx);
            b.preserved_text("w:t", &text.content);
            b.close();
        }
    }
    Ok(())
}

/// Open the `wp:anchor` element with its attributes in canonical order,
/// unknown extension attributes re-emitted after the known ones.
fn write_anchor_open(b: &mut XmlBuilder, anchor: &Anchor) {
    let dist_t = anchor.dist_top.to_string();
    let dist_b = anchor.dist_bottom.to_string();
    let dist_l = anchor.dist_left.to_string();
    let dist_r = anchor.dist_right.to_string();
    let rel_height = anchor.relative_height.to_string();
    let behind = if anchor.wrap == WrapMode::BehindText { "1" } else { "0" };
    let mut attrs: Vec<(&str, &str)> = vec![
        ("distT", &dist_t),
        ("distB", &dist_b),
        ("distL", &dist_l),
        ("distR", &dist_r),
        ("simplePos", if anchor.simple_pos { "1" } else { "0" }),
        ("relativeHeight", &rel_height),
        ("behindDoc", behind),
        ("locked", if anchor.locked { "1" } else { "0" }),
        ("layoutInCell", if anchor.layout_in_cell { "1" } else { "0" }),
        ("allowOverlap", if anchor.allow_overlap { "1" } else { "0" }),
    ];
    for (key, value) in &anchor.extensions {
        attrs.push((key.as_str(), value.as_str()));
    }
    b.open("wp:anchor", &attrs);

    b.empty("wp:simplePos", &[("x", "0"), ("y", "0")]);
    b.open("wp:positionH", &[("relativeFrom", anchor.h_anchor.as_str())]);
    match &anchor.h_offset {
        AnchorOffset::Align(align) => {
            b.open("wp:align", &[]);
            b.text(align.as_str());
            b.close();
        },
        AnchorOffset::Offset(emu) => {
            b.open("wp:posOffset", &[]);
            b.text(&emu.to_string());
            b.close();
        },
    }
    b.close();
    b.open("wp:positionV", &[("relativeFrom", anchor.v_anchor.as_str())]);
    match &anchor.v_offset {
        AnchorOffset::Align(align) => {
            b.open("wp:align", &[]);
            b.text(align.as_str());
            b.close();
        },
        AnchorOffset::Offset(emu) => {
            b.open("wp:posOffset", &[]);
            b.text(&emu.to_string());
            b.close();
        },
    }
    b.close();
}

fn write_effect_extent(b: &mut XmlBuilder, anchor: &Anchor) {
    let extent = anchor.effect_extent.unwrap_or_default();
    b.empty(
        "wp:effectExtent",
        &[
            ("l", &extent.left.to_string()),
            ("t", &extent.top.to_string()),
            ("r", &extent.right.to_string()),
            ("b", &extent.bottom.to_string()),
        ],
    );
}

fn write_wrap(b: &mut XmlBuilder, wrap: WrapMode) {
    match wrap {
        WrapMode::None | WrapMode::BehindText => {
            b.empty("wp:wrapNone", &[]);
        },
        WrapMode::Square => {
            b.empty("wp:wrapSquare", &[("wrapText", "bothSides")]);
        },
        WrapMode::Tight => {
            b.empty("wp:wrapTight", &[("wrapText", "bothSides")]);
        },
        WrapMode::Through => {
            b.empty("wp:wrapThrough", &[("wrapText", "bothSides")]);
        },
        WrapMode::TopAndBottom => {
            b.empty("wp:wrapTopAndBottom", &[]);
        },
    }
}

fn write_doc_pr(b: &mut XmlBuilder, id: u32, name: &str, alt: &str) {
    if alt.is_empty() {
        b.empty("wp:docPr", &[("id", &id.to_string()), ("name", name)]);
    } else {
        b.empty("wp:docPr", &[("id", &id.to_string()), ("name", name), ("descr", alt)]);
    }
}

fn write_frame_lock(b: &mut XmlBuilder) {
    b.open("wp:cNvGraphicFramePr", &[]);
    b.empty(
        "a:graphicFrameLocks",
        &[("xmlns:a", crate::ooxml::NS_A), ("noChangeAspect", "1")],
    );
    b.close();
}

fn write_picture(b: &mut XmlBuilder, rid: &str, name: &str, cx: &str, cy: &str) {
    b.open("a:graphic", &[("xmlns:a", crate::ooxml::NS_A)]);
    b.open("a:graphicData", &[("uri", crate::ooxml::NS_PIC)]);
    b.open("pic:pic", &[("xmlns:pic", crate::ooxml::NS_PIC)]);
    b.open("pic:nvPicPr", &[]);
    b.empty("pic:cNvPr", &[("id", "0"), ("name", name)]);
    b.empty("pic:cNvPicPr", &[]);
    b.close();
    b.open("pic:blipFill", &[]);
    b.empty("a:blip", &[("r:embed", rid)]);
    b.open("a:stretch", &[]);
    b.empty("a:fillRect", &[]);
    b.close();
    b.close();
    b.open("pic:spPr", &[]);
    b.open("a:xfrm", &[]);
    b.empty("a:off", &[("x", "0"), ("y", "0")]);
    b.empty("a:ext", &[("cx", cx), ("cy", cy)]);
    b.close();
    b.open("a:prstGeom", &[("prst", "rect")]);
    b.empty("a:avLst", &[]);
    b.close();
    b.close();
    b.close(); // pic:pic
    b.close(); // a:graphicData
    b.close(); // a:graphic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AnchorAlign, ImageData, ShapePreset};
    use crate::ids::IdRegistry;
    use crate::ooxml::writer::MediaPool;

    fn render_image(image: &InlineImage) -> (String, Vec<crate::ooxml::Relationship>) {
        let mut registry = IdRegistry::with_seed(1);
        let mut rels = Vec::new();
        let mut media = MediaPool::default();
        let mut warnings = Vec::new();
        let mut b = XmlBuilder::fragment();
        {
            let mut ctx = BodyContext {
                registry: &mut registry,
                rels: &mut rels,
                media: &mut media,
                warnings: &mut warnings,
                part: "word/document.xml",
            };
            write_image(&mut b, image, &mut ctx).unwrap();
        }
        (b.finish(), rels)
    }

    #[test]
    fn test_inline_image_extent_in_emu() {
        let image = InlineImage::new(ImageData::new(vec![0u8; 8], "png", 96, 48), 72.0, 36.0);
        let (xml, rels) = render_image(&image);
        assert!(xml.contains("<wp:extent cx=\"914400\" cy=\"457200\"/>"));
        assert!(xml.contains("r:embed=\"rId1\""));
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].target, "media/image1.png");
    }

    #[test]
    fn test_anchor_attribute_order_and_extensions() {
        let mut anchor = Anchor {
            relative_height: 251_658_240,
            ..Anchor::default()
        };
        anchor
            .extensions
            .insert("wp14:anchorId".to_string(), "1A2B3C4D".to_string());
        let image = InlineImage::new(ImageData::new(vec![0u8; 8], "png", 10, 10), 10.0, 10.0)
            .floating(anchor);
        let (xml, _) = render_image(&image);
        let anchor_start = xml.find("<wp:anchor").unwrap();
        let anchor_tag = &xml[anchor_start..xml[anchor_start..].find('>').unwrap() + anchor_start];
        // Known attributes first, extensions last
        let dist_pos = anchor_tag.find("distT=").unwrap();
        let ext_pos = anchor_tag.find("wp14:anchorId=").unwrap();
        assert!(dist_pos < ext_pos);
        assert!(anchor_tag.contains("relativeHeight=\"251658240\""));
    }

    #[test]
    fn test_behind_text_coerces_wrap_none() {
        let anchor = Anchor {
            wrap: WrapMode::BehindText,
            ..Anchor::default()
        };
        let image = InlineImage::new(ImageData::new(vec![0u8; 8], "png", 10, 10), 10.0, 10.0)
            .floating(anchor);
        let (xml, _) = render_image(&image);
        assert!(xml.contains("behindDoc=\"1\""));
        assert!(xml.contains("<wp:wrapNone/>"));
    }

    #[test]
    fn test_anchor_alignment_offset() {
        let anchor = Anchor {
            h_offset: AnchorOffset::Align(AnchorAlign::Center),
            v_offset: AnchorOffset::Offset(914_400),
            ..Anchor::default()
        };
        let image = InlineImage::new(ImageData::new(vec![0u8; 8], "png", 10, 10), 10.0, 10.0)
            .floating(anchor);
        let (xml, _) = render_image(&image);
        assert!(xml.contains("<wp:align>center</wp:align>"));
        assert!(xml.contains("<wp:posOffset>914400</wp:posOffset>"));
    }

    #[test]
    fn test_shape_preset_and_fill() {
        let mut registry = IdRegistry::with_seed(1);
        let mut rels = Vec::new();
        let mut media = MediaPool::default();
        let mut warnings = Vec::new();
        let mut b = XmlBuilder::fragment();
        {
            let mut ctx = BodyContext {
                registry: &mut registry,
                rels: &mut rels,
                media: &mut media,
                warnings: &mut warnings,
                part: "word/document.xml",
            };
            let shape = Shape::new(ShapePreset::RoundRect, 100.0, 50.0)
                .filled("4472C4")
                .outlined("000000", 1.0);
            write_shape(&mut b, &shape, &mut ctx).unwrap();
        }
        let xml = b.finish();
        assert!(xml.contains("<a:prstGeom prst=\"roundRect\">"));
        assert!(xml.contains("<a:srgbClr val=\"4472C4\"/>"));
        assert!(xml.contains("<a:ln w=\"12700\">"));
    }

    #[test]
    fn test_shape_rotation_in_sixty_thousandths() {
        let mut registry = IdRegistry::with_seed(1);
        let mut rels = Vec::new();
        let mut media = MediaPool::default();
        let mut warnings = Vec::new();
        let mut b = XmlBuilder::fragment();
        {
            let mut ctx = BodyContext {
                registry: &mut registry,
                rels: &mut rels,
                media: &mut media,
                warnings: &mut warnings,
                part: "word/document.xml",
            };
            let mut shape = Shape::new(ShapePreset::Rect, 10.0, 10.0);
            shape.rotation = 45.0;
            write_shape(&mut b, &shape, &mut ctx).unwrap();
        }
        assert!(b.finish().contains("<a:xfrm rot=\"2700000\">"));
    }
}
