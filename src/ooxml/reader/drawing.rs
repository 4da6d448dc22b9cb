//! Drawing parsing: `w:drawing` elements back into AST images and shapes.

use super::ReaderContext;
use crate::ast::{
    emu_to_pt, Anchor, AnchorAlign, AnchorOffset, EffectExtent, HorizontalAnchor, Inline,
    InlineImage, Position, Shape, ShapePreset, Text, VerticalAnchor, WrapMode,
};
use crate::ooxml::dom::XmlNode;

/// Anchor attributes the parser understands; anything else lands in the
/// extension map and is re-emitted verbatim.
const KNOWN_ANCHOR_ATTRS: &[&str] = &[
    "distT",
    "distB",
    "distL",
    "distR",
    "simplePos",
    "relativeHeight",
    "behindDoc",
    "locked",
    "layoutInCell",
    "allowOverlap",
];

/// Parse a `w:drawing` element into an image or shape inline.
pub(crate) fn parse_drawing(node: &XmlNode, ctx: &mut ReaderContext) -> Option<Inline> {
    let (container, position) = if let Some(inline) = node.child("inline") {
        (inline, Position::Inline)
    } else if let Some(anchor) = node.child("anchor") {
        (anchor, Position::Floating(Box::new(parse_anchor(anchor))))
    } else {
        return None;
    };

    let (width_pt, height_pt) = parse_extent(container);
    if let Some(id) = container
        .child("docPr")
        .and_then(|d| d.attr_local("id"))
        .and_then(|v| v.parse::<u32>().ok())
    {
        ctx.registry.register_id(id);
    }
    let alt = container
        .child("docPr")
        .and_then(|d| d.attr_local("descr"))
        .map(|s| s.to_string());

    let graphic_data = container.descend(&["graphic", "graphicData"])?;
    if let Some(pic) = graphic_data.child("pic") {
        let embed = pic.descend(&["blipFill", "blip"])?.attr_local("embed")?;
        let mut data = ctx.image_by_rel(embed)?;
        if data.px_width == 0 {
            // Payload could not be probed; assume the 96 dpi rendering size
            data.px_width = (width_pt * 96.0 / 72.0).round() as u32;
            data.px_height = (height_pt * 96.0 / 72.0).round() as u32;
        }
        let mut image = InlineImage::new(data, width_pt, height_pt);
        image.alt = alt;
        image.position = position;
        Some(Inline::Image(image))
    } else if let Some(wsp) = graphic_data.child("wsp") {
        let mut shape = parse_shape(wsp, width_pt, height_pt)?;
        shape.position = position;
        Some(Inline::Shape(shape))
    } else {
        None
    }
}

fn parse_extent(container: &XmlNode) -> (f32, f32) {
    let extent = container.child("extent");
    let cx = extent
        .and_then(|e| e.attr("cx"))
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    let cy = extent
        .and_then(|e| e.attr("cy"))
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    (emu_to_pt(cx), emu_to_pt(cy))
}

/// Parse the full anchor state of a floating drawing.
pub(crate) fn parse_anchor(anchor: &XmlNode) -> Anchor {
    let get_i64 = |name: &str| anchor.attr(name).and_then(|v| v.parse::<i64>().ok());
    let get_flag = |name: &str| matches!(anchor.attr(name), Some("1") | Some("true"));

    let mut result = Anchor {
        dist_top: get_i64("distT").unwrap_or(0),
        dist_bottom: get_i64("distB").unwrap_or(0),
        dist_left: get_i64("distL").unwrap_or(0),
        dist_right: get_i64("distR").unwrap_or(0),
        simple_pos: get_flag("simplePos"),
        relative_height: get_i64("relativeHeight").unwrap_or(0) as u32,
        locked: get_flag("locked"),
        layout_in_cell: get_flag("layoutInCell"),
        allow_overlap: get_flag("allowOverlap"),
        ..Anchor::default()
    };

    // Unknown attributes carried verbatim, in original order
    result.extensions.clear();
    for (key, value) in &anchor.attrs {
        if !KNOWN_ANCHOR_ATTRS.contains(&key.as_str()) {
            result.extensions.insert(key.clone(), value.clone());
        }
    }

    if let Some(pos_h) = anchor.child("positionH") {
        if let Some(base) = pos_h.attr("relativeFrom").and_then(HorizontalAnchor::parse) {
            result.h_anchor = base;
        }
        result.h_offset = parse_offset(pos_h);
    }
    if let Some(pos_v) = anchor.child("positionV") {
        if let Some(base) = pos_v.attr("relativeFrom").and_then(VerticalAnchor::parse) {
            result.v_anchor = base;
        }
        result.v_offset = parse_offset(pos_v);
    }
    if let Some(extent) = anchor.child("effectExtent") {
        let side = |name: &str| extent.attr(name).and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);
        let parsed = EffectExtent {
            left: side("l"),
            top: side("t"),
            right: side("r"),
            bottom: side("b"),
        };
        // An all-zero extent carries no information
        if parsed != EffectExtent::default() {
            result.effect_extent = Some(parsed);
        }
    }

    // behindDoc coerces the wrap mode regardless of the wrap element
    result.wrap = if get_flag("behindDoc") {
        WrapMode::BehindText
    } else if anchor.child("wrapSquare").is_some() {
        WrapMode::Square
    } else if anchor.child("wrapTight").is_some() {
        WrapMode::Tight
    } else if anchor.child("wrapThrough").is_some() {
        WrapMode::Through
    } else if anchor.child("wrapTopAndBottom").is_some() {
        WrapMode::TopAndBottom
    } else {
        WrapMode::None
    };

    result
}

fn parse_offset(position: &XmlNode) -> AnchorOffset {
    if let Some(align) = position.child("align") {
        if let Some(a) = AnchorAlign::parse(align.text.trim()) {
            return AnchorOffset::Align(a);
        }
    }
    if let Some(offset) = position.child("posOffset") {
        if let Ok(emu) = offset.text.trim().parse::<i64>() {
            return AnchorOffset::Offset(emu);
        }
    }
    AnchorOffset::Offset(0)
}

fn parse_shape(wsp: &XmlNode, width_pt: f32, height_pt: f32) -> Option<Shape> {
    let sp_pr = wsp.child("spPr")?;
    let preset = sp_pr
        .child("prstGeom")
        .and_then(|g| g.attr("prst"))
        .map(ShapePreset::parse)
        .unwrap_or(ShapePreset::Rect);
    let mut shape = Shape::new(preset, width_pt, height_pt);

    if let Some(rot) = sp_pr
        .child("xfrm")
        .and_then(|x| x.attr("rot"))
        .and_then(|v| v.parse::<i64>().ok())
    {
        shape.rotation = rot as f32 / 60_000.0;
    }
    if let Some(fill) = sp_pr
        .child("solidFill")
        .and_then(|f| f.child("srgbClr"))
        .and_then(|c| c.attr("val"))
    {
        shape.fill = Some(fill.to_uppercase());
    }
    if let Some(ln) = sp_pr.child("ln") {
        if let Some(color) = ln
            .child("solidFill")
            .and_then(|f| f.child("srgbClr"))
            .and_then(|c| c.attr("val"))
        {
            shape.outline = Some(color.to_uppercase());
        }
        if let Some(w) = ln.attr("w").and_then(|v| v.parse::<i64>().ok()) {
            shape.outline_width_pt = Some(emu_to_pt(w));
        }
    }
    if let Some(content) = wsp.descend(&["txbx", "txbxContent"]) {
        for paragraph in content.children_named("p") {
            for run in paragraph.children_named("r") {
                if let Some(t) = run.child("t") {
                    let (props, _) = super::body::parse_run_properties(run.child("rPr"));
                    shape.text.push(Inline::Text(Text {
                        content: t.text.clone(),
                        props,
                        href: None,
                    }));
                }
            }
        }
    }
    Some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::dom;

    #[test]
    fn test_parse_anchor_known_and_extension_attrs() {
        let xml = r#"<wp:anchor distT="0" distB="0" distL="114300" distR="114300"
            simplePos="0" relativeHeight="2" behindDoc="0" locked="0"
            layoutInCell="1" allowOverlap="1" wp14:anchorId="0A1B2C3D">
            <wp:positionH relativeFrom="page"><wp:posOffset>914400</wp:posOffset></wp:positionH>
            <wp:positionV relativeFrom="paragraph"><wp:align>top</wp:align></wp:positionV>
            <wp:wrapTight wrapText="bothSides"/>
        </wp:anchor>"#;
        let node = dom::parse(xml).unwrap();
        let anchor = parse_anchor(&node);
        assert_eq!(anchor.dist_left, 114_300);
        assert_eq!(anchor.relative_height, 2);
        assert!(anchor.layout_in_cell);
        assert_eq!(anchor.h_anchor, HorizontalAnchor::Page);
        assert_eq!(anchor.h_offset, AnchorOffset::Offset(914_400));
        assert_eq!(anchor.v_offset, AnchorOffset::Align(AnchorAlign::Top));
        assert_eq!(anchor.wrap, WrapMode::Tight);
        assert_eq!(anchor.extensions.get("wp14:anchorId").map(|s| s.as_str()), Some("0A1B2C3D"));
    }

    #[test]
    fn test_behind_doc_wins_over_wrap_element() {
        let xml = r#"<wp:anchor behindDoc="1"><wp:wrapSquare wrapText="bothSides"/></wp:anchor>"#;
        let anchor = parse_anchor(&dom::parse(xml).unwrap());
        assert_eq!(anchor.wrap, WrapMode::BehindText);
    }

    #[test]
    fn test_parse_shape_geometry() {
        let xml = r#"<wps:wsp>
            <wps:spPr>
              <a:xfrm rot="2700000"><a:off x="0" y="0"/><a:ext cx="1270000" cy="635000"/></a:xfrm>
              <a:prstGeom prst="star5"><a:avLst/></a:prstGeom>
              <a:solidFill><a:srgbClr val="ff0000"/></a:solidFill>
              <a:ln w="25400"><a:solidFill><a:srgbClr val="0000ff"/></a:solidFill></a:ln>
            </wps:spPr>
            <wps:txbx><w:txbxContent><w:p><w:r><w:t>inside</w:t></w:r></w:p></w:txbxContent></wps:txbx>
        </wps:wsp>"#;
        let shape = parse_shape(&dom::parse(xml).unwrap(), 100.0, 50.0).unwrap();
        assert_eq!(shape.preset, ShapePreset::Star5);
        assert_eq!(shape.rotation, 45.0);
        assert_eq!(shape.fill.as_deref(), Some("FF0000"));
        assert_eq!(shape.outline.as_deref(), Some("0000FF"));
        assert_eq!(shape.outline_width_pt, Some(2.0));
        assert_eq!(shape.text.len(), 1);
    }
}
