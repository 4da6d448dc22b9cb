//! `word/numbering.xml` synthesis.
//!
//! One abstract definition per distinct list, nine levels each, plus a
//! `w:num` mapping every concrete numbering id onto its abstract
//! definition. A continued list's start index becomes a level-0
//! `w:startOverride`.

use super::NumberingInstance;
use crate::ast::NumberFormat;
use crate::xml::XmlBuilder;

/// Render the numbering part for the given instances.
pub(crate) fn synthesize_numbering_xml(instances: &[NumberingInstance]) -> String {
    let mut b = XmlBuilder::new();
    b.open("w:numbering", &[("xmlns:w", crate::ooxml::NS_W)]);

    for instance in instances {
        b.open("w:abstractNum", &[("w:abstractNumId", &instance.abstract_id.to_string())]);
        b.empty("w:multiLevelType", &[("w:val", "hybridMultilevel")]);
        for depth in 0u8..9 {
            let level = instance.style.level(depth);
            b.open("w:lvl", &[("w:ilvl", &depth.to_string())]);
            b.empty("w:start", &[("w:val", "1")]);
            b.empty("w:numFmt", &[("w:val", level.format.as_str())]);
            b.empty("w:lvlText", &[("w:val", &level.text)]);
            b.empty("w:lvlJc", &[("w:val", "left")]);
            b.open("w:pPr", &[]);
            b.empty(
                "w:ind",
                &[
                    ("w:left", &level.indent.to_string()),
                    ("w:hanging", &level.hanging.to_string()),
                ],
            );
            b.close();
            if level.format == NumberFormat::Bullet {
                let font = instance.style.marker_font.as_deref().unwrap_or("Symbol");
                b.open("w:rPr", &[]);
                b.empty(
                    "w:rFonts",
                    &[("w:ascii", font), ("w:hAnsi", font), ("w:hint", "default")],
                );
                if let Some(color) = &instance.style.marker_color {
                    b.empty("w:color", &[("w:val", color)]);
                }
                b.close();
            } else if let Some(color) = &instance.style.marker_color {
                b.open("w:rPr", &[]);
                b.empty("w:color", &[("w:val", color)]);
                b.close();
            }
            b.close(); // w:lvl
        }
        b.close(); // w:abstractNum
    }

    for instance in instances {
        b.open("w:num", &[("w:numId", &instance.num_id.to_string())]);
        b.empty("w:abstractNumId", &[("w:val", &instance.abstract_id.to_string())]);
        if let Some(start) = instance.start_override {
            b.open("w:lvlOverride", &[("w:ilvl", "0")]);
            b.empty("w:startOverride", &[("w:val", &start.to_string())]);
            b.close();
        }
        b.close();
    }

    b.close(); // w:numbering
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ListStyle;

    #[test]
    fn test_nine_levels_always_defined() {
        let instances = vec![NumberingInstance {
            num_id: 1,
            abstract_id: 0,
            style: ListStyle::ordered(),
            start_override: None,
        }];
        let xml = synthesize_numbering_xml(&instances);
        for depth in 0..9 {
            assert!(xml.contains(&format!("<w:lvl w:ilvl=\"{}\">", depth)));
        }
        assert!(xml.contains("w:abstractNumId=\"0\""));
        assert!(xml.contains("<w:num w:numId=\"1\">"));
    }

    #[test]
    fn test_bullet_levels_carry_marker_font() {
        let instances = vec![NumberingInstance {
            num_id: 2,
            abstract_id: 0,
            style: ListStyle::bullet(),
            start_override: None,
        }];
        let xml = synthesize_numbering_xml(&instances);
        assert!(xml.contains("<w:numFmt w:val=\"bullet\"/>"));
        assert!(xml.contains("w:ascii=\"Symbol\""));
    }

    #[test]
    fn test_start_override_emitted() {
        let instances = vec![NumberingInstance {
            num_id: 3,
            abstract_id: 0,
            style: ListStyle::ordered(),
            start_override: Some(4),
        }];
        let xml = synthesize_numbering_xml(&instances);
        assert!(xml.contains("<w:lvlOverride w:ilvl=\"0\">"));
        assert!(xml.contains("<w:startOverride w:val=\"4\"/>"));
    }

    #[test]
    fn test_indentation_scales_with_depth() {
        let instances = vec![NumberingInstance {
            num_id: 1,
            abstract_id: 0,
            style: ListStyle::ordered(),
            start_override: None,
        }];
        let xml = synthesize_numbering_xml(&instances);
        assert!(xml.contains("w:left=\"720\""));
        assert!(xml.contains("w:left=\"6480\"")); // level 8
    }
}
