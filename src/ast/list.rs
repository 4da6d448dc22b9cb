//! List nodes and numbering vocabulary.
//!
//! A list is a run of items with levels 0..=8. Lists that share a concrete
//! numbering id but are separated by other content are distinct list nodes;
//! the later node carries a `start_index` continuing the earlier count.

use super::drawing::ImageData;
use super::inline::Inline;

/// Number formats for a list level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberFormat {
    /// 1, 2, 3
    #[default]
    Decimal,
    /// a, b, c
    LowerAlpha,
    /// A, B, C
    UpperAlpha,
    /// i, ii, iii
    LowerRoman,
    /// I, II, III
    UpperRoman,
    /// Bullet marker
    Bullet,
}

impl NumberFormat {
    /// WordprocessingML `w:numFmt` value.
    pub fn as_str(self) -> &'static str {
        match self {
            NumberFormat::Decimal => "decimal",
            NumberFormat::LowerAlpha => "lowerLetter",
            NumberFormat::UpperAlpha => "upperLetter",
            NumberFormat::LowerRoman => "lowerRoman",
            NumberFormat::UpperRoman => "upperRoman",
            NumberFormat::Bullet => "bullet",
        }
    }

    /// Parse a WordprocessingML number format.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "decimal" => NumberFormat::Decimal,
            "lowerLetter" => NumberFormat::LowerAlpha,
            "upperLetter" => NumberFormat::UpperAlpha,
            "lowerRoman" => NumberFormat::LowerRoman,
            "upperRoman" => NumberFormat::UpperRoman,
            "bullet" => NumberFormat::Bullet,
            _ => return None,
        })
    }
}

/// Formatting for one of the nine list levels.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLevel {
    /// Number format at this level
    pub format: NumberFormat,
    /// Marker text, e.g. "%1." or a bullet glyph
    pub text: String,
    /// Left indent in twips
    pub indent: i32,
    /// Hanging indent in twips
    pub hanging: i32,
}

impl ListLevel {
    /// The standard decimal level at the given depth.
    pub fn decimal(depth: u8) -> Self {
        Self {
            format: NumberFormat::Decimal,
            text: format!("%{}.", depth + 1),
            indent: 720 * (depth as i32 + 1),
            hanging: 360,
        }
    }

    /// The standard bullet level at the given depth.
    pub fn bullet(depth: u8) -> Self {
        Self {
            format: NumberFormat::Bullet,
            text: "\u{F0B7}".to_string(),
            indent: 720 * (depth as i32 + 1),
            hanging: 360,
        }
    }
}

/// The style descriptor shared by all items of a list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListStyle {
    /// Per-level formatting; levels beyond the last entry repeat the default
    /// pattern for their depth
    pub levels: Vec<ListLevel>,
    /// Marker font family (e.g. "Symbol" for bullet glyphs)
    pub marker_font: Option<String>,
    /// Marker color, six-hex uppercase
    pub marker_color: Option<String>,
    /// Bullet image, when the marker is a picture
    pub bullet_image: Option<ImageData>,
}

impl ListStyle {
    /// A nine-level ordered (decimal) style.
    pub fn ordered() -> Self {
        Self {
            levels: (0..9).map(ListLevel::decimal).collect(),
            marker_font: None,
            marker_color: None,
            bullet_image: None,
        }
    }

    /// A nine-level bullet style with the Symbol-font round bullet.
    pub fn bullet() -> Self {
        Self {
            levels: (0..9).map(ListLevel::bullet).collect(),
            marker_font: Some("Symbol".to_string()),
            marker_color: None,
            bullet_image: None,
        }
    }

    /// The level descriptor at `depth`, falling back to the standard pattern
    /// when the style defines fewer levels.
    pub fn level(&self, depth: u8) -> ListLevel {
        self.levels.get(depth as usize).cloned().unwrap_or_else(|| {
            if self.levels.first().map(|l| l.format) == Some(NumberFormat::Bullet) {
                ListLevel::bullet(depth)
            } else {
                ListLevel::decimal(depth)
            }
        })
    }
}

/// One list item.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    /// Nesting level, 0..=8
    pub level: u8,
    /// Item content
    pub inlines: Vec<Inline>,
    /// Per-item override of the level style
    ///
    /// An override naming [`NumberFormat::Bullet`] renders a bullet marker
    /// even inside an ordered list.
    pub override_level: Option<ListLevel>,
}

impl ListItem {
    /// A level-0 item.
    pub fn new(inlines: Vec<Inline>) -> Self {
        Self {
            level: 0,
            inlines,
            override_level: None,
        }
    }

    /// Return a copy at the given level (clamped to 0..=8).
    pub fn at_level(mut self, level: u8) -> Self {
        self.level = level.min(8);
        self
    }
}

/// A list block.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    /// Ordered (numbered) vs bullet
    pub is_ordered: bool,
    /// Style descriptor
    pub style: ListStyle,
    /// Items in order
    pub items: Vec<ListItem>,
    /// Concrete numbering id shared with continuation segments
    pub num_id: u32,
    /// 1-based start of the first level-0 item; >1 on a continuation segment
    pub start_index: u32,
}

impl List {
    /// An ordered list with default style.
    pub fn ordered(items: Vec<ListItem>) -> Self {
        Self {
            is_ordered: true,
            style: ListStyle::ordered(),
            items,
            num_id: 0,
            start_index: 1,
        }
    }

    /// A bullet list with default style.
    pub fn bullet(items: Vec<ListItem>) -> Self {
        Self {
            is_ordered: false,
            style: ListStyle::bullet(),
            items,
            num_id: 0,
            start_index: 1,
        }
    }

    /// Count of items at the given level.
    pub fn items_at_level(&self, level: u8) -> u32 {
        self.items.iter().filter(|i| i.level == level).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_format_round_trip() {
        for f in [
            NumberFormat::Decimal,
            NumberFormat::LowerAlpha,
            NumberFormat::UpperAlpha,
            NumberFormat::LowerRoman,
            NumberFormat::UpperRoman,
            NumberFormat::Bullet,
        ] {
            assert_eq!(NumberFormat::parse(f.as_str()), Some(f));
        }
    }

    #[test]
    fn test_ordered_style_has_nine_levels() {
        let style = ListStyle::ordered();
        assert_eq!(style.levels.len(), 9);
        assert_eq!(style.levels[0].text, "%1.");
        assert_eq!(style.levels[8].text, "%9.");
    }

    #[test]
    fn test_level_fallback_repeats_pattern() {
        let style = ListStyle {
            levels: vec![ListLevel::bullet(0)],
            ..ListStyle::bullet()
        };
        let deep = style.level(4);
        assert_eq!(deep.format, NumberFormat::Bullet);
        assert_eq!(deep.indent, 720 * 5);
    }

    #[test]
    fn test_item_level_clamped() {
        let item = ListItem::new(vec![Inline::text("x")]).at_level(12);
        assert_eq!(item.level, 8);
    }

    #[test]
    fn test_items_at_level() {
        let list = List::ordered(vec![
            ListItem::new(vec![Inline::text("a")]),
            ListItem::new(vec![Inline::text("b")]).at_level(1),
            ListItem::new(vec![Inline::text("c")]),
        ]);
        assert_eq!(list.items_at_level(0), 2);
        assert_eq!(list.items_at_level(1), 1);
    }

    #[test]
    fn test_bullet_override_on_ordered_item() {
        // An override naming Bullet is kept even though the list is ordered
        let mut item = ListItem::new(vec![Inline::text("x")]);
        item.override_level = Some(ListLevel::bullet(0));
        let list = List::ordered(vec![item]);
        assert!(list.is_ordered);
        assert_eq!(list.items[0].override_level.as_ref().unwrap().format, NumberFormat::Bullet);
    }
}
