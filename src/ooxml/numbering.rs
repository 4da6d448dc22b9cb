//! The two-level numbering model: abstract definitions and concrete
//! instances.
//!
//! `numId` is referenced from each list-item paragraph's `numPr`;
//! `abstractNumId` is referenced from `w:num`. Levels 0..=8 are always
//! defined even when only level 0 is used.

use crate::ast::{ListLevel, ListStyle, NumberFormat};
use std::collections::{BTreeMap, HashMap};

/// One level of an abstract numbering definition.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractLevel {
    /// Number format
    pub format: NumberFormat,
    /// Marker text (`w:lvlText`)
    pub text: String,
    /// Left indent in twips
    pub indent: i32,
    /// Hanging indent in twips
    pub hanging: i32,
    /// Start value (`w:start`)
    pub start: u32,
    /// Marker font, when the level pins one
    pub marker_font: Option<String>,
    /// Marker color
    pub marker_color: Option<String>,
}

impl AbstractLevel {
    /// Build from an AST list level.
    pub fn from_list_level(level: &ListLevel) -> Self {
        Self {
            format: level.format,
            text: level.text.clone(),
            indent: level.indent,
            hanging: level.hanging,
            start: 1,
            marker_font: None,
            marker_color: None,
        }
    }

    /// Convert to an AST list level.
    pub fn to_list_level(&self) -> ListLevel {
        ListLevel {
            format: self.format,
            text: self.text.clone(),
            indent: self.indent,
            hanging: self.hanging,
        }
    }
}

/// An abstract numbering definition: nine levels.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractNumbering {
    /// `abstractNumId`
    pub id: u32,
    /// Levels 0..=8
    pub levels: Vec<AbstractLevel>,
}

impl AbstractNumbering {
    /// The level descriptor at `ilvl`, when defined.
    pub fn level(&self, ilvl: u8) -> Option<&AbstractLevel> {
        self.levels.get(ilvl as usize)
    }

    /// True when level 0 renders a bullet marker.
    pub fn is_bullet(&self) -> bool {
        self.levels.first().map(|l| l.format == NumberFormat::Bullet).unwrap_or(false)
    }

    /// Convert to an AST list style.
    pub fn to_list_style(&self) -> ListStyle {
        ListStyle {
            levels: self.levels.iter().map(AbstractLevel::to_list_level).collect(),
            marker_font: self.levels.first().and_then(|l| l.marker_font.clone()),
            marker_color: self.levels.first().and_then(|l| l.marker_color.clone()),
            bullet_image: None,
        }
    }
}

/// A concrete numbering instance: `numId → abstractNumId` plus per-level
/// start overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumInstance {
    /// `abstractNumId` this instance maps to
    pub abstract_id: u32,
    /// `w:startOverride` per level
    pub start_overrides: BTreeMap<u8, u32>,
}

/// Every numbering definition of a document.
#[derive(Debug, Clone, Default)]
pub struct NumberingTables {
    /// Abstract definitions keyed by `abstractNumId`
    pub abstracts: BTreeMap<u32, AbstractNumbering>,
    /// Concrete instances keyed by `numId`
    pub nums: BTreeMap<u32, NumInstance>,
}

impl NumberingTables {
    /// An empty table set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The abstract definition behind a concrete `numId`.
    pub fn abstract_for(&self, num_id: u32) -> Option<&AbstractNumbering> {
        self.nums.get(&num_id).and_then(|n| self.abstracts.get(&n.abstract_id))
    }

    /// The level descriptor a `(numId, ilvl)` pair resolves to.
    pub fn level_for(&self, num_id: u32, ilvl: u8) -> Option<&AbstractLevel> {
        self.abstract_for(num_id).and_then(|a| a.level(ilvl))
    }

    /// The effective start for a level: the instance override when present,
    /// the abstract level's `w:start` otherwise.
    pub fn start_for(&self, num_id: u32, ilvl: u8) -> u32 {
        if let Some(instance) = self.nums.get(&num_id) {
            if let Some(s) = instance.start_overrides.get(&ilvl) {
                return *s;
            }
        }
        self.level_for(num_id, ilvl).map(|l| l.start).unwrap_or(1)
    }

    /// True when the `numId` renders ordered markers at level 0.
    pub fn is_ordered(&self, num_id: u32) -> bool {
        self.abstract_for(num_id).map(|a| !a.is_bullet()).unwrap_or(true)
    }
}

/// Tracks item counts per `(numId, level)` so a list resumed after an
/// interruption knows where its numbering continues.
///
/// When two list segments share a `numId` and are separated by non-list
/// content, the second segment's start index is the count of same-level
/// items already seen plus one.
#[derive(Debug, Default)]
pub struct ContinuityTracker {
    counts: HashMap<(u32, u8), u32>,
}

impl ContinuityTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// The 1-based start index a new segment of `numId` should carry at
    /// the given level.
    pub fn start_index(&self, num_id: u32, level: u8) -> u32 {
        self.counts.get(&(num_id, level)).copied().unwrap_or(0) + 1
    }

    /// Record one item.
    pub fn record(&mut self, num_id: u32, level: u8) {
        *self.counts.entry((num_id, level)).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal_abstract(id: u32) -> AbstractNumbering {
        AbstractNumbering {
            id,
            levels: (0..9)
                .map(|i| AbstractLevel {
                    format: NumberFormat::Decimal,
                    text: format!("%{}.", i + 1),
                    indent: 720 * (i as i32 + 1),
                    hanging: 360,
                    start: 1,
                    marker_font: None,
                    marker_color: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_num_to_abstract_resolution() {
        let mut tables = NumberingTables::new();
        tables.abstracts.insert(0, decimal_abstract(0));
        tables.nums.insert(1, NumInstance { abstract_id: 0, ..Default::default() });

        assert!(tables.abstract_for(1).is_some());
        assert!(tables.abstract_for(2).is_none());
        assert_eq!(tables.level_for(1, 3).unwrap().text, "%4.");
    }

    #[test]
    fn test_start_override_wins() {
        let mut tables = NumberingTables::new();
        tables.abstracts.insert(0, decimal_abstract(0));
        let mut instance = NumInstance { abstract_id: 0, ..Default::default() };
        instance.start_overrides.insert(0, 4);
        tables.nums.insert(1, instance);

        assert_eq!(tables.start_for(1, 0), 4);
        assert_eq!(tables.start_for(1, 1), 1);
    }

    #[test]
    fn test_is_ordered() {
        let mut tables = NumberingTables::new();
        tables.abstracts.insert(0, decimal_abstract(0));
        let mut bullet = decimal_abstract(1);
        bullet.levels[0].format = NumberFormat::Bullet;
        tables.abstracts.insert(1, bullet);
        tables.nums.insert(1, NumInstance { abstract_id: 0, ..Default::default() });
        tables.nums.insert(2, NumInstance { abstract_id: 1, ..Default::default() });

        assert!(tables.is_ordered(1));
        assert!(!tables.is_ordered(2));
    }

    #[test]
    fn test_continuity_counts_per_level() {
        let mut tracker = ContinuityTracker::new();
        // First segment: two level-0 items, one level-1 item
        tracker.record(1, 0);
        tracker.record(1, 0);
        tracker.record(1, 1);
        // The resumed segment starts at 3 on level 0, 2 on level 1
        assert_eq!(tracker.start_index(1, 0), 3);
        assert_eq!(tracker.start_index(1, 1), 2);
        // A different numId is unaffected
        assert_eq!(tracker.start_index(2, 0), 1);
    }
}
