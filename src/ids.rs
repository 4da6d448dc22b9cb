//! Identifier and relationship registry.
//!
//! Every numeric id (drawings, bookmarks, comments, footnotes, endnotes),
//! every relationship id (`rId1`, `rId2`, ...), the 8-hex document id, RSIDs
//! and font-obfuscation GUIDs are allocated here. Ids seen while reading an
//! existing package are registered so a re-save never collides with them.
//!
//! Allocation is deterministic given a fixed starting counter; the document
//! id and GUIDs are the only nondeterministic outputs, and both come from a
//! single entropy source that can be seeded for reproducible tests.

use std::collections::HashSet;

/// Relationship targets with a fixed, well-known id slot.
///
/// Word reserves the low `rId` numbers for the standard document-level
/// parts; everything else (images, hyperlinks, headers, fonts) takes the
/// next free id in encounter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedRel {
    /// `word/styles.xml` — rId1
    Styles,
    /// `word/settings.xml` — rId2
    Settings,
    /// `word/webSettings.xml` — rId3
    WebSettings,
    /// `word/fontTable.xml` — rId4
    FontTable,
    /// `word/numbering.xml` — rId5
    Numbering,
    /// `word/footnotes.xml` — rId6
    Footnotes,
    /// `word/endnotes.xml` — rId7
    Endnotes,
}

impl ReservedRel {
    fn slot(self) -> u32 {
        match self {
            ReservedRel::Styles => 1,
            ReservedRel::Settings => 2,
            ReservedRel::WebSettings => 3,
            ReservedRel::FontTable => 4,
            ReservedRel::Numbering => 5,
            ReservedRel::Footnotes => 6,
            ReservedRel::Endnotes => 7,
        }
    }
}

/// Entropy source for document ids, RSIDs and GUIDs.
///
/// The default draws from `uuid` v4; the seeded variant is an xorshift64*
/// generator so tests can pin every random output.
#[derive(Debug, Clone)]
enum Entropy {
    Os,
    Seeded(u64),
}

impl Entropy {
    fn next_u32(&mut self) -> u32 {
        match self {
            Entropy::Os => {
                let bytes = uuid::Uuid::new_v4().into_bytes();
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            },
            Entropy::Seeded(state) => {
                // xorshift64* step
                let mut x = *state;
                x ^= x >> 12;
                x ^= x << 25;
                x ^= x >> 27;
                *state = x;
                (x.wrapping_mul(0x2545F4914F6CDD1D) >> 32) as u32
            },
        }
    }

    fn next_guid(&mut self) -> String {
        match self {
            Entropy::Os => {
                format!("{}", uuid::Uuid::new_v4().as_hyphenated()).to_uppercase()
            },
            Entropy::Seeded(_) => {
                let mut hex = String::with_capacity(32);
                for _ in 0..4 {
                    hex.push_str(&format!("{:08X}", self.next_u32()));
                }
                format!(
                    "{}-{}-{}-{}-{}",
                    &hex[0..8],
                    &hex[8..12],
                    &hex[12..16],
                    &hex[16..20],
                    &hex[20..32]
                )
            },
        }
    }
}

/// Allocates stable, unique ids for everything the container references.
#[derive(Debug, Clone)]
pub struct IdRegistry {
    next_id: u32,
    next_rel: u32,
    used_ids: HashSet<u32>,
    used_rels: HashSet<u32>,
    used_doc_ids: HashSet<String>,
    entropy: Entropy,
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdRegistry {
    /// Create a registry drawing randomness from the OS.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_rel: 1,
            used_ids: HashSet::new(),
            used_rels: HashSet::new(),
            used_doc_ids: HashSet::new(),
            entropy: Entropy::Os,
        }
    }

    /// Create a registry with a deterministic entropy source.
    ///
    /// Every document id, RSID and GUID becomes reproducible; integer and
    /// relationship allocation is already deterministic.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            entropy: Entropy::Seeded(seed.max(1)),
            ..Self::new()
        }
    }

    /// Allocate the next free integer id (drawings, bookmarks, notes, comments).
    pub fn next_id(&mut self) -> u32 {
        while self.used_ids.contains(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.used_ids.insert(id);
        self.next_id += 1;
        id
    }

    /// Register an integer id seen while reading, so it is never re-issued.
    pub fn register_id(&mut self, id: u32) {
        self.used_ids.insert(id);
    }

    /// Find the next free integer id at or above `floor` without allocating it.
    pub fn next_free_from(&self, floor: u32) -> u32 {
        let mut candidate = floor;
        while self.used_ids.contains(&candidate) {
            candidate += 1;
        }
        candidate
    }

    /// Allocate the next relationship id, rendered as `rId{N}`.
    pub fn next_rel_id(&mut self) -> String {
        while self.used_rels.contains(&self.next_rel) {
            self.next_rel += 1;
        }
        let n = self.next_rel;
        self.used_rels.insert(n);
        self.next_rel += 1;
        format!("rId{}", n)
    }

    /// Reserve the well-known relationship id for a standard part.
    ///
    /// If the slot is already taken (an unusual package registered it first)
    /// the next free id is returned instead.
    pub fn reserve_rel(&mut self, purpose: ReservedRel) -> String {
        let slot = purpose.slot();
        if self.used_rels.insert(slot) {
            format!("rId{}", slot)
        } else {
            self.next_rel_id()
        }
    }

    /// Register a relationship id (e.g. `rId12`) seen while reading.
    pub fn register_rel_id(&mut self, rel_id: &str) {
        if let Some(n) = rel_id.strip_prefix("rId").and_then(|s| s.parse::<u32>().ok()) {
            self.used_rels.insert(n);
        }
    }

    /// Begin a fresh relationship-id scope.
    ///
    /// Relationship parts are fully regenerated on every write and ids are
    /// only unique within their owning part, so ids seen on read do not
    /// constrain a new write.
    pub fn reset_rels(&mut self) {
        self.used_rels.clear();
        self.next_rel = 1;
    }

    /// Generate an 8-hex-character uppercased document id.
    ///
    /// Retries up to 100 times on collision with a registered id; after that
    /// the last candidate is returned (the container has no cross-kind
    /// uniqueness constraint, so a late duplicate is harmless).
    pub fn document_id(&mut self) -> String {
        let mut candidate = String::new();
        for _ in 0..100 {
            candidate = format!("{:08X}", self.entropy.next_u32());
            if self.used_doc_ids.insert(candidate.clone()) {
                return candidate;
            }
        }
        candidate
    }

    /// Register a document id or RSID seen while reading.
    pub fn register_document_id(&mut self, id: &str) {
        self.used_doc_ids.insert(id.to_uppercase());
    }

    /// Generate a revision save id — same shape as a document id.
    pub fn rsid(&mut self) -> String {
        self.document_id()
    }

    /// Generate a GUID-style string `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`
    /// (uppercase, no braces), used as the font obfuscation key.
    pub fn guid(&mut self) -> String {
        self.entropy.next_guid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ids_are_sequential_and_unique() {
        let mut reg = IdRegistry::new();
        assert_eq!(reg.next_id(), 1);
        assert_eq!(reg.next_id(), 2);
        assert_eq!(reg.next_id(), 3);
    }

    #[test]
    fn test_registered_ids_are_skipped() {
        let mut reg = IdRegistry::new();
        reg.register_id(1);
        reg.register_id(2);
        assert_eq!(reg.next_id(), 3);
    }

    #[test]
    fn test_next_free_from_scans_used_set() {
        let mut reg = IdRegistry::new();
        reg.register_id(5);
        reg.register_id(6);
        assert_eq!(reg.next_free_from(5), 7);
        assert_eq!(reg.next_free_from(1), 1);
    }

    #[test]
    fn test_rel_ids_render_with_prefix() {
        let mut reg = IdRegistry::new();
        assert_eq!(reg.next_rel_id(), "rId1");
        assert_eq!(reg.next_rel_id(), "rId2");
    }

    #[test]
    fn test_reserved_rel_slots() {
        let mut reg = IdRegistry::new();
        assert_eq!(reg.reserve_rel(ReservedRel::Styles), "rId1");
        assert_eq!(reg.reserve_rel(ReservedRel::Numbering), "rId5");
        assert_eq!(reg.reserve_rel(ReservedRel::Endnotes), "rId7");
        // Next dynamic id skips the taken slots
        assert_eq!(reg.next_rel_id(), "rId2");
    }

    #[test]
    fn test_reserved_slot_collision_falls_back() {
        let mut reg = IdRegistry::new();
        reg.register_rel_id("rId1");
        let id = reg.reserve_rel(ReservedRel::Styles);
        assert_ne!(id, "rId1");
        assert!(id.starts_with("rId"));
    }

    #[test]
    fn test_document_id_shape() {
        let mut reg = IdRegistry::with_seed(42);
        let id = reg.document_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, id.to_uppercase());
    }

    #[test]
    fn test_document_ids_unique_under_seed() {
        let mut reg = IdRegistry::with_seed(7);
        let a = reg.document_id();
        let b = reg.document_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seeded_registry_is_reproducible() {
        let mut a = IdRegistry::with_seed(123);
        let mut b = IdRegistry::with_seed(123);
        assert_eq!(a.document_id(), b.document_id());
        assert_eq!(a.guid(), b.guid());
        assert_eq!(a.rsid(), b.rsid());
    }

    #[test]
    fn test_guid_shape() {
        let mut reg = IdRegistry::with_seed(99);
        let guid = reg.guid();
        let parts: Vec<&str> = guid.split('-').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 4);
        assert_eq!(parts[3].len(), 4);
        assert_eq!(parts[4].len(), 12);
        assert!(guid.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_os_guid_is_uppercase() {
        let mut reg = IdRegistry::new();
        let guid = reg.guid();
        assert_eq!(guid, guid.to_uppercase());
        assert_eq!(guid.len(), 36);
    }
}
