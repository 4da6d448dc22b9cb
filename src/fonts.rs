//! Embedded-font management and ODTTF obfuscation.
//!
//! Each embedded font is stored in the package as `word/fonts/{GUID}.odttf`
//! with its first 32 bytes XOR-obfuscated against a 16-byte key derived from
//! the GUID. The font table entry carries `fontKey = "{GUID}"` so a reader
//! can reverse the XOR and recover the original payload.

use crate::error::{Error, Result};
use bytes::Bytes;

/// A font registered for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFont {
    /// Family name as it appears in the font table
    pub family: String,
    /// The original (de-obfuscated) font payload
    pub bytes: Bytes,
    /// Obfuscation GUID, uppercase `8-4-4-4-12` without braces
    pub guid: String,
}

impl EmbeddedFont {
    /// The part name inside the container.
    pub fn part_name(&self) -> String {
        format!("word/fonts/{{{}}}.odttf", self.guid)
    }

    /// The `fontKey` attribute value (braced GUID).
    pub fn font_key(&self) -> String {
        format!("{{{}}}", self.guid)
    }
}

/// Parse a GUID string into its 16 key bytes.
///
/// The first three fields are little-endian, the remaining bytes are taken
/// in order — the standard mixed-endian GUID layout.
pub fn guid_key_bytes(guid: &str) -> Result<[u8; 16]> {
    let hex: String = guid.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if hex.len() != 32 {
        return Err(Error::Constraint(format!("malformed font GUID: {}", guid)));
    }
    let mut raw = [0u8; 16];
    for (i, chunk) in raw.iter_mut().enumerate() {
        *chunk = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| Error::Constraint(format!("malformed font GUID: {}", guid)))?;
    }
    let mut key = [0u8; 16];
    // Data1 (4 bytes), Data2 (2), Data3 (2) flip to little-endian
    key[0] = raw[3];
    key[1] = raw[2];
    key[2] = raw[1];
    key[3] = raw[0];
    key[4] = raw[5];
    key[5] = raw[4];
    key[6] = raw[7];
    key[7] = raw[6];
    key[8..16].copy_from_slice(&raw[8..16]);
    Ok(key)
}

/// Obfuscate a font payload in place: XOR the first 32 bytes with the key,
/// byte `i` against `key[15 - (i % 16)]`.
///
/// The operation is an involution — applying it twice restores the input —
/// so the same function de-obfuscates.
pub fn obfuscate(data: &mut [u8], key: &[u8; 16]) {
    for (i, byte) in data.iter_mut().take(32).enumerate() {
        *byte ^= key[15 - (i % 16)];
    }
}

/// De-obfuscate an ODTTF payload using the braced `fontKey` from the font
/// table.
pub fn deobfuscate(data: &[u8], font_key: &str) -> Result<Vec<u8>> {
    let key = guid_key_bytes(font_key)?;
    let mut out = data.to_vec();
    obfuscate(&mut out, &key);
    Ok(out)
}

/// Registers `(family, bytes)` pairs and assigns each a fresh GUID.
#[derive(Debug, Default)]
pub struct FontManager {
    fonts: Vec<EmbeddedFont>,
}

impl FontManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a font for embedding. Payloads already registered (same
    /// bytes identity) are returned as-is rather than re-registered.
    pub fn register(
        &mut self,
        family: impl Into<String>,
        bytes: impl Into<Bytes>,
        registry: &mut crate::ids::IdRegistry,
    ) -> &EmbeddedFont {
        let family = family.into();
        let bytes = bytes.into();
        let existing = self
            .fonts
            .iter()
            .position(|f| f.bytes.as_ptr() == bytes.as_ptr() && f.bytes.len() == bytes.len());
        let idx = match existing {
            Some(i) => i,
            None => {
                self.fonts.push(EmbeddedFont {
                    family,
                    bytes,
                    guid: registry.guid(),
                });
                self.fonts.len() - 1
            },
        };
        &self.fonts[idx]
    }

    /// Adopt a font read back from a package, keeping its GUID.
    pub fn adopt(&mut self, font: EmbeddedFont) {
        self.fonts.push(font);
    }

    /// The registered fonts in registration order.
    pub fn fonts(&self) -> &[EmbeddedFont] {
        &self.fonts
    }

    /// Produce the obfuscated payload for one registered font.
    pub fn obfuscated_payload(&self, font: &EmbeddedFont) -> Result<Vec<u8>> {
        let key = guid_key_bytes(&font.guid)?;
        let mut out = font.bytes.to_vec();
        obfuscate(&mut out, &key);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdRegistry;

    const GUID: &str = "0155E9FA-8C48-43DC-9D88-93B8C63EAE22";

    #[test]
    fn test_guid_key_bytes_mixed_endian() {
        let key = guid_key_bytes(GUID).unwrap();
        // Data1 0155E9FA little-endian
        assert_eq!(&key[0..4], &[0xFA, 0xE9, 0x55, 0x01]);
        // Data2 8C48 little-endian
        assert_eq!(&key[4..6], &[0x48, 0x8C]);
        // Data3 43DC little-endian
        assert_eq!(&key[6..8], &[0xDC, 0x43]);
        // Remaining bytes in order
        assert_eq!(&key[8..16], &[0x9D, 0x88, 0x93, 0xB8, 0xC6, 0x3E, 0xAE, 0x22]);
    }

    #[test]
    fn test_guid_key_accepts_braces() {
        let braced = format!("{{{}}}", GUID);
        assert_eq!(guid_key_bytes(&braced).unwrap(), guid_key_bytes(GUID).unwrap());
    }

    #[test]
    fn test_guid_key_rejects_short_input() {
        assert!(guid_key_bytes("1234").is_err());
    }

    #[test]
    fn test_obfuscation_is_an_involution() {
        let key = guid_key_bytes(GUID).unwrap();
        let original: Vec<u8> = (0u8..50).collect();
        let mut data = original.clone();
        obfuscate(&mut data, &key);
        assert_ne!(data, original);
        obfuscate(&mut data, &key);
        assert_eq!(data, original);
    }

    #[test]
    fn test_obfuscation_covers_only_first_32_bytes() {
        let key = guid_key_bytes(GUID).unwrap();
        let original: Vec<u8> = (0u8..50).collect();
        let mut data = original.clone();
        obfuscate(&mut data, &key);
        assert_eq!(&data[32..], &original[32..]);
        for i in 0..32 {
            assert_eq!(data[i], original[i] ^ key[15 - (i % 16)]);
        }
    }

    #[test]
    fn test_deobfuscate_with_braced_key() {
        let key = guid_key_bytes(GUID).unwrap();
        let original: Vec<u8> = (0u8..64).collect();
        let mut stored = original.clone();
        obfuscate(&mut stored, &key);
        let recovered = deobfuscate(&stored, &format!("{{{}}}", GUID)).unwrap();
        assert_eq!(recovered, original);
    }

    #[test]
    fn test_register_dedup_by_identity() {
        let mut registry = IdRegistry::with_seed(5);
        let mut manager = FontManager::new();
        let payload = Bytes::from((0u8..50).collect::<Vec<u8>>());
        let guid_a = manager.register("TestFont", payload.clone(), &mut registry).guid.clone();
        let guid_b = manager.register("TestFont", payload, &mut registry).guid.clone();
        assert_eq!(guid_a, guid_b);
        assert_eq!(manager.fonts().len(), 1);
    }

    #[test]
    fn test_part_name_and_font_key() {
        let font = EmbeddedFont {
            family: "TestFont".to_string(),
            bytes: Bytes::from_static(&[0u8; 4]),
            guid: GUID.to_string(),
        };
        assert_eq!(font.part_name(), format!("word/fonts/{{{}}}.odttf", GUID));
        assert_eq!(font.font_key(), format!("{{{}}}", GUID));
    }
}
