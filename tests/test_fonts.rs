//! Embedded-font tests: ODTTF obfuscation, font table wiring, round-trip
//! recovery of the original payload.

use docx_oxide::ast::{Block, Document, Inline};
use docx_oxide::fonts::{deobfuscate, guid_key_bytes, obfuscate, EmbeddedFont, FontManager};
use docx_oxide::ids::IdRegistry;
use docx_oxide::ooxml::{DocxReader, DocxWriter};
use proptest::prelude::*;
use std::io::Read;

fn archive_names(bytes: &[u8]) -> Vec<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn archive_part(bytes: &[u8], name: &str) -> Vec<u8> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    content
}

#[test]
fn test_embedded_font_part_and_table() {
    // Register family "TestFont" with payload [0..49]
    let payload: Vec<u8> = (0u8..50).collect();
    let mut registry = IdRegistry::with_seed(42);
    let mut manager = FontManager::new();
    let font = manager.register("TestFont", payload.clone(), &mut registry).clone();
    let guid = font.guid.clone();

    let mut doc = Document::with_blocks(vec![Block::paragraph(vec![Inline::text("uses font")])]);
    doc.embedded_fonts = vec![font];

    let bytes = DocxWriter::new().write(&doc).unwrap();
    let names = archive_names(&bytes);

    // Exactly one obfuscated font part, named by the GUID
    let font_parts: Vec<&String> =
        names.iter().filter(|n| n.starts_with("word/fonts/")).collect();
    assert_eq!(font_parts.len(), 1);
    assert_eq!(font_parts[0], &format!("word/fonts/{{{}}}.odttf", guid));

    // The stored payload is the XOR of the first 32 bytes against the key
    let stored = archive_part(&bytes, font_parts[0]);
    let key = guid_key_bytes(&guid).unwrap();
    for i in 0..32 {
        assert_eq!(stored[i], payload[i] ^ key[15 - (i % 16)]);
    }
    assert_eq!(&stored[32..], &payload[32..]);

    // The font table carries the braced fontKey and an r:id wired through
    // fontTable.xml.rels to the payload
    let table = String::from_utf8(archive_part(&bytes, "word/fontTable.xml")).unwrap();
    assert!(table.contains(&format!("w:fontKey=\"{{{}}}\"", guid)));
    assert!(table.contains("w:name=\"TestFont\""));
    assert!(table.contains("r:id=\"rId1\""));
    let rels =
        String::from_utf8(archive_part(&bytes, "word/_rels/fontTable.xml.rels")).unwrap();
    assert!(rels.contains(&format!("Target=\"fonts/{{{}}}.odttf\"", guid)));

    // Content types declare the obfuscated-font default
    let types = String::from_utf8(archive_part(&bytes, "[Content_Types].xml")).unwrap();
    assert!(types.contains("application/vnd.openxmlformats-package.obfuscated-font"));
}

#[test]
fn test_embedded_font_round_trip() {
    let payload: Vec<u8> = (0u8..200).map(|b| b.wrapping_mul(7)).collect();
    let mut registry = IdRegistry::with_seed(7);
    let mut manager = FontManager::new();
    let font = manager.register("RoundTrip Sans", payload.clone(), &mut registry).clone();

    let mut doc = Document::with_blocks(vec![Block::paragraph(vec![Inline::text("text")])]);
    doc.embedded_fonts = vec![font.clone()];

    let bytes = DocxWriter::new().write(&doc).unwrap();
    let back = DocxReader::read(&bytes).unwrap();
    assert_eq!(back.embedded_fonts.len(), 1);
    let recovered = &back.embedded_fonts[0];
    assert_eq!(recovered.family, "RoundTrip Sans");
    assert_eq!(recovered.guid, font.guid);
    assert_eq!(&recovered.bytes[..], &payload[..]);
}

#[test]
fn test_deobfuscate_is_inverse() {
    let guid = "0155E9FA-8C48-43DC-9D88-93B8C63EAE22";
    let key = guid_key_bytes(guid).unwrap();
    let payload: Vec<u8> = (0u8..64).collect();
    let mut stored = payload.clone();
    obfuscate(&mut stored, &key);
    let recovered = deobfuscate(&stored, &format!("{{{}}}", guid)).unwrap();
    assert_eq!(recovered, payload);
}

#[test]
fn test_font_part_name_shape() {
    let font = EmbeddedFont {
        family: "X".to_string(),
        bytes: vec![0u8; 40].into(),
        guid: "00000000-0000-0000-0000-000000000000".to_string(),
    };
    assert!(font.part_name().ends_with(".odttf"));
    assert!(font.font_key().starts_with('{') && font.font_key().ends_with('}'));
}

proptest! {
    /// deobfuscate(obfuscate(B, K), K) == B for arbitrary payloads and
    /// seeded GUIDs; the XOR touches only the first 32 bytes.
    #[test]
    fn prop_obfuscation_bijection(payload in proptest::collection::vec(any::<u8>(), 0..256), seed in any::<u64>()) {
        let mut registry = IdRegistry::with_seed(seed);
        let guid = registry.guid();
        let key = guid_key_bytes(&guid).unwrap();

        let mut stored = payload.clone();
        obfuscate(&mut stored, &key);
        if payload.len() > 32 {
            prop_assert_eq!(&stored[32..], &payload[32..]);
        }
        obfuscate(&mut stored, &key);
        prop_assert_eq!(stored, payload);
    }
}
