//! PDF import: content streams back into the document AST.
//!
//! The pipeline per page: decrypt and decompress the content stream,
//! interpret it against the page resources (fonts, image XObjects), then
//! group the positioned items into blocks. A page that fails to decode
//! emits a warning and is skipped; the rest of the document survives.

pub mod content;
pub mod decode;
pub mod encryption;
pub mod file;
pub mod fonts;
pub mod layout;
pub mod lexer;
pub mod object;
pub mod xref;

pub use file::PdfFile;
pub use layout::LayoutConfig;

use crate::ast::{Block, Document, ImageData, Orientation, SectionProperties};
use crate::error::{Result, Warning};
use crate::pdf::fonts::PdfFont;
use crate::pdf::object::{Dict, ObjRef, Object};
use std::cell::RefCell;
use std::collections::HashMap;

/// Reads PDF files into [`Document`] values.
#[derive(Debug, Clone, Default)]
pub struct PdfImporter {
    config: LayoutConfig,
    password: Vec<u8>,
}

impl PdfImporter {
    /// An importer with default layout thresholds and no password.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the layout tuning.
    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply the user or owner password for encrypted input.
    pub fn with_password(mut self, password: impl Into<Vec<u8>>) -> Self {
        self.password = password.into();
        self
    }

    /// Import a PDF byte sequence.
    pub fn import(&self, bytes: &[u8]) -> Result<Document> {
        let mut file = PdfFile::load(bytes, &self.password)?;
        let pages = file.pages()?;
        let mut document = Document::new();

        if let Some(first) = pages.first() {
            document.section = section_from_media_box(first.media_box);
        }

        for (number, page) in pages.iter().enumerate() {
            match self.import_page(&mut file, page) {
                Ok(blocks) => {
                    let mut blocks = blocks;
                    if number > 0 {
                        mark_page_break(&mut blocks);
                    }
                    document.blocks.extend(blocks);
                },
                Err(e) => {
                    log::warn!("page {}: {}", number + 1, e);
                    document.warnings.push(Warning::partial(
                        format!("page {}", number + 1),
                        e.to_string(),
                    ));
                },
            }
        }
        Ok(document)
    }

    fn import_page(&self, file: &mut PdfFile, page: &file::Page) -> Result<Vec<Block>> {
        let fonts = build_fonts(file, &page.resources);
        let images = build_images(file, &page.resources);
        let interpreted = content::interpret(&page.contents, &fonts);
        Ok(layout::page_to_blocks(&interpreted, &images, &self.config))
    }
}

/// Page size in points maps to twips; landscape when wider than tall.
fn section_from_media_box(media_box: [f32; 4]) -> SectionProperties {
    let width_pt = (media_box[2] - media_box[0]).abs();
    let height_pt = (media_box[3] - media_box[1]).abs();
    SectionProperties {
        page_width: (width_pt * 20.0).round() as i32,
        page_height: (height_pt * 20.0).round() as i32,
        orientation: if width_pt > height_pt {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        },
        ..SectionProperties::default()
    }
}

fn mark_page_break(blocks: &mut [Block]) {
    if let Some(Block::Paragraph(p)) = blocks.first_mut() {
        p.props.page_break_before = true;
    }
}

/// Build the page's font map from its `/Font` resources.
fn build_fonts(file: &mut PdfFile, resources: &Dict) -> HashMap<String, PdfFont> {
    let font_dict = {
        let obj = match resources.get("Font") {
            Some(obj) => obj.clone(),
            None => return HashMap::new(),
        };
        match file.resolve(&obj) {
            Ok(resolved) => resolved.as_dict().cloned().unwrap_or_default(),
            Err(_) => return HashMap::new(),
        }
    };

    let cell = RefCell::new(file);
    let resolve = |obj: &Object| -> Option<Object> { cell.borrow_mut().resolve(obj).ok() };
    let load_stream = |obj: &Object| -> Option<Vec<u8>> {
        let mut file = cell.borrow_mut();
        let stream = match obj {
            Object::Reference(r) => file.object(*r).ok()?,
            other => other.clone(),
        };
        file.stream_data(&stream, ObjRef::new(0, 0)).ok()
    };

    let mut fonts = HashMap::new();
    for (name, value) in &font_dict {
        let dict = match resolve(value).and_then(|o| o.as_dict().cloned()) {
            Some(d) => d,
            None => continue,
        };
        fonts.insert(name.clone(), PdfFont::from_dict(&dict, &resolve, &load_stream));
    }
    fonts
}

/// Decode the page's image XObjects: JPEG and JPEG 2000 pass through,
/// FlateDecode rasters are repackaged as PNG.
fn build_images(file: &mut PdfFile, resources: &Dict) -> HashMap<String, ImageData> {
    let xobjects = {
        let obj = match resources.get("XObject") {
            Some(obj) => obj.clone(),
            None => return HashMap::new(),
        };
        match file.resolve(&obj) {
            Ok(resolved) => resolved.as_dict().cloned().unwrap_or_default(),
            Err(_) => return HashMap::new(),
        }
    };

    let mut images = HashMap::new();
    for (name, value) in &xobjects {
        let stream = match file.resolve(value) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let dict = match stream.as_dict() {
            Some(d) => d.clone(),
            None => continue,
        };
        if dict.get("Subtype").and_then(|s| s.as_name()) != Some("Image") {
            continue;
        }
        let width = dict.get("Width").and_then(|o| o.as_int()).unwrap_or(0) as u32;
        let height = dict.get("Height").and_then(|o| o.as_int()).unwrap_or(0) as u32;
        if width == 0 || height == 0 {
            continue;
        }
        let filters = stream.filters();
        let data = if filters.iter().any(|f| f == "DCTDecode" || f == "DCT") {
            // JPEG is kept as-is
            match &stream {
                Object::Stream { data, .. } => {
                    Some(ImageData::new(data.clone(), "jpeg", width, height))
                },
                _ => None,
            }
        } else if filters.iter().any(|f| f == "JPXDecode") {
            match &stream {
                Object::Stream { data, .. } => {
                    Some(ImageData::new(data.clone(), "jp2", width, height))
                },
                _ => None,
            }
        } else {
            // Raw samples: repackage as PNG
            file.stream_data(&stream, ObjRef::new(0, 0))
                .ok()
                .and_then(|raw| repackage_png(&dict, width, height, raw))
        };
        if let Some(data) = data {
            images.insert(name.clone(), data);
        }
    }
    images
}

/// Encode raw RGB or grayscale samples as a PNG payload.
fn repackage_png(dict: &Dict, width: u32, height: u32, raw: Vec<u8>) -> Option<ImageData> {
    let bits = dict.get("BitsPerComponent").and_then(|o| o.as_int()).unwrap_or(8);
    if bits != 8 {
        return None;
    }
    let color_space = dict.get("ColorSpace").and_then(|c| c.as_name()).unwrap_or("DeviceRGB");
    let dynamic = match color_space {
        "DeviceRGB" => {
            let expected = (width * height * 3) as usize;
            if raw.len() < expected {
                return None;
            }
            image::DynamicImage::ImageRgb8(image::RgbImage::from_raw(
                width,
                height,
                raw[..expected].to_vec(),
            )?)
        },
        "DeviceGray" => {
            let expected = (width * height) as usize;
            if raw.len() < expected {
                return None;
            }
            image::DynamicImage::ImageLuma8(image::GrayImage::from_raw(
                width,
                height,
                raw[..expected].to_vec(),
            )?)
        },
        _ => return None,
    };
    let mut png = Vec::new();
    dynamic
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .ok()?;
    Some(ImageData::new(png, "png", width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Inline;

    #[test]
    fn test_import_minimal_text_pdf() {
        let pdf = file::tests::minimal_pdf(b"BT /F1 12 Tf 100 700 Td (Hello PDF) Tj ET");
        let document = PdfImporter::new().import(&pdf).unwrap();
        assert!(document.warnings.is_empty());
        assert_eq!(document.blocks.len(), 1);
        match &document.blocks[0] {
            Block::Paragraph(p) => match &p.inlines[0] {
                Inline::Text(t) => assert_eq!(t.content, "Hello PDF"),
                other => panic!("expected text, got {:?}", other),
            },
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_import_section_from_media_box() {
        let pdf = file::tests::minimal_pdf(b"");
        let document = PdfImporter::new().import(&pdf).unwrap();
        // US Letter: 612x792pt = 12240x15840 twips
        assert_eq!(document.section.page_width, 12240);
        assert_eq!(document.section.page_height, 15840);
        assert_eq!(document.section.orientation, Orientation::Portrait);
    }

    #[test]
    fn test_invalid_header_rejected() {
        let result = PdfImporter::new().import(b"not a pdf at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_section_landscape() {
        let section = section_from_media_box([0.0, 0.0, 792.0, 612.0]);
        assert_eq!(section.orientation, Orientation::Landscape);
    }
}
