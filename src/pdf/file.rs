//! Whole-file PDF access: header check, object resolution (including
//! object streams), decryption wiring and the page tree.

use crate::error::{Error, Result};
use crate::pdf::decode::{self, DecodeParams};
use crate::pdf::encryption::{handler_from_trailer, SecurityHandler};
use crate::pdf::lexer;
use crate::pdf::object::{parse_object, Dict, ObjRef, Object};
use crate::pdf::xref::{parse_xref, Xref, XrefEntry};
use std::collections::HashMap;

/// Supported header versions.
const VERSIONS: &[&str] = &["1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "2.0"];

/// One page, resources and media box inherited down the page tree.
#[derive(Debug, Clone)]
pub struct Page {
    /// The page's resource dictionary (fonts, XObjects)
    pub resources: Dict,
    /// MediaBox `[x0 y0 x1 y1]` in points
    pub media_box: [f32; 4],
    /// Decrypted, decompressed content stream (all segments joined)
    pub contents: Vec<u8>,
}

/// A parsed PDF file: xref plus lazily resolved objects.
pub struct PdfFile {
    bytes: Vec<u8>,
    xref: Xref,
    handler: Option<SecurityHandler>,
    cache: HashMap<u32, Object>,
    version: String,
}

impl PdfFile {
    /// Load a PDF, authenticating with `password` when it is encrypted.
    pub fn load(bytes: &[u8], password: &[u8]) -> Result<Self> {
        let version = sniff_header(bytes)?;
        let xref = parse_xref(bytes)?;
        let mut file = Self {
            bytes: bytes.to_vec(),
            xref,
            handler: None,
            cache: HashMap::new(),
            version,
        };
        // The /Encrypt dictionary must be resolved before the handler is
        // installed: its own strings are never encrypted.
        let trailer = file.xref.trailer.clone();
        let handler = handler_from_trailer(
            &trailer,
            |obj| match obj {
                Object::Reference(r) => file.object_raw(*r).ok(),
                other => Some(other.clone()),
            },
            password,
        )?;
        file.handler = handler;
        Ok(file)
    }

    /// The header version (`1.4`, `2.0`, ...).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// True when the file carried an /Encrypt dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.handler.is_some()
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.xref.trailer
    }

    /// Fetch an indirect object, decrypting its strings and stream payload.
    pub fn object(&mut self, r: ObjRef) -> Result<Object> {
        if let Some(cached) = self.cache.get(&r.num) {
            return Ok(cached.clone());
        }
        let mut obj = self.object_raw(r)?;
        if let Some(handler) = &self.handler {
            obj = decrypt_object(obj, handler, r.num, r.gen);
        }
        self.cache.insert(r.num, obj.clone());
        Ok(obj)
    }

    /// Fetch without decryption (used while bootstrapping the handler).
    fn object_raw(&self, r: ObjRef) -> Result<Object> {
        match self.xref.get(r.num) {
            None | Some(XrefEntry::Free) => Err(Error::ObjectNotFound(r.num, r.gen)),
            Some(XrefEntry::Offset(offset)) => self.object_at(offset, r),
            Some(XrefEntry::InStream(container, index)) => {
                self.object_in_stream(container, index, r)
            },
        }
    }

    fn object_at(&self, offset: u64, r: ObjRef) -> Result<Object> {
        let start = offset as usize;
        if start >= self.bytes.len() {
            return Err(Error::InvalidPdf(format!("object {} offset beyond EOF", r)));
        }
        // Skip the `N G obj` header
        let rest = lexer::skip_ws(&self.bytes[start..]);
        let (rest, tok) = lexer::token(rest).map_err(|_| Error::ObjectNotFound(r.num, r.gen))?;
        if tok != lexer::Token::Integer(r.num as i64) {
            return Err(Error::InvalidPdf(format!("object {} not found at its offset", r)));
        }
        let (rest, _gen) = lexer::token(rest).map_err(|_| Error::ObjectNotFound(r.num, r.gen))?;
        let (rest, kw) = lexer::token(rest).map_err(|_| Error::ObjectNotFound(r.num, r.gen))?;
        if kw != lexer::Token::ObjStart {
            return Err(Error::InvalidPdf(format!("missing obj keyword for {}", r)));
        }
        let (obj, _) = parse_object(rest)?;
        Ok(obj)
    }

    /// Expand an object stream (`/Type /ObjStm`) and pull one entry.
    fn object_in_stream(&self, container: u32, index: u32, r: ObjRef) -> Result<Object> {
        let stream = self.object_raw(ObjRef::new(container, 0))?;
        // The container was fetched raw: decrypt its payload first when an
        // encryption handler is active (object streams use their own id).
        let stream = match (&self.handler, stream) {
            (Some(handler), Object::Stream { dict, data }) => {
                let decrypted = handler.decrypt(&data, container, 0)?;
                Object::Stream {
                    dict,
                    data: decrypted.into(),
                }
            },
            (_, other) => other,
        };
        let dict = stream
            .as_dict()
            .ok_or_else(|| Error::InvalidPdf(format!("object stream {} has no dict", container)))?;
        let n = dict.get("N").and_then(|o| o.as_int()).unwrap_or(0) as usize;
        let first = dict.get("First").and_then(|o| o.as_int()).unwrap_or(0) as usize;
        let data = decode::decode_stream(&stream)?;

        // Header: N pairs of `objnum offset`
        let mut header = &data[..first.min(data.len())];
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            let (rest, num) = match lexer::token(header) {
                Ok((rest, lexer::Token::Integer(num))) => (rest, num),
                _ => break,
            };
            let (rest, off) = match lexer::token(rest) {
                Ok((rest, lexer::Token::Integer(off))) => (rest, off),
                _ => break,
            };
            entries.push((num as u32, off as usize));
            header = rest;
        }
        let (num, offset) = *entries
            .get(index as usize)
            .ok_or_else(|| Error::ObjectNotFound(r.num, r.gen))?;
        if num != r.num {
            return Err(Error::InvalidPdf(format!(
                "object stream {} entry {} holds {} not {}",
                container, index, num, r.num
            )));
        }
        let (obj, _) = parse_object(&data[(first + offset).min(data.len())..])?;
        Ok(obj)
    }

    /// Follow reference chains to a direct object.
    pub fn resolve(&mut self, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        for _ in 0..32 {
            match current {
                Object::Reference(r) => current = self.object(r)?,
                other => return Ok(other),
            }
        }
        Err(Error::InvalidPdf("reference chain too deep".to_string()))
    }

    /// Decrypt (if needed) and decode a stream object's payload.
    pub fn stream_data(&mut self, stream: &Object, r: ObjRef) -> Result<Vec<u8>> {
        let (dict, data) = match stream {
            Object::Stream { dict, data } => (dict.clone(), data.clone()),
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };
        // Already decrypted when fetched through object(); cached objects
        // hold plaintext payloads.
        let _ = r;
        let params = match dict.get("DecodeParms") {
            Some(Object::Dictionary(d)) => Some(DecodeParams::from_dict(d)),
            Some(Object::Reference(pr)) => {
                let resolved = self.object(*pr)?;
                resolved.as_dict().map(DecodeParams::from_dict)
            },
            _ => None,
        };
        let stream_obj = Object::Stream { dict, data };
        decode::decode_chain(
            match &stream_obj {
                Object::Stream { data, .. } => data,
                _ => unreachable!(),
            },
            &stream_obj.filters(),
            params,
        )
    }

    /// Walk the page tree, inheriting Resources and MediaBox.
    pub fn pages(&mut self) -> Result<Vec<Page>> {
        let root_ref = self
            .xref
            .trailer
            .get("Root")
            .cloned()
            .ok_or_else(|| Error::InvalidPdf("trailer has no /Root".to_string()))?;
        let catalog = self.resolve(&root_ref)?;
        let pages_obj = catalog
            .as_dict()
            .and_then(|d| d.get("Pages").cloned())
            .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages".to_string()))?;

        let mut pages = Vec::new();
        let default_box = [0.0, 0.0, 612.0, 792.0];
        self.walk_pages(&pages_obj, Dict::new(), default_box, &mut pages, 0)?;
        Ok(pages)
    }

    fn walk_pages(
        &mut self,
        node_obj: &Object,
        inherited_resources: Dict,
        inherited_box: [f32; 4],
        pages: &mut Vec<Page>,
        depth: u32,
    ) -> Result<()> {
        if depth > 64 {
            return Err(Error::InvalidPdf("page tree too deep".to_string()));
        }
        let node = self.resolve(node_obj)?;
        let dict = match node.as_dict() {
            Some(d) => d.clone(),
            None => return Ok(()),
        };

        let resources = match dict.get("Resources") {
            Some(res) => self.resolve(res)?.as_dict().cloned().unwrap_or(inherited_resources),
            None => inherited_resources,
        };
        let media_box = match dict.get("MediaBox") {
            Some(mb) => {
                let resolved = self.resolve(mb)?;
                parse_rect(&resolved).unwrap_or(inherited_box)
            },
            None => inherited_box,
        };

        match dict.get("Type").and_then(|t| t.as_name()) {
            Some("Pages") => {
                let kids = match dict.get("Kids") {
                    Some(kids) => self.resolve(kids)?,
                    None => return Ok(()),
                };
                if let Some(kids) = kids.as_array() {
                    for kid in kids.to_vec() {
                        self.walk_pages(&kid, resources.clone(), media_box, pages, depth + 1)?;
                    }
                }
            },
            _ => {
                // A leaf page
                let contents = self.page_contents(&dict)?;
                pages.push(Page {
                    resources,
                    media_box,
                    contents,
                });
            },
        }
        Ok(())
    }

    /// Join and decode a page's content stream(s).
    fn page_contents(&mut self, page: &Dict) -> Result<Vec<u8>> {
        let contents = match page.get("Contents") {
            Some(c) => c.clone(),
            None => return Ok(Vec::new()),
        };
        let mut segments: Vec<Object> = Vec::new();
        match self.resolve(&contents)? {
            Object::Array(items) => {
                for item in items {
                    segments.push(self.resolve(&item)?);
                }
            },
            other => segments.push(other),
        }
        let mut joined = Vec::new();
        for segment in &segments {
            if matches!(segment, Object::Stream { .. }) {
                let data = self.stream_data(segment, ObjRef::new(0, 0))?;
                joined.extend_from_slice(&data);
                joined.push(b'\n');
            }
        }
        Ok(joined)
    }
}

/// Check the `%PDF-M.N` header within the first bytes of the file.
fn sniff_header(bytes: &[u8]) -> Result<String> {
    let window = &bytes[..bytes.len().min(20)];
    let pos = crate::pdf::object::find_subslice(window, b"%PDF-").ok_or_else(|| {
        Error::InvalidHeader(String::from_utf8_lossy(window).into_owned())
    })?;
    let after = &bytes[pos + 5..];
    let version: String = after
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == b'.')
        .map(|&c| c as char)
        .collect();
    if VERSIONS.contains(&version.as_str()) {
        Ok(version)
    } else {
        Err(Error::InvalidHeader(format!("%PDF-{}", version)))
    }
}

fn parse_rect(obj: &Object) -> Option<[f32; 4]> {
    let array = obj.as_array()?;
    if array.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(array) {
        *slot = item.as_number()? as f32;
    }
    Some(rect)
}

/// Recursively decrypt the strings (and stream payload) of an object.
fn decrypt_object(obj: Object, handler: &SecurityHandler, num: u32, gen: u16) -> Object {
    match obj {
        Object::String(s) => {
            Object::String(handler.decrypt(&s, num, gen).unwrap_or(s))
        },
        Object::Array(items) => Object::Array(
            items.into_iter().map(|o| decrypt_object(o, handler, num, gen)).collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(
            dict.into_iter()
                .map(|(k, v)| (k, decrypt_object(v, handler, num, gen)))
                .collect(),
        ),
        Object::Stream { dict, data } => {
            let dict: Dict = dict
                .into_iter()
                .map(|(k, v)| (k, decrypt_object(v, handler, num, gen)))
                .collect();
            // Object streams and xref streams are never encrypted at this
            // layer; Type tells them apart
            let is_meta = dict.get("Type").and_then(|t| t.as_name()) == Some("XRef");
            let data = if is_meta {
                data
            } else {
                handler.decrypt(&data, num, gen).map(Into::into).unwrap_or(data)
            };
            Object::Stream { dict, data }
        },
        other => other,
    }
}
